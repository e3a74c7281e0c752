//! CRM Account Gateway Library
//!
//! HTTP gateway that creates teacher, student and parent contacts in a
//! Dynamics-style CRM and lists its academic years, authenticating with
//! client-credential OAuth tokens.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `integrations`: CRM and identity-provider clients.
//! - `app`: Router construction and shared middleware.
//! - `config`: Configuration management.
//! - `crm_client`: CRM Web API client (create, link, delete, fetchXml).
//! - `enrollment`: Student creation and lookup linking workflow.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Request, CRM payload and response models.
//! - `parent_links`: Per-session memory of recently created parents.
//! - `token`: OAuth2 client-credential token provider with caching.
//! - `validation`: Required-field checks.

pub mod api;
pub mod integrations;

pub mod app;
pub mod config;
pub mod crm_client;
pub mod enrollment;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod parent_links;
pub mod token;
pub mod validation;

#[cfg(test)]
mod test_support;
