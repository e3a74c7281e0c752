use crate::config::Config;
use crate::errors::AppError;
use crate::models::{AccountRequest, CreatedEntity, ODataCollection};
use crate::token::TokenProvider;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    error: ODataErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ODataErrorDetail {
    message: String,
}

/// A lookup field to point at another record through `@odata.bind`.
#[derive(Debug, Clone, Copy)]
pub struct LookupLink<'a> {
    pub entity_set: &'a str,
    pub entity_id: &'a str,
    pub lookup_field: &'a str,
    pub target_entity_set: &'a str,
    pub target_id: &'a str,
}

/// Client for the CRM Web API (OData v4).
///
/// Every call asks the [`TokenProvider`] for a bearer token; the provider
/// serves it from its cache while it is fresh.
#[derive(Clone)]
pub struct CrmClient {
    client: reqwest::Client,
    api_base: String,
    tokens: TokenProvider,
}

impl CrmClient {
    /// Creates a new `CrmClient` from configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.crm_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create CRM client: {}", e))
            })?;

        let tokens = TokenProvider::new(config, client.clone());

        Ok(Self {
            client,
            api_base: config.crm_api_base(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Creates a record in `entity_set` from the contact fields of `fields`.
    ///
    /// # Returns
    ///
    /// * `Result<CreatedEntity, AppError>` - The identifier taken from the `Location` header.
    pub async fn create_entity(
        &self,
        fields: &AccountRequest,
        entity_set: &str,
    ) -> Result<CreatedEntity, AppError> {
        let token = self.tokens.get_access_token().await?;
        let url = format!("{}/{}", self.api_base, entity_set);
        let record = fields.to_contact_record();

        tracing::debug!("Request payload for {}: {:?}", entity_set, record);

        let response = self
            .authorized(self.client.post(&url), &token)
            .json(&record)
            .send()
            .await
            .map_err(|e| {
                AppError::CrmWriteError(format!("Failed to create {}: {}", entity_set, e))
            })?;

        if !response.status().is_success() {
            let message = upstream_message(response).await;
            tracing::error!("Error creating {}: {}", entity_set, message);
            return Err(AppError::CrmWriteError(format!(
                "Failed to create {}: {}",
                entity_set, message
            )));
        }

        let location = location_header(response.headers())?;
        let guid = parse_entity_id(location)?;

        tracing::info!("{} created with GUID: {}", entity_set, guid);
        Ok(CreatedEntity { guid })
    }

    /// Points `link.lookup_field` of an existing record at another record.
    pub async fn link_lookup(&self, link: LookupLink<'_>) -> Result<(), AppError> {
        let token = self.tokens.get_access_token().await?;
        let url = format!("{}/{}({})", self.api_base, link.entity_set, link.entity_id);

        let mut body = serde_json::Map::new();
        body.insert(
            format!("{}@odata.bind", link.lookup_field),
            json!(format!("/{}({})", link.target_entity_set, link.target_id)),
        );

        let response = self
            .authorized(self.client.patch(&url), &token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::CrmWriteError(format!("Failed to update {}: {}", link.lookup_field, e))
            })?;

        if !response.status().is_success() {
            let message = upstream_message(response).await;
            tracing::error!(
                "Error updating {} for {}: {}",
                link.lookup_field,
                link.entity_set,
                message
            );
            return Err(AppError::CrmWriteError(format!(
                "Failed to update {}: {}",
                link.lookup_field, message
            )));
        }

        tracing::info!(
            "Updated {} for {} with ID: {}",
            link.lookup_field,
            link.entity_set,
            link.entity_id
        );
        Ok(())
    }

    /// Deletes a record; used to undo a creation whose follow-up steps failed.
    pub async fn delete_entity(&self, entity_set: &str, entity_id: &str) -> Result<(), AppError> {
        let token = self.tokens.get_access_token().await?;
        let url = format!("{}/{}({})", self.api_base, entity_set, entity_id);

        let response = self
            .authorized(self.client.delete(&url), &token)
            .send()
            .await
            .map_err(|e| {
                AppError::CrmWriteError(format!("Failed to delete {}: {}", entity_set, e))
            })?;

        if !response.status().is_success() {
            let message = upstream_message(response).await;
            return Err(AppError::CrmWriteError(format!(
                "Failed to delete {}: {}",
                entity_set, message
            )));
        }

        tracing::info!("Deleted {} with ID: {}", entity_set, entity_id);
        Ok(())
    }

    /// Runs a fetchXml query against `entity_set` and returns the `value` rows.
    pub async fn fetch_xml<T: DeserializeOwned>(
        &self,
        entity_set: &str,
        fetch_xml: &str,
    ) -> Result<Vec<T>, AppError> {
        let token = self.tokens.get_access_token().await?;

        // Build URL with proper parameter encoding; fetchXml is raw XML.
        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}", self.api_base, entity_set),
            &[("fetchXml", fetch_xml)],
        )
        .map_err(|e| AppError::CrmQueryError(format!("Failed to build URL: {}", e)))?;

        let response = self
            .authorized(self.client.get(url), &token)
            .send()
            .await
            .map_err(|e| AppError::CrmQueryError(format!("CRM query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = upstream_message(response).await;
            return Err(AppError::CrmQueryError(format!(
                "CRM returned {} for {} query: {}",
                status, entity_set, message
            )));
        }

        let collection: ODataCollection<T> = response.json().await.map_err(|e| {
            AppError::CrmQueryError(format!("Failed to parse {} response: {}", entity_set, e))
        })?;

        Ok(collection.value)
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
    }
}

fn location_header(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(LOCATION)
        .ok_or_else(|| AppError::InvalidLocation("response has no Location header".to_string()))
        .and_then(|value: &HeaderValue| {
            value.to_str().map_err(|_| {
                AppError::InvalidLocation("Location header is not valid ASCII".to_string())
            })
        })
}

/// Extracts the record GUID from a creation `Location` header such as
/// `https://org.crm.dynamics.com/api/data/v9.0/contacts(<guid>)`.
///
/// The header is parsed as a URL when absolute; the last path segment must
/// end in `(<guid>)`.
pub fn parse_entity_id(location: &str) -> Result<Uuid, AppError> {
    let parsed = url::Url::parse(location).ok();
    let path = parsed.as_ref().map_or(location, |u| u.path());

    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let open = segment.rfind('(').ok_or_else(|| {
        AppError::InvalidLocation(format!("no '(' in Location segment '{}'", segment))
    })?;
    let inner = &segment[open + 1..];
    let close = inner.find(')').ok_or_else(|| {
        AppError::InvalidLocation(format!("no closing ')' in Location segment '{}'", segment))
    })?;

    Uuid::parse_str(&inner[..close]).map_err(|e| {
        AppError::InvalidLocation(format!(
            "'{}' in Location header is not a GUID: {}",
            &inner[..close],
            e
        ))
    })
}

/// Best-effort message from a failed CRM response: the OData `error.message`
/// when present, else the raw body.
async fn upstream_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    extract_error_message(&text).unwrap_or_else(|| {
        if text.trim().is_empty() {
            format!("Request failed with status code {}", status.as_u16())
        } else {
            text
        }
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ODataErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_id_from_absolute_location() {
        let id = parse_entity_id(
            "https://org.crm4.dynamics.com/api/data/v9.0/contacts(11111111-2222-3333-4444-555555555555)",
        )
        .unwrap();
        assert_eq!(id.to_string(), "11111111-2222-3333-4444-555555555555");
    }

    #[test]
    fn test_parse_entity_id_from_relative_location() {
        let id = parse_entity_id("/api/data/v9.0/contacts(aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee)")
            .unwrap();
        assert_eq!(id.to_string(), "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
    }

    #[test]
    fn test_parse_entity_id_rejects_malformed_values() {
        for bad in [
            "",
            "https://org.crm.dynamics.com/api/data/v9.0/contacts",
            "https://org.crm.dynamics.com/api/data/v9.0/contacts(",
            "https://org.crm.dynamics.com/api/data/v9.0/contacts(not-a-guid)",
            "contacts()",
        ] {
            match parse_entity_id(bad) {
                Err(AppError::InvalidLocation(_)) => {}
                other => panic!("expected InvalidLocation for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"code":"0x80040203","message":"Invalid property 'x'"}}"#;
        assert_eq!(
            extract_error_message(body),
            Some("Invalid property 'x'".to_string())
        );
        assert_eq!(extract_error_message("Service Unavailable"), None);
    }

    #[tokio::test]
    async fn test_client_creation() {
        let config =
            crate::test_support::config("https://login.example.com", "https://crm.example.com");
        assert!(CrmClient::new(&config).is_ok());
    }
}
