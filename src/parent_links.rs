//! Remembers the most recently created father and mother per session so the
//! next student created in that session can be linked to them.
//!
//! Entries live in an in-memory TTL cache and are never persisted. Callers
//! that send no session key all share [`DEFAULT_SESSION`].

use moka::future::Cache;
use serde_json::Value;
use std::time::Duration;

/// Session used when the request carries no `X-Session-Id`.
pub const DEFAULT_SESSION: &str = "";

/// Request header carrying the session key.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRole {
    Father,
    Mother,
}

impl ParentRole {
    /// `"1"` is a father and `"2"` a mother; any other value, including the
    /// numbers 1 and 2, selects no role.
    pub fn from_gendercode(gendercode: Option<&Value>) -> Option<Self> {
        match gendercode.and_then(Value::as_str) {
            Some("1") => Some(ParentRole::Father),
            Some("2") => Some(ParentRole::Mother),
            _ => None,
        }
    }

    /// Lookup field on the student contact that points at this parent.
    pub fn lookup_field(self) -> &'static str {
        match self {
            ParentRole::Father => "new_Father",
            ParentRole::Mother => "new_Mother",
        }
    }
}

/// Parent identifiers recorded for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentLinks {
    pub father: Option<String>,
    pub mother: Option<String>,
}

impl ParentLinks {
    pub fn get(&self, role: ParentRole) -> Option<&str> {
        match role {
            ParentRole::Father => self.father.as_deref(),
            ParentRole::Mother => self.mother.as_deref(),
        }
    }

    fn set(&mut self, role: ParentRole, id: String) {
        match role {
            ParentRole::Father => self.father = Some(id),
            ParentRole::Mother => self.mother = Some(id),
        }
    }
}

#[derive(Clone)]
pub struct ParentLinkStore {
    entries: Cache<String, ParentLinks>,
}

impl ParentLinkStore {
    pub fn new(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(10_000)
            .build();
        Self { entries }
    }

    /// Records `id` in the `role` slot of `session`, keeping the other slot.
    pub async fn set_parent(&self, session: &str, role: ParentRole, id: impl Into<String>) {
        let id = id.into();
        tracing::debug!("Recording {:?} {} for session '{}'", role, id, session);

        self.entries
            .entry(session.to_string())
            .and_upsert_with(|existing| {
                let mut links = existing.map(|entry| entry.into_value()).unwrap_or_default();
                links.set(role, id);
                std::future::ready(links)
            })
            .await;
    }

    pub async fn get_parent(&self, session: &str, role: ParentRole) -> Option<String> {
        self.parents(session).await.get(role).map(str::to_string)
    }

    pub async fn parents(&self, session: &str) -> ParentLinks {
        self.entries.get(session).await.unwrap_or_default()
    }
}
