//! Clients a task can be delivered for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{default_priority, generate_id, Entity, EntityService, Violations};
use crate::error::Result;
use crate::store::{Collection, Store};

const ID_PREFIX: &str = "client";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(with = "crate::dates::instant")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::dates::instant")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<u8>,
}

impl NewClient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u8>,
}

impl Entity for Client {
    type Draft = NewClient;
    type Patch = ClientPatch;

    const COLLECTION: Collection = Collection::Clients;
    const KIND: &'static str = "client";

    fn build(draft: NewClient, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(ID_PREFIX),
            name: draft.name.trim().to_string(),
            description: draft.description.unwrap_or_default(),
            priority: draft.priority.unwrap_or_else(default_priority),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: ClientPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
    }

    fn validate(&self) -> Vec<String> {
        let mut violations = Violations::new();
        violations.require_text(&self.name, "client name is required");
        violations.require_priority(self.priority);
        violations.into_reasons()
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

pub type ClientService<'a> = EntityService<'a, Client>;

impl<'a> EntityService<'a, Client> {
    pub fn clients(store: &'a Store) -> Self {
        Self::new(store)
    }

    pub fn by_priority(&self, priority: u8) -> Result<Vec<Client>> {
        self.get_by_index("priority", &priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_keeps_untouched_fields() {
        let now = Utc::now();
        let mut client = Client::build(
            NewClient {
                name: "Acme".to_string(),
                description: Some("Key account".to_string()),
                priority: Some(7),
            },
            now,
        );
        let id = client.id.clone();
        client.apply(ClientPatch {
            priority: Some(9),
            ..ClientPatch::default()
        });
        assert_eq!(client.id, id);
        assert_eq!(client.name, "Acme");
        assert_eq!(client.description, "Key account");
        assert_eq!(client.priority, 9);
        assert_eq!(client.created_at, now);
    }

    #[test]
    fn blank_name_is_invalid() {
        let client = Client::build(NewClient::named("   "), Utc::now());
        assert_eq!(client.validate(), vec!["client name is required".to_string()]);
    }
}
