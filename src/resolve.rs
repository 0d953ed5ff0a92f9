//! Advisory reference resolution.
//!
//! Tasks point at categories and clients by id only. Deleting either side
//! never touches the tasks, so lookups resolve dangling ids to a fixed
//! placeholder instead of failing.

use std::collections::HashMap;

use crate::category::{Category, CategoryService};
use crate::client::{Client, ClientService};
use crate::error::Result;
use crate::store::Store;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_COLOR: &str = "#6c757d";
pub const UNKNOWN_ICON: &str = "bi bi-question-circle";

/// Display view of a category reference, real or placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef<'a> {
    pub id: Option<&'a str>,
    pub name: &'a str,
    pub color: &'a str,
    pub icon: &'a str,
    pub known: bool,
}

/// Id-keyed snapshot of categories and clients
#[derive(Debug, Clone, Default)]
pub struct Directory {
    categories: HashMap<String, Category>,
    clients: HashMap<String, Client>,
}

impl Directory {
    pub fn new(categories: Vec<Category>, clients: Vec<Client>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|category| (category.id.clone(), category))
                .collect(),
            clients: clients
                .into_iter()
                .map(|client| (client.id.clone(), client))
                .collect(),
        }
    }

    pub fn load(store: &Store) -> Result<Self> {
        Ok(Self::new(
            CategoryService::categories(store).get_all()?,
            ClientService::clients(store).get_all()?,
        ))
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn category_or_unknown<'a>(&'a self, id: Option<&'a str>) -> CategoryRef<'a> {
        match id.and_then(|id| self.categories.get(id)) {
            Some(category) => CategoryRef {
                id: Some(category.id.as_str()),
                name: category.name.as_str(),
                color: category.color.as_str(),
                icon: category.icon.as_str(),
                known: true,
            },
            None => CategoryRef {
                id,
                name: UNKNOWN_NAME,
                color: UNKNOWN_COLOR,
                icon: UNKNOWN_ICON,
                known: false,
            },
        }
    }

    pub fn category_name_or_unknown(&self, id: Option<&str>) -> &str {
        id.and_then(|id| self.categories.get(id))
            .map_or(UNKNOWN_NAME, |category| category.name.as_str())
    }

    pub fn client_name_or_unknown(&self, id: &str) -> &str {
        self.clients
            .get(id)
            .map_or(UNKNOWN_NAME, |client| client.name.as_str())
    }

    /// Client names for a task's references, unknown ids included as placeholders
    pub fn client_names<'a>(&'a self, ids: &'a [String]) -> Vec<&'a str> {
        ids.iter()
            .map(|id| self.client_name_or_unknown(id))
            .collect()
    }
}
