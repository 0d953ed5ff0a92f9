//! Task categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{default_priority, generate_id, Entity, EntityService, Violations};
use crate::error::Result;
use crate::store::{Collection, Store};

pub const DEFAULT_COLOR: &str = "#0d6efd";
pub const DEFAULT_ICON: &str = "bi bi-folder";

const ID_PREFIX: &str = "cat";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(with = "crate::dates::instant")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::dates::instant")]
    pub updated_at: DateTime<Utc>,
}

/// Input for [`CategoryService::create`]
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub priority: Option<u8>,
}

impl NewCategory {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub priority: Option<u8>,
}

impl Entity for Category {
    type Draft = NewCategory;
    type Patch = CategoryPatch;

    const COLLECTION: Collection = Collection::Categories;
    const KIND: &'static str = "category";

    fn build(draft: NewCategory, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(ID_PREFIX),
            name: draft.name.trim().to_string(),
            color: draft.color.unwrap_or_else(default_color),
            icon: draft.icon.unwrap_or_else(default_icon),
            priority: draft.priority.unwrap_or_else(default_priority),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: CategoryPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
    }

    fn validate(&self) -> Vec<String> {
        let mut violations = Violations::new();
        violations.require_text(&self.name, "category name is required");
        violations.require_text(&self.color, "category color is required");
        violations.require_text(&self.icon, "category icon is required");
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

pub type CategoryService<'a> = EntityService<'a, Category>;

impl<'a> EntityService<'a, Category> {
    pub fn categories(store: &'a Store) -> Self {
        Self::new(store)
    }

    pub fn by_priority(&self, priority: u8) -> Result<Vec<Category>> {
        self.get_by_index("priority", &priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn build_fills_defaults() {
        let now = Utc::now();
        let category = Category::build(NewCategory::named("  Work "), now);
        assert!(category.id.starts_with("cat_"));
        assert_eq!(category.name, "Work");
        assert_eq!(category.color, DEFAULT_COLOR);
        assert_eq!(category.icon, DEFAULT_ICON);
        assert_eq!(category.priority, 1);
        assert_eq!(category.created_at, category.updated_at);
        assert!(category.validate().is_empty());
    }

    #[test]
    fn validate_reports_every_violation() {
        let mut category = Category::build(NewCategory::named(""), Utc::now());
        category.color.clear();
        category.priority = 12;
        let reasons = category.validate();
        assert_eq!(reasons.len(), 3);
    }

    #[test]
    fn service_rejects_invalid_priority() {
        let temp = tempfile::tempdir().unwrap();
        let store = Store::open(temp.path(), "test").unwrap();
        let service = CategoryService::categories(&store);
        let err = service
            .create(NewCategory {
                name: "Home".to_string(),
                priority: Some(0),
                ..NewCategory::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation { entity: "category", .. }));
        assert!(service.get_all().unwrap().is_empty());
    }

    #[test]
    fn legacy_record_without_optional_fields_loads() {
        let raw = serde_json::json!({
            "id": "cat_1",
            "name": "Legacy",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z"
        });
        let category: Category = serde_json::from_value(raw).unwrap();
        assert_eq!(category.priority, 1);
        assert_eq!(category.color, DEFAULT_COLOR);
    }
}
