//! Expense/income categories and their service contract.
//!
//! Categories are either global (no owner) or scoped to the chat that created
//! them. The keyboard order is driven by `usage_count`, most used first.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryKind {
    Expense,
    Income,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    /// Chat id of the owning user; `None` for global categories.
    pub owner: Option<i64>,
    pub usage_count: u64,
}

impl Category {
    pub fn is_expense(&self) -> bool {
        self.kind == CategoryKind::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == CategoryKind::Income
    }
}

/// Lookup/creation contract consumed by the wizards.
///
/// Name comparisons are case-insensitive throughout.
pub trait CategoryService: Send + Sync {
    /// First category matching `name`, regardless of kind.
    fn find_by_name(&self, name: &str) -> Result<Category, LedgerError>;

    fn find_by_name_and_kind(&self, name: &str, kind: CategoryKind)
    -> Result<Category, LedgerError>;

    /// All categories of `kind`, most used first, then by name.
    fn list_by_kind(&self, kind: CategoryKind) -> Vec<Category>;

    fn list_by_owner(&self, owner: i64) -> Vec<Category>;

    /// True if `name` exists globally or scoped to `owner`.
    fn exists(&self, name: &str, owner: Option<i64>) -> bool;

    fn create(
        &self,
        name: &str,
        kind: CategoryKind,
        owner: Option<i64>,
    ) -> Result<Category, LedgerError>;

    /// Case-insensitive "contains" search over the owner's and the global
    /// categories, used for clarification keyboards.
    fn search_similar(&self, fragment: &str, owner: i64) -> Vec<Category>;

    fn increment_usage(&self, id: Uuid) -> Result<(), LedgerError>;
}

/// In-memory category registry.
#[derive(Clone, Default)]
pub struct InMemoryCategories {
    inner: Arc<Mutex<HashMap<Uuid, Category>>>,
}

impl InMemoryCategories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a global category, ignoring duplicates. Used at startup.
    pub fn seed(&self, name: &str, kind: CategoryKind) {
        let _ = self.create(name, kind, None);
    }

    fn sorted(mut categories: Vec<Category>) -> Vec<Category> {
        categories.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        categories
    }
}

impl CategoryService for InMemoryCategories {
    fn find_by_name(&self, name: &str) -> Result<Category, LedgerError> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Err(LedgerError::InvalidInput("blank category name".to_string()));
        }
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .values()
            .find(|c| c.name.to_lowercase() == needle)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(name.trim().to_string()))
    }

    fn find_by_name_and_kind(
        &self,
        name: &str,
        kind: CategoryKind,
    ) -> Result<Category, LedgerError> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Err(LedgerError::InvalidInput("blank category name".to_string()));
        }
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .values()
            .find(|c| c.kind == kind && c.name.to_lowercase() == needle)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(name.trim().to_string()))
    }

    fn list_by_kind(&self, kind: CategoryKind) -> Vec<Category> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::sorted(guard.values().filter(|c| c.kind == kind).cloned().collect())
    }

    fn list_by_owner(&self, owner: i64) -> Vec<Category> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::sorted(
            guard
                .values()
                .filter(|c| c.owner == Some(owner))
                .cloned()
                .collect(),
        )
    }

    fn exists(&self, name: &str, owner: Option<i64>) -> bool {
        let needle = name.trim().to_lowercase();
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.values().any(|c| {
            c.name.to_lowercase() == needle && (c.owner.is_none() || c.owner == owner)
        })
    }

    fn create(
        &self,
        name: &str,
        kind: CategoryKind,
        owner: Option<i64>,
    ) -> Result<Category, LedgerError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidInput("blank category name".to_string()));
        }
        let needle = trimmed.to_lowercase();

        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if guard
            .values()
            .any(|c| c.owner == owner && c.name.to_lowercase() == needle)
        {
            return Err(LedgerError::ExistingKey(trimmed.to_string()));
        }

        let category = Category {
            id: Uuid::new_v4(),
            name: trimmed.to_string(),
            kind,
            owner,
            usage_count: 0,
        };
        guard.insert(category.id, category.clone());
        Ok(category)
    }

    fn search_similar(&self, fragment: &str, owner: i64) -> Vec<Category> {
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::sorted(
            guard
                .values()
                .filter(|c| c.owner.is_none() || c.owner == Some(owner))
                .filter(|c| c.name.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        )
    }

    fn increment_usage(&self, id: Uuid) -> Result<(), LedgerError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let category = guard
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        category.usage_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_duplicate_per_owner() {
        let categories = InMemoryCategories::new();
        categories.create("Еда", CategoryKind::Expense, Some(1)).unwrap();
        assert!(matches!(
            categories.create("еда", CategoryKind::Expense, Some(1)),
            Err(LedgerError::ExistingKey(_))
        ));
        // Same name scoped to another chat is fine.
        categories.create("еда", CategoryKind::Expense, Some(2)).unwrap();
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let categories = InMemoryCategories::new();
        categories.seed("Транспорт", CategoryKind::Expense);
        assert!(categories.find_by_name("транспорт").is_ok());
        assert!(categories.exists("ТРАНСПОРТ", Some(7)));
        assert!(matches!(
            categories.find_by_name_and_kind("транспорт", CategoryKind::Income),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn list_orders_by_usage_then_name() {
        let categories = InMemoryCategories::new();
        let a = categories.create("Аптека", CategoryKind::Expense, None).unwrap();
        let b = categories.create("Бензин", CategoryKind::Expense, None).unwrap();
        categories.increment_usage(b.id).unwrap();

        let listed = categories.list_by_kind(CategoryKind::Expense);
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
    }

    #[test]
    fn similar_search_matches_substring() {
        let categories = InMemoryCategories::new();
        categories.seed("Продукты", CategoryKind::Expense);
        categories.create("Подарки", CategoryKind::Expense, Some(5)).unwrap();

        let hits = categories.search_similar("про", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Продукты");

        // Another owner's private categories stay hidden.
        assert!(categories.search_similar("подар", 6).is_empty());
    }
}
