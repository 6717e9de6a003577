// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 The verba-ledger authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Expense category registry. Read-only to the ledger core.

use crate::base::CategoryId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Named expense categories. The core only validates ids against it.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    categories: DashMap<CategoryId, Category>,
}

impl CategoryRegistry {
    /// Reserved category for reconciliation adjustment entries.
    pub const ADJUSTMENT: CategoryId = CategoryId(0);

    pub fn new() -> Self {
        Self {
            categories: DashMap::new(),
        }
    }

    /// Registry seeded with the stock categories of the business.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let defaults = [
            (Self::ADJUSTMENT, "reconciliation adjustment"),
            (CategoryId(1), "materials"),
            (CategoryId(2), "labor"),
            (CategoryId(3), "transport"),
            (CategoryId(4), "equipment rental"),
            (CategoryId(5), "third-party services"),
            (CategoryId(6), "miscellaneous"),
        ];
        for (id, name) in defaults {
            registry.insert(id, name);
        }
        registry
    }

    pub fn insert(&self, id: CategoryId, name: &str) {
        self.categories.insert(
            id,
            Category {
                id,
                name: name.to_owned(),
            },
        );
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.categories.contains_key(&id)
    }

    pub fn name(&self, id: CategoryId) -> Option<String> {
        self.categories.get(&id).map(|c| c.name.clone())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_adjustment_category() {
        let registry = CategoryRegistry::with_defaults();
        assert!(registry.contains(CategoryRegistry::ADJUSTMENT));
        assert_eq!(
            registry.name(CategoryRegistry::ADJUSTMENT).as_deref(),
            Some("reconciliation adjustment")
        );
        assert!(registry.len() >= 6);
    }

    #[test]
    fn unknown_id_is_absent() {
        let registry = CategoryRegistry::with_defaults();
        assert!(!registry.contains(CategoryId(999)));
        assert_eq!(registry.name(CategoryId(999)), None);
    }
}
