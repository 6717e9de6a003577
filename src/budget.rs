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

//! Project budget pool collaborator.
//!
//! Each project has a single counter of remaining, unallocated value.
//! Transfers into cards decrement it; reconciliation on approval credits
//! the unspent remainder back. Pools are keyed by [`ProjectId`] only.

use crate::base::ProjectId;
use crate::error::LedgerError;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// Remaining-pool interface exposed by the project budget store.
pub trait ProjectBudget: Send + Sync {
    fn decrement_remaining(&self, project: ProjectId, amount: Decimal) -> Result<(), LedgerError>;

    fn increment_remaining(&self, project: ProjectId, amount: Decimal) -> Result<(), LedgerError>;

    fn remaining(&self, project: ProjectId) -> Option<Decimal>;
}

/// In-memory budget pools with per-project serialization.
///
/// The pool counter follows the same discipline as a card balance: every
/// read-modify-write happens under the project's mutex and the counter
/// never goes negative.
#[derive(Debug, Default)]
pub struct MemoryProjectBudget {
    pools: DashMap<ProjectId, Mutex<Decimal>>,
}

impl MemoryProjectBudget {
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
        }
    }

    /// Opens (or resets) a pool with the given remaining value.
    pub fn open_pool(&self, project: ProjectId, remaining: Decimal) {
        self.pools.insert(project, Mutex::new(remaining));
    }

    pub fn has_pool(&self, project: ProjectId) -> bool {
        self.pools.contains_key(&project)
    }
}

impl ProjectBudget for MemoryProjectBudget {
    fn decrement_remaining(
        &self,
        project: ProjectId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let pool = self.pools.get(&project).ok_or(LedgerError::ProjectNotFound)?;
        let mut remaining = pool.lock();
        if *remaining < amount {
            return Err(LedgerError::BudgetExhausted);
        }
        *remaining -= amount;
        Ok(())
    }

    fn increment_remaining(
        &self,
        project: ProjectId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let pool = self.pools.get(&project).ok_or(LedgerError::ProjectNotFound)?;
        *pool.lock() += amount;
        Ok(())
    }

    fn remaining(&self, project: ProjectId) -> Option<Decimal> {
        self.pools.get(&project).map(|pool| *pool.lock())
    }
}
