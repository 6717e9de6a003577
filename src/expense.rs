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

//! Expense records charged against a card's balance.
//!
//! Reconciliation writes [`EntryKind::Adjustment`] entries instead of
//! negative-amount expenses, so spending totals and the audit trail stay
//! unambiguous.

use crate::base::{CardId, CategoryId, ExpenseId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

/// Distinguishes user expenses from reconciliation audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Expense,
    Adjustment,
}

/// One outflow (or reconciliation adjustment) recorded against a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub card_id: CardId,
    pub category_id: CategoryId,
    pub description: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub proof_reference: Option<String>,
    pub status: ExpenseStatus,
    pub kind: EntryKind,
}

impl Expense {
    pub fn is_adjustment(&self) -> bool {
        self.kind == EntryKind::Adjustment
    }
}
