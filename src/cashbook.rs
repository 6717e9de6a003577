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

//! Central cash ledger collaborator.
//!
//! The company account is append-only: every transfer into a card writes
//! exactly one outflow entry, every reconciliation writes exactly one
//! inflow entry, and entries are never mutated or removed. The in-memory
//! implementation keeps an export queue in append order alongside an
//! id-indexed map.

use crate::base::{CardId, EntryId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Direction of a cash ledger entry relative to the central account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    Inflow,
    Outflow,
}

/// One immutable entry in the company's central cash account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashEntry {
    pub id: EntryId,
    pub direction: FlowDirection,
    pub amount: Decimal,
    /// Display label, typically the card title. Traceability goes through
    /// `card_id`, never through this string.
    pub origin: String,
    pub card_id: CardId,
    pub category: String,
    pub date: DateTime<Utc>,
}

/// Append-only cash ledger interface.
///
/// Implementations must make each append atomic; the coordinator provides
/// retry and compensation on top.
pub trait CashLedger: Send + Sync {
    fn append_outflow(
        &self,
        card_id: CardId,
        origin: &str,
        category: &str,
        amount: Decimal,
    ) -> Result<EntryId, LedgerError>;

    fn append_inflow(
        &self,
        card_id: CardId,
        origin: &str,
        category: &str,
        amount: Decimal,
    ) -> Result<EntryId, LedgerError>;
}

/// In-memory append-only cash ledger.
///
/// Entries are indexed by id for O(1) lookup; a lock-free queue preserves
/// append order for journal export.
#[derive(Debug, Default)]
pub struct MemoryCashLedger {
    entries: DashMap<EntryId, CashEntry>,
    export_queue: SegQueue<EntryId>,
    next_id: AtomicU64,
}

impl MemoryCashLedger {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            export_queue: SegQueue::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn append(
        &self,
        direction: FlowDirection,
        card_id: CardId,
        origin: &str,
        category: &str,
        amount: Decimal,
    ) -> EntryId {
        let id = EntryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = CashEntry {
            id,
            direction,
            amount,
            origin: origin.to_owned(),
            card_id,
            category: category.to_owned(),
            date: Utc::now(),
        };
        self.entries.insert(id, entry);
        self.export_queue.push(id);
        id
    }

    pub fn get(&self, id: EntryId) -> Option<CashEntry> {
        self.entries.get(&id).map(|e| e.clone())
    }

    /// All entries, ordered by allocation (append) order.
    pub fn entries(&self) -> Vec<CashEntry> {
        let mut all: Vec<CashEntry> = self.entries.iter().map(|e| e.clone()).collect();
        all.sort_by_key(|e| e.id);
        all
    }

    pub fn entries_for(&self, card_id: CardId) -> Vec<CashEntry> {
        let mut matching: Vec<CashEntry> = self
            .entries
            .iter()
            .filter(|e| e.card_id == card_id)
            .map(|e| e.clone())
            .collect();
        matching.sort_by_key(|e| e.id);
        matching
    }

    /// Net position of the central account relative to these entries:
    /// inflows minus outflows.
    pub fn net_flow(&self) -> Decimal {
        self.entries.iter().fold(Decimal::ZERO, |acc, e| {
            match e.direction {
                FlowDirection::Inflow => acc + e.amount,
                FlowDirection::Outflow => acc - e.amount,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pops entries queued since the last export, in append order. Used by
    /// the CLI journal writer; entries themselves stay in the ledger.
    pub fn drain_export(&self) -> Vec<CashEntry> {
        let mut exported = Vec::new();
        while let Some(id) = self.export_queue.pop() {
            if let Some(entry) = self.entries.get(&id) {
                exported.push(entry.clone());
            }
        }
        exported
    }
}

impl CashLedger for MemoryCashLedger {
    fn append_outflow(
        &self,
        card_id: CardId,
        origin: &str,
        category: &str,
        amount: Decimal,
    ) -> Result<EntryId, LedgerError> {
        Ok(self.append(FlowDirection::Outflow, card_id, origin, category, amount))
    }

    fn append_inflow(
        &self,
        card_id: CardId,
        origin: &str,
        category: &str,
        amount: Decimal,
    ) -> Result<EntryId, LedgerError> {
        Ok(self.append(FlowDirection::Inflow, card_id, origin, category, amount))
    }
}
