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

//! Operation journal for multi-store operations.
//!
//! Every operation that touches more than one store (card, cash ledger,
//! project budget) records its steps here under a stable operation id.
//! The journal retains the step marks of operations whose compensation
//! failed — the trail an operator needs for manual reconciliation.

use crate::base::{CardId, OperationId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// One committed step of a multi-store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SagaStep {
    /// Card balance credited by a transfer
    CardCredited,
    /// Outflow entry appended to the cash ledger
    OutflowAppended,
    /// Project budget pool decremented
    BudgetDebited,
    /// Inflow entry appended to the cash ledger
    InflowAppended,
    /// Project budget pool incremented
    BudgetCredited,
    /// Card balance drained into its reconciled total
    CardReconciled,
}

/// Terminal disposition of a journaled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    /// Still executing (or crashed mid-flight)
    InFlight,
    /// All steps committed
    Committed,
    /// Completed steps were reversed after a later-step failure
    Compensated,
    /// Compensation failed; stores disagree until an operator intervenes
    NeedsIntervention,
}

#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub id: OperationId,
    pub operation: &'static str,
    pub card_id: CardId,
    pub steps: Vec<SagaStep>,
    pub outcome: OpOutcome,
}

/// Append-only journal of multi-store operations.
#[derive(Debug, Default)]
pub struct OperationLog {
    records: DashMap<OperationId, OperationRecord>,
    next_id: AtomicU64,
}

impl OperationLog {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Starts a new operation under a freshly allocated id.
    pub fn begin(&self, operation: &'static str, card_id: CardId) -> OperationId {
        let id = OperationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.records.insert(
            id,
            OperationRecord {
                id,
                operation,
                card_id,
                steps: Vec::new(),
                outcome: OpOutcome::InFlight,
            },
        );
        id
    }

    /// Marks a step as committed.
    pub fn mark(&self, id: OperationId, step: SagaStep) {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.steps.push(step);
        }
    }

    pub fn finish(&self, id: OperationId) {
        self.set_outcome(id, OpOutcome::Committed);
    }

    pub fn mark_compensated(&self, id: OperationId) {
        self.set_outcome(id, OpOutcome::Compensated);
    }

    pub fn mark_needs_intervention(&self, id: OperationId) {
        self.set_outcome(id, OpOutcome::NeedsIntervention);
    }

    fn set_outcome(&self, id: OperationId, outcome: OpOutcome) {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.outcome = outcome;
        }
    }

    pub fn get(&self, id: OperationId) -> Option<OperationRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    /// Operations whose stores may disagree: still in flight (crashed) or
    /// with failed compensation.
    pub fn unresolved(&self) -> Vec<OperationRecord> {
        let mut pending: Vec<OperationRecord> = self
            .records
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    OpOutcome::InFlight | OpOutcome::NeedsIntervention
                )
            })
            .map(|r| r.clone())
            .collect();
        pending.sort_by_key(|r| r.id);
        pending
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_steps_in_order() {
        let log = OperationLog::new();
        let id = log.begin("transfer", CardId(1));
        log.mark(id, SagaStep::CardCredited);
        log.mark(id, SagaStep::OutflowAppended);
        log.mark(id, SagaStep::BudgetDebited);
        log.finish(id);

        let record = log.get(id).unwrap();
        assert_eq!(
            record.steps,
            vec![
                SagaStep::CardCredited,
                SagaStep::OutflowAppended,
                SagaStep::BudgetDebited,
            ]
        );
        assert_eq!(record.outcome, OpOutcome::Committed);
        assert!(log.unresolved().is_empty());
    }

    #[test]
    fn allocated_ids_are_distinct() {
        let log = OperationLog::new();
        let first = log.begin("transfer", CardId(1));
        let second = log.begin("transfer", CardId(1));
        assert_ne!(first, second);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn unresolved_reports_in_flight_and_stuck_operations() {
        let log = OperationLog::new();

        let committed = log.begin("transfer", CardId(1));
        log.mark(committed, SagaStep::CardCredited);
        log.finish(committed);

        let crashed = log.begin("transfer", CardId(2));
        log.mark(crashed, SagaStep::CardCredited);

        let stuck = log.begin("approve", CardId(3));
        log.mark(stuck, SagaStep::InflowAppended);
        log.mark_needs_intervention(stuck);

        let unresolved = log.unresolved();
        assert_eq!(unresolved.len(), 2);
        assert_eq!(unresolved[0].id, crashed);
        assert_eq!(unresolved[1].id, stuck);
    }

    #[test]
    fn compensated_operations_are_resolved() {
        let log = OperationLog::new();
        let id = log.begin("transfer", CardId(1));
        log.mark(id, SagaStep::CardCredited);
        log.mark_compensated(id);

        assert!(log.unresolved().is_empty());
        assert_eq!(log.get(id).unwrap().outcome, OpOutcome::Compensated);
    }
}
