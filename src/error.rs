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

//! Error types for the cost-center ledger.
//!
//! The taxonomy separates user-correctable validation failures from
//! partial-failure reports of multi-store operations. A
//! [`LedgerError::PartialLedgerFailure`] is never interchangeable with a
//! validation error: it carries the list of committed steps so an operator
//! can reconcile by hand when automatic compensation also failed.

use crate::base::OperationId;
use crate::card::CardStatus;
use crate::oplog::SagaStep;
use thiserror::Error;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// A required field is empty or absent
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Operation attempted from a state the transition table does not allow
    #[error("operation `{operation}` not allowed while card is {from}")]
    InvalidTransition {
        from: CardStatus,
        operation: &'static str,
    },

    /// Expense would exceed the card's current balance
    #[error("insufficient balance on card")]
    InsufficientBalance,

    /// Project budget pool has less remaining than the requested transfer
    #[error("project budget pool exhausted")]
    BudgetExhausted,

    /// A fund request is already pending on this card
    #[error("card already has a pending fund request")]
    RequestAlreadyPending,

    /// Fund request has already been approved or rejected
    #[error("fund request is no longer pending")]
    RequestNotPending,

    /// Referenced card does not exist
    #[error("card not found")]
    CardNotFound,

    /// Referenced expense does not exist
    #[error("expense not found")]
    ExpenseNotFound,

    /// Referenced fund request does not exist
    #[error("fund request not found")]
    RequestNotFound,

    /// Referenced project budget pool does not exist
    #[error("project budget pool not found")]
    ProjectNotFound,

    /// Expense category is not in the registry
    #[error("unknown expense category")]
    UnknownCategory,

    /// Reconciliation adjustments are part of the audit trail
    #[error("adjustment entries cannot be deleted")]
    AdjustmentImmutable,

    /// Capability provider denied the operation for this caller
    #[error("caller is not allowed to perform this operation")]
    PermissionDenied,

    /// Balance changed underneath a compensating write; retry the operation
    #[error("card was modified concurrently")]
    ConcurrentModification,

    /// External store did not respond within the bounded retry budget
    #[error("external store unavailable: {0}")]
    StoreUnavailable(&'static str),

    /// A later step of a multi-store operation failed after earlier steps
    /// committed. `committed` lists what landed; `compensated` reports
    /// whether the compensating writes succeeded.
    #[error(
        "operation `{operation}` ({id}) failed after steps {committed:?} committed \
         (compensated: {compensated})"
    )]
    PartialLedgerFailure {
        operation: &'static str,
        id: OperationId,
        committed: Vec<SagaStep>,
        compensated: bool,
    },
}

impl LedgerError {
    /// Whether re-submitting the same logical request is safe.
    ///
    /// Validation failures need a corrected request; partial failures with
    /// failed compensation need an operator.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::ConcurrentModification | LedgerError::StoreUnavailable(_) => true,
            LedgerError::PartialLedgerFailure { compensated, .. } => *compensated,
            _ => false,
        }
    }

    /// Whether this error leaves stores in a state requiring manual
    /// reconciliation.
    pub fn needs_intervention(&self) -> bool {
        matches!(
            self,
            LedgerError::PartialLedgerFailure {
                compensated: false,
                ..
            }
        )
    }
}
