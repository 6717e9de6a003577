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

//! # Verba Ledger
//!
//! A work-order cost-center ledger: per-project budget cards that receive
//! funds transferred from a central cash account, accumulate expenses
//! against that allocation, support a fund-request workflow, and on
//! approval reconcile any unspent balance back into the project budget
//! and the cash ledger.
//!
//! ## Core Components
//!
//! - [`Coordinator`]: executes the multi-store operations (transfer,
//!   expense registration, fund requests, finalize/approve/reject)
//! - [`CostCenterCard`]: the per-project sub-ledger and its state machine
//! - [`CashLedger`] / [`ProjectBudget`] / [`Capabilities`]: collaborator
//!   seams for the central account, the budget pools, and permissions
//! - [`LedgerError`]: the full error taxonomy, including
//!   partial-failure reports for multi-store operations
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_decimal_macros::dec;
//! use verba_ledger::{
//!     AllowAll, CategoryRegistry, Coordinator, MemoryCashLedger,
//!     MemoryProjectBudget, ProjectId, UserId,
//! };
//!
//! let budget = Arc::new(MemoryProjectBudget::new());
//! budget.open_pool(ProjectId(1), dec!(10000.00));
//!
//! let coordinator = Coordinator::new(
//!     Arc::new(MemoryCashLedger::new()),
//!     budget,
//!     Arc::new(CategoryRegistry::with_defaults()),
//!     Arc::new(AllowAll),
//! );
//!
//! let admin = UserId(1);
//! let card = coordinator
//!     .create_card(admin, ProjectId(1), "Storefront sign", "Acme Stores", dec!(10000.00), admin)
//!     .unwrap();
//! coordinator.transfer(admin, card, dec!(3000.00)).unwrap();
//!
//! let snapshot = coordinator.get_card(&card).unwrap().snapshot();
//! assert_eq!(snapshot.balance, dec!(3000.00));
//! ```
//!
//! ## Consistency
//!
//! A transfer or approval spans three independently persisted records —
//! the card, the cash ledger, and the project budget pool — with no
//! shared transaction. The coordinator runs these as sagas: bounded
//! retries per external call, compensating writes for committed steps on
//! a later-step failure, and a journaled record of what landed so a
//! failed compensation can be reconciled by hand. Operations on the same
//! card are serialized by a per-card guard; different cards proceed in
//! parallel.

pub mod access;
pub mod base;
pub mod budget;
pub mod card;
pub mod cashbook;
pub mod category;
mod coordinator;
pub mod error;
pub mod expense;
pub mod oplog;
pub mod request;

pub use access::{AllowAll, Capabilities, Role};
pub use base::{
    CardId, CategoryId, EntryId, ExpenseId, OperationId, ProjectId, RequestId, UserId,
};
pub use budget::{MemoryProjectBudget, ProjectBudget};
pub use card::{CardEdit, CardSnapshot, CardStatus, CostCenterCard};
pub use cashbook::{CashEntry, CashLedger, FlowDirection, MemoryCashLedger};
pub use category::CategoryRegistry;
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use error::LedgerError;
pub use expense::{EntryKind, Expense, ExpenseStatus};
pub use oplog::{OpOutcome, OperationLog, OperationRecord, SagaStep};
pub use request::{Decision, FundRequest, RequestStatus};
