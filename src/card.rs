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

//! Cost-center card: the per-project sub-ledger.
//!
//! A card receives funds transferred in from the central cash account,
//! accumulates expenses against that allocation, and on approval returns
//! its unspent remainder to the project budget. The lifecycle is a closed
//! state machine:
//!
//  Pending ──transfer──► InProgress ──request_funds──► AwaitingFunds
//      │                     │  ▲◄─────resolve────────────┘
//      │                     │  │
//      │                 finalize└──reject── UnderReview ──approve──► Finalized
//      │                     ▼               ▲   │
//      │                 UnderReview ────────┘   │
//      └───────────cancel (any non-terminal)─────┴──────────► Canceled
//
//! Any transition not in the table is rejected with
//! [`LedgerError::InvalidTransition`].

use crate::base::{CardId, ProjectId, RequestId, UserId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Lifecycle state of a cost-center card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Pending,
    InProgress,
    AwaitingFunds,
    UnderReview,
    Finalized,
    Canceled,
}

impl CardStatus {
    /// Terminal states accept no further mutation of any kind.
    pub fn is_terminal(self) -> bool {
        matches!(self, CardStatus::Finalized | CardStatus::Canceled)
    }

    /// Explicit transition table. Everything not listed is rejected.
    pub fn can_transition(self, to: CardStatus) -> bool {
        use CardStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (InProgress, AwaitingFunds)
                | (InProgress, UnderReview)
                | (AwaitingFunds, InProgress)
                | (UnderReview, Finalized)
                | (UnderReview, InProgress)
                | (Pending, Canceled)
                | (InProgress, Canceled)
                | (AwaitingFunds, Canceled)
                | (UnderReview, Canceled)
        )
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardStatus::Pending => "pending",
            CardStatus::InProgress => "in_progress",
            CardStatus::AwaitingFunds => "awaiting_funds",
            CardStatus::UnderReview => "under_review",
            CardStatus::Finalized => "finalized",
            CardStatus::Canceled => "canceled",
        };
        write!(f, "{name}")
    }
}

/// Editable display fields of a card.
#[derive(Debug, Default, Clone)]
pub struct CardEdit {
    pub title: Option<String>,
    pub client_name: Option<String>,
    pub budget_total: Option<Decimal>,
}

#[derive(Debug)]
struct CardData {
    id: CardId,
    project_id: ProjectId,
    title: String,
    client_name: String,
    budget_total: Decimal,
    current_balance: Decimal,
    total_spent: Decimal,
    total_funded: Decimal,
    reconciled_out: Decimal,
    status: CardStatus,
    responsible_id: UserId,
    finalized_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    review_note: Option<String>,
    pending_request: Option<RequestId>,
    version: u64,
}

impl CardData {
    fn new(
        id: CardId,
        project_id: ProjectId,
        title: String,
        client_name: String,
        budget_total: Decimal,
        responsible_id: UserId,
    ) -> Self {
        Self {
            id,
            project_id,
            title,
            client_name,
            budget_total,
            current_balance: Decimal::ZERO,
            total_spent: Decimal::ZERO,
            total_funded: Decimal::ZERO,
            reconciled_out: Decimal::ZERO,
            status: CardStatus::Pending,
            responsible_id,
            finalized_at: None,
            approved_at: None,
            review_note: None,
            pending_request: None,
            version: 0,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.current_balance >= Decimal::ZERO,
            "Invariant violated: card {} balance went negative: {}",
            self.id,
            self.current_balance
        );
        debug_assert!(
            self.total_spent >= Decimal::ZERO,
            "Invariant violated: card {} total_spent went negative: {}",
            self.id,
            self.total_spent
        );
        debug_assert_eq!(
            self.total_funded,
            self.current_balance + self.total_spent + self.reconciled_out,
            "Invariant violated: card {} funding does not balance",
            self.id
        );
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn transition(&mut self, to: CardStatus, operation: &'static str) -> Result<(), LedgerError> {
        if !self.status.can_transition(to) {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                operation,
            });
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Applies an incoming transfer. Moves a `Pending` card into
    /// `InProgress` on its first funding.
    fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        match self.status {
            CardStatus::Pending | CardStatus::InProgress | CardStatus::AwaitingFunds => {}
            _ => {
                return Err(LedgerError::InvalidTransition {
                    from: self.status,
                    operation: "transfer",
                });
            }
        }
        self.current_balance += amount;
        self.total_funded += amount;
        if self.status == CardStatus::Pending {
            self.status = CardStatus::InProgress;
        }
        self.touch();
        self.assert_invariants();
        Ok(())
    }

    /// Compensating write for a transfer whose later steps failed.
    ///
    /// `was_pending` restores the pre-transfer status when the reversed
    /// credit was the card's first funding.
    fn reverse_credit(&mut self, amount: Decimal, was_pending: bool) -> Result<(), LedgerError> {
        if self.current_balance < amount {
            // Funds were consumed between the credit and its reversal.
            return Err(LedgerError::ConcurrentModification);
        }
        self.current_balance -= amount;
        self.total_funded -= amount;
        if was_pending && self.total_funded == Decimal::ZERO {
            // Direct restore of the pre-operation state; not a table move.
            self.status = CardStatus::Pending;
        }
        self.touch();
        self.assert_invariants();
        Ok(())
    }

    /// Applies an expense against the balance.
    fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if self.status != CardStatus::InProgress {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                operation: "register_expense",
            });
        }
        if self.current_balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        self.current_balance -= amount;
        self.total_spent += amount;
        self.touch();
        self.assert_invariants();
        Ok(())
    }

    /// Exact reversal of an expense (deletion). Rejected once terminal.
    fn reverse_debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                operation: "delete_expense",
            });
        }
        if self.total_spent < amount {
            return Err(LedgerError::ConcurrentModification);
        }
        self.current_balance += amount;
        self.total_spent -= amount;
        self.touch();
        self.assert_invariants();
        Ok(())
    }

    fn edit(&mut self, edit: CardEdit) -> Result<(), LedgerError> {
        match self.status {
            CardStatus::Pending | CardStatus::InProgress => {}
            _ => {
                return Err(LedgerError::InvalidTransition {
                    from: self.status,
                    operation: "edit",
                });
            }
        }
        if let Some(title) = edit.title {
            if title.trim().is_empty() {
                return Err(LedgerError::MissingField("title"));
            }
            self.title = title;
        }
        if let Some(client_name) = edit.client_name {
            self.client_name = client_name;
        }
        if let Some(budget_total) = edit.budget_total {
            if budget_total <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount);
            }
            self.budget_total = budget_total;
        }
        self.touch();
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), LedgerError> {
        self.transition(CardStatus::Canceled, "cancel")
    }

    fn begin_review(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(CardStatus::UnderReview, "finalize")?;
        self.finalized_at = Some(now);
        Ok(())
    }

    fn reject_review(&mut self, note: String) -> Result<(), LedgerError> {
        self.transition(CardStatus::InProgress, "reject")?;
        self.finalized_at = None;
        self.review_note = Some(note);
        Ok(())
    }

    /// Unspent remainder to be reconciled out. Only readable under review.
    fn reconcilable_remainder(&self) -> Result<Decimal, LedgerError> {
        if self.status != CardStatus::UnderReview {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                operation: "approve",
            });
        }
        Ok(self.current_balance)
    }

    /// Final step of approval: drain the balance into `reconciled_out`,
    /// stamp, and lock the card.
    fn commit_approval(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        let remainder = self.reconcilable_remainder()?;
        self.transition(CardStatus::Finalized, "approve")?;
        self.reconciled_out += remainder;
        self.current_balance = Decimal::ZERO;
        self.approved_at = Some(now);
        self.assert_invariants();
        Ok(())
    }

    fn mark_awaiting(&mut self, request: RequestId) -> Result<(), LedgerError> {
        if self.pending_request.is_some() {
            return Err(LedgerError::RequestAlreadyPending);
        }
        self.transition(CardStatus::AwaitingFunds, "request_funds")?;
        self.pending_request = Some(request);
        Ok(())
    }

    fn clear_awaiting(&mut self) -> Result<(), LedgerError> {
        self.transition(CardStatus::InProgress, "resolve_fund_request")?;
        self.pending_request = None;
        Ok(())
    }
}

/// Serializable point-in-time view of a card.
///
/// Monetary fields are rounded to currency precision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardSnapshot {
    pub id: CardId,
    pub project: ProjectId,
    pub title: String,
    pub client: String,
    pub status: CardStatus,
    pub budget_total: Decimal,
    pub balance: Decimal,
    pub spent: Decimal,
    pub funded: Decimal,
    pub reconciled: Decimal,
    pub version: u64,
}

/// Per-project cost-center card.
///
/// Field access goes through an inner mutex; multi-store operations in the
/// coordinator additionally hold the card's [operation guard](Self::op_guard)
/// for their whole duration so balance reads and writes cannot interleave
/// with a transfer or approval in flight.
#[derive(Debug)]
pub struct CostCenterCard {
    inner: Mutex<CardData>,
    op_lock: Mutex<()>,
}

impl CostCenterCard {
    const CURRENCY_PRECISION: u32 = 2;

    pub fn new(
        id: CardId,
        project_id: ProjectId,
        title: String,
        client_name: String,
        budget_total: Decimal,
        responsible_id: UserId,
    ) -> Self {
        Self {
            inner: Mutex::new(CardData::new(
                id,
                project_id,
                title,
                client_name,
                budget_total,
                responsible_id,
            )),
            op_lock: Mutex::new(()),
        }
    }

    /// Serializes the card's multi-store operations. Held by the
    /// coordinator for the full duration of `transfer` and `approve`.
    pub fn op_guard(&self) -> MutexGuard<'_, ()> {
        self.op_lock.lock()
    }

    pub fn id(&self) -> CardId {
        self.inner.lock().id
    }

    pub fn project_id(&self) -> ProjectId {
        self.inner.lock().project_id
    }

    pub fn title(&self) -> String {
        self.inner.lock().title.clone()
    }

    pub fn status(&self) -> CardStatus {
        self.inner.lock().status
    }

    pub fn current_balance(&self) -> Decimal {
        self.inner.lock().current_balance
    }

    pub fn total_spent(&self) -> Decimal {
        self.inner.lock().total_spent
    }

    pub fn total_funded(&self) -> Decimal {
        self.inner.lock().total_funded
    }

    pub fn reconciled_out(&self) -> Decimal {
        self.inner.lock().reconciled_out
    }

    pub fn budget_total(&self) -> Decimal {
        self.inner.lock().budget_total
    }

    pub fn responsible(&self) -> UserId {
        self.inner.lock().responsible_id
    }

    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().finalized_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().approved_at
    }

    pub fn review_note(&self) -> Option<String> {
        self.inner.lock().review_note.clone()
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.inner.lock().pending_request
    }

    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    pub fn snapshot(&self) -> CardSnapshot {
        let data = self.inner.lock();
        let dp = Self::CURRENCY_PRECISION;
        CardSnapshot {
            id: data.id,
            project: data.project_id,
            title: data.title.clone(),
            client: data.client_name.clone(),
            status: data.status,
            budget_total: data.budget_total.round_dp(dp),
            balance: data.current_balance.round_dp(dp),
            spent: data.total_spent.round_dp(dp),
            funded: data.total_funded.round_dp(dp),
            reconciled: data.reconciled_out.round_dp(dp),
            version: data.version,
        }
    }

    pub fn credit(&self, amount: Decimal) -> Result<(), LedgerError> {
        self.inner.lock().credit(amount)
    }

    pub fn reverse_credit(&self, amount: Decimal, was_pending: bool) -> Result<(), LedgerError> {
        self.inner.lock().reverse_credit(amount, was_pending)
    }

    pub fn debit(&self, amount: Decimal) -> Result<(), LedgerError> {
        self.inner.lock().debit(amount)
    }

    pub fn reverse_debit(&self, amount: Decimal) -> Result<(), LedgerError> {
        self.inner.lock().reverse_debit(amount)
    }

    pub fn edit(&self, edit: CardEdit) -> Result<(), LedgerError> {
        self.inner.lock().edit(edit)
    }

    pub fn cancel(&self) -> Result<(), LedgerError> {
        self.inner.lock().cancel()
    }

    pub fn begin_review(&self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.inner.lock().begin_review(now)
    }

    pub fn reject_review(&self, note: String) -> Result<(), LedgerError> {
        self.inner.lock().reject_review(note)
    }

    pub fn reconcilable_remainder(&self) -> Result<Decimal, LedgerError> {
        self.inner.lock().reconcilable_remainder()
    }

    pub fn commit_approval(&self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.inner.lock().commit_approval(now)
    }

    pub fn mark_awaiting(&self, request: RequestId) -> Result<(), LedgerError> {
        self.inner.lock().mark_awaiting(request)
    }

    pub fn clear_awaiting(&self) -> Result<(), LedgerError> {
        self.inner.lock().clear_awaiting()
    }
}

impl Serialize for CostCenterCard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.snapshot().serialize(serializer)
    }
}
