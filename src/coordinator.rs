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

//! Ledger coordinator.
//!
//! The coordinator is the only component that touches more than one store
//! per operation. `transfer` and `approve_card` span the card, the cash
//! ledger, and the project budget with no shared transaction, so they run
//! as sagas: each external call gets a bounded retry budget, and a
//! later-step failure triggers compensating writes for the steps already
//! committed. The outcome of every multi-store operation is journaled in
//! the [`OperationLog`].
//!
//! # Concurrency
//!
//! Every balance-affecting operation holds the card's operation guard for
//! its full duration, so a transfer can never interleave with an expense
//! registration or an approval on the same card. Operations on different
//! cards proceed in parallel.

use crate::access::Capabilities;
use crate::base::{CardId, CategoryId, ExpenseId, ProjectId, RequestId, UserId};
use crate::budget::ProjectBudget;
use crate::card::{CardEdit, CardSnapshot, CardStatus, CostCenterCard};
use crate::cashbook::CashLedger;
use crate::category::CategoryRegistry;
use crate::error::LedgerError;
use crate::expense::{EntryKind, Expense, ExpenseStatus};
use crate::oplog::{OperationLog, OperationRecord, SagaStep};
use crate::request::{Decision, FundRequest, RequestStatus};
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Cash entry category for funding transfers into a card.
const CATEGORY_FUNDING: &str = "verba";
/// Cash entry category for the unspent remainder returned on approval.
const CATEGORY_RECONCILIATION: &str = "reconciliation";
/// Cash entry category for compensating reversals.
const CATEGORY_REVERSAL: &str = "reversal";

/// Tunable behavior of the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Whether registered expenses start `Approved` instead of `Pending`.
    pub auto_approve_expenses: bool,
    /// Attempts per external-store call before the operation compensates.
    pub max_store_retries: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            auto_approve_expenses: true,
            max_store_retries: 3,
        }
    }
}

/// Executes the multi-step ledger operations and owns the card, expense,
/// and fund-request stores.
pub struct Coordinator {
    cards: DashMap<CardId, Arc<CostCenterCard>>,
    expenses: DashMap<ExpenseId, Expense>,
    requests: DashMap<RequestId, FundRequest>,
    cash: Arc<dyn CashLedger>,
    budget: Arc<dyn ProjectBudget>,
    categories: Arc<CategoryRegistry>,
    capabilities: Arc<dyn Capabilities>,
    oplog: OperationLog,
    config: CoordinatorConfig,
    next_card: AtomicU32,
    next_expense: AtomicU32,
    next_request: AtomicU32,
}

impl Coordinator {
    pub fn new(
        cash: Arc<dyn CashLedger>,
        budget: Arc<dyn ProjectBudget>,
        categories: Arc<CategoryRegistry>,
        capabilities: Arc<dyn Capabilities>,
    ) -> Self {
        Self::with_config(cash, budget, categories, capabilities, CoordinatorConfig::default())
    }

    pub fn with_config(
        cash: Arc<dyn CashLedger>,
        budget: Arc<dyn ProjectBudget>,
        categories: Arc<CategoryRegistry>,
        capabilities: Arc<dyn Capabilities>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            cards: DashMap::new(),
            expenses: DashMap::new(),
            requests: DashMap::new(),
            cash,
            budget,
            categories,
            capabilities,
            oplog: OperationLog::new(),
            config,
            next_card: AtomicU32::new(1),
            next_expense: AtomicU32::new(1),
            next_request: AtomicU32::new(1),
        }
    }

    // === Card lifecycle ===

    /// Creates a card in `Pending` state with no funds.
    pub fn create_card(
        &self,
        actor: UserId,
        project_id: ProjectId,
        title: &str,
        client_name: &str,
        budget_total: Decimal,
        responsible_id: UserId,
    ) -> Result<CardId, LedgerError> {
        if !self.capabilities.can_create(actor) {
            return Err(LedgerError::PermissionDenied);
        }
        if title.trim().is_empty() {
            return Err(LedgerError::MissingField("title"));
        }
        if budget_total <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        let id = CardId(self.next_card.fetch_add(1, Ordering::Relaxed));
        let card = CostCenterCard::new(
            id,
            project_id,
            title.to_owned(),
            client_name.to_owned(),
            budget_total,
            responsible_id,
        );
        self.cards.insert(id, Arc::new(card));
        Ok(id)
    }

    /// Creates a card against an existing project budget pool, taking the
    /// pool's remaining value as the card's agreed budget, and optionally
    /// performs an initial transfer.
    pub fn link_project_budget(
        &self,
        actor: UserId,
        project_id: ProjectId,
        title: &str,
        client_name: &str,
        responsible_id: UserId,
        initial_transfer: Option<Decimal>,
    ) -> Result<CardId, LedgerError> {
        let remaining = self
            .budget
            .remaining(project_id)
            .ok_or(LedgerError::ProjectNotFound)?;
        if remaining <= Decimal::ZERO {
            return Err(LedgerError::BudgetExhausted);
        }
        let id = self.create_card(actor, project_id, title, client_name, remaining, responsible_id)?;
        match initial_transfer {
            Some(amount) if amount < Decimal::ZERO => return Err(LedgerError::InvalidAmount),
            Some(amount) if amount > Decimal::ZERO => self.transfer(actor, id, amount)?,
            _ => {}
        }
        Ok(id)
    }

    /// Edits display fields; allowed only in `Pending`/`InProgress`.
    pub fn edit_card(
        &self,
        actor: UserId,
        card_id: CardId,
        edit: CardEdit,
    ) -> Result<(), LedgerError> {
        if !self.capabilities.can_edit(actor) {
            return Err(LedgerError::PermissionDenied);
        }
        self.card(card_id)?.edit(edit)
    }

    /// Administrative override: cancels a card from any non-terminal state.
    pub fn cancel_card(&self, actor: UserId, card_id: CardId) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let card = self.card(card_id)?;
        let _guard = card.op_guard();
        card.cancel()
    }

    /// Removes a card and cascades deletion of its expenses and requests.
    pub fn delete_card(&self, actor: UserId, card_id: CardId) -> Result<(), LedgerError> {
        if !self.capabilities.can_delete(actor) {
            return Err(LedgerError::PermissionDenied);
        }
        let (_, card) = self
            .cards
            .remove(&card_id)
            .ok_or(LedgerError::CardNotFound)?;
        // Quiesce in-flight operations before the stores are purged.
        let _guard = card.op_guard();
        self.expenses.retain(|_, e| e.card_id != card_id);
        self.requests.retain(|_, r| r.card_id != card_id);
        Ok(())
    }

    // === Transfers ===

    /// Moves funds from the central cash account into a card.
    ///
    /// Steps: credit the card (first funding flips `Pending` to
    /// `InProgress`); append one outflow entry; decrement the project
    /// budget pool. A later-step failure reverses the committed steps and
    /// reports [`LedgerError::PartialLedgerFailure`].
    pub fn transfer(
        &self,
        actor: UserId,
        card_id: CardId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let card = self.card(card_id)?;
        let _guard = card.op_guard();
        self.transfer_guarded(&card, amount)
    }

    /// Transfer body. Caller must hold the card's operation guard.
    fn transfer_guarded(
        &self,
        card: &Arc<CostCenterCard>,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        let card_id = card.id();
        let project = card.project_id();
        let title = card.title();

        // Upfront pool check keeps plain exhaustion a validation error
        // with no side effects; a race past it is caught below.
        let remaining = self
            .budget
            .remaining(project)
            .ok_or(LedgerError::ProjectNotFound)?;
        if remaining < amount {
            return Err(LedgerError::BudgetExhausted);
        }

        let was_pending = card.status() == CardStatus::Pending;
        let op = self.oplog.begin("transfer", card_id);

        if let Err(e) = card.credit(amount) {
            // Nothing committed; close the journal record.
            self.oplog.mark_compensated(op);
            return Err(e);
        }
        self.oplog.mark(op, SagaStep::CardCredited);

        if self
            .with_retries(|| self.cash.append_outflow(card_id, &title, CATEGORY_FUNDING, amount))
            .is_err()
        {
            let compensated = card.reverse_credit(amount, was_pending).is_ok();
            if compensated {
                self.oplog.mark_compensated(op);
            } else {
                self.oplog.mark_needs_intervention(op);
            }
            return Err(LedgerError::PartialLedgerFailure {
                operation: "transfer",
                id: op,
                committed: vec![SagaStep::CardCredited],
                compensated,
            });
        }
        self.oplog.mark(op, SagaStep::OutflowAppended);

        if self
            .with_retries(|| self.budget.decrement_remaining(project, amount))
            .is_err()
        {
            // The outflow entry is immutable; its reversal is a matching
            // inflow, then the card credit is taken back.
            let inflow_reversed = self
                .with_retries(|| {
                    self.cash
                        .append_inflow(card_id, &title, CATEGORY_REVERSAL, amount)
                })
                .is_ok();
            let credit_reversed = card.reverse_credit(amount, was_pending).is_ok();
            let compensated = inflow_reversed && credit_reversed;
            if compensated {
                self.oplog.mark_compensated(op);
            } else {
                self.oplog.mark_needs_intervention(op);
            }
            return Err(LedgerError::PartialLedgerFailure {
                operation: "transfer",
                id: op,
                committed: vec![SagaStep::CardCredited, SagaStep::OutflowAppended],
                compensated,
            });
        }
        self.oplog.mark(op, SagaStep::BudgetDebited);
        self.oplog.finish(op);
        Ok(())
    }

    // === Expenses ===

    /// Registers an expense against an `InProgress` card.
    pub fn register_expense(
        &self,
        actor: UserId,
        card_id: CardId,
        category_id: CategoryId,
        description: &str,
        amount: Decimal,
        proof_reference: Option<String>,
    ) -> Result<ExpenseId, LedgerError> {
        let card = self.card(card_id)?;
        if actor != card.responsible() && !self.capabilities.is_admin(actor) {
            return Err(LedgerError::PermissionDenied);
        }
        if !self.categories.contains(category_id) {
            return Err(LedgerError::UnknownCategory);
        }
        if description.trim().is_empty() {
            return Err(LedgerError::MissingField("description"));
        }
        let _guard = card.op_guard();
        card.debit(amount)?;

        let id = ExpenseId(self.next_expense.fetch_add(1, Ordering::Relaxed));
        let status = if self.config.auto_approve_expenses {
            ExpenseStatus::Approved
        } else {
            ExpenseStatus::Pending
        };
        self.expenses.insert(
            id,
            Expense {
                id,
                card_id,
                category_id,
                description: description.to_owned(),
                amount,
                date: Utc::now(),
                proof_reference,
                status,
                kind: EntryKind::Expense,
            },
        );
        Ok(id)
    }

    /// Deletes an expense, crediting its amount back to the card.
    pub fn delete_expense(&self, actor: UserId, expense_id: ExpenseId) -> Result<(), LedgerError> {
        if !self.capabilities.can_delete(actor) {
            return Err(LedgerError::PermissionDenied);
        }
        let card_id = self
            .expenses
            .get(&expense_id)
            .map(|e| e.card_id)
            .ok_or(LedgerError::ExpenseNotFound)?;
        let card = self.card(card_id)?;
        let _guard = card.op_guard();

        // Re-read under the guard; a racing delete loses here.
        let expense = self
            .expenses
            .get(&expense_id)
            .map(|e| e.clone())
            .ok_or(LedgerError::ExpenseNotFound)?;
        if expense.is_adjustment() {
            return Err(LedgerError::AdjustmentImmutable);
        }
        card.reverse_debit(expense.amount)?;
        self.expenses.remove(&expense_id);
        Ok(())
    }

    // === Fund requests ===

    /// Opens a fund request and parks the card in `AwaitingFunds`.
    pub fn request_funds(
        &self,
        actor: UserId,
        card_id: CardId,
        requester_id: UserId,
        amount: Decimal,
        justification: &str,
    ) -> Result<RequestId, LedgerError> {
        let card = self.card(card_id)?;
        if actor != card.responsible() && !self.capabilities.is_admin(actor) {
            return Err(LedgerError::PermissionDenied);
        }
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if justification.trim().is_empty() {
            return Err(LedgerError::MissingField("justification"));
        }
        let _guard = card.op_guard();
        let id = RequestId(self.next_request.fetch_add(1, Ordering::Relaxed));
        card.mark_awaiting(id)?;
        self.requests.insert(
            id,
            FundRequest {
                id,
                card_id,
                requester_id,
                amount,
                justification: justification.to_owned(),
                status: RequestStatus::Pending,
                requested_at: Utc::now(),
            },
        );
        Ok(id)
    }

    /// Approves (transfer of the requested amount) or rejects a pending
    /// request. Either way the card returns to `InProgress`.
    ///
    /// On approval, a failing transfer leaves the request pending and the
    /// card in `AwaitingFunds` so the resolution can be retried.
    pub fn resolve_fund_request(
        &self,
        actor: UserId,
        request_id: RequestId,
        decision: Decision,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let card_id = self
            .requests
            .get(&request_id)
            .map(|r| r.card_id)
            .ok_or(LedgerError::RequestNotFound)?;
        let card = self.card(card_id)?;
        let _guard = card.op_guard();

        let request = self
            .requests
            .get(&request_id)
            .map(|r| r.clone())
            .ok_or(LedgerError::RequestNotFound)?;
        if !request.is_pending() {
            return Err(LedgerError::RequestNotPending);
        }

        match decision {
            Decision::Approve => {
                self.transfer_guarded(&card, request.amount)?;
                self.set_request_status(request_id, RequestStatus::Approved);
                card.clear_awaiting()?;
            }
            Decision::Reject => {
                // Transition first: a card canceled while the request was
                // pending must leave the request untouched.
                card.clear_awaiting()?;
                self.set_request_status(request_id, RequestStatus::Rejected);
            }
        }
        Ok(())
    }

    fn set_request_status(&self, request_id: RequestId, status: RequestStatus) {
        if let Some(mut request) = self.requests.get_mut(&request_id) {
            request.status = status;
        }
    }

    // === Review and reconciliation ===

    /// Closes the card for review: no further expenses or transfers.
    pub fn finalize_card(&self, actor: UserId, card_id: CardId) -> Result<(), LedgerError> {
        let card = self.card(card_id)?;
        if actor != card.responsible() && !self.capabilities.is_admin(actor) {
            return Err(LedgerError::PermissionDenied);
        }
        let _guard = card.op_guard();
        card.begin_review(Utc::now())
    }

    /// Approves a card under review, reconciling the unspent remainder
    /// back into the cash ledger and the project budget pool.
    ///
    /// Idempotent: approving an already-`Finalized` card is a no-op and
    /// writes no second inflow entry.
    pub fn approve_card(&self, actor: UserId, card_id: CardId) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        let card = self.card(card_id)?;
        let _guard = card.op_guard();

        if card.status() == CardStatus::Finalized {
            return Ok(());
        }
        let remainder = card.reconcilable_remainder()?;
        if remainder == Decimal::ZERO {
            return card.commit_approval(Utc::now());
        }

        let project = card.project_id();
        let title = card.title();
        let op = self.oplog.begin("approve", card_id);

        if let Err(e) = self.with_retries(|| {
            self.cash
                .append_inflow(card_id, &title, CATEGORY_RECONCILIATION, remainder)
        }) {
            // Nothing committed yet.
            self.oplog.mark_compensated(op);
            return Err(e);
        }
        self.oplog.mark(op, SagaStep::InflowAppended);

        if self
            .with_retries(|| self.budget.increment_remaining(project, remainder))
            .is_err()
        {
            let compensated = self
                .with_retries(|| {
                    self.cash
                        .append_outflow(card_id, &title, CATEGORY_REVERSAL, remainder)
                })
                .is_ok();
            if compensated {
                self.oplog.mark_compensated(op);
            } else {
                self.oplog.mark_needs_intervention(op);
            }
            return Err(LedgerError::PartialLedgerFailure {
                operation: "approve",
                id: op,
                committed: vec![SagaStep::InflowAppended],
                compensated,
            });
        }
        self.oplog.mark(op, SagaStep::BudgetCredited);

        // Audit trail: the reconciled remainder shows up as a tagged
        // adjustment, not as a negative expense.
        let adjustment_id = ExpenseId(self.next_expense.fetch_add(1, Ordering::Relaxed));
        self.expenses.insert(
            adjustment_id,
            Expense {
                id: adjustment_id,
                card_id,
                category_id: CategoryRegistry::ADJUSTMENT,
                description: "unspent remainder returned to project budget".to_owned(),
                amount: remainder,
                date: Utc::now(),
                proof_reference: None,
                status: ExpenseStatus::Approved,
                kind: EntryKind::Adjustment,
            },
        );

        card.commit_approval(Utc::now())?;
        self.oplog.mark(op, SagaStep::CardReconciled);
        self.oplog.finish(op);
        Ok(())
    }

    /// Sends a card under review back to `InProgress` with a note; no
    /// ledger or budget side effects.
    pub fn reject_card(
        &self,
        actor: UserId,
        card_id: CardId,
        reason: &str,
    ) -> Result<(), LedgerError> {
        self.require_admin(actor)?;
        if reason.trim().is_empty() {
            return Err(LedgerError::MissingField("reason"));
        }
        let card = self.card(card_id)?;
        let _guard = card.op_guard();
        card.reject_review(reason.to_owned())
    }

    // === Read side ===

    pub fn get_card(&self, card_id: &CardId) -> Option<Arc<CostCenterCard>> {
        self.cards.get(card_id).map(|c| Arc::clone(&c))
    }

    pub fn cards(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, CardId, Arc<CostCenterCard>>>
    {
        self.cards.iter()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Snapshots of every card, ordered by id.
    pub fn snapshots(&self) -> Vec<CardSnapshot> {
        let mut all: Vec<CardSnapshot> = self.cards.iter().map(|c| c.snapshot()).collect();
        all.sort_by_key(|s| s.id);
        all
    }

    pub fn expense(&self, expense_id: &ExpenseId) -> Option<Expense> {
        self.expenses.get(expense_id).map(|e| e.clone())
    }

    pub fn expenses_for(&self, card_id: CardId) -> Vec<Expense> {
        let mut matching: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|e| e.card_id == card_id)
            .map(|e| e.clone())
            .collect();
        matching.sort_by_key(|e| e.id);
        matching
    }

    pub fn request(&self, request_id: &RequestId) -> Option<FundRequest> {
        self.requests.get(request_id).map(|r| r.clone())
    }

    pub fn requests_for(&self, card_id: CardId) -> Vec<FundRequest> {
        let mut matching: Vec<FundRequest> = self
            .requests
            .iter()
            .filter(|r| r.card_id == card_id)
            .map(|r| r.clone())
            .collect();
        matching.sort_by_key(|r| r.id);
        matching
    }

    pub fn pending_request_for(&self, card_id: CardId) -> Option<FundRequest> {
        self.requests
            .iter()
            .find(|r| r.card_id == card_id && r.is_pending())
            .map(|r| r.clone())
    }

    /// Journal entries needing operator attention.
    pub fn unresolved_operations(&self) -> Vec<OperationRecord> {
        self.oplog.unresolved()
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    // === Internals ===

    fn card(&self, card_id: CardId) -> Result<Arc<CostCenterCard>, LedgerError> {
        self.cards
            .get(&card_id)
            .map(|c| Arc::clone(&c))
            .ok_or(LedgerError::CardNotFound)
    }

    fn require_admin(&self, actor: UserId) -> Result<(), LedgerError> {
        if self.capabilities.is_admin(actor) {
            Ok(())
        } else {
            Err(LedgerError::PermissionDenied)
        }
    }

    /// Runs an external-store call with a bounded retry budget. Only
    /// `StoreUnavailable` is retried; every other error is final.
    fn with_retries<T>(
        &self,
        mut call: impl FnMut() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut attempts = 0;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(e @ LedgerError::StoreUnavailable(_)) => {
                    attempts += 1;
                    if attempts >= self.config.max_store_retries.max(1) {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
