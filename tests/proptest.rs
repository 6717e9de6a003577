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

//! Property-based tests for the cost-center ledger.
//!
//! These tests verify invariants that should hold for any sequence of
//! valid operations.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use verba_ledger::{
    AllowAll, CardId, CategoryId, CategoryRegistry, Coordinator, CostCenterCard, FlowDirection,
    MemoryCashLedger, MemoryProjectBudget, ProjectBudget, ProjectId, UserId,
};

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive amount (0.01 to 10000.00 with 2 decimal places).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn make_card() -> CostCenterCard {
    CostCenterCard::new(
        CardId(1),
        ProjectId(1),
        "Banner run".into(),
        "Acme Stores".into(),
        dec!(1000000.00),
        UserId(7),
    )
}

// =============================================================================
// Card Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Funding is conserved: funded = balance + spent + reconciled.
    #[test]
    fn funding_is_conserved(
        credits in prop::collection::vec(arb_amount(), 1..10),
        debits in prop::collection::vec(arb_amount(), 0..10),
    ) {
        let card = make_card();

        for amount in &credits {
            card.credit(*amount).unwrap();
        }
        // Debits may bounce off the balance; that's fine.
        for amount in &debits {
            let _ = card.debit(*amount);
        }

        prop_assert_eq!(
            card.total_funded(),
            card.current_balance() + card.total_spent() + card.reconciled_out()
        );
    }

    /// Balance is never negative after any operation mix.
    #[test]
    fn balance_never_negative(
        credits in prop::collection::vec(arb_amount(), 1..5),
        debits in prop::collection::vec(arb_amount(), 0..10),
    ) {
        let card = make_card();

        for amount in &credits {
            card.credit(*amount).unwrap();
        }
        for amount in &debits {
            let _ = card.debit(*amount);
        }

        prop_assert!(card.current_balance() >= Decimal::ZERO);
        prop_assert!(card.total_spent() >= Decimal::ZERO);
    }

    /// Sum of credits equals total funded (no debits or reconciliation).
    #[test]
    fn credits_sum_to_funded(
        amounts in prop::collection::vec(arb_amount(), 1..20),
    ) {
        let card = make_card();
        let expected: Decimal = amounts.iter().copied().sum();

        for amount in &amounts {
            card.credit(*amount).unwrap();
        }

        prop_assert_eq!(card.total_funded(), expected);
        prop_assert_eq!(card.current_balance(), expected);
        prop_assert_eq!(card.total_spent(), Decimal::ZERO);
    }

    /// Order of credits doesn't affect the final balance.
    #[test]
    fn credit_order_independent(
        amounts in prop::collection::vec(arb_amount(), 2..10),
    ) {
        let forward = make_card();
        for amount in &amounts {
            forward.credit(*amount).unwrap();
        }

        let backward = make_card();
        for amount in amounts.iter().rev() {
            backward.credit(*amount).unwrap();
        }

        prop_assert_eq!(forward.current_balance(), backward.current_balance());
    }

    /// A debit followed by its reversal is a no-op on the balances.
    #[test]
    fn debit_reversal_round_trips(
        funding in arb_amount(),
        spend_fraction in 0.01f64..0.99,
    ) {
        let card = make_card();
        card.credit(funding).unwrap();

        let spend = (funding * Decimal::try_from(spend_fraction).unwrap()).round_dp(2);
        if spend > Decimal::ZERO {
            card.debit(spend).unwrap();
            card.reverse_debit(spend).unwrap();
        }

        prop_assert_eq!(card.current_balance(), funding);
        prop_assert_eq!(card.total_spent(), Decimal::ZERO);
    }

    /// Cannot spend more than the balance.
    #[test]
    fn cannot_overspend(
        funding in arb_amount(),
        extra in arb_amount(),
    ) {
        let card = make_card();
        card.credit(funding).unwrap();

        let result = card.debit(funding + extra);
        prop_assert!(result.is_err());
        prop_assert_eq!(card.current_balance(), funding);
    }

    /// Approval drains the full remainder and preserves conservation.
    #[test]
    fn approval_reconciles_exactly_the_remainder(
        funding in arb_amount(),
        spend_fraction in 0.0f64..1.0,
    ) {
        let card = make_card();
        card.credit(funding).unwrap();

        let spend = (funding * Decimal::try_from(spend_fraction).unwrap()).round_dp(2);
        if spend > Decimal::ZERO && spend <= funding {
            card.debit(spend).unwrap();
        }
        let remainder = card.current_balance();

        card.begin_review(Utc::now()).unwrap();
        prop_assert_eq!(card.reconcilable_remainder().unwrap(), remainder);
        card.commit_approval(Utc::now()).unwrap();

        prop_assert_eq!(card.current_balance(), Decimal::ZERO);
        prop_assert_eq!(card.reconciled_out(), remainder);
        prop_assert_eq!(
            card.total_funded(),
            card.total_spent() + card.reconciled_out()
        );
    }
}

// =============================================================================
// Cross-Store Conservation Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Money never appears or disappears across the three stores: the
    /// pool's drop plus the cash ledger's net flow always matches what
    /// the cards hold and spent.
    #[test]
    fn stores_agree_after_transfers_and_expenses(
        transfers in prop::collection::vec(arb_amount(), 1..8),
        expenses in prop::collection::vec(arb_amount(), 0..8),
    ) {
        let admin = UserId(1);
        let project = ProjectId(1);
        let pool = dec!(100000000.00);

        let cash = Arc::new(MemoryCashLedger::new());
        let budget = Arc::new(MemoryProjectBudget::new());
        budget.open_pool(project, pool);
        let coordinator = Coordinator::new(
            cash.clone(),
            budget.clone(),
            Arc::new(CategoryRegistry::with_defaults()),
            Arc::new(AllowAll),
        );
        let card_id = coordinator
            .create_card(admin, project, "Banner run", "Acme", pool, admin)
            .unwrap();

        for amount in &transfers {
            coordinator.transfer(admin, card_id, *amount).unwrap();
        }
        for amount in &expenses {
            let _ = coordinator.register_expense(
                admin,
                card_id,
                CategoryId(1),
                "materials run",
                *amount,
                None,
            );
        }

        let card = coordinator.get_card(&card_id).unwrap();
        let transferred: Decimal = transfers.iter().copied().sum();

        // Pool decreased by exactly what the card received.
        prop_assert_eq!(budget.remaining(project), Some(pool - transferred));
        // Every transferred unit left the cash account as an outflow.
        prop_assert_eq!(cash.net_flow(), -transferred);
        // And the card accounts for all of it.
        prop_assert_eq!(card.total_funded(), transferred);
        prop_assert_eq!(
            card.total_funded(),
            card.current_balance() + card.total_spent()
        );
    }

    /// Approval returns the unspent remainder to both outer stores.
    #[test]
    fn approval_returns_remainder_to_pool_and_cash(
        funding in arb_amount(),
        spend in arb_amount(),
    ) {
        let admin = UserId(1);
        let project = ProjectId(1);
        let pool = dec!(100000000.00);

        let cash = Arc::new(MemoryCashLedger::new());
        let budget = Arc::new(MemoryProjectBudget::new());
        budget.open_pool(project, pool);
        let coordinator = Coordinator::new(
            cash.clone(),
            budget.clone(),
            Arc::new(CategoryRegistry::with_defaults()),
            Arc::new(AllowAll),
        );
        let card_id = coordinator
            .create_card(admin, project, "Banner run", "Acme", pool, admin)
            .unwrap();

        coordinator.transfer(admin, card_id, funding).unwrap();
        let spent = if spend <= funding {
            coordinator
                .register_expense(admin, card_id, CategoryId(1), "materials", spend, None)
                .unwrap();
            spend
        } else {
            Decimal::ZERO
        };
        let remainder = funding - spent;

        coordinator.finalize_card(admin, card_id).unwrap();
        coordinator.approve_card(admin, card_id).unwrap();

        // Pool is short only what was actually spent.
        prop_assert_eq!(budget.remaining(project), Some(pool - spent));
        // Cash netted the same: outflow `funding`, inflow `remainder`.
        prop_assert_eq!(cash.net_flow(), remainder - funding);
        let inflows: Decimal = cash
            .entries_for(card_id)
            .into_iter()
            .filter(|e| e.direction == FlowDirection::Inflow)
            .map(|e| e.amount)
            .sum();
        prop_assert_eq!(inflows, remainder);
    }
}
