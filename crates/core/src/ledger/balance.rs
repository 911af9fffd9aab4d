//! Account balance calculations.
//!
//! - Asset/Expense/Cost of sales: balance += debit - credit (debit-normal)
//! - Liability/Equity/Revenue: balance += credit - debit (credit-normal)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;

/// Natural balance direction of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Debit-normal accounts (Asset, Expense, Cost of sales)
    DebitNormal,
    /// Credit-normal accounts (Liability, Equity, Revenue)
    CreditNormal,
}

impl NormalBalance {
    /// Calculates the balance change for a debit/credit pair so that a
    /// positive result always means growth in the natural direction.
    #[must_use]
    pub fn calculate_balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::DebitNormal => debit - credit,
            Self::CreditNormal => credit - debit,
        }
    }
}

/// Debit and credit totals accumulated for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Total debit amount in base currency.
    pub debit_total: Decimal,
    /// Total credit amount in base currency.
    pub credit_total: Decimal,
}

impl AccountBalance {
    /// Creates an empty balance.
    #[must_use]
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
        }
    }

    /// Adds a debit amount.
    pub fn add_debit(&mut self, amount: Decimal) {
        self.debit_total += amount;
    }

    /// Adds a credit amount.
    pub fn add_credit(&mut self, amount: Decimal) {
        self.credit_total += amount;
    }

    /// Returns true when the account saw any activity.
    #[must_use]
    pub fn has_activity(&self) -> bool {
        !self.debit_total.is_zero() || !self.credit_total.is_zero()
    }

    /// Net balance signed in the natural direction of `normal`.
    #[must_use]
    pub fn balance(&self, normal: NormalBalance) -> Decimal {
        normal.calculate_balance_change(self.debit_total, self.credit_total)
    }
}
