//! Account resolution for document postings.
//!
//! Decides which GL account a document line posts to. Resolution order,
//! first match wins:
//! 1. explicit override on the line
//! 2. product override
//! 3. product category override
//! 4. organization default for the kind
//! 5. subtype / code-prefix heuristic, only when enabled
//!
//! Resolution is a pure lookup over a chart snapshot; it never writes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;
use tracing::warn;

use super::types::{Account, AccountSubtype, AccountType};
use crate::ledger::LedgerError;

/// The posting role an account plays in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    /// Sales revenue.
    Revenue,
    /// Purchase expense.
    Expense,
    /// Cost of goods sold.
    CostOfGoodsSold,
    /// Sales tax / VAT control.
    TaxPayable,
    /// Inventory on hand.
    InventoryAsset,
    /// Customer receivables.
    AccountsReceivable,
    /// Vendor payables.
    AccountsPayable,
    /// Default cash/bank deposit account.
    Cash,
}

impl AccountKind {
    /// All kinds.
    pub const ALL: [Self; 8] = [
        Self::Revenue,
        Self::Expense,
        Self::CostOfGoodsSold,
        Self::TaxPayable,
        Self::InventoryAsset,
        Self::AccountsReceivable,
        Self::AccountsPayable,
        Self::Cash,
    ];

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
            Self::CostOfGoodsSold => "COST_OF_GOODS_SOLD",
            Self::TaxPayable => "TAX_PAYABLE",
            Self::InventoryAsset => "INVENTORY_ASSET",
            Self::AccountsReceivable => "ACCOUNTS_RECEIVABLE",
            Self::AccountsPayable => "ACCOUNTS_PAYABLE",
            Self::Cash => "CASH",
        }
    }

    /// Account types an account of this kind may have.
    #[must_use]
    pub const fn expected_types(self) -> &'static [AccountType] {
        match self {
            Self::Revenue => &[AccountType::Revenue],
            Self::Expense => &[AccountType::Expense],
            Self::CostOfGoodsSold => &[AccountType::CostOfSales, AccountType::Expense],
            Self::TaxPayable | Self::AccountsPayable => &[AccountType::Liability],
            Self::InventoryAsset | Self::AccountsReceivable | Self::Cash => &[AccountType::Asset],
        }
    }

    /// Subtypes that identify this kind in the heuristic fallback.
    const fn heuristic_subtypes(self) -> &'static [AccountSubtype] {
        match self {
            Self::Revenue => &[AccountSubtype::OperatingRevenue],
            Self::Expense => &[AccountSubtype::OperatingExpense],
            Self::CostOfGoodsSold => &[AccountSubtype::CostOfGoodsSold],
            Self::TaxPayable => &[AccountSubtype::TaxPayable],
            Self::InventoryAsset => &[AccountSubtype::Inventory],
            Self::AccountsReceivable => &[AccountSubtype::AccountsReceivable],
            Self::AccountsPayable => &[AccountSubtype::AccountsPayable],
            Self::Cash => &[AccountSubtype::Cash, AccountSubtype::Bank],
        }
    }

    /// Legacy account-code prefixes for this kind.
    const fn heuristic_code_prefix(self) -> &'static str {
        match self {
            Self::Cash => "10",
            Self::AccountsReceivable => "12",
            Self::InventoryAsset => "13",
            Self::AccountsPayable => "20",
            Self::TaxPayable => "22",
            Self::Revenue => "4",
            Self::CostOfGoodsSold => "5",
            Self::Expense => "6",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown account kind: {s}"))
    }
}

/// Per-line overrides, most specific first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionContext {
    /// Account chosen on the document line itself.
    pub line_override: Option<AccountId>,
    /// Account configured on the product.
    pub product_override: Option<AccountId>,
    /// Account configured on the product's category.
    pub category_override: Option<AccountId>,
}

impl ResolutionContext {
    /// No overrides; resolves to the organization default.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Only a line override.
    #[must_use]
    pub fn line(account_id: Option<AccountId>) -> Self {
        Self {
            line_override: account_id,
            ..Self::default()
        }
    }
}

/// An organization's configured default account per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAccounts(HashMap<AccountKind, AccountId>);

impl DefaultAccounts {
    /// Empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the default for `kind`, if configured.
    #[must_use]
    pub fn get(&self, kind: AccountKind) -> Option<AccountId> {
        self.0.get(&kind).copied()
    }

    /// Sets the default for `kind`.
    pub fn set(&mut self, kind: AccountKind, account_id: AccountId) {
        self.0.insert(kind, account_id);
    }

    /// Builder form of [`Self::set`].
    #[must_use]
    pub fn with(mut self, kind: AccountKind, account_id: AccountId) -> Self {
        self.set(kind, account_id);
        self
    }

    /// Iterates configured (kind, account) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (AccountKind, AccountId)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Resolves posting accounts against a snapshot of one organization's chart.
#[derive(Debug, Clone, Copy)]
pub struct AccountResolver<'a> {
    chart: &'a [Account],
    defaults: &'a DefaultAccounts,
    allow_heuristic: bool,
}

impl<'a> AccountResolver<'a> {
    /// Creates a resolver. `allow_heuristic` enables step 5.
    #[must_use]
    pub fn new(chart: &'a [Account], defaults: &'a DefaultAccounts, allow_heuristic: bool) -> Self {
        Self {
            chart,
            defaults,
            allow_heuristic,
        }
    }

    /// Resolves the account for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultAccountConfigured` when nothing matches.
    pub fn resolve(
        &self,
        kind: AccountKind,
        context: &ResolutionContext,
    ) -> Result<AccountId, LedgerError> {
        if let Some(id) = context
            .line_override
            .or(context.product_override)
            .or(context.category_override)
            .or_else(|| self.defaults.get(kind))
        {
            return Ok(id);
        }

        if self.allow_heuristic {
            if let Some(account) = self.heuristic(kind) {
                warn!(
                    kind = %kind,
                    account_id = %account.id,
                    account_code = %account.code,
                    "No default account configured, using heuristic fallback"
                );
                return Ok(account.id);
            }
        }

        Err(LedgerError::NoDefaultAccountConfigured { kind })
    }

    /// Picks the lowest-coded active account matching the kind's subtype,
    /// then falls back to the legacy code prefix.
    fn heuristic(&self, kind: AccountKind) -> Option<&'a Account> {
        let mut candidates: Vec<&Account> = self
            .chart
            .iter()
            .filter(|a| a.is_active && kind.expected_types().contains(&a.account_type))
            .collect();
        candidates.sort_by(|a, b| a.code.cmp(&b.code));

        candidates
            .iter()
            .find(|a| {
                a.account_subtype
                    .is_some_and(|s| kind.heuristic_subtypes().contains(&s))
            })
            .or_else(|| {
                candidates
                    .iter()
                    .find(|a| a.code.starts_with(kind.heuristic_code_prefix()))
            })
            .copied()
    }
}
