//! Business documents accepted by the document poster.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, CurrencyCode, ProductId};

use crate::accounts::ResolutionContext;
use crate::ledger::DocumentReference;
use crate::tax::TaxMethod;

/// Fields shared by every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    /// Back-link stored on the transaction and stock movements.
    pub reference: DocumentReference,
    /// Business date; also the transaction date.
    pub date: NaiveDate,
    /// Document currency.
    pub currency: CurrencyCode,
    /// Document currency to base currency, supplied by the caller.
    pub exchange_rate: Decimal,
    /// Transaction description.
    pub description: String,
}

impl DocumentHeader {
    /// Header for a base-currency document.
    #[must_use]
    pub fn new(
        reference: DocumentReference,
        date: NaiveDate,
        currency: CurrencyCode,
        description: impl Into<String>,
    ) -> Self {
        Self {
            reference,
            date,
            currency,
            exchange_rate: Decimal::ONE,
            description: description.into(),
        }
    }
}

/// How a sale or bill is settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "account_id", rename_all = "snake_case")]
pub enum Settlement {
    /// Paid on the spot into or out of a cash/bank account. `None` uses the
    /// organization's default cash account.
    Immediate(Option<AccountId>),
    /// Receivable or payable.
    #[default]
    OnAccount,
}

/// One line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    /// Stocked product, if any. Lines without one carry no cost.
    pub product_id: Option<ProductId>,
    /// Units sold.
    pub quantity: Decimal,
    /// Price per unit in the document currency.
    pub unit_price: Decimal,
    /// Tax rate in percent.
    pub tax_rate: Decimal,
    /// Absolute pre-tax discount.
    #[serde(default)]
    pub discount: Decimal,
    /// Whether the price includes tax.
    #[serde(default)]
    pub tax_method: TaxMethod,
    /// Revenue account overrides.
    #[serde(default)]
    pub revenue_account: ResolutionContext,
}

/// A sale or invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDocument {
    /// Common fields.
    pub header: DocumentHeader,
    /// Cash sale or invoice on account.
    pub settlement: Settlement,
    /// Stock location; defaults to the main location.
    pub location: Option<String>,
    /// Fail instead of selling short when stock runs out.
    #[serde(default)]
    pub block_on_shortfall: bool,
    /// Lines.
    pub lines: Vec<SaleLine>,
}

/// One line of a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    /// Stocked product; its net cost is capitalised into inventory.
    pub product_id: Option<ProductId>,
    /// Units bought.
    pub quantity: Decimal,
    /// Cost per unit in the document currency.
    pub unit_cost: Decimal,
    /// Tax rate in percent.
    pub tax_rate: Decimal,
    /// Absolute pre-tax discount.
    #[serde(default)]
    pub discount: Decimal,
    /// Whether the cost includes tax.
    #[serde(default)]
    pub tax_method: TaxMethod,
    /// Expense account overrides for non-stocked lines.
    #[serde(default)]
    pub expense_account: ResolutionContext,
}

/// A supplier bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDocument {
    /// Common fields.
    pub header: DocumentHeader,
    /// Paid immediately or owed.
    pub settlement: Settlement,
    /// Stock location; defaults to the main location.
    pub location: Option<String>,
    /// Lines.
    pub lines: Vec<BillLine>,
}

/// Money received against customer receivables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDocument {
    /// Common fields.
    pub header: DocumentHeader,
    /// Amount in the document currency.
    pub amount: Decimal,
    /// Account the money landed in; `None` uses the default cash account.
    pub deposit_account: Option<AccountId>,
}

/// Money paid against supplier payables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDocument {
    /// Common fields.
    pub header: DocumentHeader,
    /// Amount in the document currency.
    pub amount: Decimal,
    /// Account the money left; `None` uses the default cash account.
    pub paying_account: Option<AccountId>,
}

/// Movement of money between two of the organization's accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDocument {
    /// Common fields. `currency` is the source account's currency.
    pub header: DocumentHeader,
    /// Account the money leaves.
    pub from_account: AccountId,
    /// Account the money enters.
    pub to_account: AccountId,
    /// Currency of the destination account.
    pub to_currency: CurrencyCode,
    /// Amount moved.
    pub amount: Decimal,
}
