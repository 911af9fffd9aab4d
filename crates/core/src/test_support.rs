//! Shared fixtures for engine tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::LedgerConfig;
use tally_shared::types::{AccountId, CurrencyCode, OrganizationId};

use crate::accounts::{Account, AccountKind, AccountSubtype, AccountType};
use crate::ledger::{LegRequest, PostTransactionInput, PostingEngine, TransactionType};
use crate::store::{LedgerSession, LedgerStore, MemoryStore, SessionMode};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A small retail chart with every default configured.
#[derive(Debug, Clone, Copy)]
pub struct Chart {
    pub org: OrganizationId,
    pub cash: AccountId,
    pub bank: AccountId,
    pub receivables: AccountId,
    pub inventory: AccountId,
    pub equipment: AccountId,
    pub payables: AccountId,
    pub vat: AccountId,
    pub loan: AccountId,
    pub capital: AccountId,
    pub retained: AccountId,
    pub sales: AccountId,
    pub services: AccountId,
    pub other_income: AccountId,
    pub cogs: AccountId,
    pub rent: AccountId,
    pub utilities: AccountId,
    pub interest: AccountId,
}

fn account(
    org: OrganizationId,
    code: &str,
    name: &str,
    account_type: AccountType,
    subtype: Option<AccountSubtype>,
    parent_id: Option<AccountId>,
) -> Account {
    Account {
        id: AccountId::new(),
        organization_id: org,
        code: code.to_string(),
        name: name.to_string(),
        account_type,
        account_subtype: subtype,
        parent_id,
        is_active: true,
    }
}

pub async fn seed_chart(store: &MemoryStore) -> Chart {
    use AccountSubtype as S;
    use AccountType as T;

    let org = OrganizationId::new();
    let sales = account(org, "4000", "Sales", T::Revenue, Some(S::OperatingRevenue), None);
    let rent = account(org, "6000", "Occupancy", T::Expense, Some(S::OperatingExpense), None);
    let accounts = vec![
        account(org, "1000", "Cash on hand", T::Asset, Some(S::Cash), None),
        account(org, "1010", "Bank", T::Asset, Some(S::Bank), None),
        account(org, "1200", "Accounts receivable", T::Asset, Some(S::AccountsReceivable), None),
        account(org, "1300", "Inventory", T::Asset, Some(S::Inventory), None),
        account(org, "1500", "Equipment", T::Asset, Some(S::FixedAsset), None),
        account(org, "2000", "Accounts payable", T::Liability, Some(S::AccountsPayable), None),
        account(org, "2200", "VAT payable", T::Liability, Some(S::TaxPayable), None),
        account(org, "2500", "Bank loan", T::Liability, Some(S::LongTermLiability), None),
        account(org, "3000", "Share capital", T::Equity, Some(S::ShareCapital), None),
        account(org, "3100", "Retained earnings", T::Equity, Some(S::RetainedEarnings), None),
        account(org, "4010", "Service sales", T::Revenue, Some(S::OperatingRevenue), Some(sales.id)),
        account(org, "4900", "Interest income", T::Revenue, Some(S::OtherIncome), None),
        account(org, "5000", "Cost of goods sold", T::CostOfSales, None, None),
        account(org, "6010", "Utilities", T::Expense, Some(S::OperatingExpense), Some(rent.id)),
        account(org, "7000", "Interest expense", T::Expense, Some(S::OtherExpense), None),
        sales,
        rent,
    ];
    let id = |code: &str| {
        accounts
            .iter()
            .find(|a| a.code == code)
            .map(|a| a.id)
            .unwrap()
    };

    let chart = Chart {
        org,
        cash: id("1000"),
        bank: id("1010"),
        receivables: id("1200"),
        inventory: id("1300"),
        equipment: id("1500"),
        payables: id("2000"),
        vat: id("2200"),
        loan: id("2500"),
        capital: id("3000"),
        retained: id("3100"),
        sales: id("4000"),
        services: id("4010"),
        other_income: id("4900"),
        cogs: id("5000"),
        rent: id("6000"),
        utilities: id("6010"),
        interest: id("7000"),
    };

    let mut session = store.begin(org, SessionMode::ReadWrite).await.unwrap();
    for account in &accounts {
        session.insert_account(account).await.unwrap();
    }
    for (kind, account_id) in [
        (AccountKind::Cash, chart.cash),
        (AccountKind::AccountsReceivable, chart.receivables),
        (AccountKind::InventoryAsset, chart.inventory),
        (AccountKind::AccountsPayable, chart.payables),
        (AccountKind::TaxPayable, chart.vat),
        (AccountKind::Revenue, chart.sales),
        (AccountKind::CostOfGoodsSold, chart.cogs),
        (AccountKind::Expense, chart.rent),
    ] {
        session.set_default_account(kind, account_id).await.unwrap();
    }
    session.commit().await.unwrap();
    chart
}

pub fn engine(store: &MemoryStore) -> PostingEngine<MemoryStore> {
    PostingEngine::new(store.clone(), LedgerConfig::default())
}

/// Two-leg USD journal.
pub fn journal(
    on: NaiveDate,
    debit: AccountId,
    credit: AccountId,
    amount: Decimal,
) -> PostTransactionInput {
    PostTransactionInput {
        transaction_date: on,
        transaction_type: TransactionType::Journal,
        reference: None,
        description: "Journal".to_string(),
        legs: vec![
            LegRequest::debit(debit, amount, CurrencyCode::USD),
            LegRequest::credit(credit, amount, CurrencyCode::USD),
        ],
    }
}
