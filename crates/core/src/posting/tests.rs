//! Document poster tests against the in-memory store.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::{AccountId, CurrencyCode, OrganizationId, ProductId};

use super::*;
use crate::accounts::{AccountKind, AccountType, ResolutionContext};
use crate::reports::{ReportBasis, TrialBalanceService};
use crate::inventory::{InventoryEngine, InventoryError, MovementType, StockReference};
use crate::ledger::{DocumentReference, EntryType, LedgerError, TransactionType};
use crate::store::{LedgerSession, LedgerStore, MemoryStore, SessionMode};
use crate::tax::TaxMethod;
use crate::test_support::{Chart, date, engine, seed_chart};

fn poster(store: &MemoryStore) -> DocumentPoster<MemoryStore> {
    DocumentPoster::new(engine(store))
}

async fn stock(store: &MemoryStore, org: OrganizationId, product: ProductId, quantity: Decimal, cost: Decimal) {
    let mut session = store.begin(org, SessionMode::ReadWrite).await.unwrap();
    let context = StockReference::new(MovementType::Adjustment, None, date(2026, 1, 1));
    InventoryEngine::add(&mut session, product, "MAIN", quantity, Some(cost), &context)
        .await
        .unwrap();
    session.commit().await.unwrap();
}

async fn on_hand(store: &MemoryStore, org: OrganizationId, product: ProductId) -> Decimal {
    let mut session = store.begin(org, SessionMode::ReadOnlySnapshot).await.unwrap();
    session
        .lock_inventory_item(product, "MAIN")
        .await
        .unwrap()
        .map_or(Decimal::ZERO, |item| item.quantity_on_hand)
}

fn sale(id: &str, product: Option<ProductId>, quantity: Decimal, price: Decimal, settlement: Settlement) -> SaleDocument {
    SaleDocument {
        header: DocumentHeader::new(
            DocumentReference::new("SALE", id),
            date(2026, 5, 20),
            CurrencyCode::USD,
            format!("Sale {id}"),
        ),
        settlement,
        location: None,
        block_on_shortfall: false,
        lines: vec![SaleLine {
            product_id: product,
            quantity,
            unit_price: price,
            tax_rate: dec!(10),
            discount: Decimal::ZERO,
            tax_method: TaxMethod::Exclusive,
            revenue_account: ResolutionContext::none(),
        }],
    }
}

/// Sum of the document's entries on one side of one account.
fn find(doc: &PostedDocument, account_id: AccountId, side: EntryType) -> Decimal {
    doc.transaction
        .entries
        .iter()
        .filter(|e| e.account_id == account_id && e.entry_type == side)
        .map(|e| e.amount)
        .sum()
}

#[tokio::test]
async fn test_cash_sale_with_tax_and_cost_basis() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    stock(&store, chart.org, product, dec!(10), dec!(60)).await;

    let posted = poster(&store)
        .post_sale(chart.org, sale("S-1", Some(product), dec!(10), dec!(100), Settlement::Immediate(None)))
        .await
        .unwrap();

    assert_eq!(posted.transaction.transaction_type, TransactionType::Sale);
    assert_eq!(posted.transaction.entries.len(), 5);
    assert_eq!(find(&posted, chart.cash, EntryType::Debit), dec!(1100));
    assert_eq!(find(&posted, chart.sales, EntryType::Credit), dec!(1000));
    assert_eq!(find(&posted, chart.vat, EntryType::Credit), dec!(100));
    assert_eq!(find(&posted, chart.cogs, EntryType::Debit), dec!(600));
    assert_eq!(find(&posted, chart.inventory, EntryType::Credit), dec!(600));
    assert_eq!(posted.deductions[0].quantity_deducted, dec!(10));
    assert_eq!(on_hand(&store, chart.org, product).await, dec!(0));
}

#[tokio::test]
async fn test_sale_on_account_without_stock_item() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;

    let posted = poster(&store)
        .post_sale(chart.org, sale("S-2", Some(ProductId::new()), dec!(2), dec!(50), Settlement::OnAccount))
        .await
        .unwrap();

    assert!(!posted.deductions[0].tracked);
    assert_eq!(find(&posted, chart.receivables, EntryType::Debit), dec!(110));
    assert_eq!(find(&posted, chart.cogs, EntryType::Debit), dec!(0));
    assert_eq!(posted.transaction.entries.len(), 3);
}

#[tokio::test]
async fn test_short_sale_blocked_rolls_back_stock() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    stock(&store, chart.org, product, dec!(3), dec!(5)).await;

    let mut doc = sale("S-3", Some(product), dec!(5), dec!(9), Settlement::Immediate(None));
    doc.block_on_shortfall = true;
    let err = poster(&store).post_sale(chart.org, doc).await.unwrap_err();

    assert!(matches!(
        err,
        LedgerError::InsufficientStock { requested, available, .. } if requested == dec!(5) && available == dec!(3)
    ));
    assert_eq!(on_hand(&store, chart.org, product).await, dec!(3));
}

#[tokio::test]
async fn test_short_sale_allowed_costs_only_available_units() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    stock(&store, chart.org, product, dec!(3), dec!(5)).await;

    let posted = poster(&store)
        .post_sale(chart.org, sale("S-4", Some(product), dec!(5), dec!(9), Settlement::Immediate(None)))
        .await
        .unwrap();
    assert_eq!(posted.deductions[0].shortfall, dec!(2));
    assert_eq!(find(&posted, chart.cogs, EntryType::Debit), dec!(15));
}

#[tokio::test]
async fn test_duplicate_sale_does_not_deduct_twice() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    stock(&store, chart.org, product, dec!(10), dec!(1)).await;
    let poster = poster(&store);

    let doc = sale("S-5", Some(product), dec!(4), dec!(3), Settlement::OnAccount);
    poster.post_sale(chart.org, doc.clone()).await.unwrap();
    let err = poster.post_sale(chart.org, doc).await.unwrap_err();

    assert!(matches!(err, LedgerError::DuplicatePosting { .. }));
    assert_eq!(on_hand(&store, chart.org, product).await, dec!(6));
}

#[tokio::test]
async fn test_missing_default_account_stops_posting() {
    let store = MemoryStore::new();
    seed_chart(&store).await;
    let empty_org = OrganizationId::new();

    let err = poster(&store)
        .post_sale(empty_org, sale("S-6", None, dec!(1), dec!(1), Settlement::OnAccount))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::NoDefaultAccountConfigured { kind: AccountKind::AccountsReceivable }
    ));
}

fn bill(id: &str, lines: Vec<BillLine>) -> BillDocument {
    BillDocument {
        header: DocumentHeader::new(
            DocumentReference::new("BILL", id),
            date(2026, 5, 2),
            CurrencyCode::USD,
            format!("Bill {id}"),
        ),
        settlement: Settlement::OnAccount,
        location: None,
        lines,
    }
}

fn bill_line(product: Option<ProductId>, quantity: Decimal, unit_cost: Decimal) -> BillLine {
    BillLine {
        product_id: product,
        quantity,
        unit_cost,
        tax_rate: dec!(18),
        discount: Decimal::ZERO,
        tax_method: TaxMethod::Exclusive,
        expense_account: ResolutionContext::none(),
    }
}

#[tokio::test]
async fn test_bill_capitalises_stock_and_expenses_services() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    stock(&store, chart.org, product, dec!(10), dec!(4)).await;

    let posted = poster(&store)
        .post_bill(
            chart.org,
            bill("B-1", vec![bill_line(Some(product), dec!(10), dec!(6)), bill_line(None, dec!(1), dec!(50))]),
        )
        .await
        .unwrap();

    assert_eq!(find(&posted, chart.inventory, EntryType::Debit), dec!(60));
    assert_eq!(find(&posted, chart.rent, EntryType::Debit), dec!(50));
    assert_eq!(find(&posted, chart.vat, EntryType::Debit), dec!(19.80));
    assert_eq!(find(&posted, chart.payables, EntryType::Credit), dec!(129.80));

    let mut session = store.begin(chart.org, SessionMode::ReadOnlySnapshot).await.unwrap();
    let item = session.lock_inventory_item(product, "MAIN").await.unwrap().unwrap();
    assert_eq!(item.quantity_on_hand, dec!(20));
    assert_eq!(item.average_cost, dec!(5));
}

#[tokio::test]
async fn test_void_sale_returns_stock_at_original_cost() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    stock(&store, chart.org, product, dec!(8), dec!(2.5)).await;
    let poster = poster(&store);

    let posted = poster
        .post_sale(chart.org, sale("S-7", Some(product), dec!(3), dec!(10), Settlement::OnAccount))
        .await
        .unwrap();
    let voided = poster
        .void_document(chart.org, posted.transaction.id, "Customer cancelled")
        .await
        .unwrap();

    assert_eq!(voided.restored_movements, 1);
    assert_eq!(voided.reversal.transaction_type, TransactionType::Reversal);
    assert_eq!(on_hand(&store, chart.org, product).await, dec!(8));

    let mut session = store.begin(chart.org, SessionMode::ReadOnlySnapshot).await.unwrap();
    let movements = session
        .stock_movements(&DocumentReference::new("SALE", "S-7"))
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[1].movement_type, MovementType::Return);
    assert_eq!(movements[1].quantity, dec!(3));
    assert_eq!(movements[1].unit_cost, dec!(2.5));
    drop(session);

    let err = poster
        .void_document(chart.org, posted.transaction.id, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyReversed(_)));
    assert_eq!(on_hand(&store, chart.org, product).await, dec!(8));
}

#[tokio::test]
async fn test_void_bill_removes_received_stock() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    let poster = poster(&store);

    let posted = poster
        .post_bill(chart.org, bill("B-2", vec![bill_line(Some(product), dec!(5), dec!(2))]))
        .await
        .unwrap();
    assert_eq!(on_hand(&store, chart.org, product).await, dec!(5));

    poster.void_document(chart.org, posted.transaction.id, "Wrong supplier").await.unwrap();
    assert_eq!(on_hand(&store, chart.org, product).await, dec!(0));
}

#[tokio::test]
async fn test_void_bill_after_later_purchase_keeps_stock_and_ledger_aligned() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    let poster = poster(&store);

    let first = poster
        .post_bill(chart.org, bill("B-A", vec![bill_line(Some(product), dec!(10), dec!(10))]))
        .await
        .unwrap();
    poster
        .post_bill(chart.org, bill("B-B", vec![bill_line(Some(product), dec!(10), dec!(20))]))
        .await
        .unwrap();

    poster.void_document(chart.org, first.transaction.id, "Duplicate").await.unwrap();

    let mut session = store.begin(chart.org, SessionMode::ReadOnlySnapshot).await.unwrap();
    let item = session.lock_inventory_item(product, "MAIN").await.unwrap().unwrap();
    assert_eq!(item.quantity_on_hand, dec!(10));
    assert_eq!(item.average_cost, dec!(20));
    assert_eq!(item.total_value, dec!(200));
    drop(session);

    let balances = TrialBalanceService::new(store.clone())
        .get_cumulative_balances(chart.org, date(2026, 12, 31), &[AccountType::Asset], ReportBasis::Accrual)
        .await
        .unwrap();
    let inventory = balances.iter().find(|e| e.account_id == chart.inventory).unwrap();
    assert_eq!(inventory.balance, item.total_value);
}

#[tokio::test]
async fn test_void_bill_rejected_once_stock_is_sold() {
    let store = MemoryStore::new();
    let chart = seed_chart(&store).await;
    let product = ProductId::new();
    let poster = poster(&store);

    let billed = poster
        .post_bill(chart.org, bill("B-C", vec![bill_line(Some(product), dec!(10), dec!(10))]))
        .await
        .unwrap();
    poster
        .post_sale(chart.org, sale("S-9", Some(product), dec!(10), dec!(15), Settlement::OnAccount))
        .await
        .unwrap();

    for _ in 0..2 {
        let err = poster
            .void_document(chart.org, billed.transaction.id, "Returned to supplier")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Inventory(InventoryError::StockConsumed { available_quantity, .. })
                if available_quantity.is_zero()
        ));
    }
    assert_eq!(on_hand(&store, chart.org, product).await, dec!(0));

    let original = engine(&store).get_transaction(chart.org, billed.transaction.id).await.unwrap();
    assert_eq!(original.status, crate::ledger::TransactionStatus::Posted);
}

#[tokio::test]
async fn test_receipt_payment_and_transfer() {
    let store = MemoryStore::new();
    let chart: Chart = seed_chart(&store).await;
    let poster = poster(&store);
    let header = |kind: &str, id: &str| {
        DocumentHeader::new(DocumentReference::new(kind, id), date(2026, 5, 25), CurrencyCode::USD, id)
    };

    let receipt = poster
        .post_receipt(
            chart.org,
            ReceiptDocument {
                header: header("RECEIPT", "R-1"),
                amount: dec!(110),
                deposit_account: Some(chart.bank),
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.transaction_type, TransactionType::Receipt);
    assert_eq!(receipt.entries[0].account_id, chart.bank);
    assert_eq!(receipt.entries[1].account_id, chart.receivables);

    let payment = poster
        .post_payment(
            chart.org,
            PaymentDocument {
                header: header("PAYMENT", "P-1"),
                amount: dec!(40),
                paying_account: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(payment.entries[0].account_id, chart.payables);
    assert_eq!(payment.entries[1].account_id, chart.cash);

    let transfer = poster
        .post_transfer(
            chart.org,
            TransferDocument {
                header: header("TRANSFER", "T-1"),
                from_account: chart.bank,
                to_account: chart.cash,
                to_currency: CurrencyCode::USD,
                amount: dec!(20),
            },
        )
        .await
        .unwrap();
    assert_eq!(transfer.transaction_type, TransactionType::BankTransfer);
}
