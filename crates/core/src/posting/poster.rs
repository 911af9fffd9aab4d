//! Posts business documents: account resolution, tax, stock and ledger
//! entries in one unit of work.

use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::{CurrencyCode, OrganizationId, TransactionId};
use tracing::info;

use super::builders::{BillLegs, CostLeg, PostingBuilder, SaleLegs};
use super::documents::{
    BillDocument, PaymentDocument, ReceiptDocument, SaleDocument, Settlement, TransferDocument,
};
use crate::accounts::{Account, AccountKind, AccountResolver, DefaultAccounts, ResolutionContext};
use crate::inventory::{
    DEFAULT_LOCATION, DeductOutcome, InventoryEngine, MovementType, StockMovement, StockReference,
};
use crate::ledger::{LedgerError, PostTransactionInput, PostingEngine, Transaction};
use crate::store::{self, LedgerSession, LedgerStore, SessionMode};
use crate::tax::{LineAmounts, StandardTaxCalculator, TaxCalculation, TaxInput};

/// A posted document.
#[derive(Debug, Clone, Serialize)]
pub struct PostedDocument {
    /// The ledger transaction.
    pub transaction: Transaction,
    /// Per-line amounts, in line order.
    pub lines: Vec<LineAmounts>,
    /// Stock deductions, one per product line of a sale.
    pub deductions: Vec<DeductOutcome>,
}

/// A voided document.
#[derive(Debug, Clone, Serialize)]
pub struct VoidedDocument {
    /// The reversing transaction.
    pub reversal: Transaction,
    /// Stock movements written to restore inventory.
    pub restored_movements: usize,
}

/// Snapshot of the chart and defaults used to resolve one document.
struct Chart {
    accounts: Vec<Account>,
    defaults: DefaultAccounts,
}

impl Chart {
    async fn load<T: LedgerSession>(session: &mut T) -> Result<Self, LedgerError> {
        Ok(Self {
            accounts: session.accounts().await?,
            defaults: session.default_accounts().await?,
        })
    }

    fn resolver(&self, allow_heuristic: bool) -> AccountResolver<'_> {
        AccountResolver::new(&self.accounts, &self.defaults, allow_heuristic)
    }
}

/// Posts sales, bills, receipts, payments and transfers.
#[derive(Debug, Clone)]
pub struct DocumentPoster<S> {
    engine: PostingEngine<S>,
}

impl<S: LedgerStore> DocumentPoster<S> {
    /// Creates a poster on top of a posting engine.
    #[must_use]
    pub fn new(engine: PostingEngine<S>) -> Self {
        Self { engine }
    }

    /// The underlying posting engine.
    pub fn engine(&self) -> &PostingEngine<S> {
        &self.engine
    }

    /// Posts a sale and takes its products out of stock at weighted
    /// average cost.
    ///
    /// # Errors
    ///
    /// Returns tax, resolution, stock, or posting errors. Nothing is written
    /// on error.
    pub async fn post_sale(
        &self,
        organization_id: OrganizationId,
        doc: SaleDocument,
    ) -> Result<PostedDocument, LedgerError> {
        let mut session = self.engine.store().begin(organization_id, SessionMode::ReadWrite).await?;
        let result = self.post_sale_in(&mut session, &doc).await;
        store::finish(session, result).await
    }

    /// Posts a supplier bill and receives stocked lines into inventory at
    /// their net cost.
    ///
    /// # Errors
    ///
    /// Returns tax, resolution, stock, or posting errors.
    pub async fn post_bill(
        &self,
        organization_id: OrganizationId,
        doc: BillDocument,
    ) -> Result<PostedDocument, LedgerError> {
        let mut session = self.engine.store().begin(organization_id, SessionMode::ReadWrite).await?;
        let result = self.post_bill_in(&mut session, &doc).await;
        store::finish(session, result).await
    }

    /// Posts money received from a customer.
    ///
    /// # Errors
    ///
    /// Returns resolution or posting errors.
    pub async fn post_receipt(
        &self,
        organization_id: OrganizationId,
        doc: ReceiptDocument,
    ) -> Result<Transaction, LedgerError> {
        self.post_simple(organization_id, |chart, allow| {
            let resolver = chart.resolver(allow);
            let deposit = resolver.resolve(AccountKind::Cash, &ResolutionContext::line(doc.deposit_account))?;
            let receivable = resolver.resolve(AccountKind::AccountsReceivable, &ResolutionContext::none())?;
            PostingBuilder::receipt(&doc.header, doc.amount, deposit, receivable)
        })
        .await
    }

    /// Posts money paid to a supplier.
    ///
    /// # Errors
    ///
    /// Returns resolution or posting errors.
    pub async fn post_payment(
        &self,
        organization_id: OrganizationId,
        doc: PaymentDocument,
    ) -> Result<Transaction, LedgerError> {
        self.post_simple(organization_id, |chart, allow| {
            let resolver = chart.resolver(allow);
            let payable = resolver.resolve(AccountKind::AccountsPayable, &ResolutionContext::none())?;
            let paying = resolver.resolve(AccountKind::Cash, &ResolutionContext::line(doc.paying_account))?;
            PostingBuilder::payment(&doc.header, doc.amount, payable, paying)
        })
        .await
    }

    /// Posts a same-currency transfer between two accounts.
    ///
    /// # Errors
    ///
    /// Returns `CrossCurrencyTransfer` or posting errors.
    pub async fn post_transfer(
        &self,
        organization_id: OrganizationId,
        doc: TransferDocument,
    ) -> Result<Transaction, LedgerError> {
        let input = PostingBuilder::transfer(&doc)?;
        self.engine.post_transaction(organization_id, input).await
    }

    /// Voids a posted document: reverses its transaction and puts stock
    /// back with opposite-signed movements.
    ///
    /// Sold goods return at the cost they left at; billed goods are taken
    /// out again as an adjustment at the cost they came in at, so stock value
    /// moves by the same amount as the inventory account.
    ///
    /// # Errors
    ///
    /// Returns the reversal errors of [`PostingEngine::reverse_transaction`],
    /// or `StockConsumed` when billed goods have already been used up. Nothing
    /// is written in that case.
    pub async fn void_document(
        &self,
        organization_id: OrganizationId,
        transaction_id: TransactionId,
        reason: &str,
    ) -> Result<VoidedDocument, LedgerError> {
        let mut session = self.engine.store().begin(organization_id, SessionMode::ReadWrite).await?;
        let result = self.void_in(&mut session, transaction_id, reason).await;
        store::finish(session, result).await
    }

    async fn post_simple<F>(&self, organization_id: OrganizationId, build: F) -> Result<Transaction, LedgerError>
    where
        F: FnOnce(&Chart, bool) -> Result<PostTransactionInput, LedgerError> + Send,
    {
        let mut session = self.engine.store().begin(organization_id, SessionMode::ReadWrite).await?;
        let result: Result<Transaction, LedgerError> = async {
            let chart = Chart::load(&mut session).await?;
            let input = build(&chart, self.engine.config().allow_heuristic_account_fallback)?;
            self.engine.post_in(&mut session, input).await
        }
        .await;
        store::finish(session, result).await
    }

    fn calculator(currency: CurrencyCode) -> StandardTaxCalculator {
        StandardTaxCalculator::new(currency.minor_units())
    }

    async fn post_sale_in<T: LedgerSession>(
        &self,
        session: &mut T,
        doc: &SaleDocument,
    ) -> Result<PostedDocument, LedgerError> {
        let calculator = Self::calculator(doc.header.currency);
        let lines = doc
            .lines
            .iter()
            .map(|line| {
                calculator.calculate(&TaxInput {
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                    tax_rate: line.tax_rate,
                    discount: line.discount,
                    method: line.tax_method,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let chart = Chart::load(session).await?;
        let resolver = chart.resolver(self.engine.config().allow_heuristic_account_fallback);

        let receiving_account = match doc.settlement {
            Settlement::Immediate(account) => resolver.resolve(AccountKind::Cash, &ResolutionContext::line(account))?,
            Settlement::OnAccount => resolver.resolve(AccountKind::AccountsReceivable, &ResolutionContext::none())?,
        };
        let revenue = doc
            .lines
            .iter()
            .zip(&lines)
            .map(|(line, amounts)| {
                resolver
                    .resolve(AccountKind::Revenue, &line.revenue_account)
                    .map(|account| (account, amounts.line_net))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let total_tax: Decimal = lines.iter().map(|l| l.line_tax).sum();
        let tax = if total_tax.is_zero() {
            None
        } else {
            Some((resolver.resolve(AccountKind::TaxPayable, &ResolutionContext::none())?, total_tax))
        };

        let location = doc.location.as_deref().unwrap_or(DEFAULT_LOCATION);
        let context = StockReference::new(MovementType::Sale, Some(doc.header.reference.clone()), doc.header.date);
        let mut deductions = Vec::new();
        let mut costs = Vec::new();
        for line in &doc.lines {
            let Some(product_id) = line.product_id else {
                continue;
            };
            let outcome = InventoryEngine::deduct(session, product_id, location, line.quantity, &context).await?;
            if outcome.is_short() && doc.block_on_shortfall {
                return Err(LedgerError::InsufficientStock {
                    product_id,
                    requested: outcome.quantity_requested,
                    available: outcome.quantity_deducted,
                });
            }
            if !outcome.total_cost.is_zero() {
                costs.push(CostLeg {
                    cogs_account: resolver.resolve(AccountKind::CostOfGoodsSold, &ResolutionContext::none())?,
                    inventory_account: resolver.resolve(AccountKind::InventoryAsset, &ResolutionContext::none())?,
                    amount: outcome.total_cost,
                });
            }
            deductions.push(outcome);
        }

        let legs = SaleLegs {
            receiving_account: Some(receiving_account),
            revenue,
            tax,
            costs,
        };
        let input = PostingBuilder::sale(&doc.header, &legs, self.engine.config().base_currency)?;
        let transaction = self.engine.post_in(session, input).await?;

        info!(
            transaction_id = %transaction.id,
            reference_id = %doc.header.reference.reference_id,
            lines = lines.len(),
            "Sale posted"
        );
        Ok(PostedDocument {
            transaction,
            lines,
            deductions,
        })
    }

    async fn post_bill_in<T: LedgerSession>(
        &self,
        session: &mut T,
        doc: &BillDocument,
    ) -> Result<PostedDocument, LedgerError> {
        let calculator = Self::calculator(doc.header.currency);
        let lines = doc
            .lines
            .iter()
            .map(|line| {
                calculator.calculate(&TaxInput {
                    unit_price: line.unit_cost,
                    quantity: line.quantity,
                    tax_rate: line.tax_rate,
                    discount: line.discount,
                    method: line.tax_method,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let chart = Chart::load(session).await?;
        let resolver = chart.resolver(self.engine.config().allow_heuristic_account_fallback);

        let paying_account = match doc.settlement {
            Settlement::Immediate(account) => resolver.resolve(AccountKind::Cash, &ResolutionContext::line(account))?,
            Settlement::OnAccount => resolver.resolve(AccountKind::AccountsPayable, &ResolutionContext::none())?,
        };

        let location = doc.location.as_deref().unwrap_or(DEFAULT_LOCATION);
        let context = StockReference::new(MovementType::Receipt, Some(doc.header.reference.clone()), doc.header.date);
        let mut debits = Vec::with_capacity(doc.lines.len());
        for (line, amounts) in doc.lines.iter().zip(&lines) {
            match line.product_id {
                Some(product_id) => {
                    debits.push((
                        resolver.resolve(AccountKind::InventoryAsset, &ResolutionContext::none())?,
                        amounts.line_net,
                    ));
                    if !line.quantity.is_zero() {
                        let unit_cost = amounts.line_net * doc.header.exchange_rate / line.quantity;
                        InventoryEngine::add(session, product_id, location, line.quantity, Some(unit_cost), &context)
                            .await?;
                    }
                }
                None => debits.push((
                    resolver.resolve(AccountKind::Expense, &line.expense_account)?,
                    amounts.line_net,
                )),
            }
        }

        let total_tax: Decimal = lines.iter().map(|l| l.line_tax).sum();
        let tax = if total_tax.is_zero() {
            None
        } else {
            Some((resolver.resolve(AccountKind::TaxPayable, &ResolutionContext::none())?, total_tax))
        };

        let legs = BillLegs {
            debits,
            tax,
            paying_account: Some(paying_account),
        };
        let input = PostingBuilder::bill(&doc.header, &legs)?;
        let transaction = self.engine.post_in(session, input).await?;

        info!(
            transaction_id = %transaction.id,
            reference_id = %doc.header.reference.reference_id,
            lines = lines.len(),
            "Bill posted"
        );
        Ok(PostedDocument {
            transaction,
            lines,
            deductions: Vec::new(),
        })
    }

    async fn void_in<T: LedgerSession>(
        &self,
        session: &mut T,
        transaction_id: TransactionId,
        reason: &str,
    ) -> Result<VoidedDocument, LedgerError> {
        let original = session
            .find_transaction(transaction_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))?;
        let reversal = self.engine.reverse_in(session, transaction_id, reason, None).await?;

        let mut restored_movements = 0;
        if let Some(reference) = &original.reference {
            let movements: Vec<StockMovement> = session
                .stock_movements(reference)
                .await?
                .into_iter()
                .filter(|m| matches!(m.movement_type, MovementType::Sale | MovementType::Receipt))
                .filter(|m| !m.quantity.is_zero())
                .collect();

            for movement in movements {
                let context = StockReference::new(
                    match movement.movement_type {
                        MovementType::Sale => MovementType::Return,
                        _ => MovementType::Adjustment,
                    },
                    Some(reference.clone()),
                    reversal.transaction_date,
                );
                if movement.quantity < Decimal::ZERO {
                    InventoryEngine::add(
                        session,
                        movement.product_id,
                        &movement.location,
                        -movement.quantity,
                        Some(movement.unit_cost),
                        &context,
                    )
                    .await?;
                } else {
                    InventoryEngine::remove_at_cost(
                        session,
                        movement.product_id,
                        &movement.location,
                        movement.quantity,
                        movement.unit_cost,
                        &context,
                    )
                    .await?;
                }
                restored_movements += 1;
            }
        }

        info!(
            original_id = %transaction_id,
            reversal_id = %reversal.id,
            restored_movements,
            "Document voided"
        );
        Ok(VoidedDocument {
            reversal,
            restored_movements,
        })
    }
}
