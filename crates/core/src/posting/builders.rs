//! Pure leg builders: resolved accounts and amounts in, posting input out.
//!
//! Builders never touch storage. Zero-amount legs are dropped and legs to
//! the same account are merged, keeping the order accounts first appear.

use rust_decimal::Decimal;
use tally_shared::types::{AccountId, CurrencyCode};

use super::documents::{DocumentHeader, TransferDocument};
use crate::ledger::{LedgerError, LegRequest, PostTransactionInput, TransactionType};

/// Cost of goods leaving stock, in base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostLeg {
    /// Account debited.
    pub cogs_account: AccountId,
    /// Account credited.
    pub inventory_account: AccountId,
    /// Cost at weighted average.
    pub amount: Decimal,
}

/// Resolved amounts of a sale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleLegs {
    /// Cash or receivable account debited for the gross amount.
    pub receiving_account: Option<AccountId>,
    /// Net revenue per line, in document currency.
    pub revenue: Vec<(AccountId, Decimal)>,
    /// Tax control account and total tax, in document currency.
    pub tax: Option<(AccountId, Decimal)>,
    /// Cost of goods sold, in base currency.
    pub costs: Vec<CostLeg>,
}

/// Resolved amounts of a bill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillLegs {
    /// Expense or inventory account per line with its net amount.
    pub debits: Vec<(AccountId, Decimal)>,
    /// Tax control account and recoverable tax.
    pub tax: Option<(AccountId, Decimal)>,
    /// Payable or paying account credited for the gross amount.
    pub paying_account: Option<AccountId>,
}

/// Builds posting inputs for business documents.
pub struct PostingBuilder;

impl PostingBuilder {
    /// Sale: DEBIT receiving account for gross; CREDIT revenue per account;
    /// CREDIT tax; DEBIT COGS / CREDIT inventory for cost.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDocument` when nothing is left to post.
    pub fn sale(
        header: &DocumentHeader,
        legs: &SaleLegs,
        base_currency: CurrencyCode,
    ) -> Result<PostTransactionInput, LedgerError> {
        let revenue = merge(&legs.revenue);
        let tax = legs.tax.filter(|(_, amount)| !amount.is_zero());
        let gross: Decimal =
            revenue.iter().map(|(_, a)| *a).sum::<Decimal>() + tax.map_or(Decimal::ZERO, |(_, a)| a);

        let mut out = Vec::new();
        if let Some(receiving) = legs.receiving_account.filter(|_| !gross.is_zero()) {
            out.push(doc_leg(header, LegRequest::debit(receiving, gross, header.currency)));
        }
        for (account, amount) in revenue {
            out.push(doc_leg(header, LegRequest::credit(account, amount, header.currency)));
        }
        if let Some((account, amount)) = tax {
            out.push(doc_leg(header, LegRequest::credit(account, amount, header.currency)));
        }

        let cogs = merge(&legs.costs.iter().map(|c| (c.cogs_account, c.amount)).collect::<Vec<_>>());
        let inventory = merge(
            &legs
                .costs
                .iter()
                .map(|c| (c.inventory_account, c.amount))
                .collect::<Vec<_>>(),
        );
        out.extend(
            cogs.into_iter()
                .map(|(account, amount)| LegRequest::debit(account, amount, base_currency)),
        );
        out.extend(
            inventory
                .into_iter()
                .map(|(account, amount)| LegRequest::credit(account, amount, base_currency)),
        );

        Self::finish(header, TransactionType::Sale, out)
    }

    /// Bill: DEBIT expense/inventory per account; DEBIT tax; CREDIT
    /// payable or paying account for gross.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDocument` when nothing is left to post.
    pub fn bill(header: &DocumentHeader, legs: &BillLegs) -> Result<PostTransactionInput, LedgerError> {
        let debits = merge(&legs.debits);
        let tax = legs.tax.filter(|(_, amount)| !amount.is_zero());
        let gross: Decimal =
            debits.iter().map(|(_, a)| *a).sum::<Decimal>() + tax.map_or(Decimal::ZERO, |(_, a)| a);

        let mut out: Vec<LegRequest> = debits
            .into_iter()
            .map(|(account, amount)| doc_leg(header, LegRequest::debit(account, amount, header.currency)))
            .collect();
        if let Some((account, amount)) = tax {
            out.push(doc_leg(header, LegRequest::debit(account, amount, header.currency)));
        }
        if let Some(paying) = legs.paying_account.filter(|_| !gross.is_zero()) {
            out.push(doc_leg(header, LegRequest::credit(paying, gross, header.currency)));
        }

        Self::finish(header, TransactionType::Bill, out)
    }

    /// Receipt: DEBIT deposit account, CREDIT receivables.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDocument` for a zero amount.
    pub fn receipt(
        header: &DocumentHeader,
        amount: Decimal,
        deposit_account: AccountId,
        receivable_account: AccountId,
    ) -> Result<PostTransactionInput, LedgerError> {
        Self::pair(header, TransactionType::Receipt, amount, deposit_account, receivable_account)
    }

    /// Payment: DEBIT payables, CREDIT paying account.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDocument` for a zero amount.
    pub fn payment(
        header: &DocumentHeader,
        amount: Decimal,
        payable_account: AccountId,
        paying_account: AccountId,
    ) -> Result<PostTransactionInput, LedgerError> {
        Self::pair(header, TransactionType::Payment, amount, payable_account, paying_account)
    }

    /// Transfer: DEBIT destination, CREDIT source.
    ///
    /// # Errors
    ///
    /// Returns `CrossCurrencyTransfer` when the two accounts hold different
    /// currencies, or `EmptyDocument` for a zero amount.
    pub fn transfer(doc: &TransferDocument) -> Result<PostTransactionInput, LedgerError> {
        if doc.header.currency != doc.to_currency {
            return Err(LedgerError::CrossCurrencyTransfer {
                from: doc.header.currency,
                to: doc.to_currency,
            });
        }
        Self::pair(
            &doc.header,
            TransactionType::BankTransfer,
            doc.amount,
            doc.to_account,
            doc.from_account,
        )
    }

    fn pair(
        header: &DocumentHeader,
        transaction_type: TransactionType,
        amount: Decimal,
        debit: AccountId,
        credit: AccountId,
    ) -> Result<PostTransactionInput, LedgerError> {
        let legs = if amount.is_zero() {
            Vec::new()
        } else {
            vec![
                doc_leg(header, LegRequest::debit(debit, amount, header.currency)),
                doc_leg(header, LegRequest::credit(credit, amount, header.currency)),
            ]
        };
        Self::finish(header, transaction_type, legs)
    }

    fn finish(
        header: &DocumentHeader,
        transaction_type: TransactionType,
        legs: Vec<LegRequest>,
    ) -> Result<PostTransactionInput, LedgerError> {
        if legs.is_empty() {
            return Err(LedgerError::EmptyDocument);
        }
        Ok(PostTransactionInput {
            transaction_date: header.date,
            transaction_type,
            reference: Some(header.reference.clone()),
            description: header.description.clone(),
            legs,
        })
    }
}

fn doc_leg(header: &DocumentHeader, leg: LegRequest) -> LegRequest {
    leg.with_rate(header.exchange_rate)
}

/// Sums amounts per account in first-seen order, dropping zero totals.
fn merge(amounts: &[(AccountId, Decimal)]) -> Vec<(AccountId, Decimal)> {
    let mut merged: Vec<(AccountId, Decimal)> = Vec::new();
    for &(account, amount) in amounts {
        match merged.iter_mut().find(|(a, _)| *a == account) {
            Some((_, total)) => *total += amount,
            None => merged.push((account, amount)),
        }
    }
    merged.retain(|(_, amount)| !amount.is_zero());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DocumentReference, EntryType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn header(currency: CurrencyCode, rate: Decimal) -> DocumentHeader {
        DocumentHeader {
            reference: DocumentReference::new("SALE", "S-100"),
            date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            currency,
            exchange_rate: rate,
            description: "Counter sale".to_string(),
        }
    }

    fn summary(input: &PostTransactionInput) -> Vec<(AccountId, EntryType, Decimal)> {
        input.legs.iter().map(|l| (l.account_id, l.entry_type, l.amount)).collect()
    }

    #[test]
    fn test_cash_sale_with_tax_and_cost() {
        let (cash, revenue, tax, cogs, stock) = (
            AccountId::new(),
            AccountId::new(),
            AccountId::new(),
            AccountId::new(),
            AccountId::new(),
        );
        let legs = SaleLegs {
            receiving_account: Some(cash),
            revenue: vec![(revenue, dec!(1000))],
            tax: Some((tax, dec!(100))),
            costs: vec![CostLeg {
                cogs_account: cogs,
                inventory_account: stock,
                amount: dec!(600),
            }],
        };

        let input = PostingBuilder::sale(&header(CurrencyCode::USD, Decimal::ONE), &legs, CurrencyCode::USD).unwrap();
        assert_eq!(input.transaction_type, TransactionType::Sale);
        assert_eq!(
            summary(&input),
            vec![
                (cash, EntryType::Debit, dec!(1100)),
                (revenue, EntryType::Credit, dec!(1000)),
                (tax, EntryType::Credit, dec!(100)),
                (cogs, EntryType::Debit, dec!(600)),
                (stock, EntryType::Credit, dec!(600)),
            ]
        );
    }

    #[test]
    fn test_sale_merges_revenue_and_omits_zero_tax() {
        let (ar, a, b) = (AccountId::new(), AccountId::new(), AccountId::new());
        let legs = SaleLegs {
            receiving_account: Some(ar),
            revenue: vec![(a, dec!(10)), (b, dec!(5)), (a, dec!(2.50))],
            tax: Some((AccountId::new(), dec!(0))),
            costs: vec![],
        };
        let input = PostingBuilder::sale(&header(CurrencyCode::USD, Decimal::ONE), &legs, CurrencyCode::USD).unwrap();
        assert_eq!(
            summary(&input),
            vec![
                (ar, EntryType::Debit, dec!(17.50)),
                (a, EntryType::Credit, dec!(12.50)),
                (b, EntryType::Credit, dec!(5)),
            ]
        );
    }

    #[test]
    fn test_foreign_sale_costs_post_in_base() {
        let legs = SaleLegs {
            receiving_account: Some(AccountId::new()),
            revenue: vec![(AccountId::new(), dec!(100))],
            tax: None,
            costs: vec![CostLeg {
                cogs_account: AccountId::new(),
                inventory_account: AccountId::new(),
                amount: dec!(40),
            }],
        };
        let input = PostingBuilder::sale(&header(CurrencyCode::EUR, dec!(1.1)), &legs, CurrencyCode::USD).unwrap();

        assert_eq!(input.legs[0].currency, CurrencyCode::EUR);
        assert_eq!(input.legs[0].exchange_rate, dec!(1.1));
        assert_eq!(input.legs[2].currency, CurrencyCode::USD);
        assert_eq!(input.legs[2].exchange_rate, Decimal::ONE);
    }

    #[test]
    fn test_zero_sale_is_empty() {
        let legs = SaleLegs {
            receiving_account: Some(AccountId::new()),
            revenue: vec![(AccountId::new(), dec!(0))],
            ..SaleLegs::default()
        };
        assert!(matches!(
            PostingBuilder::sale(&header(CurrencyCode::USD, Decimal::ONE), &legs, CurrencyCode::USD),
            Err(LedgerError::EmptyDocument)
        ));
    }

    #[test]
    fn test_bill_debits_and_credits_gross() {
        let (supplies, stock, vat, ap) = (AccountId::new(), AccountId::new(), AccountId::new(), AccountId::new());
        let legs = BillLegs {
            debits: vec![(supplies, dec!(200)), (stock, dec!(300))],
            tax: Some((vat, dec!(90))),
            paying_account: Some(ap),
        };
        let input = PostingBuilder::bill(&header(CurrencyCode::USD, Decimal::ONE), &legs).unwrap();
        assert_eq!(
            summary(&input),
            vec![
                (supplies, EntryType::Debit, dec!(200)),
                (stock, EntryType::Debit, dec!(300)),
                (vat, EntryType::Debit, dec!(90)),
                (ap, EntryType::Credit, dec!(590)),
            ]
        );
    }

    #[test]
    fn test_transfer_same_currency() {
        let (from, to) = (AccountId::new(), AccountId::new());
        let doc = TransferDocument {
            header: header(CurrencyCode::UGX, Decimal::ONE),
            from_account: from,
            to_account: to,
            to_currency: CurrencyCode::UGX,
            amount: dec!(50000),
        };
        let input = PostingBuilder::transfer(&doc).unwrap();
        assert_eq!(input.transaction_type, TransactionType::BankTransfer);
        assert_eq!(
            summary(&input),
            vec![(to, EntryType::Debit, dec!(50000)), (from, EntryType::Credit, dec!(50000))]
        );
    }

    #[test]
    fn test_cross_currency_transfer_rejected() {
        let doc = TransferDocument {
            header: header(CurrencyCode::USD, Decimal::ONE),
            from_account: AccountId::new(),
            to_account: AccountId::new(),
            to_currency: CurrencyCode::EUR,
            amount: dec!(10),
        };
        assert!(matches!(
            PostingBuilder::transfer(&doc),
            Err(LedgerError::CrossCurrencyTransfer { .. })
        ));
    }

    #[test]
    fn test_receipt_and_payment_directions() {
        let (bank, ar, ap) = (AccountId::new(), AccountId::new(), AccountId::new());
        let h = header(CurrencyCode::USD, Decimal::ONE);

        let receipt = PostingBuilder::receipt(&h, dec!(75), bank, ar).unwrap();
        assert_eq!(summary(&receipt)[0], (bank, EntryType::Debit, dec!(75)));
        assert_eq!(receipt.transaction_type, TransactionType::Receipt);

        let payment = PostingBuilder::payment(&h, dec!(75), ap, bank).unwrap();
        assert_eq!(summary(&payment)[1], (bank, EntryType::Credit, dec!(75)));
        assert!(PostingBuilder::payment(&h, dec!(0), ap, bank).is_err());
    }
}
