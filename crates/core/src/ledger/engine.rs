//! Posting engine: validated postings, drafts, and reversals on top of a
//! [`LedgerStore`].
//!
//! Each public operation is one unit of work. The `*_in` variants run inside
//! a caller-owned session so document postings can add stock movements to
//! the same atomic write.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use tally_shared::LedgerConfig;
use tally_shared::types::{OrganizationId, TransactionId};
use tracing::info;

use super::entry::LedgerEntry;
use super::error::LedgerError;
use super::reversal::ReversalService;
use super::service::{AccountInfo, LedgerService};
use super::transaction::Transaction;
use super::types::{
    DocumentReference, LegRequest, PostTransactionInput, ResolvedLeg, TransactionStatus,
    TransactionTotals,
};
use crate::store::{
    self, LedgerSession, LedgerStore, SessionMode, UNIQUE_DOCUMENT_POSTING, UNIQUE_REVERSAL,
};

/// Double-entry posting engine.
#[derive(Debug, Clone)]
pub struct PostingEngine<S> {
    store: S,
    config: LedgerConfig,
}

impl<S: LedgerStore> PostingEngine<S> {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ledger settings in effect.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Validates and posts a transaction atomically.
    ///
    /// # Errors
    ///
    /// Returns a validation, account, duplicate-posting or storage error.
    /// Nothing is written on error.
    pub async fn post_transaction(
        &self,
        organization_id: OrganizationId,
        input: PostTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result = self.post_in(&mut session, input).await;
        store::finish(session, result).await
    }

    /// Validates and saves a transaction as DRAFT. Drafts never affect
    /// balances.
    ///
    /// # Errors
    ///
    /// Same as [`Self::post_transaction`].
    pub async fn create_draft(
        &self,
        organization_id: OrganizationId,
        input: PostTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result = self.record(&mut session, input, TransactionStatus::Draft, None).await;
        store::finish(session, result).await
    }

    /// Re-validates a draft against the current chart and posts it.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `CanOnlyChangeDraft`, or a validation
    /// error if the chart changed since the draft was saved.
    pub async fn post_draft(
        &self,
        organization_id: OrganizationId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result = self.post_draft_in(&mut session, id).await;
        store::finish(session, result).await
    }

    /// Deletes a draft.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` or `CanOnlyChangeDraft`.
    pub async fn discard_draft(
        &self,
        organization_id: OrganizationId,
        id: TransactionId,
    ) -> Result<(), LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result: Result<(), LedgerError> = async {
            let draft = Self::load(&mut session, id).await?;
            LedgerService::validate_is_draft(draft.status)?;
            session.delete_transaction(id).await?;
            info!(transaction_id = %id, "Draft discarded");
            Ok(())
        }
        .await;
        store::finish(session, result).await
    }

    /// Marks a draft VOID, keeping it for audit.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` or `CanOnlyChangeDraft`.
    pub async fn void_draft(
        &self,
        organization_id: OrganizationId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result: Result<Transaction, LedgerError> = async {
            let mut draft = Self::load(&mut session, id).await?;
            LedgerService::validate_is_draft(draft.status)?;
            session.update_transaction_status(id, TransactionStatus::Void).await?;
            draft.status = TransactionStatus::Void;
            info!(transaction_id = %id, "Draft voided");
            Ok(draft)
        }
        .await;
        store::finish(session, result).await
    }

    /// Posts the full reversal of a posted transaction.
    ///
    /// The original stays POSTED and unchanged. A transaction can be reversed
    /// once; reversals cannot be reversed.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `NotPosted`, `CannotReverseReversal`,
    /// or `AlreadyReversed`.
    pub async fn reverse_transaction(
        &self,
        organization_id: OrganizationId,
        id: TransactionId,
        reason: &str,
        reversal_date: Option<NaiveDate>,
    ) -> Result<Transaction, LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result = self.reverse_in(&mut session, id, reason, reversal_date).await;
        store::finish(session, result).await
    }

    /// Loads a transaction with its entries.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if it does not exist in the organization.
    pub async fn get_transaction(
        &self,
        organization_id: OrganizationId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let mut session = self
            .store
            .begin(organization_id, SessionMode::ReadOnlySnapshot)
            .await?;
        let result = Self::load(&mut session, id).await;
        store::finish(session, result).await
    }
}

impl<S> PostingEngine<S> {
    /// Posts inside a caller-owned session.
    ///
    /// # Errors
    ///
    /// Same as [`PostingEngine::post_transaction`].
    pub async fn post_in<T: LedgerSession>(
        &self,
        session: &mut T,
        input: PostTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        self.record(session, input, TransactionStatus::Posted, None).await
    }

    /// Reverses inside a caller-owned session.
    ///
    /// # Errors
    ///
    /// Same as [`PostingEngine::reverse_transaction`].
    pub async fn reverse_in<T: LedgerSession>(
        &self,
        session: &mut T,
        id: TransactionId,
        reason: &str,
        reversal_date: Option<NaiveDate>,
    ) -> Result<Transaction, LedgerError> {
        let original = Self::load(session, id).await?;
        ReversalService::validate_reversible(&original)?;
        if session.reversal_of(id).await?.is_some() {
            return Err(LedgerError::AlreadyReversed(id));
        }

        let input = ReversalService::build_reversal(&original, reason, reversal_date);
        let reversal = self
            .record(session, input, TransactionStatus::Posted, Some(id))
            .await?;

        session
            .claim_reversal(id, reversal.id)
            .await
            .map_err(|e| match e {
                e if e.is_unique_violation_of(UNIQUE_REVERSAL) => LedgerError::AlreadyReversed(id),
                e => e.into(),
            })?;

        info!(
            original_id = %id,
            reversal_id = %reversal.id,
            transaction_number = %reversal.transaction_number,
            "Transaction reversed"
        );
        Ok(reversal)
    }

    async fn post_draft_in<T: LedgerSession>(
        &self,
        session: &mut T,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let mut draft = Self::load(session, id).await?;
        LedgerService::validate_is_draft(draft.status)?;

        let input = PostTransactionInput {
            transaction_date: draft.transaction_date,
            transaction_type: draft.transaction_type,
            reference: draft.reference.clone(),
            description: draft.description.clone(),
            legs: draft
                .entries
                .iter()
                .map(|e| LegRequest {
                    account_id: e.account_id,
                    entry_type: e.entry_type,
                    amount: e.amount,
                    currency: e.currency,
                    exchange_rate: e.exchange_rate,
                    description: e.description.clone(),
                })
                .collect(),
        };
        self.validate(session, &input).await?;

        session.update_transaction_status(id, TransactionStatus::Posted).await?;
        draft.status = TransactionStatus::Posted;
        draft.posted_at = Some(Utc::now());

        info!(
            transaction_id = %id,
            transaction_number = %draft.transaction_number,
            "Draft posted"
        );
        Ok(draft)
    }

    async fn validate<T: LedgerSession>(
        &self,
        session: &mut T,
        input: &PostTransactionInput,
    ) -> Result<(Vec<ResolvedLeg>, TransactionTotals), LedgerError> {
        let mut ids: Vec<_> = input.legs.iter().map(|l| l.account_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let accounts: HashMap<_, _> = session
            .find_accounts(&ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a.is_active))
            .collect();

        LedgerService::validate_and_resolve(input, self.config.balance_tolerance, |id| {
            accounts
                .get(&id)
                .map(|&is_active| AccountInfo { id, is_active })
        })
    }

    async fn record<T: LedgerSession>(
        &self,
        session: &mut T,
        input: PostTransactionInput,
        status: TransactionStatus,
        reverses: Option<TransactionId>,
    ) -> Result<Transaction, LedgerError> {
        let (legs, totals) = self.validate(session, &input).await?;

        if reverses.is_none() {
            if let Some(reference) = &input.reference {
                if session.find_posting_by_reference(reference).await?.is_some() {
                    return Err(duplicate(reference));
                }
            }
        }

        let transaction_number = session.next_transaction_number(input.transaction_date).await?;
        let id = TransactionId::new();
        let now = Utc::now();
        let transaction = Transaction {
            id,
            organization_id: session.organization_id(),
            transaction_number,
            transaction_date: input.transaction_date,
            transaction_type: input.transaction_type,
            status,
            reference: input.reference,
            description: input.description,
            reverses_transaction_id: reverses,
            created_at: now,
            posted_at: (status == TransactionStatus::Posted).then_some(now),
            entries: legs.into_iter().map(|leg| LedgerEntry::from_leg(id, leg)).collect(),
        };

        session
            .insert_transaction(&transaction)
            .await
            .map_err(|e| match (&transaction.reference, e) {
                (Some(reference), e) if e.is_unique_violation_of(UNIQUE_DOCUMENT_POSTING) => {
                    duplicate(reference)
                }
                (_, e) => LedgerError::from(e),
            })?;

        info!(
            transaction_id = %transaction.id,
            transaction_number = %transaction.transaction_number,
            transaction_type = %transaction.transaction_type,
            status = transaction.status.as_str(),
            base_total = %totals.base_debit,
            "Transaction recorded"
        );
        Ok(transaction)
    }

    async fn load<T: LedgerSession>(
        session: &mut T,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        session
            .find_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }
}

fn duplicate(reference: &DocumentReference) -> LedgerError {
    LedgerError::DuplicatePosting {
        reference_type: reference.reference_type.clone(),
        reference_id: reference.reference_id.clone(),
    }
}
