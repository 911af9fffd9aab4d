//! Row-level security context.
//!
//! Every table carries a `tenant_isolation` policy keyed on the
//! `app.current_organization_id` setting. Sessions set it with `SET LOCAL`
//! right after `BEGIN`, so it lives exactly as long as the transaction.

use sea_orm::{ConnectionTrait, DatabaseTransaction, DbErr};
use tally_shared::types::OrganizationId;

/// Setting the tenant policies read.
pub const ORGANIZATION_SETTING: &str = "app.current_organization_id";

/// `SET LOCAL` statement scoping a transaction to one organization.
///
/// The id is a formatted UUID, so it cannot carry quotes.
#[must_use]
pub fn context_sql(organization_id: OrganizationId) -> String {
    format!("SET LOCAL {ORGANIZATION_SETTING} = '{organization_id}'")
}

/// Scopes an open transaction to `organization_id`.
///
/// # Errors
///
/// Returns an error if the setting cannot be applied.
pub async fn set_rls_context(
    txn: &DatabaseTransaction,
    organization_id: OrganizationId,
) -> Result<(), DbErr> {
    txn.execute_unprepared(&context_sql(organization_id)).await?;
    Ok(())
}
