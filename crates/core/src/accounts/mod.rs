//! Chart of accounts: classification, report mapping, and posting-account
//! resolution.

mod mapping;
mod resolution;
mod service;
mod types;

pub use mapping::{ReportBucket, SUBTYPE_BUCKETS, SUBTYPE_MAPPING_VERSION, bucket_for, validate_subtype};
pub use resolution::{AccountKind, AccountResolver, DefaultAccounts, ResolutionContext};
pub use service::{AccountsService, NewAccount};
pub use types::{Account, AccountSubtype, AccountType};
