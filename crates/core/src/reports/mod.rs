//! Financial reporting over the committed ledger.
//!
//! - Trial balance and cumulative balances
//! - Profit & loss with optional hierarchy and prior-period comparison
//! - Balance sheet with retained and current-year earnings
//! - Accrual and cash basis

mod basis;
mod error;
mod service;
mod trial_balance;
mod types;


pub use basis::{CashBasisFilter, SettlementIndex};
pub use error::ReportError;
pub use service::{FinancialReportsService, ProfitLossParams};
pub use trial_balance::TrialBalanceService;
pub use types::{
    BalanceSheetReport, ComparisonLine, ProfitLossComparison, ProfitLossReport, ProfitLossTotals,
    ReportBasis, ReportLine, ReportSection, TrialBalanceEntry, TrialBalanceReport, TrialBalanceTotals,
};
