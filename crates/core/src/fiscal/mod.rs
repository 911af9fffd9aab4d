//! Fiscal year and reporting period handling.

pub mod period;

pub use period::{DateRange, FiscalCalendar};
