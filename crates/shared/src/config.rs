//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::CurrencyCode;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Posting and reporting behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Accounting basis used when a report request does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultBasis {
    /// Every posted transaction counts in the period it is dated.
    #[default]
    Accrual,
    /// Only cash-settled activity counts.
    Cash,
}

/// Ledger posting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Maximum tolerated difference between debit and credit totals
    /// (in base-currency units) before a posting is rejected.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: Decimal,
    /// Decimal places used for report rounding of percentages and tax when
    /// the leg currency does not say otherwise.
    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u32,
    /// Allow the legacy code-prefix heuristic when no default account is
    /// configured. Off unless explicitly enabled for migrated data.
    #[serde(default)]
    pub allow_heuristic_account_fallback: bool,
    /// Basis for reports that do not specify one.
    #[serde(default)]
    pub default_basis: DefaultBasis,
    /// Currency ledger balances and inventory costs are kept in.
    #[serde(default = "default_base_currency")]
    pub base_currency: CurrencyCode,
}

fn default_base_currency() -> CurrencyCode {
    CurrencyCode::USD
}

fn default_balance_tolerance() -> Decimal {
    Decimal::new(1, 6)
}

fn default_currency_decimals() -> u32 {
    2
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: default_balance_tolerance(),
            currency_decimals: default_currency_decimals(),
            allow_heuristic_account_fallback: false,
            default_basis: DefaultBasis::default(),
            base_currency: default_base_currency(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `TALLY__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
