//! Tally reporter.
//!
//! Lists the chart of accounts and generates trial balances, cumulative
//! balances, profit and loss statements and balance sheets straight from the
//! ledger database, printing them as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tally_core::accounts::{AccountType, AccountsService};
use tally_core::fiscal::FiscalCalendar;
use tally_core::reports::{
    FinancialReportsService, ProfitLossParams, ReportBasis, TrialBalanceService,
};
use tally_db::SeaOrmStore;
use tally_shared::AppConfig;
use tally_shared::types::OrganizationId;

#[derive(Parser)]
#[command(name = "tally-reporter", about = "Financial reports over the Tally ledger", version)]
struct Cli {
    /// Organization to report on.
    #[arg(long)]
    org: OrganizationId,
    /// Accounting basis. Defaults to `ledger.default_basis` from config.
    #[arg(long, value_enum, global = true)]
    basis: Option<BasisArg>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chart of accounts, ordered by code.
    Accounts,
    /// Debit and credit totals per account for a period.
    TrialBalance {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Balances from inception through a date, optionally for some account types.
    Balances {
        #[arg(long)]
        as_of: NaiveDate,
        /// Account type to include (repeatable), e.g. ASSET.
        #[arg(long = "type")]
        types: Vec<AccountType>,
    },
    /// Income statement for a period.
    ProfitLoss {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Group accounts under their parents.
        #[arg(long, action = ArgAction::SetTrue)]
        hierarchical: bool,
        /// Compare against the preceding period of equal length.
        #[arg(long, action = ArgAction::SetTrue)]
        compare: bool,
    },
    /// Statement of financial position at a date.
    BalanceSheet {
        #[arg(long)]
        as_of: NaiveDate,
        /// Start of the fiscal year for current-year earnings.
        #[arg(long)]
        fiscal_year_start: Option<NaiveDate>,
        /// Month the fiscal year starts in, used when no start date is given.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=12))]
        fiscal_start_month: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BasisArg {
    Accrual,
    Cash,
}

impl From<BasisArg> for ReportBasis {
    fn from(basis: BasisArg) -> Self {
        match basis {
            BasisArg::Accrual => Self::Accrual,
            BasisArg::Cash => Self::Cash,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tally_reporter=info,tally_core=info,tally_db=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = tally_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let store = SeaOrmStore::new(db);
    let balances = TrialBalanceService::new(store.clone());
    let basis = cli
        .basis
        .map_or_else(|| config.ledger.default_basis.into(), ReportBasis::from);
    info!(organization_id = %cli.org, basis = ?basis, "Generating report");

    match cli.command {
        Command::Accounts => {
            let accounts = AccountsService::new(store)
                .list_accounts(cli.org)
                .await
                .context("failed to load chart of accounts")?;
            print_json(&accounts)
        }
        Command::TrialBalance { start, end } => {
            let report = balances
                .get_trial_balance(cli.org, start, end, basis)
                .await
                .context("failed to build trial balance")?;
            print_json(&report)
        }
        Command::Balances { as_of, types } => {
            let entries = balances
                .get_cumulative_balances(cli.org, as_of, &types, basis)
                .await
                .context("failed to build cumulative balances")?;
            print_json(&entries)
        }
        Command::ProfitLoss {
            start,
            end,
            hierarchical,
            compare,
        } => {
            let mut params = ProfitLossParams::new(start, end).with_basis(basis);
            if hierarchical {
                params = params.hierarchical();
            }
            if compare {
                params = params.with_comparison();
            }
            let report = FinancialReportsService::new(balances)
                .generate_profit_loss(cli.org, &params)
                .await
                .context("failed to build profit and loss")?;
            print_json(&report)
        }
        Command::BalanceSheet {
            as_of,
            fiscal_year_start,
            fiscal_start_month,
        } => {
            let calendar = FiscalCalendar {
                start_month: fiscal_start_month,
                start_day: 1,
            };
            let report = FinancialReportsService::new(balances)
                .with_fiscal_calendar(calendar)
                .generate_balance_sheet(cli.org, as_of, basis, fiscal_year_start)
                .await
                .context("failed to build balance sheet")?;
            if let Err(err) = report.verify(config.ledger.balance_tolerance) {
                tracing::warn!(error = %err, "Balance sheet does not balance");
            }
            print_json(&report)
        }
    }
}
