//! Operator console for the case economy.
//!
//! Connects to the database, applies migrations and runs a single economy
//! command, printing the result as JSON on stdout.

mod config;
mod logging;

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Error, bail};
use case_economy::{
    Command, EconomyError, EconomyManager, PgStore,
    db::Database,
};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use serde::Serialize;

use crate::config::CliConfig;

const HELP: &str = "\
Run one command against the case economy

USAGE:
  case_cli [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
  migrate                           Apply database migrations and exit
  health                            Check database connectivity
  open-case  USER_ID CASE_ID        Open a case
  redeem     USER_ID CODE_ID        Sell a code back to the house
  list       USER_ID CODE_ID PRICE  List a code on the market (price in cents)
  buy        USER_ID LISTING_ID     Buy a market listing
  cancel     USER_ID LISTING_ID     Withdraw a market listing
  market                            Show open listings
  codes      USER_ID                Show a user's codes
  balance    USER_ID                Show a user's balance
  exec       JSON                   Run a JSON command, e.g. '{\"action\":\"balance\",\"user_id\":1}'

OPTIONS:
  --db-url   URL                    Database connection string  [default: env DATABASE_URL]
  --skip-migrations                 Do not migrate before running the command

FLAGS:
  -h, --help                        Print help information

ENVIRONMENT:
  DATABASE_URL                      PostgreSQL connection string
  SELL_RATE_BPS                     House buy-back rate in basis points (default: 5000)
  CODE_LENGTH                       Symbols per minted code (default: 12)
  TX_MAX_RETRIES                    Retries after serialization failures (default: 3)
  TX_TIMEOUT_SECS                   Deadline per transaction attempt (default: 10)
  RUST_LOG                          Log filter (default: info,sqlx=warn)
  (A .env file in the working directory is loaded first)
";

/// What the console was asked to do
#[derive(Debug, PartialEq)]
enum Action {
    Migrate,
    Health,
    Run(Command),
}

struct Args {
    database_url: Option<String>,
    skip_migrations: bool,
    action: Action,
}

/// Error shape printed on stderr for failed commands
#[derive(Serialize)]
struct ErrorReport {
    error: String,
    status: u16,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(ExitCode::SUCCESS);
    }

    let args = parse_args(pargs)?;

    // Catching signals for exit. An interrupted transaction is rolled back by the server.
    set_handler(|| std::process::exit(130))?;

    logging::init();

    let config = CliConfig::from_env(args.database_url, !args.skip_migrations)?;
    config.validate()?;

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected successfully");

    let command = match args.action {
        Action::Health => {
            db.health_check().await.context("Health check failed")?;
            println!("ok");
            return Ok(ExitCode::SUCCESS);
        }
        Action::Migrate => {
            db.migrate().await.context("Failed to run migrations")?;
            info!("Migrations applied");
            return Ok(ExitCode::SUCCESS);
        }
        Action::Run(command) => command,
    };

    if config.run_migrations {
        db.migrate().await.context("Failed to run migrations")?;
    }

    let store = PgStore::new(Arc::new(db.pool().clone()));
    let economy = EconomyManager::new(Arc::new(store), config.economy);

    let action = command.name();
    let start = Instant::now();
    let result = economy.execute(command).await;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let exit = match result {
        Ok(output) => {
            logging::log_command(action, duration_ms, 200);
            println!("{}", serde_json::to_string_pretty(&output)?);
            ExitCode::SUCCESS
        }
        Err(err) => {
            logging::log_command(action, duration_ms, err.status_code());
            report_error(&err)?;
            ExitCode::FAILURE
        }
    };

    db.close().await;
    Ok(exit)
}

/// Print a sanitized error on stderr
fn report_error(err: &EconomyError) -> Result<(), Error> {
    log::debug!("Command error detail: {err}");
    let report = ErrorReport {
        error: err.client_message(),
        status: err.status_code(),
    };
    eprintln!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn parse_args(mut pargs: Arguments) -> Result<Args, Error> {
    let database_url = pargs.opt_value_from_str("--db-url")?;
    let skip_migrations = pargs.contains("--skip-migrations");

    let Some(subcommand) = pargs.subcommand()? else {
        bail!("No command given, see --help");
    };

    let action = match subcommand.as_str() {
        "migrate" => Action::Migrate,
        "health" => Action::Health,
        "open-case" => Action::Run(Command::OpenCase {
            user_id: pargs.free_from_str()?,
            case_id: pargs.free_from_str()?,
        }),
        "redeem" => Action::Run(Command::Redeem {
            user_id: pargs.free_from_str()?,
            code_id: pargs.free_from_str()?,
        }),
        "list" => Action::Run(Command::ListForSale {
            seller_id: pargs.free_from_str()?,
            code_id: pargs.free_from_str()?,
            price: pargs.free_from_str()?,
        }),
        "buy" => Action::Run(Command::Buy {
            buyer_id: pargs.free_from_str()?,
            listing_id: pargs.free_from_str()?,
        }),
        "cancel" => Action::Run(Command::CancelListing {
            seller_id: pargs.free_from_str()?,
            listing_id: pargs.free_from_str()?,
        }),
        "market" => Action::Run(Command::ListMarket),
        "codes" => Action::Run(Command::ListCodes {
            user_id: pargs.free_from_str()?,
        }),
        "balance" => Action::Run(Command::Balance {
            user_id: pargs.free_from_str()?,
        }),
        "exec" => {
            let json: String = pargs.free_from_str()?;
            Action::Run(serde_json::from_str(&json).context("Invalid JSON command")?)
        }
        other => bail!("Unknown command '{other}', see --help"),
    };

    let remaining: Vec<OsString> = pargs.finish();
    if !remaining.is_empty() {
        bail!("Unexpected arguments: {remaining:?}");
    }

    Ok(Args {
        database_url,
        skip_migrations,
        action,
    })
}
