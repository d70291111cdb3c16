//! RCard CLI - cards, wallet and loans from the command line
//!
//! Usage:
//! ```bash
//! rcard init
//! rcard user register alice secret123
//! rcard card apply gold-credit 4111-0001 --type credit -u alice -p secret123
//! rcard loan preview gold-credit 500 10 -u alice -p secret123
//! rcard loan create gold-credit 500 10 -u alice -p secret123
//! rcard loan repay loan_ab12 516.67 -u alice -p secret123
//! rcard history -u alice -p secret123
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rcard_business::{BusinessError, ErrorKind};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;

use commands::{card, fraud, history, loan, sponsor, user, wallet};

/// RCard - virtual cards and short-term loans
#[derive(Parser)]
#[command(name = "rcard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, env = "RCARD_DB", default_value = "data/rcard.db", global = true)]
    pub db: PathBuf,

    /// Audit events directory
    #[arg(long, default_value = "data/events", global = true)]
    pub events_dir: PathBuf,

    /// Platform configuration (JSON)
    #[arg(long, env = "RCARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "rcard_business=trace" (defaults to RUST_LOG, then info)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Credentials for commands acting as a user
#[derive(Args, Clone)]
pub struct AuthArgs {
    /// Username
    #[arg(long, short = 'u')]
    pub user: String,
    /// Password
    #[arg(long, short = 'p', env = "RCARD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or migrate the database
    Init {
        /// Remove the existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// List card policies
    Catalog,

    /// User accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Card grants
    Card {
        #[command(subcommand)]
        action: CardAction,
    },

    /// Sponsor card programs
    Sponsor {
        #[command(subcommand)]
        action: SponsorAction,
    },

    /// Central wallet
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Loans
    Loan {
        #[command(subcommand)]
        action: LoanAction,
    },

    /// Fraud reports
    Fraud {
        #[command(subcommand)]
        action: FraudAction,
    },

    /// Show your audit trail
    History {
        /// Number of most recent events
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a new user
    Register { username: String, password: String },
    /// Check credentials
    Login {
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Show your profile, cards and balances
    Show {
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand)]
pub enum CardAction {
    /// Apply for a card
    Apply {
        /// Policy or sponsor card id (e.g., gold-credit)
        card_id: String,
        /// Card identifier
        identifier: String,
        /// Card type
        #[arg(long, short = 't', default_value = "credit")]
        r#type: CardTypeArg,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// List your cards
    List {
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand)]
pub enum SponsorAction {
    /// Publish a sponsor card
    Create {
        /// Organization id
        #[arg(long)]
        org: String,
        /// Card name
        #[arg(long)]
        name: String,
        /// Base catalog policy
        #[arg(long)]
        policy: Option<String>,
        /// Public identifier (generated when omitted)
        #[arg(long)]
        public_id: Option<String>,
        #[arg(long)]
        annual_fee: Option<Decimal>,
        /// Monthly interest rate in percent
        #[arg(long)]
        rate: Option<Decimal>,
        /// Yearly borrowing cap
        #[arg(long)]
        cap: Option<Decimal>,
        #[arg(long)]
        min_days: Option<u32>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Show a sponsor card and its effective policy
    Show { public_id: String },
    /// List an organization's cards
    List { org: String },
    /// Delete a sponsor card
    Delete {
        #[arg(long)]
        org: String,
        card_id: String,
    },
}

#[derive(Subcommand)]
pub enum WalletAction {
    /// Show central wallet balance
    Balance {
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Add funds to the central wallet
    Deposit {
        amount: Decimal,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand)]
pub enum LoanAction {
    /// Preview interest and yearly limit for a loan
    Preview {
        card_id: String,
        principal: Decimal,
        days: u32,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Take out a loan
    Create {
        card_id: String,
        principal: Decimal,
        days: u32,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// List loans, newest first
    List {
        #[arg(long)]
        status: Option<LoanStatusArg>,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Show a loan with current interest
    Show {
        loan_id: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Active loans with cards and policies
    Overview {
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Persist accrued interest
    Refresh {
        /// Loan id; every active loan when omitted
        loan_id: Option<String>,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Repay from the central wallet
    Repay {
        loan_id: String,
        amount: Decimal,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand)]
pub enum FraudAction {
    /// Submit a fraud report
    Report {
        description: String,
        #[arg(long, short = 't')]
        r#type: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CardTypeArg {
    Credit,
    Debit,
    Merchant,
    Custom,
}

impl CardTypeArg {
    pub fn to_core_type(&self) -> rcard_core::CardType {
        match self {
            CardTypeArg::Credit => rcard_core::CardType::Credit,
            CardTypeArg::Debit => rcard_core::CardType::Debit,
            CardTypeArg::Merchant => rcard_core::CardType::Merchant,
            CardTypeArg::Custom => rcard_core::CardType::Custom,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LoanStatusArg {
    Active,
    Paid,
}

impl LoanStatusArg {
    pub fn to_core_status(&self) -> rcard_core::LoanStatus {
        match self {
            LoanStatusArg::Active => rcard_core::LoanStatus::Active,
            LoanStatusArg::Paid => rcard_core::LoanStatus::Paid,
        }
    }
}

/// Process exit code for a failed command
fn exit_code(err: &anyhow::Error) -> u8 {
    let Some(business) = err.downcast_ref::<BusinessError>() else {
        return 1;
    };
    match business.kind() {
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::PolicyViolation => 4,
        ErrorKind::InsufficientFunds => 5,
        ErrorKind::Conflict => 6,
        ErrorKind::Unauthenticated => 7,
        ErrorKind::RateLimited => 8,
        ErrorKind::Storage => 10,
    }
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            app::init(&cli.db, &cli.events_dir, force).await?;
            println!("Database initialized at {}", cli.db.display());
        }

        Commands::Status => {
            app::show_status(&cli.db, &cli.events_dir).await?;
        }

        Commands::Catalog => {
            let config = app::load_config(cli.config.as_deref())?;
            app::show_catalog(&config.catalog);
        }

        Commands::User { ref action } => {
            let api = app::open(&cli).await?;
            user::handle(&api, action).await?;
        }

        Commands::Card { ref action } => {
            let api = app::open(&cli).await?;
            card::handle(&api, action).await?;
        }

        Commands::Sponsor { ref action } => {
            let api = app::open(&cli).await?;
            sponsor::handle(&api, action).await?;
        }

        Commands::Wallet { ref action } => {
            let api = app::open(&cli).await?;
            wallet::handle(&api, action).await?;
        }

        Commands::Loan { ref action } => {
            let api = app::open(&cli).await?;
            loan::handle(&api, action).await?;
        }

        Commands::Fraud { ref action } => {
            let api = app::open(&cli).await?;
            fraud::handle(&api, action).await?;
        }

        Commands::History { limit, ref auth } => {
            let api = app::open(&cli).await?;
            history::show(&api, auth, limit).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}
