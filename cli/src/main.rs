mod commands;
mod util;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crmdesk_client::config::{API_URL_ENV, PROJECT_ID_ENV, PUBLIC_KEY_ENV, TIMEOUT_ENV};
use crmdesk_client::{ClientConfig, ConfigOverrides, HttpTableClient, Services};

use commands::activity::ActivityCommands;
use commands::alerts::AlertCommands;
use commands::config::ConfigCommands;
use commands::crud::CrudCommands;
use commands::quote::QuoteCommands;
use util::{EXIT_USAGE, StderrNotifier, print_error};

const DEFAULT_LOG_FILTER: &str = "crmdesk_client=warn,crmdesk_cli=warn";

#[derive(Parser, Debug)]
#[command(
    name = "crmdesk",
    version,
    about = "CRM records and alerts over the hosted table API"
)]
struct Cli {
    /// Table API base URL
    #[arg(long, env = API_URL_ENV, global = true)]
    api_url: Option<String>,

    /// Project the tables belong to
    #[arg(long, env = PROJECT_ID_ENV, global = true)]
    project_id: Option<String>,

    /// Public API key
    #[arg(long, env = PUBLIC_KEY_ENV, global = true, hide_env_values = true)]
    public_key: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, env = TIMEOUT_ENV, global = true)]
    timeout_secs: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Contact operations
    Contact {
        #[command(subcommand)]
        command: CrudCommands,
    },
    /// Deal operations
    Deal {
        #[command(subcommand)]
        command: CrudCommands,
    },
    /// Task operations
    Task {
        #[command(subcommand)]
        command: CrudCommands,
    },
    /// Activity operations
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Quote operations
    Quote {
        #[command(subcommand)]
        command: QuoteCommands,
    },
    /// Task and follow-up alerts
    Alerts {
        #[command(subcommand)]
        command: AlertCommands,
    },
    /// Local connection settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_url: self.api_url.clone(),
            project_id: self.project_id.clone(),
            public_key: self.public_key.clone(),
            timeout_secs: self.timeout_secs.clone(),
        }
    }
}

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Resolve settings and build the services, or report why that failed.
fn connect(overrides: ConfigOverrides) -> Result<Services, i32> {
    let client = ClientConfig::load(overrides)
        .and_then(|config| {
            tracing::debug!(api_url = config.base_url(), project_id = %config.project_id, "connecting");
            HttpTableClient::new(config)
        })
        .map_err(|e| {
            print_error(&e.to_body());
            EXIT_USAGE
        })?;
    Ok(Services::new(Arc::new(client), Arc::new(StderrNotifier)))
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let overrides = cli.overrides();
    let code = match cli.command {
        Commands::Config { command } => commands::config::run(overrides, command),
        command => match connect(overrides) {
            Ok(services) => dispatch(&services, command).await,
            Err(code) => code,
        },
    };

    std::process::exit(code);
}

async fn dispatch(services: &Services, command: Commands) -> i32 {
    match command {
        Commands::Contact { command } => commands::crud::run(&services.contacts, command).await,
        Commands::Deal { command } => commands::crud::run(&services.deals, command).await,
        Commands::Task { command } => commands::crud::run(&services.tasks, command).await,
        Commands::Activity { command } => {
            commands::activity::run(&services.activities, command).await
        }
        Commands::Quote { command } => commands::quote::run(&services.quotes, command).await,
        Commands::Alerts { command } => commands::alerts::run(services, command).await,
        Commands::Config { command } => commands::config::run(ConfigOverrides::default(), command),
    }
}
