use clap::{Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

use gym_gateway::config::{self, DashboardConfig};
use gym_gateway::dashboard::types::MemberId;
use gym_gateway::dashboard::{
    login, render, resolve_api_base, AdminView, ApiClient, BillingView, DashboardView, ViewScope,
};
use gym_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "gym-cli")]
#[command(about = "Terminal views of the gym member dashboard", long_about = None)]
struct Cli {
    /// URL the dashboard is served from; its host picks the API base.
    #[arg(short, long, default_value = "http://localhost:3000")]
    site: Url,

    /// Use this API base instead of resolving one from the site.
    #[arg(short, long)]
    api_base: Option<Url>,

    /// Gateway configuration file to read the `[dashboard]` table from.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look a member up by email
    Login {
        #[arg(short, long, default_value = "")]
        email: String,
    },
    /// Member dashboard: profile, recommendations, weekly schedule
    Dashboard {
        #[arg(short, long)]
        member: MemberId,
    },
    /// Billing history and plan options
    Billing {
        #[arg(short, long)]
        member: MemberId,
    },
    /// Admin analytics
    Admin,
    /// Print the API base the dashboard would use
    Resolve,
}

fn dashboard_config(path: Option<&PathBuf>) -> Result<DashboardConfig, config::ConfigError> {
    Ok(match path {
        Some(path) => config::load_config(path)?.dashboard,
        None => DashboardConfig::default(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_stderr(&cli.log_level)?;

    let dashboard = dashboard_config(cli.config.as_ref())?;
    let api_base = match &cli.api_base {
        Some(base) => base.clone(),
        None => {
            let host = cli.site.host_str().unwrap_or_default();
            resolve_api_base(host, &dashboard).endpoint(&cli.site)?
        }
    };

    let client = ApiClient::new(&api_base)?.with_dedup();
    let scope = ViewScope::new();

    let report = match cli.command {
        Commands::Login { email } => match login(&client, &email).await {
            Ok(member_id) => format!("Logged in as member {}\n", member_id),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        Commands::Dashboard { member } => match DashboardView::load(&client, member, &scope).await {
            Some(view) => render::dashboard(&view)?,
            None => String::new(),
        },
        Commands::Billing { member } => match BillingView::load(&client, member, &scope).await {
            Some(view) => render::billing(&view)?,
            None => String::new(),
        },
        Commands::Admin => match AdminView::load(&client, &scope).await {
            Some(view) => render::admin(&view)?,
            None => String::new(),
        },
        Commands::Resolve => format!("{}\n", api_base),
    };

    print!("{}", report);
    Ok(())
}
