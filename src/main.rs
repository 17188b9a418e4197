use clap::Parser;
use index_helper::analysis;
use index_helper::config::{Adapter, DbConfig};
use index_helper::loader::{self, MetadataLoader};
use index_helper::models::Schema;
use index_helper::reporter::{ReportFormat, Reporter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Index Helper - Finds redundant, missing and badly ordered indexes from catalog metadata
#[derive(Parser, Debug)]
#[command(name = "index-helper")]
#[command(version = "0.1.0")]
#[command(about = "MySQL index design analyzer")]
struct Cli {
    /// Catalog adapter
    #[arg(
        long = "adapter",
        value_enum,
        env = "INDEX_HELPER_ADAPTER",
        required_unless_present_any = ["config_path", "snapshot"]
    )]
    adapter: Option<Adapter>,

    /// Username
    #[arg(short = 'u', long = "user", env = "MYSQL_USER", default_value = "root")]
    user: String,

    /// Password
    #[arg(
        short = 'p',
        long = "password",
        env = "MYSQL_PASSWORD",
        default_value = "",
        hide_env_values = true
    )]
    password: String,

    /// Database host, optionally with port
    #[arg(
        short = 'H',
        long = "host",
        env = "MYSQL_HOST",
        default_value = "localhost:3306"
    )]
    host: String,

    /// Also analyze mysql, sys, performance_schema and information_schema
    #[arg(long = "include-system-schemas", default_value_t = false)]
    include_system_schemas: bool,

    /// Analyze every target listed in a YAML config file
    #[arg(short = 'c', long = "config", conflicts_with = "snapshot")]
    config_path: Option<PathBuf>,

    /// Analyze a saved YAML or JSON schema snapshot instead of a live server
    #[arg(short = 's', long = "snapshot")]
    snapshot: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "text")]
    format: ReportFormat,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let reporter = Reporter::new(cli.format);

    if let Some(path) = &cli.snapshot {
        let schema = loader::load_snapshot(path)?;
        return report(&schema, &reporter);
    }

    let configs = match &cli.config_path {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            DbConfig::from_config_file(path)?
        }
        None => {
            let Some(adapter) = cli.adapter else {
                anyhow::bail!("--adapter is required");
            };
            vec![DbConfig::from_connection_params(
                adapter,
                cli.user,
                cli.password,
                cli.host,
                cli.include_system_schemas,
            )]
        }
    };

    for config in configs {
        info!("Analyzing {}", config.target());
        let loader = MetadataLoader::connect(config).await?;
        let schema = loader.load().await;
        loader.close().await;
        report(&schema?, &reporter)?;
    }

    Ok(())
}

fn report(schema: &Schema, reporter: &Reporter) -> anyhow::Result<()> {
    let results = analysis::analyze(schema)?;
    reporter.report(&results)?;
    Ok(())
}
