use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bilhetes_core::Zone;
use bilhetes_db::DbConfig;
use bilhetes_report::ExportFormat;
use bilhetes_service::{TicketQuery, TicketService};
use bilhetes_store::StoreConfig;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bilhetes-server", about = "Ticket board HTTP API")]
struct Cli {
    /// SQLite database file (defaults to the data directory)
    #[arg(long, env = "BILHETES_DB")]
    db: Option<String>,

    /// Directory for uploaded images when no S3 bucket is configured
    #[arg(long, env = "BILHETES_DATA_DIR")]
    data_dir: Option<String>,

    #[arg(long, env = "BILHETES_BIND", default_value = "0.0.0.0")]
    bind: String,

    #[arg(long, env = "BILHETES_PORT", default_value_t = 3710)]
    port: u16,

    /// Prefix for image URLs handed to clients
    #[arg(long, env = "BILHETES_PUBLIC_URL")]
    public_url: Option<String>,

    /// Without a subcommand the server runs.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the ticket list to a CSV or XLSX file
    Export {
        /// csv or xlsx
        #[arg(long, default_value = "csv")]
        format: String,
        /// Only tickets created in this year
        #[arg(long)]
        year: Option<i32>,
        /// Output path (defaults to bilhetes_<year>.<ext>)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Zone the year is taken in: `local`, `UTC` or an offset like `-03:00`
        #[arg(long, default_value = "local", value_parser = Zone::parse_str)]
        tz: Zone,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_config = DbConfig {
        sqlite_path: cli.db,
    };
    let mut store_config = StoreConfig::from_env();
    if cli.data_dir.is_some() {
        store_config.local_data_dir = cli.data_dir;
    }

    match cli.command {
        Some(Commands::Export {
            format,
            year,
            out,
            tz,
        }) => {
            let format = ExportFormat::parse_str(&format)
                .with_context(|| format!("unknown export format {format:?}"))?;
            let state = bilhetes_server::open_state(&db_config, &store_config)?;
            let data = state
                .service
                .export(format, &TicketQuery::year(year).in_zone(tz))
                .await?;
            let out = out.unwrap_or_else(|| PathBuf::from(format.file_name(year)));
            std::fs::write(&out, &data).with_context(|| format!("write {}", out.display()))?;
            eprintln!("wrote {} ({} bytes)", out.display(), data.len());
        }
        None => {
            run_server(&cli.bind, cli.port, cli.public_url, &db_config, store_config).await?
        }
    }

    Ok(())
}

async fn run_server(
    bind: &str,
    port: u16,
    public_url: Option<String>,
    db_config: &DbConfig,
    mut store_config: StoreConfig,
) -> Result<()> {
    let addr = SocketAddr::new(bind.parse()?, port);
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    if store_config.public_base_url.is_none() && !store_config.is_s3() {
        store_config.public_base_url =
            Some(public_url.unwrap_or_else(|| bilhetes_server::public_url_for(addr)));
    }

    let state = bilhetes_server::open_state(db_config, &store_config)?;
    tracing::info!(
        %addr,
        db = %db_config.resolved_path().display(),
        "bilhetes-server listening"
    );
    bilhetes_server::serve(listener, state).await
}
