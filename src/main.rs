mod api;
mod config;
mod db;
mod error;
mod metrics;
mod notify;
mod shipper;
mod stats;
mod types;
mod workflow;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::types::TriggerResponse;
use crate::workflow::{run_once, RunDates};

#[derive(Parser)]
#[command(name = "pitchday", version, about = "Daily MLB game and probable-pitcher loader")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run both phases once and print the trigger result (default).
    Run {
        /// Day whose games get their winner recorded (defaults to the day before --today)
        #[arg(long)]
        yesterday: Option<NaiveDate>,
        /// Day whose games get inserted (defaults to local today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Serve POST /run and GET /health for an external scheduler.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&cfg.log_level));
    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let command = cli.command.unwrap_or(Command::Run {
        yesterday: None,
        today: None,
    });

    let outcome = match command {
        Command::Run { yesterday, today } => run(cfg, RunDates::resolve(today, yesterday)).await,
        Command::Serve => serve(cfg).await.map(|()| true),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {e}");
            std::process::exit(1);
        }
    }
}

/// One run from the command line. Returns whether the run reported success.
async fn run(cfg: Config, dates: RunDates) -> Result<bool> {
    let report = run_once(&cfg, dates).await?;
    let response = TriggerResponse::from_report(&report);
    info!(
        state = %report.state,
        updated = report.updated.len(),
        prepared = report.prepared.len(),
        failures = report.failures.len(),
        "Run finished with status {}",
        response.status_code
    );
    println!("{}", serde_json::to_string(&response)?);
    Ok(response.status_code == 200)
}

async fn serve(cfg: Config) -> Result<()> {
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let app = router(ApiState::new(cfg));
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
