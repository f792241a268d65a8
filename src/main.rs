use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::{Interval, MissedTickBehavior};

use anyrouter_checkin::{
    CheckinConfig, ConfigError, ProxyState, ReqwestTransport, VERSION, run_checkin, serve_proxy,
};

#[derive(Parser)]
#[clap(name = "anyrouter-checkin", version = VERSION, about = "AnyRouter daily check-in")]
struct Cli {
    /// Upstream base URL; overrides UPSTREAM.
    #[clap(long, global = true)]
    upstream: Option<String>,

    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Check in every account once and exit non-zero if any failed.
    Run,
    /// Check in immediately and then every `--every` seconds.
    Schedule {
        #[clap(long, default_value = "86400")]
        every: u64,
    },
    /// Serve the cookie-injecting reverse proxy.
    Serve {
        #[clap(long, default_value = "0.0.0.0:8787")]
        addr: SocketAddr,
    },
}

fn load_config(upstream: Option<&str>) -> Result<CheckinConfig, ConfigError> {
    let mut config = CheckinConfig::from_env()?;
    if let Some(raw) = upstream {
        config.upstream = anyrouter_checkin::normalize_base_url(raw)?;
    }
    Ok(config)
}

async fn run_once(config: &CheckinConfig) -> u8 {
    match run_checkin(config).await {
        Ok(report) => report.exit_code(),
        Err(err) => {
            log::error!("[anyrouter] {err}");
            err.exit_code()
        }
    }
}

/// A pass that overruns `every` pushes the next one back instead of
/// triggering catch-up runs.
fn schedule_ticker(every: u64) -> Interval {
    let mut ticker = tokio::time::interval(Duration::from_secs(every.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.upstream.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            log::error!("[anyrouter] configuration error: {err}");
            return ExitCode::from(1);
        }
    };

    match cli.subcommand {
        SubCommand::Run => ExitCode::from(run_once(&config).await),
        SubCommand::Schedule { every } => {
            let mut ticker = schedule_ticker(every);
            loop {
                ticker.tick().await;
                let code = run_once(&config).await;
                log::info!("[anyrouter] scheduled run finished exit_code={code}");
            }
        }
        SubCommand::Serve { addr } => {
            let transport = match ReqwestTransport::new(config.request_timeout) {
                Ok(transport) => transport,
                Err(err) => {
                    log::error!("[anyrouter] {err}");
                    return ExitCode::from(1);
                }
            };
            let state = ProxyState::new(Arc::new(transport), config.upstream.clone())
                .with_user_agent(config.user_agent.clone());
            match serve_proxy(addr, state).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    log::error!("[anyrouter] proxy stopped: {err}");
                    ExitCode::from(1)
                }
            }
        }
    }
}
