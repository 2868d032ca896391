use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use mqttbroker::{constants, server, Broker, Config, MemoryRepository, Repository};

#[derive(Parser, Debug)]
#[command(name = "mqttbroker", version, about = "MQTT 5.0 broker")]
struct Cli {
    /// Path to a TOML config file. Falls back to `constants::DEFAULT_CONFIG`
    /// when that path exists, else to `Config::default()`.
    #[arg(short, long)]
    config: Option<String>,

    /// Overrides the bind address from the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_log(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", format!("mqttbroker={level}"));
    }
    env_logger::init();
}

fn load_config(cli: &Cli) -> Config {
    let path = cli
        .config
        .clone()
        .or_else(|| Path::new(constants::DEFAULT_CONFIG).exists().then(|| constants::DEFAULT_CONFIG.to_string()));

    match path {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load config {path}: {e}");
                Config::default()
            }
        },
        None => Config::default(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_log(cli.verbose);

    let mut config = load_config(&cli);
    if let Some(bind) = cli.bind {
        config.connections.bind = bind;
    }

    let repository: Arc<dyn Repository> = Arc::new(MemoryRepository::with_max_client_id_length(
        config.connections.max_connections,
        config.connections.min_connection_interval_secs,
        config.connections.max_client_id_length,
    ));

    let (broker, workers) = Broker::with_dispatcher_config(
        repository,
        config.dispatcher.worker_count,
        config.dispatcher.ack_timeout_secs,
    );
    let shutdown_handle = broker.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down");
            shutdown_handle.request_shutdown();
        }
    });

    match server::serve(broker, &config.connections.bind, workers).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("mqttbroker exited: {e}");
            ExitCode::FAILURE
        }
    }
}
