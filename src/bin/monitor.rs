use archiver_status::{
    MonitorSupervisor,
    config::{Config, MonitorConfig, read_config_file},
    export::{PvNaming, log_changes, pv_database},
    util::get_config_path,
};
use clap::Parser;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Monitor the status of Archiver Appliance nodes")]
struct Args {
    /// Config file (falls back to ARCHIVER_STATUS_CONFIG, then to built-in defaults)
    #[arg(short)]
    file: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("archiver_status", level),
        ("archiver_monitor", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = load_config(&args)?.resolve()?;
    announce(&config);

    let naming = PvNaming::from_config(&config);
    let mut supervisor = MonitorSupervisor::start_http(&config)?;

    for pv in pv_database(supervisor.store(), &naming) {
        info!("serving PV {}", pv.name);
    }

    let reporter = tokio::spawn(log_changes(supervisor.store().clone(), naming));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("cannot listen for interrupt: {e}");
            }
            info!("interrupted, stopping pollers");
        }

        _ = supervisor.wait() => {
            error!("all pollers have stopped");
        }
    }

    reporter.abort();
    supervisor.shutdown().await;

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    match args.file.clone().or_else(get_config_path) {
        Some(path) => read_config_file(&path),
        None => {
            warn!("no configuration file provided, the default configuration is used");
            Ok(Config::default())
        }
    }
}

fn announce(config: &MonitorConfig) {
    if config.is_cluster() {
        info!(
            "monitoring {} nodes of an Archiver Appliance cluster",
            config.targets.len()
        );
    } else {
        info!("monitoring a single Archiver Appliance node");
    }

    for target in &config.targets {
        info!("appliance {} at {}", target.identity(), target.base_url());
    }

    info!(
        "request timeout {:?}, poll interval {:?}, PV prefix {:?}",
        config.request_timeout, config.poll_interval, config.prefix
    );
}
