use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use sonoscan_core::SonarConfig;
use sonoscan_server::{SonarDevice, SonarLink, SonarNode};

/// Driver and scan server for mechanically scanning sonars
#[derive(Parser, Debug)]
#[command(name = "sonoscan-server", version, about)]
struct Cli {
    /// Address of the sonar's serial bridge (host:port). Without it the
    /// emulated sonar is used.
    #[arg(long)]
    connect: Option<String>,

    /// Fall back to the emulated sonar when hardware initialization fails
    #[arg(long)]
    fallback: bool,

    /// JSON configuration file; missing fields use their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SonarConfig> {
    let Some(path) = path else {
        return Ok(SonarConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let config: SonarConfig =
        serde_json::from_str(&text).with_context(|| "cannot parse config file")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let config = load_config(cli.config.as_ref())?;
    config.validate().context("invalid configuration")?;

    let link = match &cli.connect {
        Some(addr) => {
            let stream = TcpStream::connect(addr)
                .await
                .with_context(|| format!("cannot reach sonar bridge at {addr}"))?;
            Some(SonarLink::new(stream))
        }
        None => None,
    };

    let device = SonarDevice::connect(link, cli.fallback)
        .await
        .context("sonar startup failed")?;
    if device.is_emulated() {
        info!("running against the emulated sonar");
    }

    let image_rate = Duration::from_millis(config.image_rate_ms);
    let node = Arc::new(Mutex::new(
        SonarNode::new(device, config).context("initial configuration rejected")?,
    ));

    // scan worker: one advance/ping/outputs cycle at a time
    let scan_node = Arc::clone(&node);
    let scan_worker = tokio::spawn(async move {
        loop {
            if let Err(e) = scan_node.lock().await.run_cycle().await {
                warn!("scan cycle failed: {e}");
                break;
            }
        }
    });

    // independent cadence for the accumulated image, read-only
    let image_node = Arc::clone(&node);
    let image_worker = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(image_rate);
        loop {
            ticker.tick().await;
            image_node.lock().await.publish_image();
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    scan_worker.abort();
    image_worker.abort();
    Ok(())
}
