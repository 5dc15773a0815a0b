//! hived - hive gateway daemon
//!
//! Orchestrates a pool of netcore drivers and the device/gadget registries
//! above them.
//!
//! Usage:
//!   hived [config.toml]
//!
//! If no config file is provided, runs two simulated netcores for demo
//! purposes.

use std::sync::Arc;

use anyhow::Context;
use example_netcore::MockNetcore;
use hive_core::{Device, LogAgent, MemStore, Netcore};
use hive_gateway::{events, Hive};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parsed command-line arguments
struct Args {
    /// Daemon config file (TOML)
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let mut result = Args { config_path: None };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            a if !a.starts_with('-') => {
                // Positional argument = config file
                result.config_path = Some(a.to_string());
            }
            _ => {
                tracing::warn!("Unknown argument: {}", arg);
            }
        }
    }

    result
}

fn print_help() {
    eprintln!(
        r#"hived - hive gateway daemon

Usage: hived [config.toml]

Options:
  -h, --help    Print this help message

Examples:
  # Run with two simulated netcores
  hived

  # Run with a config file
  hived config.toml
"#
    );
}

mod config {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct DaemonConfig {
        #[serde(default)]
        pub gateway: GatewayConfig,
        #[serde(default, rename = "netcore")]
        pub netcores: Vec<NetcoreConfig>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GatewayConfig {
        #[serde(default = "default_gateway_name")]
        pub name: String,
        /// Seconds to keep networks open for joining right after start;
        /// 0 leaves them closed.
        #[serde(default)]
        pub permit_join: u32,
    }

    impl Default for GatewayConfig {
        fn default() -> Self {
            Self {
                name: default_gateway_name(),
                permit_join: 0,
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct NetcoreConfig {
        pub name: String,
        /// Simulated device addresses on this netcore
        #[serde(default)]
        pub devices: Vec<String>,
    }

    fn default_gateway_name() -> String {
        "hive".to_string()
    }
}

fn demo_config() -> config::DaemonConfig {
    config::DaemonConfig {
        gateway: config::GatewayConfig::default(),
        netcores: vec![
            config::NetcoreConfig {
                name: "mock0".to_string(),
                devices: vec!["00:00:00:00:01".to_string(), "00:00:00:00:02".to_string()],
            },
            config::NetcoreConfig {
                name: "mock1".to_string(),
                devices: vec!["00:00:00:01:01".to_string()],
            },
        ],
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hived=info,hive_gateway=info,hive_registry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting hived (hive gateway daemon)");

    let args = parse_args();
    let cfg = if let Some(ref path) = args.config_path {
        tracing::info!("Loading config from: {}", path);
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config file {path}"))?
    } else {
        tracing::info!("No config file provided, running simulated netcores");
        demo_config()
    };

    let netcores: Vec<Arc<MockNetcore>> = cfg
        .netcores
        .iter()
        .map(|nc| {
            let mock = MockNetcore::new(&nc.name);
            for addr in &nc.devices {
                mock.add_device(addr.clone());
            }
            Arc::new(mock)
        })
        .collect();

    let hive = Arc::new(
        Hive::new(
            netcores
                .iter()
                .map(|nc| nc.clone() as Arc<dyn Netcore>)
                .collect(),
            Arc::new(MemStore::new()),
            Arc::new(MemStore::new()),
            Arc::new(LogAgent),
        )?,
    );

    // Surface registry traffic in the daemon log.
    let mut incoming = hive.subscribe(events::DEV_INCOMING);
    tokio::spawn(async move {
        while let Ok(payload) = incoming.recv().await {
            tracing::info!(device = %payload, "device registered");
        }
    });

    hive.start().await?;
    tracing::info!(gateway = %cfg.gateway.name, "all netcores started");

    // Bring the simulated devices into the registry, as if they had joined.
    for nc in &cfg.netcores {
        for addr in &nc.devices {
            if hive.device_by_net(&nc.name, addr).await.is_none() {
                hive.register_device(Device::new(&nc.name, addr)).await?;
            }
        }
    }

    if cfg.gateway.permit_join > 0 {
        hive.permit_join(cfg.gateway.permit_join).await?;
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    hive.stop().await?;

    Ok(())
}
