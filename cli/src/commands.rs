pub mod devices;
pub mod discover;
pub mod run;

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use khaneh_common::config::{Config, DEFAULT_SCAN_CONCURRENCY};
use khaneh_common::network::range::Ipv4Range;

#[derive(Parser)]
#[command(name = "khaneh")]
#[command(about = "Find and control the smart-home devices on your LAN.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Subnet to port-scan in CIDR notation (default: the active LAN)
    #[arg(short, long, global = true)]
    pub range: Option<String>,

    /// Discovery budget in seconds
    #[arg(short, long, global = true, default_value_t = 10)]
    pub timeout: u64,

    /// Simultaneous TCP connects while port scanning
    #[arg(short, long, global = true, default_value_t = DEFAULT_SCAN_CONCURRENCY)]
    pub concurrency: usize,

    /// Extra host to fingerprint over HTTP (repeatable)
    #[arg(long = "host", global = true)]
    pub hosts: Vec<IpAddr>,

    /// Skip the mDNS probe
    #[arg(long, global = true)]
    pub no_mdns: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover devices on the network
    #[command(alias = "d")]
    Discover {
        /// Ignore devices found earlier and scan again
        #[arg(short, long)]
        force: bool,
    },
    /// List discovered devices the way a controller sees them
    #[command(alias = "ls")]
    Devices,
    /// Execute a spoken-style command, e.g. "چراغ نشیمن را روشن کن"
    #[command(alias = "r")]
    Run { phrase: String },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> anyhow::Result<Config> {
        let network_range: Option<Ipv4Range> = self
            .range
            .as_deref()
            .map(str::parse)
            .transpose()
            .context("invalid --range")?;

        Ok(Config {
            network_range,
            discovery_timeout: Duration::from_secs(self.timeout.max(1)),
            scan_concurrency: self.concurrency.max(1),
            known_hosts: self.hosts.clone(),
            enable_mdns: !self.no_mdns,
            ..Config::default()
        })
    }
}
