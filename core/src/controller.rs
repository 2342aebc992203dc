//! # Home Controller
//!
//! The entry point UIs and voice front-ends talk to: discovery, the flat
//! device list and phrase execution over one shared catalog.

use std::sync::Arc;
use std::time::Duration;

use khaneh_common::config::Config;
use khaneh_common::device::{DeviceRecord, DiscoveredDevice};
use tokio::sync::RwLock;

use crate::catalog::DeviceCatalog;
use crate::command::{self, CommandExecutor, CommandOutcome};
use crate::control::NetworkAdapters;
use crate::discovery::DiscoveryService;
use crate::error::CommandError;

pub struct HomeController {
    discovery: DiscoveryService,
    catalog: Arc<RwLock<DeviceCatalog>>,
    executor: CommandExecutor,
    discovery_timeout: Duration,
}

impl HomeController {
    pub fn new(config: &Config) -> Self {
        let executor = CommandExecutor::new(
            Arc::new(NetworkAdapters::new(config.http_timeout)),
            config.brightness_step,
        );
        Self::with_parts(DiscoveryService::from_config(config), executor, config.discovery_timeout)
    }

    pub fn with_parts(discovery: DiscoveryService, executor: CommandExecutor, discovery_timeout: Duration) -> Self {
        Self {
            catalog: discovery.catalog(),
            discovery,
            executor,
            discovery_timeout,
        }
    }

    pub fn discovery_timeout(&self) -> Duration {
        self.discovery_timeout
    }

    pub async fn discover_all(&self, force_rescan: bool, global_timeout: Duration) -> DeviceCatalog {
        self.discovery.discover_all(force_rescan, global_timeout).await
    }

    pub async fn get_devices_for_controller(&self) -> Vec<DeviceRecord> {
        self.catalog.read().await.iter().map(DiscoveredDevice::to_record).collect()
    }

    /// Parses and executes one phrase. Never fails; errors are in the reply.
    ///
    /// The catalog lock is held only while resolving the device, not during
    /// the network call to it.
    pub async fn execute_command(&self, phrase: &str) -> CommandOutcome {
        let intent = command::parse(phrase);
        let resolved: Result<DiscoveredDevice, CommandError> = {
            let catalog = self.catalog.read().await;
            command::resolve(&catalog, &intent).cloned()
        };

        let result = match resolved {
            Ok(device) => self.executor.dispatch(&device, intent.action).await,
            Err(e) => Err(e),
        };
        result.into()
    }
}
