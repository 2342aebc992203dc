//! # Discovery Service
//!
//! Runs every probe concurrently under one global deadline and folds their
//! results into the shared [`DeviceCatalog`].
//!
//! A session never fails as a whole: probe errors and panics are logged and
//! the probe's contribution is simply missing. When the deadline passes,
//! unfinished probes are aborted and whatever was already merged is kept.

use std::sync::Arc;
use std::time::Duration;

use khaneh_common::config::Config;
use khaneh_common::device::DiscoveredDevice;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::catalog::DeviceCatalog;
use crate::error::ProbeError;
use crate::probe::{self, Probe};
use crate::vendors::{MacOuiRepo, VendorRepository};

type ProbeOutcome = (&'static str, Result<Vec<DiscoveredDevice>, ProbeError>);

/// Part of the session held back so probes that use their whole budget
/// still report before the deadline.
const SETTLE_MARGIN: Duration = Duration::from_millis(250);

/// The budget each probe gets out of a session of length `timeout`.
///
/// Ends strictly before the session deadline for any non-zero `timeout`;
/// short sessions give up a fifth instead of the full margin.
pub fn probe_budget(timeout: Duration) -> Duration {
    timeout.saturating_sub(SETTLE_MARGIN.min(timeout / 5))
}

pub struct DiscoveryService {
    probes: Vec<Arc<dyn Probe>>,
    vendor_repo: Box<dyn VendorRepository>,
    catalog: Arc<RwLock<DeviceCatalog>>,
    /// Serializes sessions so a forced rescan cannot clear the catalog
    /// underneath another session.
    session: Mutex<()>,
}

impl DiscoveryService {
    pub fn new(probes: Vec<Arc<dyn Probe>>, vendor_repo: Box<dyn VendorRepository>) -> Self {
        Self {
            probes,
            vendor_repo,
            catalog: Arc::new(RwLock::new(DeviceCatalog::new())),
            session: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(probe::default_probes(config), Box::new(MacOuiRepo))
    }

    /// Shared handle to the live catalog.
    pub fn catalog(&self) -> Arc<RwLock<DeviceCatalog>> {
        self.catalog.clone()
    }

    /// Returns the catalog after running a discovery session.
    ///
    /// Without `force_rescan`, a non-empty catalog from an earlier session is
    /// returned as is. With it, the catalog is emptied first. The call
    /// returns shortly after `timeout` even if some probe never finishes.
    pub async fn discover_all(&self, force_rescan: bool, timeout: Duration) -> DeviceCatalog {
        let _session = self.session.lock().await;

        if force_rescan {
            self.catalog.write().await.clear();
        } else {
            let cached = self.catalog.read().await;
            if !cached.is_empty() {
                debug!(devices = cached.len(), "serving cached catalog");
                return cached.clone();
            }
        }

        self.run_probes(timeout).await;

        let snapshot: DeviceCatalog = self.catalog.read().await.clone();
        info!(devices = snapshot.len(), "discovery finished");
        snapshot
    }

    async fn run_probes(&self, timeout: Duration) {
        let deadline: Instant = Instant::now() + timeout;
        let budget: Duration = probe_budget(timeout);
        let mut tasks: JoinSet<ProbeOutcome> = JoinSet::new();

        for probe in &self.probes {
            let probe: Arc<dyn Probe> = probe.clone();
            tasks.spawn(async move { (probe.name(), probe.probe(budget).await) });
        }

        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((name, Ok(devices))))) => {
                    debug!(probe = name, found = devices.len(), "probe finished");
                    self.absorb(devices).await;
                }
                Ok(Some(Ok((name, Err(e))))) => warn!(probe = name, "probe failed: {e}"),
                Ok(Some(Err(e))) => warn!("probe task did not complete: {e}"),
                Ok(None) => break,
                Err(_elapsed) => {
                    warn!(unfinished = tasks.len(), "discovery deadline reached, aborting probes");
                    tasks.abort_all();
                    break;
                }
            }
        }
    }

    async fn absorb(&self, mut devices: Vec<DiscoveredDevice>) {
        self.enrich_vendors(&mut devices);

        let mut catalog = self.catalog.write().await;
        for device in devices {
            catalog.upsert(device);
        }
    }

    fn enrich_vendors(&self, devices: &mut [DiscoveredDevice]) {
        for device in devices.iter_mut().filter(|d| d.manufacturer.is_none()) {
            if let Some(mac) = device.mac {
                device.manufacturer = self.vendor_repo.get_vendor(mac);
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
