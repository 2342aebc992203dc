use std::sync::Arc;
use std::time::{Duration, Instant};

use khaneh_core::discovery::DiscoveryService;
use khaneh_core::probe::Probe;
use khaneh_core::vendors::NoVendors;

use crate::support::{HangingProbe, InstantProbe};

const EPSILON: Duration = Duration::from_millis(250);

#[tokio::test]
async fn hanging_probes_cannot_outlive_the_session() {
    let probes: Vec<Arc<dyn Probe>> = vec![
        Arc::new(HangingProbe),
        Arc::new(InstantProbe),
        Arc::new(HangingProbe),
        Arc::new(HangingProbe),
    ];
    let service = DiscoveryService::new(probes, Box::new(NoVendors));
    let budget = Duration::from_millis(300);

    let started = Instant::now();
    let catalog = service.discover_all(false, budget).await;
    let elapsed = started.elapsed();

    assert!(elapsed < budget + EPSILON, "took {elapsed:?}");
    assert_eq!(catalog.len(), 1, "finished probe results are kept");
}

#[tokio::test]
async fn all_probes_hanging_yields_empty_catalog() {
    let service = DiscoveryService::new(
        vec![Arc::new(HangingProbe) as Arc<dyn Probe>],
        Box::new(NoVendors),
    );

    let started = Instant::now();
    let catalog = service.discover_all(true, Duration::from_millis(200)).await;

    assert!(catalog.is_empty());
    assert!(started.elapsed() < Duration::from_millis(200) + EPSILON);
}
