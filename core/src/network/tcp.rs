use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::timeout;
use tracing::trace;

/// Bounds the number of simultaneous TCP connections a scan opens.
///
/// Connect attempts and the identification exchange that follows an open
/// port each hold a [`Slot`], so at most `limit` connections to scanned
/// hosts are in flight at any time.
#[derive(Debug)]
pub struct ConnectGate {
    permits: Semaphore,
    limit: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ConnectGate {
    pub fn new(limit: usize) -> Self {
        let limit: usize = limit.max(1);
        Self {
            permits: Semaphore::new(limit),
            limit,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Highest number of slots that were ever held together.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Waits for a free slot. `None` only if the gate was closed.
    pub async fn slot(&self) -> Option<Slot<'_>> {
        let permit: SemaphorePermit<'_> = self.permits.acquire().await.ok()?;
        Some(Slot {
            _in_flight: InFlight::enter(&self.in_flight, &self.peak),
            _permit: permit,
        })
    }

    /// Returns `true` when a TCP handshake with `addr` completes within
    /// `connect_timeout`.
    ///
    /// Refused and timed-out connects are both reported as closed.
    pub async fn is_open(&self, addr: SocketAddr, connect_timeout: Duration) -> bool {
        let Some(_slot) = self.slot().await else {
            return false;
        };

        let outcome = timeout(connect_timeout, TcpStream::connect(addr)).await;

        match outcome {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                trace!(%addr, "connect failed: {e}");
                false
            }
            Err(_elapsed) => {
                trace!(%addr, "connect timed out");
                false
            }
        }
    }
}

/// One held connection slot. Released on drop, including when the holder
/// is cancelled mid-flight.
pub struct Slot<'a> {
    _in_flight: InFlight<'a>,
    _permit: SemaphorePermit<'a>,
}

/// Counts one slot holder for as long as it lives.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let current: usize = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(current, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
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
