//! Live packet capture and the background extraction loop.
//!
//! The engine is backend-agnostic:
//! - [`CaptureBackend`] opens a live handle on an interface
//! - [`PacketReader`] installs the filter and yields rendered packet text
//! - `pcap_backend` is the production implementation over libpcap / Npcap

pub mod pcap_backend;
pub mod render;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config;
use crate::core::{extract, Credential};
use crate::error::CaptureError;

pub use pcap_backend::PcapBackend;

/// Why a packet read produced no packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The read timeout elapsed with no traffic.
    Timeout,
    /// A read failed; the next read may succeed.
    Transient(String),
    /// The handle can deliver no more packets.
    Closed,
}

/// An open live capture handle. Owned by the capture worker once `start` returns;
/// dropping it releases the handle.
pub trait PacketReader: Send + 'static {
    fn apply_filter(&mut self, expr: &str) -> Result<(), String>;

    /// Block for the next packet and return its textual rendering.
    fn next_packet(&mut self) -> Result<String, ReadError>;
}

pub trait CaptureBackend {
    type Reader: PacketReader;

    /// Open `interface` in promiscuous mode.
    fn open(&self, interface: &str) -> Result<Self::Reader, String>;
}

/// Receives every credential the capture loop finds, in packet arrival order.
pub type Reporter = Box<dyn FnMut(Credential) + Send + 'static>;

/// Default reporter: one informational log line per discovery.
pub fn log_reporter() -> Reporter {
    Box::new(|credential| tracing::info!("{credential}"))
}

/// One live capture session with a single background worker thread.
/// Implements Drop to signal the worker on panic/exit.
pub struct CaptureEngine {
    interface: String,
    filter: String,
    shutdown: Arc<AtomicBool>,
    capture_thread: Option<JoinHandle<()>>,
}

impl CaptureEngine {
    /// Open `interface`, install `filter`, and spawn the extraction loop.
    ///
    /// Returns once the worker is running. On failure nothing is left open and no
    /// worker exists.
    pub fn start<B: CaptureBackend>(
        backend: &B,
        interface: &str,
        filter: &str,
        reporter: Reporter,
    ) -> Result<Self, CaptureError> {
        tracing::info!("Opening capture on {interface}");
        let mut reader = backend
            .open(interface)
            .map_err(|reason| CaptureError::OpenFailed {
                interface: interface.to_string(),
                reason,
            })?;

        // The reader is dropped on this error path, closing the handle.
        reader
            .apply_filter(filter)
            .map_err(|reason| CaptureError::FilterRejected {
                filter: filter.to_string(),
                reason,
            })?;
        tracing::debug!("Filter installed: {filter}");

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let thread = std::thread::Builder::new()
            .name("packet-capture".into())
            .spawn(move || run_capture_loop(reader, shutdown_clone, reporter))
            .map_err(CaptureError::Spawn)?;

        tracing::info!("CaptureEngine started on {interface}");
        Ok(Self {
            interface: interface.to_string(),
            filter: filter.to_string(),
            shutdown,
            capture_thread: Some(thread),
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Ask the worker to exit. Observed before the next read, or right after the
    /// read in flight returns. Idempotent.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// True while the worker thread has not exited.
    pub fn is_running(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Block until the worker has exited and the capture handle is released.
    /// Returns immediately if the worker was already joined.
    pub fn wait(&mut self) -> Result<(), CaptureError> {
        match self.capture_thread.take() {
            Some(thread) => thread.join().map_err(|_| CaptureError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        if self.capture_thread.is_some() {
            tracing::warn!("CaptureEngine dropped, releasing capture resources");
        }
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Worker body. Owns the reader; it is dropped (handle closed) when this returns.
fn run_capture_loop<R: PacketReader>(
    mut reader: R,
    shutdown: Arc<AtomicBool>,
    mut reporter: Reporter,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match reader.next_packet() {
            Ok(text) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                for credential in extract(&text).into_credentials() {
                    reporter(credential);
                }
            }
            Err(ReadError::Timeout) => {}
            Err(ReadError::Transient(e)) => {
                tracing::debug!("Packet read error: {e}");
                std::thread::sleep(Duration::from_millis(config::READ_ERROR_BACKOFF_MS));
            }
            Err(ReadError::Closed) => {
                tracing::warn!("Capture handle closed, no more packets");
                break;
            }
        }
    }

    tracing::info!("Stopping packet capture...");
}
