//! DBI Session - connects to the Switch and serves it until it exits.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::dispatcher::Dispatcher;
use crate::events::{DbiEvent, DbiObserver, PacketDirection, SessionEnd, TracingObserver};
use crate::protocol::constants::{DEFAULT_POLL_INTERVAL_MS, NINTENDO_VENDOR_ID, SWITCH_PRODUCT_ID};
use crate::transport::{NusbTransport, TransportError, UsbTransport};

/// Configuration for a DBI session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding NSP/NSZ/XCI files.
    pub root_dir: PathBuf,
    /// Debug-level logging.
    pub debug_logging: bool,
    /// USB vendor id to wait for.
    pub vendor_id: u16,
    /// USB product id to wait for.
    pub product_id: u16,
    /// Delay between device polls in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::new(),
            debug_logging: false,
            vendor_id: NINTENDO_VENDOR_ID,
            product_id: SWITCH_PRODUCT_ID,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SessionConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The library root must be an existing directory.
    pub fn validate(&self) -> Result<()> {
        if self.root_dir.as_os_str().is_empty() {
            bail!("No library directory given (--rom-dir or root_dir in the config file)");
        }
        if !self.root_dir.is_dir() {
            bail!(
                "Specified path must be a directory: {}",
                self.root_dir.display()
            );
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// DBI Session - waits for the device, then runs the command loop.
pub struct DbiSession<O: DbiObserver> {
    config: SessionConfig,
    observer: Arc<O>,
}

impl DbiSession<TracingObserver> {
    /// Create a new session with default tracing observer.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }
}

impl<O: DbiObserver> DbiSession<O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(config: SessionConfig, observer: Arc<O>) -> Self {
        Self { config, observer }
    }

    /// Run the complete session against a real device.
    #[instrument(skip(self))]
    pub fn run(&self) -> Result<SessionEnd> {
        self.config.validate()?;
        let (vid, pid) = (self.config.vendor_id, self.config.product_id);
        let transport = self.wait_for_device(|| NusbTransport::open_with_ids(vid, pid))?;
        self.serve(&transport)
    }

    /// Poll `open` until the device shows up.
    ///
    /// Only `DeviceNotFound` is retried, forever, at the configured interval.
    pub fn wait_for_device<T, F>(&self, mut open: F) -> Result<T>
    where
        T: UsbTransport,
        F: FnMut() -> Result<T, TransportError>,
    {
        loop {
            match open() {
                Ok(t) => {
                    self.observer.on_event(&DbiEvent::DeviceConnected {
                        vid: t.vendor_id(),
                        pid: t.product_id(),
                    });
                    return Ok(t);
                }
                Err(TransportError::DeviceNotFound { .. }) => {
                    self.observer.on_event(&DbiEvent::WaitingForDevice);
                    thread::sleep(self.config.poll_interval());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Serve an already open transport until the device exits.
    pub fn serve<T: UsbTransport>(&self, transport: &T) -> Result<SessionEnd> {
        let obs_transport = ObservableTransport {
            inner: transport,
            observer: self.observer.as_ref(),
        };
        let mut dispatcher =
            Dispatcher::new(&obs_transport, self.observer.as_ref(), &self.config.root_dir);
        dispatcher.run()
    }
}

/// Bytes of each packet copied into its trace event.
const PACKET_HEAD_LEN: usize = 32;

/// Transport wrapper that emits packet events.
struct ObservableTransport<'a, T: UsbTransport, O: DbiObserver> {
    inner: &'a T,
    observer: &'a O,
}

impl<'a, T: UsbTransport, O: DbiObserver> ObservableTransport<'a, T, O> {
    fn packet(&self, direction: PacketDirection, data: &[u8]) {
        self.observer.on_event(&DbiEvent::Packet {
            direction,
            length: data.len(),
            head: data.iter().take(PACKET_HEAD_LEN).cloned().collect(),
        });
    }
}

impl<'a, T: UsbTransport, O: DbiObserver> UsbTransport for ObservableTransport<'a, T, O> {
    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        let res = self.inner.write(data);
        if res.is_ok() {
            self.packet(PacketDirection::Tx, data);
        }
        res
    }

    fn read_exact(&self, len: usize) -> Result<Vec<u8>, TransportError> {
        let res = self.inner.read_exact(len);
        if let Ok(data) = &res {
            self.packet(PacketDirection::Rx, data);
        }
        res
    }

    fn vendor_id(&self) -> u16 {
        self.inner.vendor_id()
    }

    fn product_id(&self) -> u16 {
        self.inner.product_id()
    }
}
