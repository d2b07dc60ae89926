// ABOUTME: Network reachability checks, read fresh on every call
// ABOUTME: ConnectivityMonitor is a library hook for hosts that get platform status events

use crate::{Error, Result};
use log::{debug, info};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Reports online when a TCP connection to the API host succeeds.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        TcpProbe {
            host: host.into(),
            port,
            timeout: Duration::from_secs(3),
        }
    }

    /// Probes the host and port of `url`.
    pub fn for_url(url: &str) -> Result<Self> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::Config(format!("Invalid URL {}: {}", url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::Config(format!("URL has no host: {}", url)))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| Error::Config(format!("URL has no port: {}", url)))?;
        Ok(TcpProbe::new(host, port))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_online(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!("Cannot resolve {}: {}", self.host, e);
                return false;
            }
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok())
    }
}

/// Probe whose answer is set explicitly.
#[derive(Debug)]
pub struct StaticProbe(AtomicBool);

impl StaticProbe {
    pub fn new(online: bool) -> Self {
        StaticProbe(AtomicBool::new(online))
    }

    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl ConnectivityProbe for StaticProbe {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Embedding hosts call [`ConnectivityMonitor::connectivity_changed`] from
/// their own network-change callback. The one-shot CLI has no such event.
pub struct ConnectivityMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    subscribers: Mutex<Vec<Sender<bool>>>,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        ConnectivityMonitor {
            probe,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<bool> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    /// Called when the platform reports a status change. Re-reads the probe
    /// and tells every live subscriber the current state.
    pub fn connectivity_changed(&self) -> bool {
        let online = self.probe.is_online();
        if online {
            info!("Device went online");
        } else {
            info!("Device no longer online");
        }

        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|tx| tx.send(online).is_ok());
        online
    }
}
