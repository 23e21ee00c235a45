// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline signal consumed by the queue and the gateway.

use tokio::sync::watch;

/// Source of truth for whether the network is reachable.
pub trait ConnectivityOracle: Send + Sync {
    /// Current connectivity.
    fn is_online(&self) -> bool;

    /// Stream of connectivity changes. The receiver starts at the current
    /// value.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity flag set by whoever observes the network.
///
/// Cloning is not supported; share it through an `Arc`.
pub struct SharedConnectivity {
    tx: watch::Sender<bool>,
}

impl SharedConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        SharedConnectivity { tx }
    }

    /// Sets connectivity. Subscribers are only woken on an actual change.
    ///
    /// Returns true if the value changed.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        })
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityOracle for SharedConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
