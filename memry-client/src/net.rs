use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Reachability as reported by the device probe. `Unknown` shows up on
/// platforms that cannot answer before the first real request goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
    Unknown,
}

/// Point-in-time snapshot of the device link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    pub interface_up: bool,
    pub reachability: Reachability,
}

impl LinkState {
    pub fn online() -> Self {
        Self {
            interface_up: true,
            reachability: Reachability::Reachable,
        }
    }

    pub fn offline() -> Self {
        Self {
            interface_up: false,
            reachability: Reachability::Unreachable,
        }
    }
}

/// Seam over the platform connectivity check so the monitor can be driven
/// by a fake in tests.
#[async_trait::async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn snapshot(&self) -> LinkState;
}

/// A link counts as online when an interface is up and reachability is not
/// explicitly negative. Treating `Unknown` as online is an open product
/// question; keep the policy in this one place.
pub fn link_is_online(state: LinkState) -> bool {
    state.interface_up && state.reachability != Reachability::Unreachable
}

/// Wraps the device probe and fans out online/offline transitions.
/// Repeated identical reports are collapsed, so subscribers never see an
/// online -> online event.
pub struct NetworkMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    online: watch::Sender<bool>,
}

impl NetworkMonitor {
    pub async fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        let initial = link_is_online(probe.snapshot().await);
        let (online, _) = watch::channel(initial);
        Self { probe, online }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Transition events in emission order, deduplicated.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Ask the probe for a fresh snapshot and publish it.
    pub async fn refresh(&self) -> bool {
        let state = self.probe.snapshot().await;
        self.report(state)
    }

    /// Entry point for platform callbacks delivering a new link state.
    pub fn report(&self, state: LinkState) -> bool {
        let online = link_is_online(state);
        let changed = self.online.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
        if changed {
            debug!("connectivity changed, online: {online}");
        }
        online
    }
}

/// Probe that checks the backend's health endpoint. Used by the CLI wiring;
/// an unreachable server from this device is indistinguishable from being
/// offline for every operation the engine performs.
pub struct ServerProbe {
    address: String,
}

impl ServerProbe {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait::async_trait]
impl ConnectivityProbe for ServerProbe {
    async fn snapshot(&self) -> LinkState {
        match crate::api_client::health_check(&self.address).await {
            Ok(_) => LinkState::online(),
            Err(_) => LinkState::offline(),
        }
    }
}
