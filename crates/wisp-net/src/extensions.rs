//! Shared state of the wifi and tcp extensions
//!
//! `WifiExtensions` ties the collaborators together: it owns the socket
//! registry and the wait table, runs the socket poller and installs the link
//! event classifier on the stack. The script-facing operations live in
//! `wifi.rs` and `tcp.rs`.

use crate::classifier::NetworkEventClassifier;
use crate::config::NetConfig;
use crate::error::{NetError, NetResult};
use crate::handles::SocketRegistry;
use crate::poller::SocketPoller;
use crate::registry::register_wifi;
use crate::stack::{SocketTransport, WifiMode, WifiStack};
use crate::suspend::Suspender;
use crate::wait::WaitTable;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wisp_sdk::{ContextId, EventSink, NativeCallResult, NativeFunctionRegistry, ScriptValue};

/// Outcome of an operation that may park its caller
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Finished synchronously with a value
    Ready(ScriptValue),
    /// The caller was suspended; the value arrives as a resumption
    Suspended,
}

impl From<Completion> for NativeCallResult {
    fn from(completion: Completion) -> Self {
        match completion {
            Completion::Ready(value) => NativeCallResult::Value(value),
            Completion::Suspended => NativeCallResult::Suspend,
        }
    }
}

/// Wifi and tcp extensions bound to one stack and transport.
pub struct WifiExtensions {
    pub(crate) config: NetConfig,
    pub(crate) stack: Arc<dyn WifiStack>,
    pub(crate) transport: Arc<dyn SocketTransport>,
    pub(crate) suspender: Arc<Suspender>,
    pub(crate) waits: Arc<WaitTable>,
    pub(crate) sockets: SocketRegistry,
    pub(crate) scan_results_ready: AtomicBool,
    classifier: Arc<NetworkEventClassifier>,
    poller: SocketPoller,
    loaded: AtomicBool,
}

impl WifiExtensions {
    /// Start the socket poller and install the link event listener.
    pub fn new(
        config: NetConfig,
        stack: Arc<dyn WifiStack>,
        transport: Arc<dyn SocketTransport>,
        suspender: Arc<Suspender>,
        events: Arc<dyn EventSink>,
    ) -> io::Result<Arc<Self>> {
        let waits = Arc::new(WaitTable::new());
        let classifier = Arc::new(NetworkEventClassifier::new(
            &stack,
            waits.clone(),
            suspender.clone(),
            events,
            config.disconnect_events,
        ));
        stack.set_event_listener(classifier.clone());

        let poller = SocketPoller::start(
            waits.clone(),
            suspender.clone(),
            transport.clone(),
            config.poll_interval(),
        )?;

        log::info!(
            "wifi extensions ready ({} sockets, poll every {:?})",
            config.socket_capacity,
            config.poll_interval()
        );

        Ok(Arc::new(Self {
            sockets: SocketRegistry::new(config.socket_capacity),
            config,
            stack,
            transport,
            suspender,
            waits,
            scan_results_ready: AtomicBool::new(false),
            classifier,
            poller,
            loaded: AtomicBool::new(false),
        }))
    }

    /// Register the extensions with a (fresh) runtime.
    ///
    /// Loading again after a runtime restart closes every socket the old
    /// runtime left open and drops its waits; the poller keeps running.
    pub fn load(self: &Arc<Self>, registry: &mut NativeFunctionRegistry) {
        if self.loaded.swap(true, Ordering::AcqRel) {
            self.reset();
        }
        register_wifi(registry, self);
    }

    /// Forget every wait, then close every registered socket.
    ///
    /// Waits go first so the poller cannot answer a dropped receive with
    /// the outcome of its socket being closed.
    pub fn reset(&self) {
        for context in self.waits.clear() {
            self.suspender.cancel(context);
        }
        for handle in self.sockets.drain() {
            if let Err(e) = self.transport.close(handle) {
                log::debug!("closing {:?} on reset failed: {}", handle, e);
            }
        }
        self.scan_results_ready.store(false, Ordering::Relaxed);
    }

    /// Forget a blocked context that the runtime tore down.
    pub fn cancel_context(&self, context: ContextId) {
        if let Some(kind) = self.waits.abandon(context) {
            log::debug!("dropped {:?} wait of {:?}", kind, context);
        }
        self.suspender.cancel(context);
    }

    /// Enable or disable `event-wifi-disconnect` notifications
    pub fn set_disconnect_events(&self, enabled: bool) {
        self.classifier.set_disconnect_events(enabled);
    }

    /// Whether `event-wifi-disconnect` notifications are enabled
    pub fn disconnect_events(&self) -> bool {
        self.classifier.disconnect_events()
    }

    /// Active configuration
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Registry of the sockets opened by `tcp-connect`
    pub fn sockets(&self) -> &SocketRegistry {
        &self.sockets
    }

    /// Pending waits
    pub fn waits(&self) -> &WaitTable {
        &self.waits
    }

    /// Check if the socket poller thread is alive
    pub fn poller_running(&self) -> bool {
        self.poller.is_running()
    }

    /// Every extension requires station mode and no outstanding wait.
    pub(crate) fn check_ready(&self) -> NetResult<()> {
        if self.waits.is_busy() {
            return Err(NetError::ThreadWaiting);
        }
        if self.stack.mode() != WifiMode::Station {
            return Err(NetError::ModeInvalid);
        }
        Ok(())
    }
}
