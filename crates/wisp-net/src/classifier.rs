//! Link event classifier
//!
//! Decides what a link event means for a pending `wifi-connect`: an address
//! resolves it with `t`, a disconnect resolves it with `'wrong-password` or
//! `nil`, or leaves it pending while the stack retries. Independently of any
//! wait, disconnects that the stack is not recovering from are posted to the
//! runtime as `(event-wifi-disconnect <reason> <from-extension>)`.

use crate::stack::{LinkEvent, LinkEventListener, WifiMode, WifiStack};
use crate::suspend::Suspender;
use crate::symbols;
use crate::wait::WaitTable;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use wisp_sdk::{EventSink, ScriptValue};

/// Raw disconnect reason code (ESP-IDF `wifi_err_reason_t` numbering)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisconnectReason(pub u8);

impl DisconnectReason {
    /// Authentication expired
    pub const AUTH_EXPIRE: DisconnectReason = DisconnectReason(2);
    /// Station left the association
    pub const ASSOC_LEAVE: DisconnectReason = DisconnectReason(8);
    /// WPA 4-way handshake timed out
    pub const FOUR_WAY_HANDSHAKE_TIMEOUT: DisconnectReason = DisconnectReason(15);
    /// No access point with the SSID
    pub const NO_AP_FOUND: DisconnectReason = DisconnectReason(201);
    /// Handshake timed out
    pub const HANDSHAKE_TIMEOUT: DisconnectReason = DisconnectReason(204);

    /// Look the reason up in the classification table
    pub fn class(self) -> ReasonClass {
        REASON_TABLE
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, class)| *class)
            .unwrap_or(ReasonClass::Unknown)
    }
}

impl fmt::Debug for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reason {}", self.0)
    }
}

/// What a disconnect means for a pending connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonClass {
    /// Bad password or no such network: give up with `'wrong-password`
    WrongCredentials,
    /// Part of a normal network change, or ambiguous on the first attempt:
    /// keep waiting for the stack's next try
    ExpectedTransition,
    /// Anything else: give up with `nil`
    Unknown,
}

/// Reasons with a known meaning. Everything else is `Unknown`.
static REASON_TABLE: &[(DisconnectReason, ReasonClass)] = &[
    (DisconnectReason::FOUR_WAY_HANDSHAKE_TIMEOUT, ReasonClass::WrongCredentials),
    (DisconnectReason::NO_AP_FOUND, ReasonClass::WrongCredentials),
    (DisconnectReason::HANDSHAKE_TIMEOUT, ReasonClass::WrongCredentials),
    // Leaving the old network on a network change
    (DisconnectReason::ASSOC_LEAVE, ReasonClass::ExpectedTransition),
    // Seen with both right and wrong credentials after a long idle period
    (DisconnectReason::AUTH_EXPIRE, ReasonClass::ExpectedTransition),
];

/// Stack event listener resolving network-change waits.
pub struct NetworkEventClassifier {
    stack: Weak<dyn WifiStack>,
    waits: Arc<WaitTable>,
    suspender: Arc<Suspender>,
    events: Arc<dyn EventSink>,
    disconnect_events: AtomicBool,
}

impl NetworkEventClassifier {
    /// Create a classifier. The stack is held weakly since it owns the
    /// classifier once installed as its listener.
    pub fn new(
        stack: &Arc<dyn WifiStack>,
        waits: Arc<WaitTable>,
        suspender: Arc<Suspender>,
        events: Arc<dyn EventSink>,
        disconnect_events: bool,
    ) -> Self {
        Self {
            stack: Arc::downgrade(stack),
            waits,
            suspender,
            events,
            disconnect_events: AtomicBool::new(disconnect_events),
        }
    }

    /// Enable or disable `event-wifi-disconnect` notifications
    pub fn set_disconnect_events(&self, enabled: bool) {
        self.disconnect_events.store(enabled, Ordering::Relaxed);
    }

    /// Whether `event-wifi-disconnect` notifications are enabled
    pub fn disconnect_events(&self) -> bool {
        self.disconnect_events.load(Ordering::Relaxed)
    }

    fn on_got_ip(&self) {
        if let Some(wait) = self.waits.take_network() {
            log::debug!("address acquired, resolving {:?} with t", wait.context);
            self.suspender.resume(wait.context, ScriptValue::t());
        }
    }

    fn on_disconnected(&self, reason: DisconnectReason) {
        let stack = self.stack.upgrade();
        let extension_waiting = self.waits.network_active();
        let reconnecting = stack
            .as_ref()
            .is_some_and(|s| s.is_connecting() || s.is_connected());

        if !reconnecting {
            let station = stack.as_ref().is_some_and(|s| s.mode() == WifiMode::Station);
            if self.disconnect_events() && station {
                self.post_disconnect(reason, extension_waiting);
            }
        }

        if !extension_waiting {
            return;
        }

        let value = match reason.class() {
            ReasonClass::WrongCredentials => ScriptValue::Symbol(symbols::WRONG_PASSWORD),
            ReasonClass::ExpectedTransition => {
                log::debug!("{:?} during network change, still waiting", reason);
                return;
            }
            ReasonClass::Unknown => ScriptValue::Nil,
        };

        if let Some(wait) = self.waits.take_network() {
            log::debug!("{:?}: resolving {:?} with {:?}", reason, wait.context, value);
            self.suspender.resume(wait.context, value);
        }
    }

    fn post_disconnect(&self, reason: DisconnectReason, from_extension: bool) {
        let event = ScriptValue::List(vec![
            ScriptValue::Symbol(symbols::EVENT_WIFI_DISCONNECT),
            ScriptValue::UInt(reason.0 as u64),
            if from_extension {
                ScriptValue::t()
            } else {
                ScriptValue::Nil
            },
        ]);
        if !self.events.post_event(event) {
            log::warn!("failed to post wifi-disconnect event, {:?}", reason);
        }
    }
}

impl LinkEventListener for NetworkEventClassifier {
    fn on_link_event(&self, event: LinkEvent) {
        log::debug!("link event: {:?}", event);
        match event {
            LinkEvent::GotIp => self.on_got_ip(),
            LinkEvent::Disconnected { reason } => self.on_disconnected(DisconnectReason(reason)),
            LinkEvent::Other(_) => {}
        }
    }
}
