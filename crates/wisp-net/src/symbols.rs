//! Outcome symbols returned to scripts

use wisp_sdk::Symbol;

/// `wifi-connect` was rejected because of bad credentials (or a missing AP)
pub const WRONG_PASSWORD: Symbol = Symbol::new("wrong-password");
/// `tcp-connect` could not resolve the host name
pub const UNKNOWN_HOST: Symbol = Symbol::new("unknown-host");
/// `tcp-recv` found nothing before its timeout
pub const NO_DATA: Symbol = Symbol::new("no-data");
/// Link or socket is connected
pub const CONNECTED: Symbol = Symbol::new("connected");
/// Link is joining a network
pub const CONNECTING: Symbol = Symbol::new("connecting");
/// Link or socket is down, or the remote closed the connection
pub const DISCONNECTED: Symbol = Symbol::new("disconnected");
/// Head of the asynchronous disconnect event
pub const EVENT_WIFI_DISCONNECT: Symbol = Symbol::new("event-wifi-disconnect");
