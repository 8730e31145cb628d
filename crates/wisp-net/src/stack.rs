//! Collaborator traits for the network stack and the socket transport
//!
//! The extensions never talk to a radio or a socket API directly. A
//! `WifiStack` owns association, scanning and reconnection and reports link
//! events through a `LinkEventListener`; a `SocketTransport` owns the sockets
//! behind the script-visible handles.

use crate::handles::SocketHandle;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// Operating mode of the wireless interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// Radio off
    Disabled,
    /// Client of an access point
    Station,
    /// Serving as an access point
    AccessPoint,
}

/// Association state as seen by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not associated and not trying
    Disconnected,
    /// Joining (or rejoining) a network
    Connecting,
    /// Associated with an address
    Connected,
}

/// One scan result
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPoint {
    /// Network name
    pub ssid: String,
    /// Signal strength in dBm
    pub rssi: i8,
    /// Primary channel
    pub channel: u8,
}

/// Parameters of a passive scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanConfig {
    /// Listen time per channel, in seconds
    pub scan_time: f64,
    /// Channel to scan, 0 for all
    pub channel: u8,
    /// Include networks that hide their SSID
    pub show_hidden: bool,
}

/// Failures reported by a `WifiStack`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// The driver was not started
    #[error("wifi not started")]
    NotStarted,
    /// The driver was not initialized
    #[error("wifi not initialized")]
    NotInitialized,
    /// The stack is busy joining a network
    #[error("wifi busy connecting")]
    Busy,
    /// The stack ran out of memory
    #[error("wifi out of memory")]
    NoMemory,
    /// The operation timed out
    #[error("wifi timeout")]
    Timeout,
    /// The stack rejected an argument
    #[error("invalid argument")]
    InvalidArgument,
    /// Any other driver error code
    #[error("wifi error {0}")]
    Other(i32),
}

/// Link notifications delivered by the stack
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The station lost (or failed to gain) its association
    Disconnected {
        /// Raw 802.11/driver reason code
        reason: u8,
    },
    /// DHCP handed out an address
    GotIp,
    /// Anything else, by name
    Other(String),
}

/// Receiver of `LinkEvent`s. Called on the stack's own thread.
pub trait LinkEventListener: Send + Sync {
    /// Handle one event
    fn on_link_event(&self, event: LinkEvent);
}

/// Event-driven wireless stack.
pub trait WifiStack: Send + Sync {
    /// Current operating mode
    fn mode(&self) -> WifiMode;

    /// Run a blocking scan; results are read with `scan_records`.
    fn start_scan(&self, config: &ScanConfig) -> Result<(), StackError>;

    /// Records of the last scan
    fn scan_records(&self) -> Result<Vec<AccessPoint>, StackError>;

    /// Release the records of the last scan
    fn clear_scan_records(&self);

    /// Begin joining `ssid`. Returns false if the join could not be started;
    /// the outcome otherwise arrives as a `LinkEvent`.
    fn change_network(&self, ssid: &str, password: Option<&str>) -> bool;

    /// Leave the current network
    fn disconnect(&self);

    /// Current association state
    fn connection_state(&self) -> ConnectionState;

    /// Check if the stack is joining a network
    fn is_connecting(&self) -> bool {
        self.connection_state() == ConnectionState::Connecting
    }

    /// Check if the stack is associated
    fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Whether the stack rejoins on its own after a disconnect
    fn auto_reconnect(&self) -> bool;

    /// Change automatic rejoining, returning the previous setting
    fn set_auto_reconnect(&self, enabled: bool) -> bool;

    /// Install the receiver of link events, replacing any previous one
    fn set_event_listener(&self, listener: Arc<dyn LinkEventListener>);
}

/// Flags of a single receive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecvFlags {
    /// Leave the data in the socket
    pub peek: bool,
    /// Fail with `WouldBlock` instead of waiting
    pub dont_wait: bool,
}

impl RecvFlags {
    /// Non-blocking read
    pub const NONBLOCKING: RecvFlags = RecvFlags {
        peek: false,
        dont_wait: true,
    };

    /// Non-blocking peek
    pub const PEEK: RecvFlags = RecvFlags {
        peek: true,
        dont_wait: true,
    };
}

/// Socket layer behind the `tcp-*` extensions.
pub trait SocketTransport: Send + Sync {
    /// Resolve a host name. Returns `None` when the name does not resolve.
    fn resolve(&self, host: &str, port: u16) -> Option<SocketAddr>;

    /// Open a TCP connection
    fn connect(&self, addr: SocketAddr) -> io::Result<SocketHandle>;

    /// Write all of `data`
    fn send(&self, handle: SocketHandle, data: &[u8]) -> io::Result<usize>;

    /// Read into `buf`. `Ok(0)` means the remote closed the connection.
    fn recv(&self, handle: SocketHandle, buf: &mut [u8], flags: RecvFlags) -> io::Result<usize>;

    /// Shut the socket down and release it
    fn close(&self, handle: SocketHandle) -> io::Result<()>;
}

/// Check if an error means the connection is gone
pub fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_kinds() {
        assert!(is_disconnect(io::ErrorKind::ConnectionReset));
        assert!(is_disconnect(io::ErrorKind::NotConnected));
        assert!(is_disconnect(io::ErrorKind::BrokenPipe));
        assert!(!is_disconnect(io::ErrorKind::WouldBlock));
        assert!(!is_disconnect(io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_state_helpers() {
        struct Fixed(ConnectionState);
        impl WifiStack for Fixed {
            fn mode(&self) -> WifiMode {
                WifiMode::Station
            }
            fn start_scan(&self, _: &ScanConfig) -> Result<(), StackError> {
                Ok(())
            }
            fn scan_records(&self) -> Result<Vec<AccessPoint>, StackError> {
                Ok(Vec::new())
            }
            fn clear_scan_records(&self) {}
            fn change_network(&self, _: &str, _: Option<&str>) -> bool {
                true
            }
            fn disconnect(&self) {}
            fn connection_state(&self) -> ConnectionState {
                self.0
            }
            fn auto_reconnect(&self) -> bool {
                false
            }
            fn set_auto_reconnect(&self, _: bool) -> bool {
                false
            }
            fn set_event_listener(&self, _: Arc<dyn LinkEventListener>) {}
        }

        assert!(Fixed(ConnectionState::Connecting).is_connecting());
        assert!(!Fixed(ConnectionState::Connecting).is_connected());
        assert!(Fixed(ConnectionState::Connected).is_connected());
    }
}
