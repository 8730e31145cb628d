//! Wisp network extensions
//!
//! Wifi and TCP extensions for the Wisp script runtime. Scripts see plain
//! blocking calls (`wifi-connect`, `tcp-recv`, ...); underneath, a calling
//! context is suspended and later resumed from the network stack's event
//! callback or from the socket poller thread.
//!
//! The network stack and the socket layer are collaborators behind the
//! `WifiStack` and `SocketTransport` traits. `TcpTransport` is the
//! std::net implementation of the latter.

#![warn(missing_docs)]

pub mod classifier;
pub mod config;
pub mod error;
pub mod extensions;
pub mod handles;
pub mod poller;
pub mod registry;
pub mod stack;
pub mod suspend;
pub mod symbols;
pub mod transport;
pub mod wait;

mod tcp;
mod wifi;

pub use classifier::{DisconnectReason, NetworkEventClassifier, ReasonClass};
pub use config::{ConfigError, KeepaliveConfig, NetConfig};
pub use error::{NetError, NetResult};
pub use extensions::{Completion, WifiExtensions};
pub use handles::{SocketHandle, SocketRegistry};
pub use poller::SocketPoller;
pub use registry::register_wifi;
pub use stack::{
    AccessPoint, ConnectionState, LinkEvent, LinkEventListener, RecvFlags, ScanConfig,
    SocketTransport, StackError, WifiMode, WifiStack,
};
pub use suspend::{ResumeQueue, Resumption, Suspender};
pub use transport::TcpTransport;
pub use wait::{PendingWait, WaitKind, WaitTable, WaitTicket};
