//! Pending wait table
//!
//! Holds the (at most one) outstanding network-change wait and the (at most
//! one) outstanding socket-receive wait. Each registration gets a fresh
//! `WaitTicket`; resolvers clear a slot only when it still holds the ticket
//! they observed, so a wait is resolved at most once even when the classifier
//! thread, the poller thread and the scheduler race for it.

use crate::error::{NetError, NetResult};
use crate::handles::SocketHandle;
use parking_lot::{Condvar, Mutex};
use std::time::Duration;
use wisp_sdk::ContextId;

/// What a suspended context is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitKind {
    /// Outcome of joining a wireless network
    NetworkChange,
    /// Data on a socket, bounded by a timeout
    SocketRecv,
}

/// Identity of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaitTicket(u64);

/// A context waiting for `wifi-connect` to settle
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkChangeWait {
    /// Suspended context
    pub context: ContextId,
}

/// A context waiting inside `tcp-recv`
#[derive(Debug, Clone, PartialEq)]
pub struct SocketRecvWait {
    /// Suspended context
    pub context: ContextId,
    /// Socket to read
    pub socket: SocketHandle,
    /// Receive buffer sized to the caller's `max-len`, allocated before the
    /// caller is suspended
    pub buffer: Vec<u8>,
    /// How long to keep polling before answering `'no-data`
    pub timeout: Duration,
    /// Append a NUL terminator to the received bytes
    pub decode_as_text: bool,
}

/// A registered wait
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWait {
    /// See `NetworkChangeWait`
    NetworkChange(NetworkChangeWait),
    /// See `SocketRecvWait`
    SocketRecv(SocketRecvWait),
}

impl PendingWait {
    /// Kind of the wait
    pub fn kind(&self) -> WaitKind {
        match self {
            PendingWait::NetworkChange(_) => WaitKind::NetworkChange,
            PendingWait::SocketRecv(_) => WaitKind::SocketRecv,
        }
    }

    /// Context parked on the wait
    pub fn context(&self) -> ContextId {
        match self {
            PendingWait::NetworkChange(w) => w.context,
            PendingWait::SocketRecv(w) => w.context,
        }
    }
}

#[derive(Default)]
struct Slots {
    network: Option<(WaitTicket, NetworkChangeWait)>,
    recv: Option<(WaitTicket, SocketRecvWait)>,
    next_ticket: u64,
    shutdown: bool,
}

/// Owner of every pending wait.
pub struct WaitTable {
    slots: Mutex<Slots>,
    /// Signalled when a receive wait is registered or on shutdown
    recv_ready: Condvar,
}

impl WaitTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            recv_ready: Condvar::new(),
        }
    }

    /// Register a wait.
    ///
    /// Only one wait of any kind may be outstanding; a second registration
    /// fails with `ThreadWaiting` and leaves the table untouched.
    pub fn try_register(&self, wait: PendingWait) -> NetResult<WaitTicket> {
        let mut slots = self.slots.lock();
        if slots.network.is_some() || slots.recv.is_some() {
            return Err(NetError::ThreadWaiting);
        }

        slots.next_ticket += 1;
        let ticket = WaitTicket(slots.next_ticket);
        match wait {
            PendingWait::NetworkChange(w) => slots.network = Some((ticket, w)),
            PendingWait::SocketRecv(w) => {
                slots.recv = Some((ticket, w));
                self.recv_ready.notify_one();
            }
        }
        Ok(ticket)
    }

    /// Check whether any wait is outstanding
    pub fn is_busy(&self) -> bool {
        let slots = self.slots.lock();
        slots.network.is_some() || slots.recv.is_some()
    }

    /// Check whether a network-change wait is outstanding
    pub fn network_active(&self) -> bool {
        self.slots.lock().network.is_some()
    }

    /// Clear and return the network-change wait, whatever its ticket.
    pub fn take_network(&self) -> Option<NetworkChangeWait> {
        self.slots.lock().network.take().map(|(_, w)| w)
    }

    /// Clear and return the network-change wait if it is still `ticket`.
    pub fn take_network_if(&self, ticket: WaitTicket) -> Option<NetworkChangeWait> {
        let mut slots = self.slots.lock();
        match &slots.network {
            Some((active, _)) if *active == ticket => slots.network.take().map(|(_, w)| w),
            _ => None,
        }
    }

    /// Check whether the receive wait is still `ticket`
    pub fn recv_active(&self, ticket: WaitTicket) -> bool {
        matches!(&self.slots.lock().recv, Some((active, _)) if *active == ticket)
    }

    /// Clear and return the receive wait if it is still `ticket`.
    pub fn take_recv_if(&self, ticket: WaitTicket) -> Option<SocketRecvWait> {
        let mut slots = self.slots.lock();
        match &slots.recv {
            Some((active, _)) if *active == ticket => slots.recv.take().map(|(_, w)| w),
            _ => None,
        }
    }

    /// Drop whatever wait `context` holds. Used when the runtime tears the
    /// context down.
    pub fn abandon(&self, context: ContextId) -> Option<WaitKind> {
        let mut slots = self.slots.lock();
        if matches!(&slots.network, Some((_, w)) if w.context == context) {
            slots.network = None;
            return Some(WaitKind::NetworkChange);
        }
        if matches!(&slots.recv, Some((_, w)) if w.context == context) {
            slots.recv = None;
            return Some(WaitKind::SocketRecv);
        }
        None
    }

    /// Drop every wait, returning the contexts that held one.
    pub fn clear(&self) -> Vec<ContextId> {
        let mut slots = self.slots.lock();
        let network = slots.network.take().map(|(_, w)| w.context);
        let recv = slots.recv.take().map(|(_, w)| w.context);
        network.into_iter().chain(recv).collect()
    }

    /// Block until a receive wait is registered.
    ///
    /// Returns a copy of the wait with its ticket; the wait itself stays in
    /// the table until resolved. The receive buffer moves to the returned
    /// copy. Returns `None` once the table is shut down.
    pub fn wait_for_recv(&self) -> Option<(WaitTicket, SocketRecvWait)> {
        let mut slots = self.slots.lock();
        loop {
            if slots.shutdown {
                return None;
            }
            if let Some((ticket, wait)) = &mut slots.recv {
                let buffer = std::mem::take(&mut wait.buffer);
                let served = SocketRecvWait {
                    buffer,
                    ..wait.clone()
                };
                return Some((*ticket, served));
            }
            self.recv_ready.wait(&mut slots);
        }
    }

    /// Release every thread blocked in `wait_for_recv`.
    pub fn shutdown(&self) {
        self.slots.lock().shutdown = true;
        self.recv_ready.notify_all();
    }

    /// Check whether `shutdown` was called
    pub fn is_shut_down(&self) -> bool {
        self.slots.lock().shutdown
    }
}

impl Default for WaitTable {
    fn default() -> Self {
        Self::new()
    }
}
