//! Socket poller thread
//!
//! Serves `tcp-recv` calls that chose to wait. The thread parks on the wait
//! table until a receive wait is registered, then retries a non-blocking
//! read every poll interval until data arrives, the connection drops, the
//! timeout passes, or the wait disappears (its context was cancelled).

use crate::stack::{is_disconnect, RecvFlags, SocketTransport};
use crate::suspend::Suspender;
use crate::symbols;
use crate::wait::{SocketRecvWait, WaitTable, WaitTicket};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use wisp_sdk::ScriptValue;

/// Received bytes as handed to scripts. Text gets a NUL terminator.
pub(crate) fn received_value(data: &[u8], decode_as_text: bool) -> ScriptValue {
    let mut bytes = Vec::with_capacity(data.len() + decode_as_text as usize);
    bytes.extend_from_slice(data);
    if decode_as_text {
        bytes.push(0);
    }
    ScriptValue::Bytes(bytes)
}

fn is_retry(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

struct PollerShared {
    waits: Arc<WaitTable>,
    suspender: Arc<Suspender>,
    transport: Arc<dyn SocketTransport>,
    poll_interval: Duration,
}

/// Background thread resolving socket-receive waits.
pub struct SocketPoller {
    shared: Arc<PollerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SocketPoller {
    /// Spawn the poller thread
    pub fn start(
        waits: Arc<WaitTable>,
        suspender: Arc<Suspender>,
        transport: Arc<dyn SocketTransport>,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        let shared = Arc::new(PollerShared {
            waits,
            suspender,
            transport,
            poll_interval,
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("wisp-socket-poller".to_string())
            .spawn(move || worker.run_loop())?;

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Check if the thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the poller thread
    pub fn stop(&self) {
        self.shared.waits.shutdown();

        if let Some(handle) = self.handle.lock().take() {
            let start = Instant::now();
            let timeout = Duration::from_secs(2);
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    return;
                }
                if start.elapsed() > timeout {
                    log::warn!("socket poller did not stop within {:?}", timeout);
                    drop(handle);
                    return;
                }
                thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

impl Drop for SocketPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl PollerShared {
    fn run_loop(&self) {
        while let Some((ticket, wait)) = self.waits.wait_for_recv() {
            self.serve(ticket, wait);
        }
        log::debug!("socket poller shutting down");
    }

    fn serve(&self, ticket: WaitTicket, wait: SocketRecvWait) {
        // An unrepresentable deadline never expires
        let deadline = Instant::now().checked_add(wait.timeout);
        let mut buf = wait.buffer;

        loop {
            if self.waits.is_shut_down() || !self.waits.recv_active(ticket) {
                log::debug!("receive wait of {:?} withdrawn", wait.context);
                return;
            }

            let received = self
                .transport
                .recv(wait.socket, &mut buf, RecvFlags::NONBLOCKING);
            let outcome = match received {
                Ok(0) => Some(ScriptValue::Symbol(symbols::DISCONNECTED)),
                Ok(n) => Some(received_value(&buf[..n], wait.decode_as_text)),
                Err(e) if is_retry(e.kind()) => match deadline {
                    Some(deadline) if Instant::now() >= deadline => {
                        Some(ScriptValue::Symbol(symbols::NO_DATA))
                    }
                    _ => None,
                },
                Err(e) if is_disconnect(e.kind()) => {
                    Some(ScriptValue::Symbol(symbols::DISCONNECTED))
                }
                Err(e) => {
                    log::debug!("recv on {:?} failed: {}", wait.socket, e);
                    Some(ScriptValue::Nil)
                }
            };

            match outcome {
                Some(value) => {
                    if let Some(wait) = self.waits.take_recv_if(ticket) {
                        log::debug!("receive on {:?} resolved: {:?}", wait.socket, value);
                        self.suspender.resume(wait.context, value);
                    }
                    return;
                }
                None => thread::sleep(self.poll_interval),
            }
        }
    }
}
