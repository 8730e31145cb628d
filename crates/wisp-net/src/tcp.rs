//! tcp-* extensions
//!
//! Sockets are only reachable through handles in the socket registry; any
//! other handle answers `nil`. Network outcomes are values, not errors:
//! `'unknown-host`, `'disconnected`, `'no-data` or `nil` for anything
//! unexpected. Preconditions are checked by the registered handlers.

use crate::error::{NetError, NetResult};
use crate::extensions::{Completion, WifiExtensions};
use crate::handles::SocketHandle;
use crate::poller::received_value;
use crate::stack::{is_disconnect, RecvFlags};
use crate::symbols;
use crate::wait::{PendingWait, SocketRecvWait, WaitKind};
use std::io;
use std::time::Duration;
use wisp_sdk::{NativeContext, ScriptValue};

fn disconnected() -> ScriptValue {
    ScriptValue::Symbol(symbols::DISCONNECTED)
}

/// Zeroed receive buffer of `len` bytes, or `OutOfMemory` if the
/// allocation cannot be made.
fn recv_buffer(len: usize) -> NetResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| NetError::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Seconds as a timeout. Negative and NaN mean no wait; values too large
/// for a `Duration` wait forever.
fn timeout_from_secs(secs: f64) -> Duration {
    let secs = if secs.is_nan() { 0.0 } else { secs.max(0.0) };
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

impl WifiExtensions {
    /// `tcp-connect`: open a socket to `host:port`.
    ///
    /// Returns the handle, `'unknown-host`, or `nil` when the connection
    /// fails.
    pub(crate) fn tcp_connect(&self, host: &str, port: u16) -> NetResult<ScriptValue> {
        let Some(addr) = self.transport.resolve(host, port) else {
            log::debug!("cannot resolve {:?}", host);
            return Ok(ScriptValue::Symbol(symbols::UNKNOWN_HOST));
        };
        if self.sockets.is_full() {
            return Err(NetError::TooManySockets);
        }

        let handle = match self.transport.connect(addr) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("connect to {} failed: {}", addr, e);
                return Ok(ScriptValue::Nil);
            }
        };
        if !self.sockets.register(handle) {
            log::warn!("transport reused live handle {:?}", handle);
            let _ = self.transport.close(handle);
            return Ok(ScriptValue::Nil);
        }

        log::debug!("opened {:?} to {}", handle, addr);
        Ok(ScriptValue::Int(handle.as_raw() as i64))
    }

    /// `tcp-close`
    pub(crate) fn tcp_close(&self, handle: SocketHandle) -> NetResult<ScriptValue> {
        if !self.sockets.unregister(handle) {
            return Ok(ScriptValue::Nil);
        }
        if let Err(e) = self.transport.close(handle) {
            log::debug!("close of {:?} failed: {}", handle, e);
        }
        Ok(ScriptValue::t())
    }

    /// `tcp-status`: `'connected`, `'disconnected`, or `nil` for an unknown
    /// socket.
    pub(crate) fn tcp_status(&self, handle: SocketHandle) -> NetResult<ScriptValue> {
        if !self.sockets.is_valid(handle) {
            log::debug!("{:?} is not registered", handle);
            return Ok(ScriptValue::Nil);
        }

        let mut probe = [0u8; 1];
        let connected = match self.transport.recv(handle, &mut probe, RecvFlags::PEEK) {
            Ok(n) => n != 0,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
            Err(e) if is_disconnect(e.kind()) => false,
            Err(e) => {
                log::debug!("status probe on {:?} failed: {}", handle, e);
                return Ok(ScriptValue::Nil);
            }
        };

        Ok(ScriptValue::Symbol(if connected {
            symbols::CONNECTED
        } else {
            symbols::DISCONNECTED
        }))
    }

    /// `tcp-send`: `t`, `'disconnected`, or `nil`.
    pub(crate) fn tcp_send(&self, handle: SocketHandle, data: &[u8]) -> NetResult<ScriptValue> {
        if !self.sockets.is_valid(handle) {
            return Ok(ScriptValue::Nil);
        }

        match self.transport.send(handle, data) {
            Ok(n) => {
                log::debug!("sent {} bytes on {:?}", n, handle);
                Ok(ScriptValue::t())
            }
            Err(e) if is_disconnect(e.kind()) => Ok(disconnected()),
            Err(e) => {
                log::debug!("send on {:?} failed: {}", handle, e);
                Ok(ScriptValue::Nil)
            }
        }
    }

    /// `tcp-recv`: read up to `max_len` bytes.
    ///
    /// With `timeout_secs` the caller is suspended and the socket poller
    /// answers with the data, `'no-data` once the timeout passes, or
    /// `'disconnected`. Without it a single non-blocking read answers
    /// immediately. Either way the receive buffer and the heap room for the
    /// result are secured before anything else happens.
    pub(crate) fn tcp_recv(
        &self,
        ctx: &dyn NativeContext,
        handle: SocketHandle,
        max_len: usize,
        timeout_secs: Option<f64>,
        decode_as_text: bool,
    ) -> NetResult<Completion> {
        if max_len == 0 {
            return Err(NetError::InvalidArgument("max-len must be at least 1"));
        }
        if max_len > self.config.max_recv_len {
            return Err(NetError::RecvTooLarge {
                max: self.config.max_recv_len,
            });
        }
        if !self.sockets.is_valid(handle) {
            return Ok(Completion::Ready(ScriptValue::Nil));
        }

        if !ctx.reserve_bytes(max_len + decode_as_text as usize) {
            return Err(NetError::OutOfMemory);
        }
        let buffer = recv_buffer(max_len)?;

        let Some(secs) = timeout_secs else {
            return Ok(Completion::Ready(self.recv_now(handle, buffer, decode_as_text)));
        };

        let context = ctx.current_context();
        if !self.suspender.suspend(context, WaitKind::SocketRecv) {
            return Err(NetError::Fatal(format!("{:?} is already blocked", context)));
        }
        let wait = SocketRecvWait {
            context,
            socket: handle,
            buffer,
            timeout: timeout_from_secs(secs),
            decode_as_text,
        };
        if let Err(e) = self.waits.try_register(PendingWait::SocketRecv(wait)) {
            self.suspender.withdraw(context);
            return Err(e);
        }
        Ok(Completion::Suspended)
    }

    fn recv_now(
        &self,
        handle: SocketHandle,
        mut buf: Vec<u8>,
        decode_as_text: bool,
    ) -> ScriptValue {
        match self.transport.recv(handle, &mut buf, RecvFlags::NONBLOCKING) {
            Ok(0) => disconnected(),
            Ok(n) => received_value(&buf[..n], decode_as_text),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                ScriptValue::Symbol(symbols::NO_DATA)
            }
            Err(e) if is_disconnect(e.kind()) => disconnected(),
            Err(e) => {
                log::debug!("recv on {:?} failed: {}", handle, e);
                ScriptValue::Nil
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_from_secs() {
        assert_eq!(timeout_from_secs(1.5), Duration::from_millis(1500));
        assert_eq!(timeout_from_secs(0.0), Duration::ZERO);
        assert_eq!(timeout_from_secs(-3.0), Duration::ZERO);
        assert_eq!(timeout_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(timeout_from_secs(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn test_recv_buffer_allocation() {
        assert_eq!(recv_buffer(16).unwrap(), vec![0u8; 16]);
        assert_eq!(recv_buffer(usize::MAX), Err(NetError::OutOfMemory));
    }
}
