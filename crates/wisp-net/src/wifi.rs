//! wifi-* extensions
//!
//! Station mode and the one-wait-at-a-time rule are checked by the
//! registered handlers before any argument is decoded.

use crate::error::{NetError, NetResult};
use crate::extensions::{Completion, WifiExtensions};
use crate::stack::{AccessPoint, ConnectionState, ScanConfig, StackError};
use crate::symbols;
use crate::wait::{NetworkChangeWait, PendingWait, WaitKind};
use std::sync::atomic::Ordering;
use wisp_sdk::{NativeContext, ScriptValue, Symbol};

/// Values needed to return one scan record: the list cell plus its
/// three-element entry.
const VALUES_PER_RECORD: usize = 4;

impl WifiExtensions {
    /// `wifi-scan-networks`: passive scan for access points.
    ///
    /// When the runtime cannot hold the result, the records are kept for one
    /// retry that skips the scan; a second failure discards them.
    pub(crate) fn scan_networks(
        &self,
        ctx: &dyn NativeContext,
        scan_time: Option<f64>,
        channel: Option<u8>,
        show_hidden: bool,
    ) -> NetResult<Vec<AccessPoint>> {
        if !self.scan_results_ready.load(Ordering::Relaxed) {
            let config = ScanConfig {
                scan_time: scan_time.unwrap_or(self.config.default_scan_time_secs),
                channel: channel.unwrap_or(0),
                show_hidden,
            };
            self.stack.start_scan(&config).map_err(|e| match e {
                StackError::NotStarted | StackError::NotInitialized => {
                    NetError::Fatal(e.to_string())
                }
                StackError::Busy => NetError::Connecting,
                StackError::NoMemory => NetError::StackNoMemory,
                other => NetError::Stack(other.to_string()),
            })?;
        }

        let records = match self.stack.scan_records() {
            Ok(records) => records,
            Err(e) => {
                log::warn!("reading scan records failed: {}", e);
                self.discard_scan();
                return Err(match e {
                    StackError::NoMemory => NetError::StackNoMemory,
                    other => NetError::Stack(other.to_string()),
                });
            }
        };

        if !ctx.reserve(records.len() * VALUES_PER_RECORD) {
            if self.scan_results_ready.swap(true, Ordering::Relaxed) {
                self.discard_scan();
            }
            return Err(NetError::OutOfMemory);
        }

        self.discard_scan();
        Ok(records)
    }

    fn discard_scan(&self) {
        self.scan_results_ready.store(false, Ordering::Relaxed);
        self.stack.clear_scan_records();
    }

    /// `wifi-connect`: join a network, suspending the caller until the
    /// stack settles on `t`, `'wrong-password` or `nil`.
    pub(crate) fn connect(
        &self,
        ctx: &dyn NativeContext,
        ssid: &str,
        password: Option<&str>,
    ) -> NetResult<Completion> {
        if ssid.len() >= self.config.max_ssid_len {
            return Err(NetError::SsidTooLong {
                max: self.config.max_ssid_len,
            });
        }
        if password.is_some_and(|p| p.len() >= self.config.max_password_len) {
            return Err(NetError::PasswordTooLong {
                max: self.config.max_password_len,
            });
        }

        let context = ctx.current_context();
        if !self.suspender.suspend(context, WaitKind::NetworkChange) {
            return Err(NetError::Fatal(format!("{:?} is already blocked", context)));
        }
        let ticket = match self
            .waits
            .try_register(PendingWait::NetworkChange(NetworkChangeWait { context }))
        {
            Ok(ticket) => ticket,
            Err(e) => {
                self.suspender.withdraw(context);
                return Err(e);
            }
        };

        if !self.stack.change_network(ssid, password) {
            // A link event may already have claimed the wait
            if self.waits.take_network_if(ticket).is_some() {
                self.suspender.withdraw(context);
                log::debug!("joining {:?} could not be started", ssid);
                return Ok(Completion::Ready(ScriptValue::Nil));
            }
        }
        Ok(Completion::Suspended)
    }

    /// `wifi-disconnect`
    pub(crate) fn disconnect(&self) -> ScriptValue {
        self.stack.disconnect();
        ScriptValue::t()
    }

    /// `wifi-status`
    pub(crate) fn status(&self) -> Symbol {
        match self.stack.connection_state() {
            ConnectionState::Connecting => symbols::CONNECTING,
            ConnectionState::Connected => symbols::CONNECTED,
            ConnectionState::Disconnected => symbols::DISCONNECTED,
        }
    }

    /// `wifi-auto-reconnect`: returns the previous setting, changing it
    /// when `enabled` is given.
    pub(crate) fn auto_reconnect(&self, enabled: Option<bool>) -> bool {
        match enabled {
            Some(enabled) => self.stack.set_auto_reconnect(enabled),
            None => self.stack.auto_reconnect(),
        }
    }
}

/// Scan records as a script list of `(ssid rssi channel)`
pub(crate) fn access_point_list(records: Vec<AccessPoint>) -> ScriptValue {
    ScriptValue::List(
        records
            .into_iter()
            .map(|ap| {
                ScriptValue::List(vec![
                    ScriptValue::String(ap.ssid),
                    ScriptValue::Int(ap.rssi as i64),
                    ScriptValue::UInt(ap.channel as u64),
                ])
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_point_list_shape() {
        let list = access_point_list(vec![AccessPoint {
            ssid: "home".into(),
            rssi: -48,
            channel: 6,
        }]);
        let entries = list.as_list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0],
            ScriptValue::List(vec![
                ScriptValue::String("home".into()),
                ScriptValue::Int(-48),
                ScriptValue::UInt(6),
            ])
        );
    }

    #[test]
    fn test_empty_scan_is_nil_like() {
        assert_eq!(access_point_list(Vec::new()).as_list().unwrap().len(), 0);
    }
}
