//! Symbolic native function registry for the wifi/tcp extensions
//!
//! Registers every extension by its script-visible name (e.g.
//! "wifi-connect", "tcp-recv") into a `NativeFunctionRegistry`, decoding
//! the raw argument list into the typed operations of `WifiExtensions`.

use crate::error::{NetError, NetResult};
use crate::extensions::{Completion, WifiExtensions};
use crate::handles::SocketHandle;
use crate::wifi::access_point_list;
use std::sync::Arc;
use wisp_sdk::{
    NativeCallResult, NativeContext, NativeError, NativeFunctionRegistry, ScriptValue,
};

/// Register all wifi and tcp extensions into the given registry.
pub fn register_wifi(registry: &mut NativeFunctionRegistry, ext: &Arc<WifiExtensions>) {
    register_wifi_fns(registry, ext);
    register_tcp_fns(registry, ext);
}

fn register_wifi_fns(registry: &mut NativeFunctionRegistry, ext: &Arc<WifiExtensions>) {
    let e = ext.clone();
    registry.register("wifi-scan-networks", move |ctx, args| {
        respond(wifi_scan_networks(&e, ctx, args))
    });
    let e = ext.clone();
    registry.register("wifi-connect", move |ctx, args| respond(wifi_connect(&e, ctx, args)));
    let e = ext.clone();
    registry.register("wifi-disconnect", move |_ctx, args| respond(wifi_disconnect(&e, args)));
    let e = ext.clone();
    registry.register("wifi-status", move |_ctx, args| respond(wifi_status(&e, args)));
    let e = ext.clone();
    registry.register("wifi-auto-reconnect", move |_ctx, args| {
        respond(wifi_auto_reconnect(&e, args))
    });
}

fn register_tcp_fns(registry: &mut NativeFunctionRegistry, ext: &Arc<WifiExtensions>) {
    let e = ext.clone();
    registry.register("tcp-connect", move |_ctx, args| respond(tcp_connect(&e, args)));
    let e = ext.clone();
    registry.register("tcp-close", move |_ctx, args| respond(tcp_close(&e, args)));
    let e = ext.clone();
    registry.register("tcp-status", move |_ctx, args| respond(tcp_status(&e, args)));
    let e = ext.clone();
    registry.register("tcp-send", move |_ctx, args| respond(tcp_send(&e, args)));
    let e = ext.clone();
    registry.register("tcp-recv", move |ctx, args| respond(tcp_recv(&e, ctx, args)));
}

// ── Argument decoding ──

fn check_argn(
    args: &[ScriptValue],
    min: usize,
    max: usize,
    expected: &'static str,
) -> NetResult<()> {
    if args.len() < min || args.len() > max {
        return Err(NetError::ArgumentCount {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn type_error(args: &[ScriptValue], index: usize, expected: &'static str) -> NetError {
    NetError::ArgumentType {
        index,
        expected,
        got: args.get(index).map(|v| v.type_name()).unwrap_or("nothing"),
    }
}

fn number(args: &[ScriptValue], index: usize) -> NetResult<f64> {
    args.get(index)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| type_error(args, index, "number"))
}

fn integer(args: &[ScriptValue], index: usize) -> NetResult<i64> {
    args.get(index)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| type_error(args, index, "number"))
}

fn text(args: &[ScriptValue], index: usize) -> NetResult<&str> {
    args.get(index)
        .and_then(|v| v.as_str())
        .ok_or_else(|| type_error(args, index, "string"))
}

fn boolean(args: &[ScriptValue], index: usize) -> NetResult<bool> {
    args.get(index)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| type_error(args, index, "bool"))
}

fn socket(args: &[ScriptValue], index: usize) -> NetResult<SocketHandle> {
    args.get(index)
        .and_then(|v| v.as_i32())
        .map(SocketHandle::from_raw)
        .ok_or_else(|| type_error(args, index, "number"))
}

fn respond(result: NetResult<impl Into<NativeCallResult>>) -> NativeCallResult {
    match result {
        Ok(value) => value.into(),
        Err(e) => NativeCallResult::Error(NativeError::from(e)),
    }
}

// ── wifi ──

fn wifi_scan_networks(
    ext: &WifiExtensions,
    ctx: &dyn NativeContext,
    args: &[ScriptValue],
) -> NetResult<ScriptValue> {
    ext.check_ready()?;
    check_argn(args, 0, 3, "0-3")?;
    let scan_time = if args.is_empty() { None } else { Some(number(args, 0)?) };
    let channel = match args.get(1) {
        None => None,
        Some(_) => Some(
            u8::try_from(integer(args, 1)?)
                .map_err(|_| NetError::InvalidArgument("channel out of range"))?,
        ),
    };
    let show_hidden = if args.len() < 3 { false } else { boolean(args, 2)? };
    let records = ext.scan_networks(ctx, scan_time, channel, show_hidden)?;
    Ok(access_point_list(records))
}

fn wifi_connect(
    ext: &WifiExtensions,
    ctx: &dyn NativeContext,
    args: &[ScriptValue],
) -> NetResult<Completion> {
    ext.check_ready()?;
    check_argn(args, 2, 2, "2")?;
    let ssid = text(args, 0)?;
    let password = if args[1].is_nil() { None } else { Some(text(args, 1)?) };
    ext.connect(ctx, ssid, password)
}

fn wifi_disconnect(ext: &WifiExtensions, args: &[ScriptValue]) -> NetResult<ScriptValue> {
    ext.check_ready()?;
    check_argn(args, 0, 0, "0")?;
    Ok(ext.disconnect())
}

fn wifi_status(ext: &WifiExtensions, args: &[ScriptValue]) -> NetResult<ScriptValue> {
    ext.check_ready()?;
    check_argn(args, 0, 0, "0")?;
    Ok(ScriptValue::Symbol(ext.status()))
}

fn wifi_auto_reconnect(ext: &WifiExtensions, args: &[ScriptValue]) -> NetResult<ScriptValue> {
    ext.check_ready()?;
    check_argn(args, 0, 1, "0-1")?;
    let enabled = if args.is_empty() { None } else { Some(boolean(args, 0)?) };
    Ok(ScriptValue::Bool(ext.auto_reconnect(enabled)))
}

// ── tcp ──

fn tcp_connect(ext: &WifiExtensions, args: &[ScriptValue]) -> NetResult<ScriptValue> {
    ext.check_ready()?;
    check_argn(args, 2, 2, "2")?;
    let host = text(args, 0)?;
    let port = u16::try_from(integer(args, 1)?)
        .map_err(|_| NetError::InvalidArgument("port out of range"))?;
    ext.tcp_connect(host, port)
}

fn tcp_close(ext: &WifiExtensions, args: &[ScriptValue]) -> NetResult<ScriptValue> {
    ext.check_ready()?;
    check_argn(args, 1, 1, "1")?;
    ext.tcp_close(socket(args, 0)?)
}

fn tcp_status(ext: &WifiExtensions, args: &[ScriptValue]) -> NetResult<ScriptValue> {
    ext.check_ready()?;
    check_argn(args, 1, 1, "1")?;
    ext.tcp_status(socket(args, 0)?)
}

fn tcp_send(ext: &WifiExtensions, args: &[ScriptValue]) -> NetResult<ScriptValue> {
    ext.check_ready()?;
    check_argn(args, 2, 2, "2")?;
    let handle = socket(args, 0)?;
    let data = args[1].as_bytes().ok_or_else(|| type_error(args, 1, "byte-array"))?;
    ext.tcp_send(handle, data)
}

fn tcp_recv(
    ext: &WifiExtensions,
    ctx: &dyn NativeContext,
    args: &[ScriptValue],
) -> NetResult<Completion> {
    ext.check_ready()?;
    check_argn(args, 2, 4, "2-4")?;
    let handle = socket(args, 0)?;
    // Negative lengths read as 0 and are rejected with it
    let max_len = usize::try_from(integer(args, 1)?).unwrap_or(0);
    // Omitted: default timeout. nil: answer immediately.
    let timeout = match args.get(2) {
        None => Some(ext.config.default_recv_timeout_secs),
        Some(ScriptValue::Nil) => None,
        Some(_) => Some(number(args, 2)?),
    };
    let as_text = if args.len() < 4 { true } else { boolean(args, 3)? };
    ext.tcp_recv(ctx, handle, max_len, timeout, as_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_argn_bounds() {
        let args = [ScriptValue::Int(1), ScriptValue::Int(2)];
        assert!(check_argn(&args, 2, 4, "2-4").is_ok());
        assert_eq!(
            check_argn(&args[..1], 2, 4, "2-4"),
            Err(NetError::ArgumentCount {
                expected: "2-4",
                got: 1
            })
        );
    }

    #[test]
    fn test_decoders_report_position_and_type() {
        let args = [ScriptValue::String("x".into()), ScriptValue::Float(2.5)];
        assert_eq!(number(&args, 1), Ok(2.5));
        assert_eq!(text(&args, 0), Ok("x"));
        assert_eq!(
            number(&args, 0),
            Err(NetError::ArgumentType {
                index: 0,
                expected: "number",
                got: "string"
            })
        );
        assert_eq!(
            boolean(&args, 5),
            Err(NetError::ArgumentType {
                index: 5,
                expected: "bool",
                got: "nothing"
            })
        );
    }

    #[test]
    fn test_integer_truncates_floats() {
        let args = [ScriptValue::Float(80.9), ScriptValue::Int(-1)];
        assert_eq!(integer(&args, 0), Ok(80));
        assert_eq!(integer(&args, 1), Ok(-1));
        assert!(integer(&[ScriptValue::Nil], 0).is_err());
    }

    #[test]
    fn test_nil_reads_as_false() {
        assert_eq!(boolean(&[ScriptValue::Nil], 0), Ok(false));
        assert_eq!(boolean(&[ScriptValue::t()], 0), Ok(true));
    }

    #[test]
    fn test_socket_from_number() {
        assert_eq!(
            socket(&[ScriptValue::Int(54)], 0),
            Ok(SocketHandle::from_raw(54))
        );
        assert!(socket(&[ScriptValue::Nil], 0).is_err());
    }
}
