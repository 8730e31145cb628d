//! Loading, reloading and configuring the extensions

mod common;

use common::{s, value, Harness, TestContext};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use wisp_net::{NetConfig, RecvFlags, SocketHandle, SocketTransport, TcpTransport};
use wisp_sdk::{NativeFunctionRegistry, ScriptValue};

/// TCP transport whose `close` lingers after the socket is gone
#[derive(Default)]
struct LingeringClose {
    inner: TcpTransport,
}

impl SocketTransport for LingeringClose {
    fn resolve(&self, host: &str, port: u16) -> Option<SocketAddr> {
        self.inner.resolve(host, port)
    }
    fn connect(&self, addr: SocketAddr) -> io::Result<SocketHandle> {
        self.inner.connect(addr)
    }
    fn send(&self, handle: SocketHandle, data: &[u8]) -> io::Result<usize> {
        self.inner.send(handle, data)
    }
    fn recv(&self, handle: SocketHandle, buf: &mut [u8], flags: RecvFlags) -> io::Result<usize> {
        self.inner.recv(handle, buf, flags)
    }
    fn close(&self, handle: SocketHandle) -> io::Result<()> {
        let closed = self.inner.close(handle);
        thread::sleep(Duration::from_millis(100));
        closed
    }
}

#[test]
fn test_load_starts_poller_and_installs_listener() {
    let h = Harness::new();
    assert!(h.ext.poller_running());
    assert!(h.stack.has_listener());
}

#[test]
fn test_reload_closes_sockets_and_keeps_poller() {
    let h = Harness::new();
    let ctx = TestContext::new();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let sock = value(h.call(&ctx, "tcp-connect", &[s("127.0.0.1"), ScriptValue::Int(port as i64)]));
    let (mut peer, _) = listener.accept().unwrap();
    assert_eq!(h.ext.sockets().len(), 1);

    let mut registry = NativeFunctionRegistry::new();
    h.ext.load(&mut registry);

    assert!(h.ext.sockets().is_empty());
    assert!(h.ext.poller_running());
    assert_eq!(registry.len(), 10);

    // The peer sees the connection go away
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(peer.read(&mut buf).unwrap_or(0), 0);

    // And the old handle is no longer valid
    assert_eq!(value(h.call(&ctx, "tcp-status", &[sock])), ScriptValue::Nil);
}

#[test]
fn test_reload_drops_pending_wait() {
    let h = Harness::new();
    let ctx = TestContext::new();
    assert!(h.call(&ctx, "wifi-connect", &[s("home"), s("pw")]).is_suspend());

    h.ext.reset();

    assert!(!h.ext.waits().is_busy());
    assert!(!h.suspender.is_blocked(ctx.id));
}

#[test]
fn test_reset_during_recv_resumes_nothing() {
    let h = Harness::with(Arc::new(LingeringClose::default()), NetConfig::default());
    let ctx = TestContext::new();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let sock = value(h.call(&ctx, "tcp-connect", &[s("127.0.0.1"), ScriptValue::Int(port as i64)]));
    let (_peer, _) = listener.accept().unwrap();

    let result = h.call(&ctx, "tcp-recv", &[sock, ScriptValue::Int(8), ScriptValue::Int(5)]);
    assert!(result.is_suspend());
    thread::sleep(Duration::from_millis(20));

    h.ext.reset();

    assert!(h.no_resumption());
    assert!(!h.suspender.is_blocked(ctx.id));
    assert!(h.ext.sockets().is_empty());
}

#[test]
fn test_config_file_drives_limits() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        socket_capacity = 1
        max_ssid_len = 8
        disconnect_events = false
        "#
    )
    .unwrap();
    let config = NetConfig::load(file.path()).unwrap();

    let h = Harness::with(Arc::new(TcpTransport::from_config(&config)), config);
    let ctx = TestContext::new();

    assert_eq!(h.ext.sockets().capacity(), 1);
    assert!(!h.ext.disconnect_events());
    let result = h.call(&ctx, "wifi-connect", &[s("too-long-name"), ScriptValue::Nil]);
    assert!(!result.is_suspend());
    assert_eq!(
        common::eval_error(result),
        "Too long ssid, max: 8 chars."
    );
}
