//! Shared fixtures: a simulated wifi stack, a scriptable runtime context and
//! an extension harness.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::cell::Cell;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use wisp_net::{
    AccessPoint, ConnectionState, LinkEvent, LinkEventListener, NetConfig, RecvFlags,
    ResumeQueue, Resumption, ScanConfig, SocketHandle, SocketTransport, StackError, Suspender,
    TcpTransport, WifiExtensions, WifiMode, WifiStack,
};
use wisp_sdk::{
    ContextId, EventSink, NativeCallResult, NativeContext, NativeError, NativeFunctionRegistry,
    ScriptValue,
};

// ── Simulated wifi stack ──

struct SimState {
    mode: WifiMode,
    connection: ConnectionState,
    auto_reconnect: bool,
    accept_joins: bool,
    records: Vec<AccessPoint>,
    scan_error: Option<StackError>,
    scans: usize,
    clears: usize,
    joins: Vec<(String, Option<String>)>,
}

/// In-process stand-in for the radio driver. Link events are injected by
/// the test with `emit`.
pub struct SimStack {
    state: Mutex<SimState>,
    listener: Mutex<Option<Arc<dyn LinkEventListener>>>,
}

impl SimStack {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SimState {
                mode: WifiMode::Station,
                connection: ConnectionState::Disconnected,
                auto_reconnect: false,
                accept_joins: true,
                records: Vec::new(),
                scan_error: None,
                scans: 0,
                clears: 0,
                joins: Vec::new(),
            }),
            listener: Mutex::new(None),
        })
    }

    pub fn set_mode(&self, mode: WifiMode) {
        self.state.lock().mode = mode;
    }

    pub fn set_connection(&self, connection: ConnectionState) {
        self.state.lock().connection = connection;
    }

    pub fn set_records(&self, records: Vec<AccessPoint>) {
        self.state.lock().records = records;
    }

    pub fn fail_scans_with(&self, error: Option<StackError>) {
        self.state.lock().scan_error = error;
    }

    pub fn refuse_joins(&self) {
        self.state.lock().accept_joins = false;
    }

    pub fn scans(&self) -> usize {
        self.state.lock().scans
    }

    pub fn clears(&self) -> usize {
        self.state.lock().clears
    }

    pub fn joins(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().joins.clone()
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Deliver a link event the way the driver's event task would.
    pub fn emit(&self, event: LinkEvent) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_link_event(event);
        }
    }
}

impl WifiStack for SimStack {
    fn mode(&self) -> WifiMode {
        self.state.lock().mode
    }

    fn start_scan(&self, _config: &ScanConfig) -> Result<(), StackError> {
        let mut state = self.state.lock();
        if let Some(error) = state.scan_error.clone() {
            return Err(error);
        }
        state.scans += 1;
        Ok(())
    }

    fn scan_records(&self) -> Result<Vec<AccessPoint>, StackError> {
        Ok(self.state.lock().records.clone())
    }

    fn clear_scan_records(&self) {
        self.state.lock().clears += 1;
    }

    fn change_network(&self, ssid: &str, password: Option<&str>) -> bool {
        let mut state = self.state.lock();
        state
            .joins
            .push((ssid.to_string(), password.map(str::to_string)));
        if state.accept_joins {
            state.connection = ConnectionState::Connecting;
        }
        state.accept_joins
    }

    fn disconnect(&self) {
        self.state.lock().connection = ConnectionState::Disconnected;
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    fn auto_reconnect(&self) -> bool {
        self.state.lock().auto_reconnect
    }

    fn set_auto_reconnect(&self, enabled: bool) -> bool {
        std::mem::replace(&mut self.state.lock().auto_reconnect, enabled)
    }

    fn set_event_listener(&self, listener: Arc<dyn LinkEventListener>) {
        *self.listener.lock() = Some(listener);
    }
}

// ── Transport that resolves nothing ──

/// Transport whose name lookups always fail
pub struct NoDnsTransport;

impl SocketTransport for NoDnsTransport {
    fn resolve(&self, _host: &str, _port: u16) -> Option<SocketAddr> {
        None
    }
    fn connect(&self, _addr: SocketAddr) -> io::Result<SocketHandle> {
        Err(io::ErrorKind::ConnectionRefused.into())
    }
    fn send(&self, _handle: SocketHandle, _data: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::NotConnected.into())
    }
    fn recv(&self, _handle: SocketHandle, _buf: &mut [u8], _flags: RecvFlags) -> io::Result<usize> {
        Err(io::ErrorKind::NotConnected.into())
    }
    fn close(&self, _handle: SocketHandle) -> io::Result<()> {
        Ok(())
    }
}

// ── Runtime side ──

/// Calling context with a controllable heap
pub struct TestContext {
    pub id: ContextId,
    heap_ok: Cell<bool>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            id: ContextId::new(),
            heap_ok: Cell::new(true),
        }
    }

    pub fn set_heap_ok(&self, ok: bool) {
        self.heap_ok.set(ok);
    }
}

impl NativeContext for TestContext {
    fn current_context(&self) -> ContextId {
        self.id
    }

    fn reserve(&self, _values: usize) -> bool {
        self.heap_ok.get()
    }
}

/// Event sink remembering every posted event
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ScriptValue>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ScriptValue> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn post_event(&self, event: ScriptValue) -> bool {
        self.events.lock().push(event);
        true
    }
}

// ── Harness ──

pub struct Harness {
    pub stack: Arc<SimStack>,
    pub ext: Arc<WifiExtensions>,
    pub suspender: Arc<Suspender>,
    pub queue: ResumeQueue,
    pub events: Arc<RecordingSink>,
    pub registry: NativeFunctionRegistry,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Arc::new(TcpTransport::default()), NetConfig::default())
    }

    pub fn with(transport: Arc<dyn SocketTransport>, config: NetConfig) -> Self {
        let stack = SimStack::new();
        let (suspender, queue) = Suspender::channel();
        let suspender = Arc::new(suspender);
        let events = Arc::new(RecordingSink::default());

        let ext = WifiExtensions::new(
            config,
            stack.clone(),
            transport,
            suspender.clone(),
            events.clone(),
        )
        .unwrap();
        let mut registry = NativeFunctionRegistry::new();
        ext.load(&mut registry);

        Self {
            stack,
            ext,
            suspender,
            queue,
            events,
            registry,
        }
    }

    pub fn call(&self, ctx: &TestContext, name: &str, args: &[ScriptValue]) -> NativeCallResult {
        self.registry
            .call(name, ctx, args)
            .unwrap_or_else(|| panic!("{} is not registered", name))
    }

    /// Next resumption, failing the test if none arrives in time
    pub fn resumption(&self) -> Resumption {
        self.queue
            .next_timeout(Duration::from_secs(5))
            .expect("no resumption delivered")
    }

    /// Check that nothing is resumed for a short while
    pub fn no_resumption(&self) -> bool {
        self.queue.next_timeout(Duration::from_millis(100)).is_none()
    }
}

// ── Value helpers ──

pub fn s(text: &str) -> ScriptValue {
    ScriptValue::String(text.to_string())
}

pub fn sym(name: &'static str) -> ScriptValue {
    ScriptValue::Symbol(wisp_sdk::Symbol::new(name))
}

pub fn value(result: NativeCallResult) -> ScriptValue {
    match result {
        NativeCallResult::Value(v) => v,
        other => panic!("expected a value, got {:?}", other),
    }
}

pub fn eval_error(result: NativeCallResult) -> String {
    match result {
        NativeCallResult::Error(NativeError::EvalError(reason)) => reason,
        other => panic!("expected an eval error, got {:?}", other),
    }
}
