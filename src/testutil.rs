//! Shared test doubles: in-memory capability store, recording automation
//! bus, and a scripted client factory.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::config::ConnectionParams;
use crate::error::BridgeError;
use crate::esphome::client::{ClientConfig, ClientEvent, ClientFactory, EspClient};
use crate::models::{CapabilityValue, Side};
use crate::platform::{AutomationBus, CapabilityStore, TriggerCard};

pub fn make_params(host: &str, port: u16) -> ConnectionParams {
    ConnectionParams {
        host: host.to_string(),
        port,
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, CapabilityValue>>,
    write_counts: Mutex<HashMap<String, u32>>,
    registered: Mutex<HashSet<String>>,
    available: Mutex<Option<bool>>,
    unavailable_reasons: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, key: &str) -> Option<CapabilityValue> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn write_count(&self, key: &str) -> u32 {
        self.write_counts
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }

    /// Seed a value directly, bypassing write accounting.
    pub fn set_raw(&self, key: &str, value: CapabilityValue) {
        self.values.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn availability(&self) -> Option<bool> {
        *self.available.lock().unwrap()
    }

    pub fn last_unavailable_reason(&self) -> Option<String> {
        self.unavailable_reasons.lock().unwrap().last().cloned()
    }

    pub fn added_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.registered.lock().unwrap().iter().cloned().collect();
        keys.sort();
        keys
    }
}

impl CapabilityStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CapabilityValue> {
        self.value(key)
    }

    fn set(&self, key: &str, value: CapabilityValue) -> Result<(), BridgeError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BridgeError::Store("store rejected write".into()));
        }
        self.values.lock().unwrap().insert(key.to_string(), value);
        *self
            .write_counts
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    fn has(&self, key: &str) -> bool {
        self.values.lock().unwrap().contains_key(key)
            || self.registered.lock().unwrap().contains(key)
    }

    fn add(&self, key: &str) -> Result<(), BridgeError> {
        self.registered.lock().unwrap().insert(key.to_string());
        Ok(())
    }

    fn set_available(&self) {
        *self.available.lock().unwrap() = Some(true);
    }

    fn set_unavailable(&self, reason: &str) {
        *self.available.lock().unwrap() = Some(false);
        self.unavailable_reasons
            .lock()
            .unwrap()
            .push(reason.to_string());
    }
}

// ============================================================================
// RecordingBus
// ============================================================================

#[derive(Default)]
pub struct RecordingBus {
    fired: Mutex<Vec<(TriggerCard, Side)>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> Vec<(TriggerCard, Side)> {
        self.fired.lock().unwrap().clone()
    }
}

impl AutomationBus for RecordingBus {
    fn fire(&self, card: TriggerCard, side: Side) {
        self.fired.lock().unwrap().push((card, side));
    }
}

// ============================================================================
// FakeClient
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SentCommand {
    Number(String, f64),
    Button(String),
    Switch(String, bool),
    Select(String, String),
}

pub struct FakeClient {
    connected: AtomicBool,
    fail_connect: AtomicBool,
    fail_disconnect: AtomicBool,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<SentCommand>>,
    events_tx: broadcast::Sender<ClientEvent>,
}

impl Default for FakeClient {
    fn default() -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_disconnect: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            events_tx,
        }
    }
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentCommand> {
        self.sent.lock().unwrap().clone()
    }

    /// Push an event into the stream, as the device would.
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.events_tx.send(event);
    }

    fn record(&self, command: SentCommand) -> Result<(), BridgeError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BridgeError::Command("send failed".into()));
        }
        self.sent.lock().unwrap().push(command);
        Ok(())
    }
}

#[async_trait]
impl EspClient for FakeClient {
    async fn connect(&self) -> Result<(), BridgeError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(BridgeError::Connect("connect refused".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BridgeError> {
        self.connected.store(false, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(BridgeError::Command("teardown failed".into()));
        }
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events_tx.subscribe()
    }

    async fn send_number(&self, id: &str, value: f64) -> Result<(), BridgeError> {
        self.record(SentCommand::Number(id.to_string(), value))
    }

    async fn send_button(&self, id: &str) -> Result<(), BridgeError> {
        self.record(SentCommand::Button(id.to_string()))
    }

    async fn send_switch(&self, id: &str, on: bool) -> Result<(), BridgeError> {
        self.record(SentCommand::Switch(id.to_string(), on))
    }

    async fn send_select(&self, id: &str, option: &str) -> Result<(), BridgeError> {
        self.record(SentCommand::Select(id.to_string(), option.to_string()))
    }
}

// ============================================================================
// FakeFactory
// ============================================================================

#[derive(Default)]
struct FactoryInner {
    scripted_probes: Mutex<VecDeque<bool>>,
    default_probe: AtomicBool,
    probe_calls: AtomicUsize,
    fail_create: AtomicBool,
    fail_next_connect: AtomicBool,
    created: Mutex<Vec<Arc<FakeClient>>>,
}

/// Scripted factory: probes answer from a script (falling back to a default),
/// created clients are retained for inspection. Clones share state.
#[derive(Clone, Default)]
pub struct FakeFactory {
    inner: Arc<FactoryInner>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_probes<I: IntoIterator<Item = bool>>(&self, results: I) {
        self.inner
            .scripted_probes
            .lock()
            .unwrap()
            .extend(results);
    }

    pub fn set_default_probe(&self, reachable: bool) {
        self.inner.default_probe.store(reachable, Ordering::SeqCst);
    }

    pub fn probe_calls(&self) -> usize {
        self.inner.probe_calls.load(Ordering::SeqCst)
    }

    pub fn fail_create(&self, fail: bool) {
        self.inner.fail_create.store(fail, Ordering::SeqCst);
    }

    /// The next created client refuses to connect.
    pub fn fail_next_connect(&self, fail: bool) {
        self.inner.fail_next_connect.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<Arc<FakeClient>> {
        self.inner.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    type Client = FakeClient;

    async fn create(&self, _config: &ClientConfig) -> Result<Arc<FakeClient>, BridgeError> {
        if self.inner.fail_create.load(Ordering::SeqCst) {
            return Err(BridgeError::Connect("factory refused".into()));
        }
        let client = Arc::new(FakeClient::new());
        if self.inner.fail_next_connect.swap(false, Ordering::SeqCst) {
            client.fail_connect(true);
        }
        self.inner.created.lock().unwrap().push(client.clone());
        Ok(client)
    }

    async fn probe(&self, _host: &str, _port: u16, _timeout: Duration) -> bool {
        self.inner.probe_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.inner.scripted_probes.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.inner.default_probe.load(Ordering::SeqCst))
    }
}
