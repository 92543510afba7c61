//! In-memory RFCOMM transport for driving a chat session in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bluer::Address;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, DuplexStream};
use tokio::sync::mpsc;
use uuid::Uuid;

use rfcomm_chat::bluetooth::{RfcommTransport, SdpAttribute};
use rfcomm_chat::{ChatSession, SessionEvent, TransportError};

pub const PEER_NAME: &str = "Test Phone";
pub const SERVICE_NAME: &str = "bluetooth rfcomm sample";
pub const WAIT: Duration = Duration::from_secs(5);

/// Address of the simulated remote device.
pub fn peer() -> Address {
    Address::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])
}

/// Transport calls, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Advertise(Vec<SdpAttribute>),
    StopAdvertising,
    Bind,
    CloseListener,
    Connect(Address),
}

pub struct MockAdvertisement;
pub struct MockListener;

pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    radio_on: AtomicBool,
    fail_advertise: AtomicBool,
    fail_bind: AtomicBool,
    fail_accept: AtomicBool,
    incoming_tx: mpsc::UnboundedSender<(DuplexStream, Address)>,
    incoming_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(DuplexStream, Address)>>,
    outgoing: Mutex<VecDeque<DuplexStream>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            radio_on: AtomicBool::new(true),
            fail_advertise: AtomicBool::new(false),
            fail_bind: AtomicBool::new(false),
            fail_accept: AtomicBool::new(false),
            incoming_tx,
            incoming_rx: tokio::sync::Mutex::new(incoming_rx),
            outgoing: Mutex::new(VecDeque::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn set_radio_on(&self, on: bool) {
        self.radio_on.store(on, Ordering::SeqCst);
    }

    pub fn set_fail_advertise(&self, fail: bool) {
        self.fail_advertise.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_bind(&self, fail: bool) {
        self.fail_bind.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_accept(&self, fail: bool) {
        self.fail_accept.store(fail, Ordering::SeqCst);
    }

    /// Simulate a remote client connecting. Returns the client end.
    pub fn dial(&self) -> DuplexStream {
        let (client, server) = duplex(1024);
        self.incoming_tx
            .send((server, peer()))
            .expect("mock transport dropped");
        client
    }

    /// Prepare a remote server for the next `connect`. Returns the server end.
    pub fn serve(&self) -> DuplexStream {
        let (client, server) = duplex(1024);
        self.outgoing.lock().push_back(client);
        server
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl RfcommTransport for MockTransport {
    type Advertisement = MockAdvertisement;
    type Listener = MockListener;
    type Stream = DuplexStream;

    async fn advertise(
        &self,
        _service_id: Uuid,
        attributes: &[SdpAttribute],
    ) -> Result<MockAdvertisement, TransportError> {
        if !self.radio_on.load(Ordering::SeqCst) {
            return Err(TransportError::RadioUnavailable("radio is off".to_string()));
        }
        if self.fail_advertise.load(Ordering::SeqCst) {
            return Err(TransportError::Advertise("record rejected".to_string()));
        }
        self.record(Call::Advertise(attributes.to_vec()));
        Ok(MockAdvertisement)
    }

    async fn stop_advertising(&self, _advertisement: MockAdvertisement) {
        self.record(Call::StopAdvertising);
    }

    async fn bind(&self, _service_id: Uuid) -> Result<MockListener, TransportError> {
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(TransportError::Bind("address in use".to_string()));
        }
        self.record(Call::Bind);
        Ok(MockListener)
    }

    async fn accept(
        &self,
        _listener: &MockListener,
    ) -> Result<(DuplexStream, Address), TransportError> {
        if self.fail_accept.load(Ordering::SeqCst) {
            return Err(TransportError::Accept("connection reset".to_string()));
        }
        let mut incoming = self.incoming_rx.lock().await;
        incoming
            .recv()
            .await
            .ok_or_else(|| TransportError::Accept("transport closed".to_string()))
    }

    async fn close_listener(&self, _listener: MockListener) {
        self.record(Call::CloseListener);
    }

    async fn connect(
        &self,
        peer: Address,
        _service_id: Uuid,
    ) -> Result<DuplexStream, TransportError> {
        if !self.radio_on.load(Ordering::SeqCst) {
            return Err(TransportError::RadioUnavailable("radio is off".to_string()));
        }
        self.record(Call::Connect(peer));
        self.outgoing
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::Connect("host is down".to_string()))
    }

    async fn resolve_peer_name(&self, _peer: Address) -> String {
        PEER_NAME.to_string()
    }
}

/// A session over a fresh mock transport.
pub fn session() -> (
    ChatSession<MockTransport>,
    Arc<MockTransport>,
    mpsc::Receiver<SessionEvent>,
) {
    let transport = MockTransport::new();
    let (event_tx, event_rx) = mpsc::channel(64);
    let session = ChatSession::new(
        transport.clone(),
        rfcomm_chat::bluetooth::CHAT_SERVICE_UUID,
        SERVICE_NAME,
        event_tx,
    )
    .expect("valid service name");
    (session, transport, event_rx)
}

/// Apply the next transport signal, failing the test if none arrives.
pub async fn step(session: &mut ChatSession<MockTransport>) {
    tokio::time::timeout(WAIT, session.step())
        .await
        .expect("timed out waiting for a session signal");
}

/// Everything emitted so far.
pub fn drain(event_rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        events.push(event);
    }
    events
}

/// Status messages among `events`.
pub fn statuses(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Status(message) => Some(message.clone()),
            _ => None,
        })
        .collect()
}

/// Received message texts among `events`.
pub fn received(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::MessageReceived { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}
