//! Shared fixtures for player tests
//!
//! The player runs against the in-memory renderer and a connector that
//! records what it was asked to do. Socket events are injected through the
//! dispatch queue, so every test drives the exact same code path the async
//! driver does.

#![allow(dead_code)]

use base64::Engine;
use bytes::Bytes;
use fluplay::*;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const URL: &str = "ws://stream.test/camera/mse_ld";
pub const START: f64 = 1_700_000_000.0;
pub const VIDEO: TrackId = 1;
pub const AUDIO: TrackId = 2;

#[derive(Debug, Default)]
pub struct ConnectorLog {
    pub connects: Vec<(ConnectionId, String, Duration)>,
    pub sent: Vec<(ConnectionId, String)>,
    pub closed: Vec<ConnectionId>,
}

/// Connector recording every socket and command
///
/// With `scripted` set it also plays the server: sockets open at once, every
/// command is acknowledged and a close request is answered with a close
/// event.
#[derive(Debug, Default, Clone)]
pub struct RecordingConnector {
    pub log: Arc<Mutex<ConnectorLog>>,
    pub scripted: bool,
}

impl RecordingConnector {
    pub fn scripted() -> Self {
        Self {
            scripted: true,
            ..Default::default()
        }
    }
}

struct RecordingTransport {
    id: ConnectionId,
    log: Arc<Mutex<ConnectorLog>>,
    server: Option<Dispatcher>,
}

impl Transport for RecordingTransport {
    fn send_text(&mut self, text: &str) -> Result<(), FluError> {
        self.log.lock().sent.push((self.id, text.to_string()));
        if let Some(server) = &self.server {
            server.connection(
                self.id,
                ConnectionEventKind::Message(WireMessage::Text(ack_message())),
            );
        }
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().closed.push(self.id);
        if let Some(server) = &self.server {
            server.connection(self.id, ConnectionEventKind::Close);
        }
    }
}

impl Connector for RecordingConnector {
    fn connect(
        &mut self,
        id: ConnectionId,
        url: &str,
        delay: Duration,
        dispatcher: Dispatcher,
    ) -> Result<Box<dyn Transport>, FluError> {
        self.log
            .lock()
            .connects
            .push((id, url.to_string(), delay));
        let server = self.scripted.then(|| {
            dispatcher.connection(id, ConnectionEventKind::Open);
            dispatcher
        });
        Ok(Box::new(RecordingTransport {
            id,
            log: self.log.clone(),
            server,
        }))
    }
}

pub fn ack_message() -> String {
    json!({ "type": "event", "event": { "status": "ok" } }).to_string()
}

pub fn init_message() -> String {
    init_message_with(json!([{ "content": "video" }, { "content": "audio" }]))
}

pub fn init_message_with(declared: serde_json::Value) -> String {
    let encode = |raw: &[u8]| base64::engine::general_purpose::STANDARD.encode(raw);
    json!({
        "type": "mse_init_segment",
        "metadata": { "tracks": declared },
        "tracks": [
            { "id": VIDEO, "content": "video", "payload": encode(b"init-video") },
            { "id": AUDIO, "content": "audio", "payload": encode(b"init-audio") }
        ]
    })
    .to_string()
}

/// Binary frame for `track_id` stamped with `timestamp`
pub fn segment(track_id: TrackId, timestamp: f64) -> Bytes {
    let mut frame = vec![0u8; 128];
    frame[47] = track_id;
    let seconds = timestamp.trunc() as u32;
    let micros = (timestamp.fract() * 1_000_000.0).round() as u32;
    frame[92..96].copy_from_slice(&seconds.to_be_bytes());
    frame[96..100].copy_from_slice(&micros.to_be_bytes());
    Bytes::from(frame)
}

pub fn builder() -> PlayerBuilder {
    PlayerBuilder::new().url(URL).start_time(START)
}

pub struct Harness {
    pub player: Player<MemoryRenderer, RecordingConnector>,
    pub queue: DispatchQueue,
    pub media: MemoryHandle,
    pub log: Arc<Mutex<ConnectorLog>>,
    pub events: EventStream,
    dispatcher: Dispatcher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_builder(builder())
    }

    pub fn with_builder(builder: PlayerBuilder) -> Self {
        let queue = DispatchQueue::new();
        let renderer = MemoryRenderer::new(queue.dispatcher());
        let media = renderer.handle();
        let connector = RecordingConnector::default();
        let log = connector.log.clone();
        let (player, events) = builder
            .build(renderer, connector, queue.dispatcher())
            .unwrap();
        let dispatcher = queue.dispatcher();
        Self {
            player,
            queue,
            media,
            log,
            events,
            dispatcher,
        }
    }

    /// Feed every queued event to the player
    pub fn pump(&mut self) {
        while let Some(event) = self.queue.try_recv() {
            self.player.handle(event);
        }
    }

    pub fn socket(&self) -> ConnectionId {
        self.player
            .connection()
            .current_id()
            .expect("no current socket")
    }

    pub fn socket_event(&mut self, id: ConnectionId, kind: ConnectionEventKind) {
        self.dispatcher.connection(id, kind);
        self.pump();
    }

    pub fn open(&mut self) {
        self.socket_event(self.socket(), ConnectionEventKind::Open);
    }

    pub fn close(&mut self) {
        self.socket_event(self.socket(), ConnectionEventKind::Close);
    }

    pub fn text(&mut self, text: String) {
        self.socket_event(
            self.socket(),
            ConnectionEventKind::Message(WireMessage::Text(text)),
        );
    }

    pub fn ack(&mut self) {
        self.text(ack_message());
    }

    pub fn init(&mut self) {
        self.text(init_message());
    }

    pub fn binary(&mut self, data: Bytes) {
        self.socket_event(
            self.socket(),
            ConnectionEventKind::Message(WireMessage::Binary(data)),
        );
    }

    pub fn media(&mut self, track_id: TrackId, timestamp: f64) {
        self.binary(segment(track_id, timestamp));
    }

    pub fn play(&mut self) {
        self.player.play();
        self.pump();
    }

    pub fn pause(&mut self) {
        self.player.pause();
        self.pump();
    }

    pub fn complete(&mut self, track_id: TrackId) -> bool {
        let completed = self.media.complete_append(track_id);
        self.pump();
        completed
    }

    /// Play, open, acknowledge and initialize both tracks
    ///
    /// Leaves the player loading with the gate open and clears the command
    /// log and the event stream.
    pub fn start(&mut self) {
        self.play();
        self.open();
        self.ack();
        self.init();
        self.complete(VIDEO);
        self.complete(AUDIO);
        self.take_sent();
        self.take_events();
    }

    pub fn sent(&self) -> Vec<String> {
        self.log
            .lock()
            .sent
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn take_sent(&mut self) -> Vec<String> {
        self.log
            .lock()
            .sent
            .drain(..)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.events.try_next() {
            events.push(event);
        }
        events
    }

    pub fn connects(&self) -> Vec<(ConnectionId, String, Duration)> {
        self.log.lock().connects.clone()
    }
}
