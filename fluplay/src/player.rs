//! Playback session and command protocol state machine
//!
//! A [`Player`] owns every piece of playback state and is driven by three
//! inputs: [`DispatchEvent`]s from the connection and the renderer, calls on
//! its public methods, and flow timer ticks. Each input is handled to
//! completion before the next one, so no handler ever observes another
//! half-way through.
//!
//! Commands follow a strict request/acknowledge protocol. Sending any
//! command closes the data gate and stops the flow timer; media frames that
//! arrive before the server's `event` acknowledgement belong to the previous
//! position and are dropped. The acknowledgement reopens the gate, re-arms
//! the clock anchor and restarts the timer.

use crate::config::{FlowConfig, PlayerConfig};
use crate::event::{Event, EventStream};
use crate::flow::{FlowController, FlowTimer};
use crate::status::{PlaybackStats, PlaybackStatus};
use bytes::Bytes;
use fluplay_core::segment::to_utc;
use fluplay_core::{
    ConnectionEvent, ConnectionEventKind, ConnectionId, DispatchEvent, Dispatcher, FluError,
    PlaybackClock, RendererEvent, Segment, WireMessage,
};
use fluplay_diagnostics::{ReconnectAnalyzer, ReconnectReport};
use fluplay_media::{DropReason, EnqueueOutcome, MediaRenderer, TrackBuffers, TrackKind};
use fluplay_signaling::{
    Command, Connection, Connector, Inbound, InitSegment, ReconnectDecision, ReconnectPolicy,
    SeekTarget, ServerMessage,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Fluent builder for player configuration
#[derive(Debug, Clone, Default)]
pub struct PlayerBuilder {
    config: PlayerConfig,
}

impl PlayerBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: PlayerConfig) -> Self {
        Self { config }
    }

    /// Set the stream URL (required)
    pub fn url(mut self, url: &str) -> Self {
        self.config.url = url.to_string();
        self
    }

    /// Set the initial real-time cursor
    pub fn start_time(mut self, utc: f64) -> Self {
        self.config.start_time = utc;
        self
    }

    /// Label the video track in logs
    pub fn video_track(mut self, label: &str) -> Self {
        self.config.video_track = Some(label.to_string());
        self
    }

    /// Label the audio track in logs
    pub fn audio_track(mut self, label: &str) -> Self {
        self.config.audio_track = Some(label.to_string());
        self
    }

    /// Set flow control thresholds
    pub fn flow(mut self, flow: FlowConfig) -> Self {
        self.config.flow = flow;
        self
    }

    /// Set the reconnect policy
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.config.reconnect = policy;
        self
    }

    /// Set how far playback rewinds when resuming on an open socket
    pub fn resume_rewind(mut self, seconds: f64) -> Self {
        self.config.resume_rewind = seconds;
        self
    }

    /// Validated configuration
    pub fn config(self) -> Result<PlayerConfig, FluError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Create the player
    pub fn build<R: MediaRenderer, C: Connector>(
        self,
        renderer: R,
        connector: C,
        dispatcher: Dispatcher,
    ) -> Result<(Player<R, C>, EventStream), FluError> {
        Player::new(self.config, renderer, connector, dispatcher)
    }
}

/// Live segment player
pub struct Player<R: MediaRenderer, C: Connector> {
    session_id: Uuid,
    renderer: R,
    connection: Connection<C>,
    tracks: TrackBuffers,
    clock: PlaybackClock,
    flow: FlowController,
    timer: FlowTimer,
    video_track: Option<String>,
    audio_track: Option<String>,
    resume_rewind: f64,
    paused: bool,
    loading: bool,
    live: bool,
    waiting_data: bool,
    stopped: bool,
    pending_init: Option<InitSegment>,
    stats: PlaybackStats,
    reconnects: ReconnectAnalyzer,
    events: mpsc::UnboundedSender<Event>,
}

impl<R: MediaRenderer, C: Connector> Player<R, C> {
    /// Create a paused player
    ///
    /// `dispatcher` must feed the queue this player's events are drained
    /// from; the renderer should report through the same queue.
    pub fn new(
        config: PlayerConfig,
        renderer: R,
        connector: C,
        dispatcher: Dispatcher,
    ) -> Result<(Self, EventStream), FluError> {
        config.validate()?;
        let PlayerConfig {
            url,
            start_time,
            video_track,
            audio_track,
            flow,
            reconnect,
            resume_rewind,
        } = config;

        let session_id = Uuid::new_v4();
        info!("player {} created for {}", session_id, url);

        let (events, receiver) = mpsc::unbounded_channel();
        let player = Self {
            session_id,
            renderer,
            connection: Connection::new(url, connector, dispatcher, reconnect),
            tracks: TrackBuffers::new(),
            clock: PlaybackClock::new(start_time),
            timer: FlowTimer::new(flow.period),
            flow: FlowController::new(flow),
            video_track,
            audio_track,
            resume_rewind,
            paused: true,
            loading: false,
            live: true,
            waiting_data: true,
            stopped: false,
            pending_init: None,
            stats: PlaybackStats::default(),
            reconnects: ReconnectAnalyzer::default(),
            events,
        };
        Ok((player, EventStream::new(receiver)))
    }

    /// Session id, also recorded on the driver's tracing span
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Stream URL
    pub fn url(&self) -> &str {
        self.connection.url()
    }

    /// Whether playback is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether playback follows the live edge
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Whether the server is pushing segments
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether media frames are accepted (no command awaits acknowledgement)
    pub fn is_waiting_data(&self) -> bool {
        self.waiting_data
    }

    /// Whether [`stop`](Self::stop) was called
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Real-time cursor
    pub fn cursor(&self) -> f64 {
        self.clock.cursor()
    }

    /// Session counters
    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    /// Connection manager
    pub fn connection(&self) -> &Connection<C> {
        &self.connection
    }

    /// Registered tracks
    pub fn tracks(&self) -> &TrackBuffers {
        &self.tracks
    }

    /// Renderer
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Reconnect activity over the analyzer's window
    pub fn reconnect_report(&mut self) -> ReconnectReport {
        self.reconnects.report(std::time::Instant::now())
    }

    /// Start playback
    ///
    /// Forwarded to the renderer; its play notification connects or resumes.
    pub fn play(&mut self) {
        self.renderer.play();
    }

    /// Pause playback
    ///
    /// Forwarded to the renderer; its pause notification stops delivery.
    pub fn pause(&mut self) {
        self.renderer.pause();
    }

    /// Jump to a real time or back to the live edge
    pub fn seek(&mut self, target: SeekTarget) {
        debug!("seek to: {}", target);
        // showing the end of what is buffered hides the old position while
        // the new one loads
        self.jump_to_buffered_end();
        match target {
            SeekTarget::Live => {
                self.renderer.set_rate(1.0);
                self.live = true;
            }
            SeekTarget::At(utc) => {
                self.clock.set_cursor(utc);
                self.live = false;
            }
        }
        self.do_seek(target);
    }

    /// Change the playback rate
    pub fn set_rate(&mut self, rate: f64) {
        info!("set playback rate: {}", rate);
        self.renderer.set_rate(rate);
    }

    /// Current playback rate
    pub fn rate(&self) -> f64 {
        self.renderer.rate()
    }

    /// Current real time, once the first video segment anchored the clock
    pub fn time(&self) -> Option<f64> {
        self.clock.real_time(self.renderer.position())
    }

    /// Switch to another stream URL
    ///
    /// The socket is closed; unless paused, the close handler reconnects to
    /// the new URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        info!("set stream URL: {}", url);
        self.connection.set_url(url);
        self.jump_to_buffered_end();
        self.connection.close();
    }

    /// Pause, close the connection and end the stream
    ///
    /// All tracks are released. The player ignores every later event.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        info!("stopping");
        self.renderer.pause();
        self.on_media_pause();
        self.connection.close();
        self.timer.stop();
        self.renderer.end_of_stream();
        self.tracks.clear_all();
        self.pending_init = None;
        self.stopped = true;
    }

    /// Process one dispatched event
    pub fn handle(&mut self, event: DispatchEvent) {
        if self.stopped {
            return;
        }
        match event {
            DispatchEvent::Connection(event) => self.on_connection_event(event),
            DispatchEvent::Renderer(event) => self.on_renderer_event(event),
        }
    }

    /// Run the flow tick if the timer is due at `now`
    pub fn tick(&mut self, now: Instant) {
        if self.timer.fire(now) {
            self.flow_tick();
        }
    }

    /// When the flow timer fires next, if it is armed
    pub fn next_tick(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// One flow control pass
    ///
    /// The checks run in order and each sees the effects of the previous
    /// one.
    pub fn flow_tick(&mut self) {
        let Some(end) = self.tracks.video_end_time() else {
            return;
        };
        let position = self.renderer.position();
        let depth = FlowController::depth(end, position);

        if self.flow.should_pause(depth, self.loading) {
            debug!("buffer depth {:.2}s, pausing delivery", depth);
            self.do_pause();
        }
        if self.flow.should_resume(depth, self.loading) {
            debug!("buffer depth {:.2}s, resuming delivery", depth);
            let target = self.flow.reseek_target(self.clock.cursor());
            self.do_seek(SeekTarget::At(target));
            self.do_resume();
        }
        if let Some(target) = self.flow.catch_up_target(self.live, end, position) {
            debug!("catching up with live edge: {:.2} -> {:.2}", position, target);
            self.renderer.set_position(target);
        }
    }

    /// Snapshot of the current state
    pub fn status(&self) -> PlaybackStatus {
        let time = self.time();
        PlaybackStatus {
            session_id: self.session_id,
            url: self.connection.url().to_string(),
            time,
            utc: time.and_then(to_utc),
            cursor: self.clock.cursor(),
            rate: self.renderer.rate(),
            live: self.live,
            paused: self.paused,
            loading: self.loading,
            waiting_data: self.waiting_data,
            awaiting_start: self.clock.is_awaiting_start(),
            connection: self.connection.state(),
            tracks: self.tracks.len(),
            stats: self.stats.clone(),
            stopped: self.stopped,
        }
    }

    fn on_renderer_event(&mut self, event: RendererEvent) {
        match event {
            RendererEvent::Play => self.on_media_play(),
            RendererEvent::Pause => self.on_media_pause(),
            RendererEvent::RateChange(rate) => {
                self.live = rate == 1.0;
                debug!("playback rate {}, live: {}", rate, self.live);
            }
            RendererEvent::TimeUpdate => {
                if let Some(time) = self.time() {
                    self.emit(Event::Progress { time });
                }
            }
            RendererEvent::SourceOpen => self.on_source_open(),
            RendererEvent::AppendComplete { track_id } => {
                self.tracks.on_append_complete(track_id);
            }
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) {
        let ConnectionEvent { id, kind } = event;
        if !self.connection.accepts(id) {
            debug!("ignoring event from replaced socket {}", id);
            return;
        }
        match kind {
            ConnectionEventKind::Open => self.on_open(id),
            ConnectionEventKind::Close => self.on_close(id),
            ConnectionEventKind::Error(reason) => error!("web socket error: {}", reason),
            ConnectionEventKind::Message(message) => self.on_message(message),
        }
    }

    fn on_media_play(&mut self) {
        info!(
            "play event from renderer, url: {}, time: {}, video: {:?}, audio: {:?}",
            self.connection.url(),
            self.clock.cursor(),
            self.video_track,
            self.audio_track
        );
        if !self.paused {
            return;
        }
        self.emit(Event::Play);
        self.paused = false;
        if self.connection.is_open() {
            debug!("web socket is open, resume downloading data");
            self.do_seek(SeekTarget::At(self.clock.cursor() - self.resume_rewind));
            self.do_resume();
        } else {
            self.connect();
        }
    }

    fn on_media_pause(&mut self) {
        info!("pause event from renderer");
        if !self.paused {
            self.emit(Event::Pause);
        }
        self.live = false;
        self.paused = true;
        self.do_pause();
    }

    fn connect(&mut self) {
        match self.connection.connect() {
            Ok(_) => self.clock.await_start(),
            Err(e) => {
                error!("failed to open web socket: {}", e);
                self.emit(Event::Disconnected {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn on_open(&mut self, id: ConnectionId) {
        if self.connection.on_open(id) {
            self.do_resume();
        }
    }

    fn on_close(&mut self, id: ConnectionId) {
        if !self.connection.on_close(id) {
            return;
        }
        self.loading = false;
        self.timer.stop();
        if !self.paused {
            self.reconnect();
        }
    }

    fn reconnect(&mut self) {
        match self.connection.reconnect() {
            Ok(ReconnectDecision::Reconnecting { attempt, delay, .. }) => {
                info!("reconnecting, attempt {} in {:?}", attempt, delay);
                self.clock.await_start();
                self.stats.reconnects += 1;
                self.reconnects.record(std::time::Instant::now());
                self.emit(Event::Reconnecting { attempt });
            }
            Ok(ReconnectDecision::GaveUp { attempts }) => {
                warn!("giving up after {} reconnect attempts", attempts);
                // paused, so a later play() dials again
                self.paused = true;
                self.live = false;
                self.renderer.pause();
                self.emit(Event::Disconnected {
                    reason: format!("gave up after {} reconnect attempts", attempts),
                });
            }
            Err(e) => {
                error!("reconnect failed: {}", e);
                self.emit(Event::Disconnected {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn on_message(&mut self, message: WireMessage) {
        match Inbound::classify(message) {
            Ok(Inbound::Media(data)) => {
                if self.waiting_data {
                    self.recv_media(data);
                } else {
                    self.stats.segments_awaiting_ack += 1;
                }
            }
            Ok(Inbound::Server(ServerMessage::Event(event))) => {
                info!("event from server: {}", event);
                self.recv_event();
            }
            Ok(Inbound::Server(ServerMessage::InitSegment(init))) => self.recv_init(init),
            Err(FluError::UnhandledMessageType { message_type }) => {
                warn!("unhandled web socket message with type: {:?}", message_type);
            }
            Err(e) => warn!("dropping web socket message: {}", e),
        }
    }

    fn recv_media(&mut self, data: Bytes) {
        let segment = match Segment::parse(data) {
            Ok(segment) => segment,
            Err(e) => {
                warn!("dropping media frame: {}", e);
                self.stats.segments_malformed += 1;
                return;
            }
        };
        let position = self.renderer.position();
        match self.tracks.enqueue(segment, &mut self.clock, position) {
            EnqueueOutcome::Appended | EnqueueOutcome::Queued => self.stats.segments_accepted += 1,
            EnqueueOutcome::Dropped(DropReason::Stale) => self.stats.segments_stale += 1,
            EnqueueOutcome::Dropped(DropReason::UnknownTrack) => {
                self.stats.segments_unknown_track += 1
            }
            EnqueueOutcome::Dropped(DropReason::Rejected) => self.stats.segments_rejected += 1,
        }
    }

    fn recv_event(&mut self) {
        self.waiting_data = true;
        self.clock.await_start();
        self.timer.start(Instant::now());
    }

    fn recv_init(&mut self, init: InitSegment) {
        info!(
            "received init segment, {} tracks declared",
            init.metadata.tracks.len()
        );
        self.tracks.clear_all();
        if let Err(e) = self.renderer.open_source() {
            error!("failed to open media source: {}", e);
            return;
        }
        // sinks are added once the renderer reports the source open
        self.pending_init = Some(init);
    }

    fn on_source_open(&mut self) {
        let Some(init) = self.pending_init.take() else {
            debug!("media source open without a pending init segment");
            return;
        };
        debug!("media source open");
        for declared in &init.metadata.tracks {
            if let Err(e) = self.init_track(&init, &declared.content) {
                warn!("skipping {} track: {}", declared.content, e);
            }
        }
        self.renderer.play();
    }

    fn init_track(&mut self, init: &InitSegment, content: &str) -> Result<(), FluError> {
        let kind: TrackKind = content.parse()?;
        let Some(track) = init.track_for(content) else {
            debug!("no init payload for {} track", content);
            return Ok(());
        };
        let payload = track.decode_payload()?;
        let sink = self
            .renderer
            .add_track_sink(track.id, kind, kind.mime_type())?;
        self.tracks.init_track(kind, track.id, sink, payload)?;
        Ok(())
    }

    fn do_seek(&mut self, target: SeekTarget) {
        let command = match target {
            SeekTarget::At(utc) if !self.live => Command::play_from(utc),
            _ => Command::Live,
        };
        self.send(command);
    }

    fn do_pause(&mut self) {
        if self.connection.is_open() && self.loading {
            self.live = false;
            self.loading = false;
            self.send(Command::Pause);
        }
    }

    fn do_resume(&mut self) {
        if self.connection.is_open() && !self.loading {
            self.loading = true;
            self.send(Command::Resume);
        }
    }

    fn send(&mut self, command: Command) {
        debug!("sending command: {}", command);
        match self.connection.send(command) {
            Ok(()) => {
                self.stats.commands_sent += 1;
                self.waiting_data = false;
                self.timer.stop();
            }
            Err(e) => {
                warn!("command is not sent: {}", e);
                self.stats.commands_dropped += 1;
            }
        }
    }

    fn jump_to_buffered_end(&mut self) {
        if let Some(end) = self.tracks.video_end_time() {
            self.renderer.set_position(end);
        }
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("event stream closed, event dropped");
        }
    }
}

impl<R: MediaRenderer, C: Connector> std::fmt::Debug for Player<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("session_id", &self.session_id)
            .field("connection", &self.connection)
            .field("tracks", &self.tracks)
            .field("paused", &self.paused)
            .field("loading", &self.loading)
            .field("live", &self.live)
            .field("waiting_data", &self.waiting_data)
            .finish()
    }
}
