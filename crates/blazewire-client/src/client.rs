use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use blazewire_frame::FrameWriter;
use blazewire_store::{BufferStore, ReadStream};
use blazewire_transport::{Transport, TransportError};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::completion::{Completion, CompletionToken};
use crate::config::ClientConfig;
use crate::error::{ClientError, FailureCause, Result};
use crate::messages::{Control, Peer, Playlist, SequencerState, Settings};
use crate::patterns::PatternIter;
use crate::queue::ReplyQueue;
use crate::reassembly::Reassembly;
use crate::slot::{
    Reply, ReplyKind, SequencerHandler, SettingsHandler, Slot, StreamHandler,
};
use crate::watcher::{NoopWatcher, Watcher};

/// Name of the playlist the controller sequences by default.
pub const DEFAULT_PLAYLIST: &str = "_defaultplaylist_";

/// Callbacks for the parts of a `getConfig` request the caller wants.
///
/// Parts left as `None` are still expected from the controller but are
/// dropped on arrival.
#[derive(Default)]
pub struct SystemStateRequest {
    pub settings: Option<SettingsHandler>,
    pub sequencer: Option<SequencerHandler>,
    pub expander: Option<StreamHandler>,
}

/// Tokens for the parts of a system state request that were asked for.
#[derive(Debug, Clone, Default)]
pub struct SystemStateTokens {
    pub settings: Option<CompletionToken>,
    pub sequencer: Option<CompletionToken>,
    pub expander: Option<CompletionToken>,
}

#[derive(Debug, Clone, Copy, Default)]
struct PingStats {
    rtt: Option<Duration>,
    last_ok: Option<Instant>,
}

/// Protocol engine for one controller connection.
///
/// The client is single threaded and cooperative: nothing happens unless
/// [`check_for_inbound`](Self::check_for_inbound) is called, and each call
/// only consumes messages the transport already holds. Requests may be
/// issued between ticks.
pub struct Client<T: Transport, S: BufferStore, W: Watcher = NoopWatcher> {
    pub(crate) transport: T,
    pub(crate) store: S,
    pub(crate) watcher: W,
    pub(crate) config: ClientConfig,
    pub(crate) queue: ReplyQueue,
    pub(crate) reassembly: Reassembly,
    pub(crate) chunk: Vec<u8>,
    pub(crate) preview: Vec<u8>,
    next_buffer_seq: u64,
    last_ping_sent: Instant,
    ping_stats: Rc<Cell<PingStats>>,
}

impl<T: Transport, S: BufferStore, W: Watcher> Client<T, S, W> {
    /// Create a client with default configuration.
    pub fn new(transport: T, store: S, watcher: W) -> Self {
        Self::with_config(transport, store, watcher, ClientConfig::default())
    }

    /// Create a client with explicit configuration.
    pub fn with_config(transport: T, store: S, watcher: W, config: ClientConfig) -> Self {
        Self {
            transport,
            store,
            watcher,
            queue: ReplyQueue::new(config.reply_queue_size),
            reassembly: Reassembly::default(),
            chunk: vec![0u8; config.binary_chunk_bytes.max(1)],
            preview: vec![0u8; config.preview_frame_bytes],
            next_buffer_seq: 0,
            last_ping_sent: Instant::now(),
            ping_stats: Rc::new(Cell::new(PingStats::default())),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    pub fn watcher_mut(&mut self) -> &mut W {
        &mut self.watcher
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Requests still waiting for a reply.
    pub fn pending(&self) -> usize {
        self.queue.iter().filter(|slot| !slot.is_satisfied()).count()
    }

    /// Whether a multi-frame binary reply is partway received.
    pub fn is_reassembling(&self) -> bool {
        self.reassembly.is_active()
    }

    /// Round trip time of the most recent answered ping.
    pub fn last_ping_rtt(&self) -> Option<Duration> {
        self.ping_stats.get().rtt
    }

    /// Time since a ping was last answered.
    pub fn since_successful_ping(&self) -> Option<Duration> {
        self.ping_stats.get().last_ok.map(|at| at.elapsed())
    }

    /// Process inbound messages for at most `max_inbound_check`.
    ///
    /// Returns `false` only when the connection is down and could not be
    /// repaired; every pending request has then failed with
    /// [`FailureCause::ConnectionLost`].
    pub fn check_for_inbound(&mut self) -> bool {
        if !self.connection_maintenance() {
            return false;
        }
        self.keepalive();

        let weeded = self
            .queue
            .weed_expired(Instant::now(), self.config.max_response_wait);
        self.retire_all(weeded, FailureCause::TimedOut);

        let started = Instant::now();
        while started.elapsed() < self.config.max_inbound_check {
            let message = match self.transport.next_message() {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "inbound check stopped");
                    break;
                }
            };
            self.dispatch(message);
        }
        true
    }

    /// Tick until `token` resolves or `timeout` passes.
    pub fn wait(&mut self, token: &CompletionToken, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            self.check_for_inbound();
            if let Some(outcome) = settled(token) {
                return outcome;
            }
            if Instant::now() >= deadline {
                return Err(ClientError::Timeout(timeout));
            }
            std::thread::sleep(self.config.sync_poll_wait);
        }
    }

    /// Tick until `token` resolves or `timeout` passes, sleeping on the runtime.
    #[cfg(feature = "async")]
    pub async fn wait_async(&mut self, token: &CompletionToken, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            self.check_for_inbound();
            if let Some(outcome) = settled(token) {
                return outcome;
            }
            if Instant::now() >= deadline {
                return Err(ClientError::Timeout(timeout));
            }
            tokio::time::sleep(self.config.sync_poll_wait).await;
        }
    }

    /// Fail every pending request and drop any partial reply.
    pub fn shutdown(&mut self) {
        self.abandon_reassembly(FailureCause::ClientDropped);
        let pending = self.queue.drain();
        if !pending.is_empty() {
            debug!(pending = pending.len(), "client shutting down");
        }
        self.retire_all(pending, FailureCause::ClientDropped);
    }

    fn connection_maintenance(&mut self) -> bool {
        if self.transport.is_connected() {
            return true;
        }

        let started = Instant::now();
        loop {
            match self.transport.reconnect() {
                Ok(()) if self.transport.is_connected() => {
                    info!("reconnected to controller");
                    self.abandon_reassembly(FailureCause::MultipartReadInterrupted);
                    return true;
                }
                Ok(()) => {}
                Err(TransportError::ReconnectUnsupported) => break,
                Err(e) => debug!(error = %e, "reconnect attempt failed"),
            }
            if started.elapsed() + self.config.conn_repair_retry_delay > self.config.max_conn_repair
            {
                break;
            }
            std::thread::sleep(self.config.conn_repair_retry_delay);
        }

        self.reassembly.clear();
        let lost = self.queue.drain();
        warn!(pending = lost.len(), "connection lost");
        self.retire_all(lost, FailureCause::ConnectionLost);
        false
    }

    fn keepalive(&mut self) {
        let Some(every) = self.config.send_ping_every else {
            return;
        };
        if self.last_ping_sent.elapsed() < every {
            return;
        }
        self.last_ping_sent = Instant::now();
        if let Err(e) = self.ping(|_| {}) {
            debug!(error = %e, "keepalive ping not sent");
        }
    }

    /// Resolve a slot that left the queue without a reply.
    pub(crate) fn retire(&mut self, mut slot: Slot, cause: FailureCause) {
        if slot.is_satisfied() {
            return;
        }
        if let Some(buffer_id) = slot.buffer_id() {
            if self.reassembly.is_writing(buffer_id) {
                self.reassembly.clear();
            }
            self.store.delete_result(buffer_id);
        }
        debug!(reply = slot.reply.name(), %cause, "request ended without reply");
        slot.fail(cause);
    }

    pub(crate) fn retire_all(&mut self, slots: Vec<Slot>, cause: FailureCause) {
        for slot in slots {
            self.retire(slot, cause);
        }
    }

    /// Drop the reassembly in progress, failing its slot and deleting the partial buffer.
    pub(crate) fn abandon_reassembly(&mut self, cause: FailureCause) {
        let Some(active) = self.reassembly.clear() else {
            return;
        };
        let owns_front =
            self.queue.front().and_then(Slot::buffer_id) == Some(active.buffer_id.as_str());
        let slot = if owns_front {
            self.queue.dequeue_front()
        } else {
            None
        };
        match slot {
            Some(slot) => self.retire(slot, cause),
            None => self.store.delete_result(&active.buffer_id),
        }
    }

    /// Deliver a fully received binary reply and resolve its slot.
    pub(crate) fn finish_binary(&mut self, mut slot: Slot) {
        match slot.deliver_binary(&mut self.store, self.config.text_field_bytes) {
            Ok(()) => {
                slot.complete();
                if slot.delete_buffer_on_completion {
                    if let Some(buffer_id) = slot.buffer_id() {
                        self.store.delete_result(buffer_id);
                    }
                }
            }
            Err(cause) => self.retire(slot, cause),
        }
    }

    fn assign_buffer_id(&mut self, slot: &mut Slot) {
        if slot.kind() == ReplyKind::Binary && slot.buffer_id.is_none() {
            self.next_buffer_seq += 1;
            slot.buffer_id = Some(format!("{}.{}", slot.reply.name(), self.next_buffer_seq));
        }
    }

    /// Send a JSON message with no reply tracking.
    pub fn send_json(&mut self, message: &Value) -> Result<()> {
        if !self.transport.is_connected() {
            return Err(ClientError::Disconnected);
        }
        let text = serde_json::to_string(message)?;
        self.transport.send_text(&text)?;
        debug!(bytes = text.len(), "sent json");
        Ok(())
    }

    fn track(&mut self, mut slot: Slot) -> Result<CompletionToken> {
        self.assign_buffer_id(&mut slot);
        let token = slot.token();
        match self
            .queue
            .enqueue(slot, Instant::now(), self.config.max_response_wait)
        {
            Ok(removed) => {
                self.retire_all(removed, FailureCause::TimedOut);
                Ok(token)
            }
            Err(slot) => {
                warn!(reply = slot.reply.name(), "reply queue full, request not sent");
                Err(ClientError::QueueFull {
                    capacity: self.queue.capacity(),
                })
            }
        }
    }

    fn untrack_newest(&mut self, count: usize, cause: FailureCause) {
        for _ in 0..count {
            if let Some(slot) = self.queue.pop_back() {
                self.retire(slot, cause);
            }
        }
    }

    /// Enqueue `slot`, then send `request`. Nothing is sent if the queue is full.
    pub fn request(&mut self, slot: Slot, request: &Value) -> Result<CompletionToken> {
        let token = self.track(slot)?;
        if let Err(e) = self.send_json(request) {
            self.untrack_newest(1, FailureCause::ConnectionLost);
            return Err(e);
        }
        Ok(token)
    }

    /// Enqueue a batch of slots for one request, all or nothing.
    ///
    /// Slots flagged `true` are parts of the reply the caller does not want;
    /// they take no queue room. Returns tokens for the wanted slots in order.
    pub fn request_batch(
        &mut self,
        batch: Vec<(Slot, bool)>,
        request: &Value,
    ) -> Result<Vec<CompletionToken>> {
        let mut tokens = Vec::new();
        let mut prepared = Vec::with_capacity(batch.len());
        for (mut slot, satisfied) in batch {
            if !satisfied {
                self.assign_buffer_id(&mut slot);
                tokens.push(slot.token());
            }
            prepared.push((slot, satisfied));
        }

        match self
            .queue
            .enqueue_batch(prepared, Instant::now(), self.config.max_response_wait)
        {
            Ok(removed) => self.retire_all(removed, FailureCause::TimedOut),
            Err(_) => {
                warn!(parts = tokens.len(), "reply queue full, request not sent");
                return Err(ClientError::QueueFull {
                    capacity: self.queue.capacity(),
                });
            }
        }

        if tokens.is_empty() {
            return Ok(tokens);
        }
        if let Err(e) = self.send_json(request) {
            self.untrack_newest(tokens.len(), FailureCause::ConnectionLost);
            return Err(e);
        }
        Ok(tokens)
    }

    /// `{"ping": true}`; the callback receives the round trip time.
    pub fn ping(&mut self, mut on_reply: impl FnMut(Duration) + 'static) -> Result<CompletionToken> {
        let stats = Rc::clone(&self.ping_stats);
        let slot = Slot::new(Reply::Ping(Box::new(move |rtt| {
            stats.set(PingStats {
                rtt: Some(rtt),
                last_ok: Some(Instant::now()),
            });
            on_reply(rtt);
        })));
        self.request(slot, &json!({"ping": true}))
    }

    /// List every stored pattern.
    pub fn get_patterns(
        &mut self,
        on_reply: impl FnMut(&mut PatternIter<'_>) + 'static,
    ) -> Result<CompletionToken> {
        let slot = Slot::new(Reply::Patterns(Box::new(on_reply)));
        self.request(slot, &json!({"listPrograms": true}))
    }

    pub fn get_playlist(
        &mut self,
        name: &str,
        on_reply: impl FnMut(&Playlist) + 'static,
    ) -> Result<CompletionToken> {
        let slot = Slot::new(Reply::Playlist(Box::new(on_reply)));
        self.request(slot, &json!({"getPlaylist": name}))
    }

    /// Position of the current pattern on the default playlist.
    pub fn get_playlist_index(
        &mut self,
        mut on_reply: impl FnMut(i64) + 'static,
    ) -> Result<CompletionToken> {
        self.get_playlist(DEFAULT_PLAYLIST, move |playlist| on_reply(playlist.position))
    }

    /// `{"getConfig": true}`: settings, sequencer state and expander config.
    pub fn get_system_state(&mut self, parts: SystemStateRequest) -> Result<SystemStateTokens> {
        let wants = [
            parts.settings.is_some(),
            parts.sequencer.is_some(),
            parts.expander.is_some(),
        ];
        let batch: Vec<(Slot, bool)> = vec![
            Slot::new(Reply::Settings(
                parts.settings.unwrap_or_else(|| Box::new(|_: &Settings| {})),
            )),
            Slot::new(Reply::Sequencer(
                parts.sequencer.unwrap_or_else(|| Box::new(|_: &SequencerState| {})),
            )),
            Slot::new(Reply::ExpanderConfig(
                parts.expander.unwrap_or_else(|| Box::new(|_: &mut dyn ReadStream| {})),
            )),
        ]
        .into_iter()
        .zip(wants)
        .map(|(slot, wanted)| {
            if wanted {
                (slot, false)
            } else {
                (slot.presatisfied(), true)
            }
        })
        .collect();

        let mut tokens = self
            .request_batch(batch, &json!({"getConfig": true}))?
            .into_iter();
        let mut next_if = |wanted: bool| if wanted { tokens.next() } else { None };
        Ok(SystemStateTokens {
            settings: next_if(wants[0]),
            sequencer: next_if(wants[1]),
            expander: next_if(wants[2]),
        })
    }

    pub fn get_settings(
        &mut self,
        on_reply: impl FnMut(&Settings) + 'static,
    ) -> Result<CompletionToken> {
        let tokens = self.get_system_state(SystemStateRequest {
            settings: Some(Box::new(on_reply)),
            ..Default::default()
        })?;
        tokens.settings.ok_or(ClientError::Failed(FailureCause::ClientDropped))
    }

    pub fn get_sequencer_state(
        &mut self,
        on_reply: impl FnMut(&SequencerState) + 'static,
    ) -> Result<CompletionToken> {
        let tokens = self.get_system_state(SystemStateRequest {
            sequencer: Some(Box::new(on_reply)),
            ..Default::default()
        })?;
        tokens.sequencer.ok_or(ClientError::Failed(FailureCause::ClientDropped))
    }

    /// Raw output expander configuration. Never arrives if no expander is fitted.
    pub fn get_expander_config(
        &mut self,
        on_reply: impl FnMut(&mut dyn ReadStream) + 'static,
    ) -> Result<CompletionToken> {
        let tokens = self.get_system_state(SystemStateRequest {
            expander: Some(Box::new(on_reply)),
            ..Default::default()
        })?;
        tokens.expander.ok_or(ClientError::Failed(FailureCause::ClientDropped))
    }

    pub fn get_pattern_controls(
        &mut self,
        pattern_id: &str,
        on_reply: impl FnMut(&[Control]) + 'static,
    ) -> Result<CompletionToken> {
        let slot = Slot::new(Reply::PatternControls(Box::new(on_reply)));
        self.request(slot, &json!({"getControls": pattern_id}))
    }

    /// Controls of the active pattern, taken from the sequencer state.
    pub fn get_current_pattern_controls(
        &mut self,
        mut on_reply: impl FnMut(&[Control]) + 'static,
    ) -> Result<CompletionToken> {
        self.get_sequencer_state(move |state| on_reply(&state.controls))
    }

    /// Preview image of a pattern. The callback gets the pattern id and a
    /// stream positioned at the JPEG data.
    pub fn get_preview_image(
        &mut self,
        pattern_id: &str,
        on_reply: impl FnMut(&str, &mut dyn ReadStream) + 'static,
    ) -> Result<CompletionToken> {
        let slot = Slot::new(Reply::PreviewImage(Box::new(on_reply)));
        self.request(slot, &json!({"getPreviewImg": pattern_id}))
    }

    pub fn get_peers(
        &mut self,
        on_reply: impl FnMut(&[Peer]) + 'static,
    ) -> Result<CompletionToken> {
        let slot = Slot::new(Reply::Peers(Box::new(on_reply)));
        self.request(slot, &json!({"getPeers": 1}))
    }

    /// Send `request` and hand the first text reply `matches` accepts to `handle`.
    pub fn raw_text_request(
        &mut self,
        request: &Value,
        matches: impl Fn(&Value) -> bool + 'static,
        handle: impl FnMut(&Value) + 'static,
    ) -> Result<CompletionToken> {
        let slot = Slot::new(Reply::RawText {
            matches: Box::new(matches),
            handle: Box::new(handle),
        });
        self.request(slot, request)
    }

    /// Send a JSON request answered by a binary reply of `binary_type`.
    pub fn raw_binary_request(
        &mut self,
        request: &Value,
        binary_type: u8,
        handle: impl FnMut(&mut dyn ReadStream) + 'static,
    ) -> Result<CompletionToken> {
        let slot = Slot::new(Reply::RawBinary {
            binary_type,
            handle: Box::new(handle),
        });
        self.request(slot, request)
    }

    /// Send a fragmented binary request answered by a binary reply of `reply_type`.
    pub fn raw_binary_send(
        &mut self,
        frame_type: u8,
        payload: &[u8],
        reply_type: u8,
        handle: impl FnMut(&mut dyn ReadStream) + 'static,
    ) -> Result<CompletionToken> {
        if !self.transport.is_connected() {
            return Err(ClientError::Disconnected);
        }
        let slot = Slot::new(Reply::RawBinary {
            binary_type: reply_type,
            handle: Box::new(handle),
        });
        let token = self.track(slot)?;
        if let Err(e) = FrameWriter::new(&mut self.transport).send(frame_type, payload) {
            self.untrack_newest(1, FailureCause::ConnectionLost);
            return Err(e.into());
        }
        Ok(token)
    }
}

impl<T: Transport, S: BufferStore, W: Watcher> Drop for Client<T, S, W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T: Transport, S: BufferStore, W: Watcher> std::fmt::Debug for Client<T, S, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("queue", &self.queue)
            .field("reassembly", &self.reassembly)
            .finish()
    }
}

fn settled(token: &CompletionToken) -> Option<Result<()>> {
    match token.state() {
        Completion::Pending => None,
        Completion::Done => Some(Ok(())),
        Completion::Failed(cause) => Some(Err(ClientError::Failed(cause))),
    }
}
