use std::fmt;
use std::time::{Duration, Instant};

use blazewire_frame::{EXPANDER_CONFIG, PREVIEW_IMAGE, PROGRAM_LIST};
use blazewire_store::{BufferStore, ReadStream};
use serde_json::Value;
use tracing::warn;

use crate::completion::{Completer, CompletionToken};
use crate::config::ClientConfig;
use crate::error::FailureCause;
use crate::messages::{
    controls_from_json, peers_from_json, Control, Peer, Playlist, SequencerState, Settings,
};
use crate::patterns::PatternIter;
use crate::preview::read_preview_id;

pub type PingHandler = Box<dyn FnMut(Duration)>;
pub type SettingsHandler = Box<dyn FnMut(&Settings)>;
pub type SequencerHandler = Box<dyn FnMut(&SequencerState)>;
pub type PlaylistHandler = Box<dyn FnMut(&Playlist)>;
pub type ControlsHandler = Box<dyn FnMut(&[Control])>;
pub type PeersHandler = Box<dyn FnMut(&[Peer])>;
pub type TextPredicate = Box<dyn Fn(&Value) -> bool>;
pub type TextHandler = Box<dyn FnMut(&Value)>;
pub type PatternsHandler = Box<dyn FnMut(&mut PatternIter<'_>)>;
pub type PreviewImageHandler = Box<dyn FnMut(&str, &mut dyn ReadStream)>;
pub type StreamHandler = Box<dyn FnMut(&mut dyn ReadStream)>;
pub type FailureHandler = Box<dyn FnMut(FailureCause)>;

/// Whether a slot waits for a text or a binary reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Text,
    Binary,
}

/// The reply a slot waits for, with the callback that receives it.
pub enum Reply {
    /// `{"ack": ...}`; receives the round trip time.
    Ping(PingHandler),
    /// `getConfig` settings part.
    Settings(SettingsHandler),
    /// `getConfig` sequencer part.
    Sequencer(SequencerHandler),
    /// `getPlaylist`.
    Playlist(PlaylistHandler),
    /// `getControls`.
    PatternControls(ControlsHandler),
    /// `getPeers`.
    Peers(PeersHandler),
    /// Any text reply the predicate accepts.
    RawText {
        matches: TextPredicate,
        handle: TextHandler,
    },
    /// Program list, binary type 7.
    Patterns(PatternsHandler),
    /// Preview image, binary type 4.
    PreviewImage(PreviewImageHandler),
    /// Expander configuration, binary type 9. May arrive out of order.
    ExpanderConfig(StreamHandler),
    /// Any binary reply of the given type.
    RawBinary {
        binary_type: u8,
        handle: StreamHandler,
    },
}

impl Reply {
    pub fn kind(&self) -> ReplyKind {
        match self {
            Reply::Ping(_)
            | Reply::Settings(_)
            | Reply::Sequencer(_)
            | Reply::Playlist(_)
            | Reply::PatternControls(_)
            | Reply::Peers(_)
            | Reply::RawText { .. } => ReplyKind::Text,
            Reply::Patterns(_)
            | Reply::PreviewImage(_)
            | Reply::ExpanderConfig(_)
            | Reply::RawBinary { .. } => ReplyKind::Binary,
        }
    }

    /// Binary type code expected, for binary replies.
    pub fn binary_type(&self) -> Option<u8> {
        match self {
            Reply::Patterns(_) => Some(PROGRAM_LIST),
            Reply::PreviewImage(_) => Some(PREVIEW_IMAGE),
            Reply::ExpanderConfig(_) => Some(EXPANDER_CONFIG),
            Reply::RawBinary { binary_type, .. } => Some(*binary_type),
            _ => None,
        }
    }

    /// Whether a text message is this reply.
    pub fn matches_text(&self, json: &Value) -> bool {
        match self {
            Reply::Ping(_) => json.get("ack").is_some(),
            Reply::Settings(_) => json.get("pixelCount").is_some(),
            Reply::Sequencer(_) => json.get("activeProgram").is_some(),
            Reply::Playlist(_) => json
                .get("playlist")
                .and_then(|p| p.get("position"))
                .is_some(),
            Reply::PatternControls(_) => json.get("controls").is_some(),
            Reply::Peers(_) => json.get("peers").is_some(),
            Reply::RawText { matches, .. } => matches(json),
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reply::Ping(_) => "ping",
            Reply::Settings(_) => "settings",
            Reply::Sequencer(_) => "sequencer",
            Reply::Playlist(_) => "playlist",
            Reply::PatternControls(_) => "controls",
            Reply::Peers(_) => "peers",
            Reply::RawText { .. } => "raw-text",
            Reply::Patterns(_) => "patterns",
            Reply::PreviewImage(_) => "preview",
            Reply::ExpanderConfig(_) => "expander",
            Reply::RawBinary { .. } => "raw-binary",
        }
    }
}

/// One outstanding request awaiting its reply.
///
/// A slot resolves its [`CompletionToken`] exactly once. Dropping a slot
/// that never resolved marks the token [`FailureCause::ClientDropped`].
pub struct Slot {
    pub(crate) reply: Reply,
    pub(crate) buffer_id: Option<String>,
    pub(crate) issued_at: Instant,
    pub(crate) satisfied: bool,
    pub(crate) delete_buffer_on_completion: bool,
    completion: Completer,
    on_failure: Option<FailureHandler>,
}

impl Slot {
    pub fn new(reply: Reply) -> Self {
        let (completion, _) = Completer::pair();
        Self {
            reply,
            buffer_id: None,
            issued_at: Instant::now(),
            satisfied: false,
            delete_buffer_on_completion: true,
            completion,
            on_failure: None,
        }
    }

    /// Store a binary reply under `id` instead of a generated id.
    pub fn with_buffer_id(mut self, id: impl Into<String>) -> Self {
        self.buffer_id = Some(id.into());
        self
    }

    /// Keep the reassembled buffer after the reply is delivered.
    pub fn keep_buffer(mut self) -> Self {
        self.delete_buffer_on_completion = false;
        self
    }

    pub fn with_issued_at(mut self, issued_at: Instant) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Observe failures. Called at most once, never together with the reply callback.
    pub fn on_failure(mut self, handler: impl FnMut(FailureCause) + 'static) -> Self {
        self.on_failure = Some(Box::new(handler));
        self
    }

    /// Mark as already satisfied, for parts of a batch the caller does not want.
    pub fn presatisfied(mut self) -> Self {
        self.satisfied = true;
        self.completion.finish();
        self
    }

    pub fn token(&self) -> CompletionToken {
        self.completion.token()
    }

    pub fn kind(&self) -> ReplyKind {
        self.reply.kind()
    }

    pub fn expected_binary_type(&self) -> Option<u8> {
        self.reply.binary_type()
    }

    pub fn buffer_id(&self) -> Option<&str> {
        self.buffer_id.as_deref()
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn is_expired(&self, now: Instant, max_wait: Duration) -> bool {
        now.saturating_duration_since(self.issued_at) > max_wait
    }

    /// Neither satisfied nor expired.
    pub fn is_live(&self, now: Instant, max_wait: Duration) -> bool {
        !self.satisfied && !self.is_expired(now, max_wait)
    }

    pub fn matches_text(&self, json: &Value) -> bool {
        self.reply.matches_text(json)
    }

    pub(crate) fn complete(&mut self) {
        self.satisfied = true;
        self.completion.finish();
    }

    pub(crate) fn fail(&mut self, cause: FailureCause) {
        self.satisfied = true;
        if !self.completion.is_pending() {
            return;
        }
        if let Some(handler) = self.on_failure.as_mut() {
            handler(cause);
        }
        self.completion.fail(cause);
    }

    /// Decode a matched text reply and hand it to the callback.
    pub(crate) fn deliver_text(
        &mut self,
        json: &Value,
        config: &ClientConfig,
        now: Instant,
    ) -> Result<(), FailureCause> {
        let decode_failed = |e: serde_json::Error| {
            warn!(error = %e, "failed to decode reply");
            FailureCause::ReplyDecodeFailure
        };

        match &mut self.reply {
            Reply::Ping(handle) => handle(now.saturating_duration_since(self.issued_at)),
            Reply::Settings(handle) => handle(&Settings::from_json(json).map_err(decode_failed)?),
            Reply::Sequencer(handle) => handle(
                &SequencerState::from_json(json, config.control_limit).map_err(decode_failed)?,
            ),
            Reply::Playlist(handle) => {
                handle(&Playlist::from_json(json, config.playlist_limit).map_err(decode_failed)?)
            }
            Reply::PatternControls(handle) => {
                handle(&controls_from_json(json, config.control_limit))
            }
            Reply::Peers(handle) => {
                handle(&peers_from_json(json, config.peer_limit).map_err(decode_failed)?)
            }
            Reply::RawText { handle, .. } => handle(json),
            other => {
                warn!(reply = other.name(), "text delivered to a binary reply");
                return Err(FailureCause::ReplyDecodeFailure);
            }
        }
        Ok(())
    }

    /// Read the reassembled reply back from the store and hand it to the callback.
    pub(crate) fn deliver_binary<S: BufferStore + ?Sized>(
        &mut self,
        store: &mut S,
        text_field_bytes: usize,
    ) -> Result<(), FailureCause> {
        let Some(buffer_id) = self.buffer_id.as_deref() else {
            return Err(FailureCause::BufferReadFailure);
        };
        let mut stream = store.open_read(buffer_id).map_err(|e| {
            warn!(buffer_id, error = %e, "could not open reply buffer for reading");
            FailureCause::BufferReadFailure
        })?;

        match &mut self.reply {
            Reply::Patterns(handle) => {
                let mut patterns = PatternIter::new(&mut *stream, text_field_bytes);
                handle(&mut patterns);
            }
            Reply::PreviewImage(handle) => {
                let pattern_id = read_preview_id(&mut *stream, text_field_bytes);
                handle(&pattern_id, &mut *stream);
            }
            Reply::ExpanderConfig(handle) | Reply::RawBinary { handle, .. } => {
                handle(&mut *stream)
            }
            other => {
                warn!(reply = other.name(), "binary delivered to a text reply");
                return Err(FailureCause::BufferReadFailure);
            }
        }

        stream.close();
        Ok(())
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.completion.fail(FailureCause::ClientDropped);
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("reply", &self.reply.name())
            .field("buffer_id", &self.buffer_id)
            .field("issued_at", &self.issued_at)
            .field("satisfied", &self.satisfied)
            .field("delete_buffer_on_completion", &self.delete_buffer_on_completion)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::completion::Completion;

    #[test]
    fn text_predicates() {
        let ping = Reply::Ping(Box::new(|_| {}));
        assert!(ping.matches_text(&json!({"ack": 1})));
        assert!(!ping.matches_text(&json!({"fps": 1})));

        let playlist = Reply::Playlist(Box::new(|_| {}));
        assert!(playlist.matches_text(&json!({"playlist": {"position": 0}})));
        assert!(!playlist.matches_text(&json!({"playlist": {"items": []}})));

        let raw = Reply::RawText {
            matches: Box::new(|v| v.get("custom").is_some()),
            handle: Box::new(|_| {}),
        };
        assert!(raw.matches_text(&json!({"custom": true})));
        assert_eq!(raw.kind(), ReplyKind::Text);
    }

    #[test]
    fn binary_types() {
        assert_eq!(Reply::Patterns(Box::new(|_| {})).binary_type(), Some(7));
        assert_eq!(Reply::ExpanderConfig(Box::new(|_| {})).binary_type(), Some(9));
        let raw = Reply::RawBinary {
            binary_type: 6,
            handle: Box::new(|_| {}),
        };
        assert_eq!(raw.binary_type(), Some(6));
        assert_eq!(raw.kind(), ReplyKind::Binary);
        assert!(!raw.matches_text(&json!({"ack": 1})));
    }

    #[test]
    fn expiry_is_strict() {
        let t0 = Instant::now();
        let slot = Slot::new(Reply::Ping(Box::new(|_| {}))).with_issued_at(t0);
        let wait = Duration::from_secs(5);
        assert!(!slot.is_expired(t0 + wait, wait));
        assert!(slot.is_expired(t0 + wait + Duration::from_millis(1), wait));
        assert!(slot.is_live(t0, wait));
    }

    #[test]
    fn failure_reports_once_and_drop_does_not_override() {
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let mut slot = Slot::new(Reply::Ping(Box::new(|_| {})))
            .on_failure(move |_| counter.set(counter.get() + 1));
        let token = slot.token();

        slot.fail(FailureCause::TimedOut);
        slot.fail(FailureCause::ConnectionLost);
        drop(slot);

        assert_eq!(seen.get(), 1);
        assert_eq!(token.state(), Completion::Failed(FailureCause::TimedOut));
    }

    #[test]
    fn dropping_pending_slot_fails_token() {
        let slot = Slot::new(Reply::Ping(Box::new(|_| {})));
        let token = slot.token();
        drop(slot);
        assert_eq!(token.failure(), Some(FailureCause::ClientDropped));
    }

    #[test]
    fn presatisfied_slot_completes() {
        let slot = Slot::new(Reply::Settings(Box::new(|_| {}))).presatisfied();
        let token = slot.token();
        assert!(slot.is_satisfied());
        drop(slot);
        assert!(token.is_done());
    }
}
