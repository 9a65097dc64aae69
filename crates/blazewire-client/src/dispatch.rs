use std::time::Instant;

use blazewire_frame::{peek_type, read_flags, read_type, type_name, FrameFlags, EXPANDER_CONFIG};
use blazewire_store::BufferStore;
use blazewire_transport::{InboundMessage, MessageKind, Transport};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::client::Client;
use crate::error::FailureCause;
use crate::reassembly::{stream_to_store, WriteMode};
use crate::slot::{ReplyKind, Slot};
use crate::watcher::Watcher;

impl<T: Transport, S: BufferStore, W: Watcher> Client<T, S, W> {
    /// Route one inbound message to the front slot or the unsolicited router.
    pub(crate) fn dispatch(&mut self, message: InboundMessage) {
        trace!(kind = message.kind.name(), len = message.len, "inbound message");
        self.drop_satisfied_front();

        let incoming_expander =
            message.kind == MessageKind::Binary && peek_type(&self.transport) == Some(EXPANDER_CONFIG);
        if !self.reassembly.is_active() && !incoming_expander {
            self.rotate_expander_slots();
        }

        let Some(sought) = self.queue.front().map(Slot::kind) else {
            self.route_unsolicited(message);
            return;
        };

        match (message.kind, sought) {
            (MessageKind::Text, ReplyKind::Text) => self.text_for_text(message),
            (MessageKind::Binary, ReplyKind::Binary) => self.reassemble(),
            _ => self.route_unsolicited(message),
        }
    }

    fn drop_satisfied_front(&mut self) {
        while self.queue.front().is_some_and(Slot::is_satisfied) {
            self.queue.dequeue_front();
        }
    }

    /// Expander config replies only arrive if an expander is fitted, so a
    /// slot waiting on one must not block the replies queued behind it.
    fn rotate_expander_slots(&mut self) {
        let pass = self.queue.len();
        for _ in 0..pass {
            let seeks_expander = self
                .queue
                .front()
                .is_some_and(|slot| slot.expected_binary_type() == Some(EXPANDER_CONFIG));
            if !seeks_expander {
                break;
            }
            self.queue.rotate_front_to_back();
            self.drop_satisfied_front();
        }
    }

    fn route_unsolicited(&mut self, message: InboundMessage) {
        match message.kind {
            MessageKind::Text => {
                if let Some(json) = self.read_json(message) {
                    self.route_unsolicited_text(&json);
                }
            }
            MessageKind::Binary => match read_type(&mut self.transport) {
                Ok(frame_type) => {
                    if !self.route_unsolicited_binary(frame_type) {
                        debug!(frame_type, "dropped unknown binary frame");
                    }
                }
                Err(e) => warn!(error = %e, "empty binary message"),
            },
        }
    }

    fn read_json(&mut self, message: InboundMessage) -> Option<Value> {
        if message.len > self.config.max_text_bytes {
            warn!(
                len = message.len,
                max = self.config.max_text_bytes,
                "discarding oversized text message"
            );
            return None;
        }
        let body = match self.transport.read_remaining() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to read text message");
                return None;
            }
        };
        match serde_json::from_slice(&body) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "message deserialization error");
                None
            }
        }
    }

    fn text_for_text(&mut self, message: InboundMessage) {
        let Some(json) = self.read_json(message) else {
            return;
        };
        if !self.queue.front().is_some_and(|slot| slot.matches_text(&json)) {
            self.route_unsolicited_text(&json);
            return;
        }
        let Some(mut slot) = self.queue.dequeue_front() else {
            return;
        };
        match slot.deliver_text(&json, &self.config, Instant::now()) {
            Ok(()) => slot.complete(),
            Err(cause) => self.retire(slot, cause),
        }
    }

    fn read_frame_flags(&mut self) -> Option<FrameFlags> {
        match read_flags(&mut self.transport) {
            Ok(flags) => Some(flags),
            Err(e) => {
                warn!(error = %e, "binary frame without flags");
                None
            }
        }
    }

    /// Stream the current frame into `buffer_id`. Fresh buffers opened
    /// while a reassembly is active never trigger garbage collection.
    pub(crate) fn stream_frame(&mut self, buffer_id: &str, append: bool) -> Result<usize, FailureCause> {
        let mode = if append {
            WriteMode::Append
        } else if self.reassembly.is_active() {
            WriteMode::TruncateNoCollect
        } else {
            WriteMode::Truncate
        };
        stream_to_store(
            &mut self.transport,
            &mut self.store,
            buffer_id,
            mode,
            &mut self.chunk,
        )
    }

    /// Binary frame while the front slot awaits a binary reply.
    fn reassemble(&mut self) {
        let frame_type = match read_type(&mut self.transport) {
            Ok(frame_type) => frame_type,
            Err(e) => {
                warn!(error = %e, "empty binary message");
                return;
            }
        };

        match self.reassembly.active_type() {
            None => self.start_reply(frame_type),
            Some(active) if active == frame_type => self.continue_reply(),
            Some(active) => {
                if !self.route_unsolicited_binary(frame_type) {
                    warn!(
                        expected = type_name(active),
                        frame_type, "unexpected frame type during reassembly, abandoning reply"
                    );
                    self.abandon_reassembly(FailureCause::MultipartReadInterrupted);
                }
            }
        }
    }

    fn start_reply(&mut self, frame_type: u8) {
        let Some(front) = self.queue.front() else {
            return;
        };
        if front.expected_binary_type() != Some(frame_type) {
            if !self.route_unsolicited_binary(frame_type) {
                debug!(frame_type, "dropped unknown binary frame");
            }
            return;
        }
        let buffer_id = front.buffer_id().unwrap_or_default().to_string();

        let Some(flags) = self.read_frame_flags() else {
            return;
        };
        if flags.is_single() {
            let streamed = self.stream_frame(&buffer_id, false);
            if let Some(slot) = self.queue.dequeue_front() {
                match streamed {
                    Ok(_) => self.finish_binary(slot),
                    Err(cause) => self.retire(slot, cause),
                }
            }
        } else if flags.is_first() {
            match self.stream_frame(&buffer_id, false) {
                Ok(bytes) => {
                    debug!(frame_type = type_name(frame_type), bytes, "reassembly started");
                    self.reassembly.begin(frame_type, &buffer_id);
                }
                Err(cause) => {
                    if let Some(slot) = self.queue.dequeue_front() {
                        self.retire(slot, cause);
                    }
                }
            }
        } else {
            warn!(frame_type, ?flags, "continuation frame with no reassembly in progress");
        }
    }

    fn continue_reply(&mut self) {
        let Some(buffer_id) = self.reassembly.active().map(|a| a.buffer_id.clone()) else {
            return;
        };
        if self.queue.front().and_then(Slot::buffer_id) != Some(buffer_id.as_str()) {
            warn!(buffer_id, "reassembly lost its request");
            self.abandon_reassembly(FailureCause::MultipartReadInterrupted);
            return;
        }

        let Some(flags) = self.read_frame_flags() else {
            return;
        };
        if flags.is_last() {
            let streamed = self.stream_frame(&buffer_id, true);
            self.reassembly.clear();
            if let Some(slot) = self.queue.dequeue_front() {
                match streamed {
                    Ok(_) => self.finish_binary(slot),
                    Err(cause) => self.retire(slot, cause),
                }
            }
        } else if flags.is_middle() {
            if let Err(cause) = self.stream_frame(&buffer_id, true) {
                self.abandon_reassembly(cause);
            }
        } else {
            warn!(?flags, buffer_id, "unexpected flags during reassembly, frame dropped");
        }
    }
}
