use blazewire_frame::{is_known, type_name, EXPANDER_CONFIG, PREVIEW_FRAME};
use blazewire_store::BufferStore;
use blazewire_transport::Transport;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::Client;
use crate::messages::{PlaylistUpdate, SequencerState, Stats};
use crate::watcher::Watcher;

impl<T: Transport, S: BufferStore, W: Watcher> Client<T, S, W> {
    /// Hand a text message no request claimed to the watcher.
    pub(crate) fn route_unsolicited_text(&mut self, json: &Value) {
        if json.get("fps").is_some() {
            match Stats::from_json(json) {
                Ok(stats) => self.watcher.on_stats(&stats),
                Err(e) => warn!(error = %e, "malformed stats message"),
            }
        } else if json.get("activeProgram").is_some() {
            match SequencerState::from_json(json, self.config.control_limit) {
                Ok(state) => self.watcher.on_pattern_change(&state),
                Err(e) => warn!(error = %e, "malformed sequencer message"),
            }
        } else if let Some(playlist) = json.get("playlist") {
            if playlist.get("position").is_some() {
                debug!("unrequested playlist reply ignored");
                return;
            }
            match PlaylistUpdate::from_json(json, self.config.playlist_limit) {
                Ok(update) => self.watcher.on_playlist_change(&update),
                Err(e) => warn!(error = %e, "malformed playlist update"),
            }
        } else {
            debug!("unrequested text message ignored");
        }
    }

    /// Handle a binary frame no slot is positioned to take.
    ///
    /// The type byte has been consumed. Returns `false` for unknown frame
    /// types, which a reassembly in progress treats as an interruption.
    pub(crate) fn route_unsolicited_binary(&mut self, frame_type: u8) -> bool {
        match frame_type {
            PREVIEW_FRAME => {
                let len = self.read_preview_frame();
                self.watcher.on_preview_frame(&self.preview[..len]);
                true
            }
            EXPANDER_CONFIG => {
                self.expander_out_of_order();
                true
            }
            known if is_known(known) => {
                debug!(frame_type = type_name(known), "dropping unrequested binary frame");
                true
            }
            _ => false,
        }
    }

    /// Live preview frames have no flag byte; the pixels follow the type.
    fn read_preview_frame(&mut self) -> usize {
        let mut filled = 0;
        while filled < self.preview.len() {
            match self.transport.read_bytes(&mut self.preview[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    warn!(error = %e, "preview frame read failed");
                    break;
                }
            }
        }
        if self.transport.available() > 0 {
            debug!(
                kept = filled,
                dropped = self.transport.available(),
                "preview frame larger than buffer"
            );
        }
        filled
    }

    /// Serve an expander config frame to a slot waiting anywhere in the queue.
    fn expander_out_of_order(&mut self) {
        let Some(pos) = self.queue.find_binary(EXPANDER_CONFIG) else {
            debug!("no pending expander request, discarding frame");
            return;
        };
        let flags = match blazewire_frame::read_flags(&mut self.transport) {
            Ok(flags) => flags,
            Err(e) => {
                warn!(error = %e, "expander frame without flags");
                return;
            }
        };
        if !flags.is_single() {
            warn!(?flags, "multi-frame expander config out of order, discarding");
            return;
        }
        let Some(buffer_id) = self
            .queue
            .get_mut(pos)
            .and_then(|slot| slot.buffer_id().map(str::to_string))
        else {
            return;
        };

        let streamed = self.stream_frame(&buffer_id, false);
        let text_field_bytes = self.config.text_field_bytes;
        let Some(slot) = self.queue.get_mut(pos) else {
            return;
        };
        let delivered = streamed
            .and_then(|_| slot.deliver_binary(&mut self.store, text_field_bytes));
        match delivered {
            Ok(()) => {
                debug!(pos, "expander config delivered out of order");
                slot.complete();
                if slot.delete_buffer_on_completion {
                    self.store.delete_result(&buffer_id);
                }
            }
            Err(cause) => {
                self.store.delete_result(&buffer_id);
                slot.fail(cause);
            }
        }
    }
}
