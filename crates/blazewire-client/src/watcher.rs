use crate::messages::{PlaylistUpdate, SequencerState, Stats};

/// Receives messages the controller pushes without being asked.
///
/// All methods default to doing nothing.
pub trait Watcher {
    /// Periodic statistics (`"fps"` key).
    fn on_stats(&mut self, _stats: &Stats) {}

    /// The active pattern or sequencer state changed (`"activeProgram"` key).
    fn on_pattern_change(&mut self, _state: &SequencerState) {}

    /// The playlist was edited (`"playlist"` without a position).
    fn on_playlist_change(&mut self, _update: &PlaylistUpdate) {}

    /// A live preview frame, usually RGB triplets.
    fn on_preview_frame(&mut self, _pixels: &[u8]) {}
}

/// A watcher that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWatcher;

impl Watcher for NoopWatcher {}

impl<W: Watcher + ?Sized> Watcher for &mut W {
    fn on_stats(&mut self, stats: &Stats) {
        (**self).on_stats(stats)
    }

    fn on_pattern_change(&mut self, state: &SequencerState) {
        (**self).on_pattern_change(state)
    }

    fn on_playlist_change(&mut self, update: &PlaylistUpdate) {
        (**self).on_playlist_change(update)
    }

    fn on_preview_frame(&mut self, pixels: &[u8]) {
        (**self).on_preview_frame(pixels)
    }
}

impl<W: Watcher + ?Sized> Watcher for Box<W> {
    fn on_stats(&mut self, stats: &Stats) {
        (**self).on_stats(stats)
    }

    fn on_pattern_change(&mut self, state: &SequencerState) {
        (**self).on_pattern_change(state)
    }

    fn on_playlist_change(&mut self, update: &PlaylistUpdate) {
        (**self).on_playlist_change(update)
    }

    fn on_preview_frame(&mut self, pixels: &[u8]) {
        (**self).on_preview_frame(pixels)
    }
}
