use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::slot::{ReplyKind, Slot};

/// Bounded ring of pending slots in issuance order.
///
/// Storage has one more cell than the capacity so a full queue and an empty
/// one have different cursor layouts. Cells strictly between `front` and
/// `back` are always occupied.
///
/// Operations that remove slots hand them back to the caller, which decides
/// how each one resolves.
pub struct ReplyQueue {
    cells: Vec<Option<Slot>>,
    front: usize,
    back: usize,
}

impl ReplyQueue {
    pub fn new(capacity: usize) -> Self {
        let mut cells = Vec::with_capacity(capacity + 1);
        cells.resize_with(capacity + 1, || None);
        Self {
            cells,
            front: 0,
            back: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len() - 1
    }

    pub fn len(&self) -> usize {
        if self.front > self.back {
            self.back + (self.cells.len() - self.front)
        } else {
            self.back - self.front
        }
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.back
    }

    fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    fn advance(&self, idx: usize) -> usize {
        (idx + 1) % self.cells.len()
    }

    fn physical(&self, pos: usize) -> usize {
        (self.front + pos) % self.cells.len()
    }

    pub fn front(&self) -> Option<&Slot> {
        if self.is_empty() {
            return None;
        }
        self.cells[self.front].as_ref()
    }

    pub fn front_mut(&mut self) -> Option<&mut Slot> {
        if self.is_empty() {
            return None;
        }
        self.cells[self.front].as_mut()
    }

    /// Slot at logical position `pos` (0 is the front).
    pub fn get_mut(&mut self, pos: usize) -> Option<&mut Slot> {
        if pos >= self.len() {
            return None;
        }
        let idx = self.physical(pos);
        self.cells[idx].as_mut()
    }

    /// Slots from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> + '_ {
        (0..self.len()).filter_map(move |pos| self.cells[self.physical(pos)].as_ref())
    }

    fn push_back(&mut self, slot: Slot) {
        self.cells[self.back] = Some(slot);
        self.back = self.advance(self.back);
    }

    /// Append a slot. When full, compacts once and retries.
    ///
    /// On success returns whatever compaction removed. On failure the slot is
    /// handed back untouched.
    pub fn enqueue(
        &mut self,
        slot: Slot,
        now: Instant,
        max_wait: Duration,
    ) -> Result<Vec<Slot>, Slot> {
        let mut removed = Vec::new();
        if self.free() == 0 {
            removed = self.compact(now, max_wait);
            if self.free() == 0 {
                return Err(slot);
            }
        }
        self.push_back(slot);
        Ok(removed)
    }

    /// Append several slots, all or nothing.
    ///
    /// Slots flagged as already satisfied are not enqueued and take no room;
    /// they are returned along with anything compaction removed.
    pub fn enqueue_batch(
        &mut self,
        batch: Vec<(Slot, bool)>,
        now: Instant,
        max_wait: Duration,
    ) -> Result<Vec<Slot>, Vec<Slot>> {
        let wanted = batch.iter().filter(|(_, satisfied)| !satisfied).count();
        if wanted == 0 {
            return Ok(batch.into_iter().map(|(slot, _)| slot).collect());
        }

        let mut removed = Vec::new();
        if self.free() < wanted {
            removed = self.compact(now, max_wait);
            if self.free() < wanted {
                return Err(batch.into_iter().map(|(slot, _)| slot).collect());
            }
        }

        for (slot, satisfied) in batch {
            if satisfied {
                removed.push(slot);
            } else {
                self.push_back(slot);
            }
        }
        Ok(removed)
    }

    pub fn dequeue_front(&mut self) -> Option<Slot> {
        if self.is_empty() {
            warn!("dequeue on empty reply queue");
            return None;
        }
        let slot = self.cells[self.front].take();
        self.front = self.advance(self.front);
        slot
    }

    /// Remove the most recently enqueued slot.
    pub fn pop_back(&mut self) -> Option<Slot> {
        if self.is_empty() {
            return None;
        }
        self.back = (self.back + self.cells.len() - 1) % self.cells.len();
        self.cells[self.back].take()
    }

    /// Move the front slot to the back, keeping its issue time and state.
    pub fn rotate_front_to_back(&mut self) {
        if let Some(slot) = self.dequeue_front() {
            self.push_back(slot);
        }
    }

    /// Remove satisfied or expired slots from the front, stopping at the first
    /// live one. Expired slots behind a live slot stay put.
    pub fn weed_expired(&mut self, now: Instant, max_wait: Duration) -> Vec<Slot> {
        let mut removed = Vec::new();
        while let Some(front) = self.front() {
            if front.is_live(now, max_wait) {
                break;
            }
            if let Some(slot) = self.dequeue_front() {
                removed.push(slot);
            }
        }
        if !removed.is_empty() {
            debug!(removed = removed.len(), queue_len = self.len(), "weeded reply queue");
        }
        removed
    }

    /// Drop every satisfied or expired slot, wherever it sits, and rebuild the
    /// survivors from the start of storage in their relative order.
    pub fn compact(&mut self, now: Instant, max_wait: Duration) -> Vec<Slot> {
        let mut removed = Vec::new();
        let mut kept = Vec::new();
        for slot in self.drain() {
            if slot.is_live(now, max_wait) {
                kept.push(slot);
            } else {
                removed.push(slot);
            }
        }

        for slot in kept {
            self.push_back(slot);
        }
        debug!(
            removed = removed.len(),
            queue_len = self.len(),
            "compacted reply queue"
        );
        removed
    }

    /// Position of the first unsatisfied binary slot expecting `binary_type`.
    pub fn find_binary(&self, binary_type: u8) -> Option<usize> {
        self.iter().position(|slot| {
            !slot.is_satisfied()
                && slot.kind() == ReplyKind::Binary
                && slot.expected_binary_type() == Some(binary_type)
        })
    }

    /// Remove every slot, front first, and reset the cursors.
    pub fn drain(&mut self) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(self.len());
        while !self.is_empty() {
            if let Some(slot) = self.cells[self.front].take() {
                slots.push(slot);
            }
            self.front = self.advance(self.front);
        }
        self.front = 0;
        self.back = 0;
        slots
    }
}

impl std::fmt::Debug for ReplyQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyQueue")
            .field("capacity", &self.capacity())
            .field("front", &self.front)
            .field("back", &self.back)
            .field("slots", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}
