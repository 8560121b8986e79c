use sdr_fec::CauchyCodec;
use sdr_proto::Datagram;

use crate::error::Result;
use crate::meta_lifecycle::MetaLifecycle;
use crate::reassembler::{drain_slot, DrainedFrame, Reassembler};
use crate::slot::{record_into_slot, Slot};
use crate::stats::ReassemblyStats;

/// Recommended slot count: a small power of two, well under 2^16.
pub const DEFAULT_SLOT_COUNT: usize = 4;

/// Variant B: S decoder slots indexed by `frameIndex mod S`, tolerant of
/// datagram reordering within the sliding window. Not the default; kept as
/// a documented, tested alternative to [`SingleSlotReassembler`](crate::reassembler::SingleSlotReassembler).
pub struct SlidingWindowReassembler {
    slots: Vec<Slot>,
    head: Option<u16>,
    codec: CauchyCodec,
    stats: ReassemblyStats,
    meta_lifecycle: MetaLifecycle,
}

impl SlidingWindowReassembler {
    pub fn new(slot_count: usize) -> Self {
        assert!(slot_count.is_power_of_two(), "slot count must be a power of two");
        assert!(slot_count <= u16::MAX as usize - slot_count);
        Self {
            slots: (0..slot_count).map(|_| Slot::new()).collect(),
            head: None,
            codec: CauchyCodec::new(),
            stats: ReassemblyStats::new(),
            meta_lifecycle: MetaLifecycle::new(),
        }
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot_for(&mut self, frame_index: u16) -> &mut Slot {
        let idx = frame_index as usize % self.slot_count();
        &mut self.slots[idx]
    }

    fn drain_and_commit(&mut self, idx: usize, new_frame_index: u16) -> DrainedFrame {
        let frame = drain_slot(&mut self.slots[idx], new_frame_index);
        self.stats.record_drain(frame.block_count, frame.recovery_count);
        if let Some(meta) = frame.meta {
            self.meta_lifecycle.commit_output(meta);
        }
        frame
    }

    fn clear_all(&mut self, new_frame_index: u16) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::new();
        }
        let idx = new_frame_index as usize % self.slot_count();
        self.slots[idx].reinit(new_frame_index);
    }
}

impl Reassembler for SlidingWindowReassembler {
    fn write_and_read(&mut self, datagram: Datagram) -> Result<Option<DrainedFrame>> {
        let frame_index = datagram.header.frame_index;
        let slot_count = self.slot_count() as i64;
        let wraparound_threshold = (1i64 << 16) - slot_count;

        let mut drained = None;

        match self.head {
            None => {
                self.head = Some(frame_index);
                self.clear_all(frame_index);
            }
            Some(head) => {
                let delta = head as i64 - frame_index as i64;
                if delta < 0 && -delta < slot_count {
                    let idx = frame_index as usize % self.slot_count();
                    drained = Some(self.drain_and_commit(idx, frame_index));
                    self.head = Some(frame_index);
                } else if delta < 0 && -delta >= wraparound_threshold {
                    self.clear_all(frame_index);
                    self.head = Some(frame_index);
                } else if delta > 0 && delta > wraparound_threshold {
                    let idx = frame_index as usize % self.slot_count();
                    drained = Some(self.drain_and_commit(idx, frame_index));
                    self.head = Some(frame_index);
                } else if delta > 0 && delta >= slot_count {
                    self.clear_all(frame_index);
                    self.head = Some(frame_index);
                }
                // else: frame_index falls within the sliding window; accumulate
                // into its slot without draining or moving head.
            }
        }

        let slot = self.slot_for(frame_index);
        if !slot.initialized || slot.frame_index != frame_index {
            slot.reinit(frame_index);
        }
        record_into_slot(
            slot,
            &self.codec,
            &mut self.meta_lifecycle,
            datagram.header.block_index,
            &datagram.block,
        )?;

        Ok(drained)
    }

    fn stats(&self) -> &ReassemblyStats {
        &self.stats
    }

    fn meta_lifecycle(&self) -> &MetaLifecycle {
        &self.meta_lifecycle
    }
}
