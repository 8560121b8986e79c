use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sdr_proto::constants::{BLOCK_SIZE, ORIGINAL_COUNT, SAMPLES_PER_BLOCK};
use sdr_proto::{MetaData, Sample};

use crate::ring::TxRing;
use crate::tuning::TuningSnapshot;

/// Shared, atomically-updated control-plane knobs. Changes made through the
/// command channel take effect at the next frame boundary.
#[derive(Debug, Default)]
pub struct SenderControls {
    pub recovery_count: AtomicU8,
    pub tx_delay_us: AtomicU32,
}

impl SenderControls {
    pub fn new(recovery_count: u8, tx_delay_us: u32) -> Self {
        Self {
            recovery_count: AtomicU8::new(recovery_count),
            tx_delay_us: AtomicU32::new(tx_delay_us),
        }
    }
}

/// Packs a stream of [`Sample`]s into frame-sized staging buffers. Runs on
/// the device I/O thread: `write` may block cooperatively at a frame
/// boundary if the Tx ring is full, but never touches the network.
pub struct Framer {
    ring: Arc<TxRing>,
    controls: Arc<SenderControls>,
    tuning: Arc<TuningSnapshot>,
    frame_count: u16,
    block_index: usize,
    sample_index: usize,
}

impl Framer {
    pub fn new(ring: Arc<TxRing>, controls: Arc<SenderControls>, tuning: Arc<TuningSnapshot>) -> Self {
        Self {
            ring,
            controls,
            tuning,
            frame_count: 0,
            block_index: 0,
            sample_index: 0,
        }
    }

    fn start_frame_if_needed(&mut self) {
        if self.block_index != 0 {
            return;
        }
        let (center_frequency_hz, sample_rate_hz, sample_bytes, sample_bits) = self.tuning.load();
        let recovery_count = self.controls.recovery_count.load(Ordering::Relaxed);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        let meta = MetaData::new(
            center_frequency_hz,
            sample_rate_hz,
            sample_bytes,
            sample_bits,
            ORIGINAL_COUNT as u8,
            recovery_count,
            now.as_secs() as u32,
            now.subsec_micros(),
        );

        let slot_mutex = self.ring.current_fill_slot();
        let mut slot = slot_mutex.lock().unwrap();
        let mut cursor: &mut [u8] = &mut slot.blocks[0][..];
        meta.encode(&mut cursor);
        self.block_index = 1;
    }

    /// Pack `samples` into the frame currently being filled, finalizing and
    /// rotating frames as they fill up. May call multiple frames' worth of
    /// `finalize_frame` if `samples` spans more than one frame boundary.
    pub fn write(&mut self, mut samples: &[Sample]) {
        while !samples.is_empty() {
            self.start_frame_if_needed();

            let slot_mutex = self.ring.current_fill_slot();
            let mut slot = slot_mutex.lock().unwrap();
            let block = &mut slot.blocks[self.block_index];

            let remaining_in_block = SAMPLES_PER_BLOCK - self.sample_index;
            let take = remaining_in_block.min(samples.len());

            let offset = self.sample_index * Sample::SIZE;
            {
                let mut cursor = &mut block[offset..offset + take * Sample::SIZE];
                for sample in &samples[..take] {
                    sample.encode(&mut cursor);
                }
            }
            samples = &samples[take..];
            self.sample_index += take;

            if self.sample_index == SAMPLES_PER_BLOCK {
                self.sample_index = 0;
                if self.block_index == ORIGINAL_COUNT - 1 {
                    drop(slot);
                    self.finalize_frame();
                } else {
                    self.block_index += 1;
                }
            }
        }
    }

    /// Publish the current staging buffer to the Tx task and rotate to the
    /// next one, blocking cooperatively if the ring is full.
    pub fn finalize_frame(&mut self) {
        {
            let slot_mutex = self.ring.current_fill_slot();
            let mut slot = slot_mutex.lock().unwrap();
            slot.frame_index = self.frame_count;
            slot.recovery_count = self.controls.recovery_count.load(Ordering::Relaxed) as usize;
            slot.tx_delay_us = self.controls.tx_delay_us.load(Ordering::Relaxed) as u64;
        }
        self.ring.finalize_fill();
        self.frame_count = self.frame_count.wrapping_add(1);
        self.block_index = 0;
        self.sample_index = 0;
    }
}

const _: () = assert!(BLOCK_SIZE > 0);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::TxRing;
    use sdr_proto::constants::{FRAME_PAYLOAD_BYTES, PAYLOAD_BLOCKS_PER_FRAME, SAMPLES_PER_FRAME};

    fn new_framer() -> (Framer, Arc<TxRing>) {
        let ring = Arc::new(TxRing::new(2));
        let controls = Arc::new(SenderControls::new(0, 0));
        let tuning = Arc::new(TuningSnapshot::new(100_000_000, 1_000_000, 0x02, 16));
        (Framer::new(ring.clone(), controls, tuning), ring)
    }

    #[test]
    fn one_full_frame_finalizes_exactly_once() {
        let (mut framer, ring) = new_framer();
        let samples = vec![Sample::new(1, 2); SAMPLES_PER_FRAME];
        framer.write(&samples);
        assert_eq!(framer.frame_count, 1);
        assert_eq!(framer.block_index, 0);
        assert_eq!(ring.capacity(), 2);
    }

    #[test]
    fn block_zero_carries_metadata_not_samples() {
        let (mut framer, ring) = new_framer();
        let samples = vec![Sample::new(3, 4); 1];
        framer.write(&samples);
        let slot = ring.current_fill_slot().lock().unwrap();
        // block 0 was written with metadata by start_frame_if_needed, block 1 holds the sample
        let decoded = Sample::decode(&mut &slot.blocks[1][0..4]);
        assert_eq!(decoded, Sample::new(3, 4));
    }

    #[test]
    fn payload_blocks_per_frame_matches_geometry() {
        assert_eq!(PAYLOAD_BLOCKS_PER_FRAME, ORIGINAL_COUNT - 1);
        assert_eq!(FRAME_PAYLOAD_BYTES, SAMPLES_PER_FRAME * Sample::SIZE);
    }
}
