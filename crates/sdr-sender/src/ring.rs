use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytes::BytesMut;
use sdr_proto::constants::{BLOCK_SIZE, MAX_RECOVERY_COUNT, ORIGINAL_COUNT};

/// One frame-sized staging buffer: storage for the K original blocks plus
/// room for up to the maximum recovery block count. The Tx task only reads
/// `recovery_count` of the recovery slots; the rest are scratch space.
pub struct StagingSlot {
    pub blocks: Vec<BytesMut>,
    pub frame_index: u16,
    pub recovery_count: usize,
    pub tx_delay_us: u64,
}

impl StagingSlot {
    fn new() -> Self {
        let blocks = (0..ORIGINAL_COUNT + MAX_RECOVERY_COUNT)
            .map(|_| BytesMut::zeroed(BLOCK_SIZE))
            .collect();
        Self {
            blocks,
            frame_index: 0,
            recovery_count: 0,
            tx_delay_us: 0,
        }
    }
}

/// Double-buffer (or wider) ring of staging slots shared between the
/// producer thread filling frames and the Tx task draining them. Ownership
/// of a given slot's contents is serialized by `write_index`/`read_index`:
/// the producer only ever touches the slot at `write_index`, the Tx task
/// only ever touches slots with `read_index <= i < write_index`.
pub struct TxRing {
    slots: Vec<Mutex<StagingSlot>>,
    write_index: AtomicU64,
    read_index: AtomicU64,
}

impl TxRing {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "Tx staging ring needs at least 2 buffers");
        let slots = (0..capacity).map(|_| Mutex::new(StagingSlot::new())).collect();
        Self {
            slots,
            write_index: AtomicU64::new(0),
            read_index: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot_index(&self, counter: u64) -> usize {
        (counter % self.capacity() as u64) as usize
    }

    /// The slot the producer is currently filling.
    pub fn current_fill_slot(&self) -> &Mutex<StagingSlot> {
        let idx = self.slot_index(self.write_index.load(Ordering::Relaxed));
        &self.slots[idx]
    }

    /// Cooperatively wait (spin with a short sleep) until there is room to
    /// publish the slot currently being filled, then publish it. Called by
    /// the producer thread only.
    pub fn finalize_fill(&self) {
        loop {
            let w = self.write_index.load(Ordering::Acquire);
            let r = self.read_index.load(Ordering::Acquire);
            if w.wrapping_sub(r) < self.capacity() as u64 {
                break;
            }
            tracing::warn!("tx staging ring full, producer waiting for Tx task to catch up");
            std::thread::sleep(Duration::from_micros(100));
        }
        self.write_index.fetch_add(1, Ordering::Release);
    }

    /// Asynchronously wait until a slot is ready, returning a reference to
    /// it. Called by the Tx task only.
    pub async fn wait_for_ready(&self) -> &Mutex<StagingSlot> {
        loop {
            let w = self.write_index.load(Ordering::Acquire);
            let r = self.read_index.load(Ordering::Acquire);
            if r < w {
                return &self.slots[self.slot_index(r)];
            }
            tokio::time::sleep(Duration::from_micros(100)).await;
        }
    }

    /// Mark the oldest unprocessed slot as consumed. Called by the Tx task
    /// only, after it has finished reading the slot returned by
    /// `wait_for_ready`.
    pub fn advance_read(&self) {
        self.read_index.fetch_add(1, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_publish_single_slot() {
        let ring = TxRing::new(2);
        {
            let mut slot = ring.current_fill_slot().lock().unwrap();
            slot.frame_index = 42;
        }
        ring.finalize_fill();
        assert_eq!(ring.write_index.load(Ordering::Relaxed), 1);
        assert_eq!(ring.read_index.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn tx_task_drains_published_slot() {
        let ring = TxRing::new(2);
        {
            let mut slot = ring.current_fill_slot().lock().unwrap();
            slot.frame_index = 7;
        }
        ring.finalize_fill();

        let ready = ring.wait_for_ready().await;
        assert_eq!(ready.lock().unwrap().frame_index, 7);
        ring.advance_read();
        assert_eq!(ring.read_index.load(Ordering::Relaxed), 1);
    }
}
