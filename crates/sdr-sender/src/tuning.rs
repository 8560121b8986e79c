use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Snapshot of the top-level tuning/geometry fields the command channel may
/// update concurrently with the framer filling blocks. Relaxed ordering is
/// acceptable throughout: a stale read delays a reconfiguration by at most
/// one frame.
#[derive(Debug, Default)]
pub struct TuningSnapshot {
    pub center_frequency_hz: AtomicU32,
    pub sample_rate_hz: AtomicU32,
    pub sample_bytes: AtomicU8,
    pub sample_bits: AtomicU8,
}

impl TuningSnapshot {
    pub fn new(center_frequency_hz: u32, sample_rate_hz: u32, sample_bytes: u8, sample_bits: u8) -> Self {
        Self {
            center_frequency_hz: AtomicU32::new(center_frequency_hz),
            sample_rate_hz: AtomicU32::new(sample_rate_hz),
            sample_bytes: AtomicU8::new(sample_bytes),
            sample_bits: AtomicU8::new(sample_bits),
        }
    }

    pub fn set_center_frequency_hz(&self, hz: u32) {
        self.center_frequency_hz.store(hz, Ordering::Relaxed);
    }

    pub fn set_sample_rate_hz(&self, hz: u32) {
        self.sample_rate_hz.store(hz, Ordering::Relaxed);
    }

    pub fn load(&self) -> (u32, u32, u8, u8) {
        (
            self.center_frequency_hz.load(Ordering::Relaxed),
            self.sample_rate_hz.load(Ordering::Relaxed),
            self.sample_bytes.load(Ordering::Relaxed),
            self.sample_bits.load(Ordering::Relaxed),
        )
    }
}
