use sdr_proto::MetaData;

const DEFAULT_CENTER_FREQUENCY_HZ: u32 = 100_000_000;
const DEFAULT_SAMPLE_RATE_HZ: u32 = 48_000;
const DEFAULT_SAMPLE_BITS: u8 = 8;

/// Tracks the two metadata snapshots the receiver exposes: the most recent
/// value observed on the wire, and the value belonging to the frame most
/// recently drained to the consumer.
#[derive(Debug, Default)]
pub struct MetaLifecycle {
    current: Option<MetaData>,
    output: Option<MetaData>,
}

impl MetaLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called whenever block 0 of an incoming frame is decoded. Returns
    /// `true` if the geometry changed (first 12 bytes differ), which the
    /// caller should log.
    pub fn observe(&mut self, meta: MetaData) -> bool {
        let changed = match &self.current {
            Some(existing) => !existing.geometry_eq(&meta),
            None => true,
        };
        self.current = Some(meta);
        changed
    }

    /// Called when a frame is drained, if that frame's metadata block was
    /// actually retrieved.
    pub fn commit_output(&mut self, meta: MetaData) {
        self.output = Some(meta);
    }

    pub fn center_frequency_hz(&self) -> u32 {
        match self.output {
            Some(m) if m.center_frequency_hz != 0 => m.center_frequency_hz,
            _ => DEFAULT_CENTER_FREQUENCY_HZ,
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        match self.output {
            Some(m) if m.sample_rate_hz != 0 => m.sample_rate_hz,
            _ => DEFAULT_SAMPLE_RATE_HZ,
        }
    }

    pub fn sample_bits(&self) -> u8 {
        match self.output {
            Some(m) if m.sample_bits != 0 => m.sample_bits,
            _ => DEFAULT_SAMPLE_BITS,
        }
    }
}
