use bytes::{Buf, BufMut};

use crate::constants::{METADATA_COMPARE_LEN, METADATA_SIZE};
use crate::error::{Error, Result};

/// Tuning, geometry and timestamp record carried in the block-0 payload of
/// every frame. Equality for change-detection purposes only considers the
/// first 12 bytes (tuning + geometry); timestamps and the CRC are excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaData {
    pub center_frequency_hz: u32,
    pub sample_rate_hz: u32,
    /// Low nibble: bytes per sample component. High nibble: flags.
    pub sample_bytes: u8,
    pub sample_bits: u8,
    pub original_blocks: u8,
    pub fec_blocks: u8,
    pub tx_tv_sec: u32,
    pub tx_tv_usec: u32,
}

impl MetaData {
    pub const LEN: usize = METADATA_SIZE;

    pub fn new(
        center_frequency_hz: u32,
        sample_rate_hz: u32,
        sample_bytes: u8,
        sample_bits: u8,
        original_blocks: u8,
        fec_blocks: u8,
        tx_tv_sec: u32,
        tx_tv_usec: u32,
    ) -> Self {
        Self {
            center_frequency_hz,
            sample_rate_hz,
            sample_bytes,
            sample_bits,
            original_blocks,
            fec_blocks,
            tx_tv_sec,
            tx_tv_usec,
        }
    }

    /// Encode the 20-byte body (everything but the trailing CRC).
    fn encode_body(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.center_frequency_hz);
        dst.put_u32_le(self.sample_rate_hz);
        dst.put_u8(self.sample_bytes);
        dst.put_u8(self.sample_bits);
        dst.put_u8(self.original_blocks);
        dst.put_u8(self.fec_blocks);
        dst.put_u32_le(self.tx_tv_sec);
        dst.put_u32_le(self.tx_tv_usec);
    }

    /// Encode the full 24-byte record, computing the CRC32 over the first 20.
    pub fn encode(&self, dst: &mut impl BufMut) {
        let mut body = Vec::with_capacity(Self::LEN - 4);
        self.encode_body(&mut body);
        debug_assert_eq!(body.len(), Self::LEN - 4);
        let crc = crc32fast::hash(&body);
        dst.put_slice(&body);
        dst.put_u32_le(crc);
    }

    /// Decode and verify the trailing CRC32. Returns `MetadataCrcMismatch`
    /// if it does not verify; the caller (per the erasure code's opaque-byte
    /// contract) still uses the raw bytes for decoding, it just must not
    /// trust the returned `MetaData` as the current tuning snapshot.
    pub fn decode(mut src: impl Buf) -> Result<Self> {
        if src.remaining() < Self::LEN {
            return Err(Error::MalformedDatagram(format!(
                "metadata needs {} bytes, got {}",
                Self::LEN,
                src.remaining()
            )));
        }
        let mut body = [0u8; Self::LEN - 4];
        src.copy_to_slice(&mut body);
        let crc_on_wire = src.get_u32_le();

        let computed = crc32fast::hash(&body);
        if computed != crc_on_wire {
            tracing::warn!(crc_on_wire, computed, "metadata CRC mismatch");
            return Err(Error::MetadataCrcMismatch);
        }

        let mut body_buf = &body[..];
        let center_frequency_hz = body_buf.get_u32_le();
        let sample_rate_hz = body_buf.get_u32_le();
        let sample_bytes = body_buf.get_u8();
        let sample_bits = body_buf.get_u8();
        let original_blocks = body_buf.get_u8();
        let fec_blocks = body_buf.get_u8();
        let tx_tv_sec = body_buf.get_u32_le();
        let tx_tv_usec = body_buf.get_u32_le();

        Ok(Self {
            center_frequency_hz,
            sample_rate_hz,
            sample_bytes,
            sample_bits,
            original_blocks,
            fec_blocks,
            tx_tv_sec,
            tx_tv_usec,
        })
    }

    /// Compare the tuning + geometry prefix only (first 12 bytes on the
    /// wire), ignoring timestamps. This is what drives metadata-change
    /// detection and logging, not `PartialEq`.
    pub fn geometry_eq(&self, other: &MetaData) -> bool {
        let mut a = Vec::with_capacity(METADATA_COMPARE_LEN);
        let mut b = Vec::with_capacity(METADATA_COMPARE_LEN);
        self.encode_body(&mut a);
        other.encode_body(&mut b);
        a[..METADATA_COMPARE_LEN] == b[..METADATA_COMPARE_LEN]
    }
}

impl Default for MetaData {
    fn default() -> Self {
        Self {
            center_frequency_hz: 0,
            sample_rate_hz: 0,
            sample_bytes: 0,
            sample_bits: 0,
            original_blocks: 0,
            fec_blocks: 0,
            tx_tv_sec: 0,
            tx_tv_usec: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_valid_crc() {
        let meta = MetaData::new(100_000_000, 1_000_000, 0x02, 16, 128, 16, 10, 20);
        let mut buf = Vec::new();
        meta.encode(&mut buf);
        assert_eq!(buf.len(), MetaData::LEN);
        let decoded = MetaData::decode(&buf[..]).unwrap();
        assert_eq!(meta, decoded);
    }

    #[test]
    fn detects_crc_corruption() {
        let meta = MetaData::new(100_000_000, 1_000_000, 0x02, 16, 128, 16, 10, 20);
        let mut buf = Vec::new();
        meta.encode(&mut buf);
        buf[0] ^= 0xFF;
        assert!(matches!(
            MetaData::decode(&buf[..]),
            Err(Error::MetadataCrcMismatch)
        ));
    }

    #[test]
    fn geometry_eq_ignores_timestamps() {
        let a = MetaData::new(100_000_000, 1_000_000, 0x02, 16, 128, 16, 10, 20);
        let b = MetaData::new(100_000_000, 1_000_000, 0x02, 16, 128, 16, 999, 888);
        assert!(a.geometry_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn geometry_eq_detects_frequency_change() {
        let a = MetaData::new(100_000_000, 1_000_000, 0x02, 16, 128, 16, 10, 20);
        let b = MetaData::new(101_000_000, 1_000_000, 0x02, 16, 128, 16, 10, 20);
        assert!(!a.geometry_eq(&b));
    }
}
