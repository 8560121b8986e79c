use bytes::{Buf, BufMut};

/// One complex baseband sample: 16-bit signed real and imaginary components.
///
/// Both endpoints MUST agree on this layout (signed 16-bit, 4 bytes total,
/// little-endian on the wire) regardless of what a given SDR front-end's
/// native sample type looks like internally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub re: i16,
    pub im: i16,
}

impl Sample {
    pub const SIZE: usize = 4;

    pub fn new(re: i16, im: i16) -> Self {
        Self { re, im }
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_i16_le(self.re);
        dst.put_i16_le(self.im);
    }

    pub fn decode(src: &mut impl Buf) -> Self {
        let re = src.get_i16_le();
        let im = src.get_i16_le();
        Self { re, im }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let s = Sample::new(-12345, 6789);
        let mut buf = Vec::new();
        s.encode(&mut buf);
        assert_eq!(buf.len(), Sample::SIZE);
        let decoded = Sample::decode(&mut &buf[..]);
        assert_eq!(s, decoded);
    }
}
