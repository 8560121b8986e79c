use bytes::{Buf, BufMut};

use crate::constants::HEADER_SIZE;
use crate::error::{Error, Result};

/// Fixed 4-byte datagram header: which frame, which block within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub frame_index: u16,
    pub block_index: u8,
    pub filler: u8,
}

impl Header {
    pub const LEN: usize = HEADER_SIZE;

    pub fn new(frame_index: u16, block_index: u8) -> Self {
        Self {
            frame_index,
            block_index,
            filler: 0,
        }
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.frame_index);
        dst.put_u8(self.block_index);
        dst.put_u8(self.filler);
    }

    pub fn decode(src: &mut impl Buf) -> Result<Self> {
        if src.remaining() < Self::LEN {
            return Err(Error::MalformedDatagram(format!(
                "header needs {} bytes, got {}",
                Self::LEN,
                src.remaining()
            )));
        }
        let frame_index = src.get_u16_le();
        let block_index = src.get_u8();
        let filler = src.get_u8();
        Ok(Self {
            frame_index,
            block_index,
            filler,
        })
    }
}
