use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::{BLOCK_SIZE, DATAGRAM_SIZE};
use crate::error::{Error, Result};
use crate::header::Header;

/// One on-the-wire datagram: a [`Header`] followed by a fixed-size protected
/// block. The protected block is opaque to this type — it is either the
/// metadata-plus-sample payload of an original block, or an FEC recovery
/// block produced by the erasure codec. Both look identical on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub header: Header,
    pub block: Bytes,
}

impl Datagram {
    pub const LEN: usize = DATAGRAM_SIZE;

    /// `block` must be exactly [`BLOCK_SIZE`] bytes.
    pub fn new(header: Header, block: Bytes) -> Result<Self> {
        if block.len() != BLOCK_SIZE {
            tracing::warn!(got = block.len(), want = BLOCK_SIZE, "malformed protected block size");
            return Err(Error::MalformedDatagram(format!(
                "protected block must be {} bytes, got {}",
                BLOCK_SIZE,
                block.len()
            )));
        }
        Ok(Self { header, block })
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        self.header.encode(dst);
        dst.put_slice(&self.block);
    }

    pub fn encode_to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        self.encode(&mut buf);
        buf
    }

    pub fn decode(mut src: impl Buf) -> Result<Self> {
        if src.remaining() != Self::LEN {
            tracing::warn!(got = src.remaining(), want = Self::LEN, "malformed datagram size");
            return Err(Error::MalformedDatagram(format!(
                "datagram must be {} bytes, got {}",
                Self::LEN,
                src.remaining()
            )));
        }
        let header = Header::decode(&mut src)?;
        let block = src.copy_to_bytes(src.remaining());
        Self::new(header, block)
    }
}
