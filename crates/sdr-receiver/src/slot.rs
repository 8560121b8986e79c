use bytes::BytesMut;
use sdr_fec::{CauchyCodec, CodecParams, Descriptor};
use sdr_proto::constants::{BLOCK_SIZE, MAX_RECOVERY_COUNT, ORIGINAL_COUNT};
use sdr_proto::MetaData;

use crate::error::Result;

/// Per-frame accumulator shared by both reassembler variants. In Variant A
/// this holds payload blocks at their literal wire block index (1..K-1,
/// with index 0 reserved for metadata); Variant B instead stores payload
/// blocks shifted down by one (see `SlidingWindowReassembler`), but the
/// accumulation and decode-trigger logic is otherwise identical, so both
/// share this type.
pub struct Slot {
    pub frame_index: u16,
    pub initialized: bool,
    pub meta_block: BytesMut,
    pub payload_present: Vec<bool>,
    pub payload_blocks: Vec<BytesMut>,
    pub recovery_present: Vec<bool>,
    pub recovery_blocks: Vec<BytesMut>,
    pub recovery_count: usize,
    pub block_count: u32,
    pub decoded: bool,
    pub meta_retrieved: bool,
}

impl Slot {
    pub fn new() -> Self {
        Self {
            frame_index: 0,
            initialized: false,
            meta_block: BytesMut::zeroed(BLOCK_SIZE),
            payload_present: vec![false; ORIGINAL_COUNT - 1],
            payload_blocks: (0..ORIGINAL_COUNT - 1)
                .map(|_| BytesMut::zeroed(BLOCK_SIZE))
                .collect(),
            recovery_present: vec![false; MAX_RECOVERY_COUNT],
            recovery_blocks: (0..MAX_RECOVERY_COUNT)
                .map(|_| BytesMut::zeroed(BLOCK_SIZE))
                .collect(),
            recovery_count: 0,
            block_count: 0,
            decoded: false,
            meta_retrieved: false,
        }
    }

    pub fn reinit(&mut self, frame_index: u16) {
        self.frame_index = frame_index;
        self.initialized = true;
        self.meta_block.fill(0);
        for present in self.payload_present.iter_mut() {
            *present = false;
        }
        for block in self.payload_blocks.iter_mut() {
            block.fill(0);
        }
        for present in self.recovery_present.iter_mut() {
            *present = false;
        }
        for block in self.recovery_blocks.iter_mut() {
            block.fill(0);
        }
        self.recovery_count = 0;
        self.block_count = 0;
        self.decoded = false;
        self.meta_retrieved = false;
    }

    /// Record block 0 (metadata). Returns the decoded `MetaData` if its CRC
    /// verified; the raw bytes are kept regardless so the erasure decoder
    /// can still use this block as an original.
    pub fn record_meta_block(&mut self, payload: &[u8]) -> Option<MetaData> {
        self.meta_block.copy_from_slice(payload);
        self.block_count += 1;
        self.meta_retrieved = true;
        MetaData::decode(payload).ok()
    }

    /// Record a payload block at its zero-based position within
    /// `payload_blocks` (already adjusted for whichever variant's index
    /// convention is in play).
    pub fn record_payload_block(&mut self, position: usize, payload: &[u8]) {
        self.payload_blocks[position].copy_from_slice(payload);
        self.payload_present[position] = true;
        self.block_count += 1;
    }

    /// `wire_index` is the full datagram block index (`>= ORIGINAL_COUNT`);
    /// its position among recovery blocks is `wire_index - ORIGINAL_COUNT`,
    /// which must be preserved even if recovery datagrams arrive out of
    /// order, since that position is the erasure codec's shard index.
    pub fn record_recovery_block(&mut self, wire_index: u8, payload: &[u8]) {
        let position = wire_index as usize - ORIGINAL_COUNT;
        if position >= self.recovery_blocks.len() {
            tracing::warn!(wire_index, "dropping recovery block beyond capacity");
            return;
        }
        if !self.recovery_present[position] {
            self.recovery_present[position] = true;
            self.recovery_count += 1;
            self.block_count += 1;
        }
        self.recovery_blocks[position].copy_from_slice(payload);
    }

    /// Invoke the erasure decoder once `block_count` reaches K with at
    /// least one recovery block present. No-op if already decoded or if
    /// all originals are already present.
    pub fn maybe_decode(&mut self, codec: &CauchyCodec) -> Result<()> {
        if self.decoded || self.recovery_count == 0 || self.block_count < ORIGINAL_COUNT as u32 {
            return Ok(());
        }
        self.decoded = true;

        let missing = self.payload_present.iter().filter(|p| !**p).count()
            + if self.meta_retrieved { 0 } else { 1 };
        if missing == 0 {
            return Ok(());
        }

        let params = CodecParams {
            block_bytes: BLOCK_SIZE,
            original_count: ORIGINAL_COUNT,
            max_recovery_count: MAX_RECOVERY_COUNT,
        };

        // `decode` needs one descriptor per position in the full K+R space,
        // present or not: it reconstructs missing positions by writing
        // straight into their `block` buffer, which for us is the slot's
        // own (currently zeroed) storage for that index.
        let mut descriptors: Vec<Descriptor> =
            Vec::with_capacity(ORIGINAL_COUNT + MAX_RECOVERY_COUNT);
        descriptors.push(Descriptor {
            index: 0,
            present: self.meta_retrieved,
            block: &mut self.meta_block[..],
        });
        for (i, block) in self.payload_blocks.iter_mut().enumerate() {
            descriptors.push(Descriptor {
                index: (i + 1) as u8,
                present: self.payload_present[i],
                block: &mut block[..],
            });
        }
        for (i, block) in self.recovery_blocks.iter_mut().enumerate() {
            descriptors.push(Descriptor {
                index: (ORIGINAL_COUNT + i) as u8,
                present: self.recovery_present[i],
                block: &mut block[..],
            });
        }

        codec.decode(params, &mut descriptors)?;

        self.meta_retrieved = true;
        self.payload_present.iter_mut().for_each(|p| *p = true);
        Ok(())
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch one datagram's payload into `slot` by its wire block index,
/// logging (via the returned bool) whether the metadata geometry changed.
/// Shared by both reassembler variants, which differ only in how they pick
/// which `Slot` a given wire frame index maps to.
pub fn record_into_slot(
    slot: &mut Slot,
    codec: &CauchyCodec,
    meta_lifecycle: &mut crate::meta_lifecycle::MetaLifecycle,
    block_index: u8,
    payload: &[u8],
) -> Result<()> {
    let index = block_index as usize;
    if index == 0 {
        if let Some(meta) = slot.record_meta_block(payload) {
            if meta_lifecycle.observe(meta) {
                tracing::info!(?meta, "metadata changed");
            }
        }
    } else if index < ORIGINAL_COUNT {
        slot.record_payload_block(index - 1, payload);
    } else {
        slot.record_recovery_block(block_index, payload);
    }
    slot.maybe_decode(codec)
}
