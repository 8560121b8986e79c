use bytes::Bytes;
use sdr_fec::CauchyCodec;
use sdr_proto::constants::{BLOCK_SIZE, FRAME_PAYLOAD_BYTES, ORIGINAL_COUNT};
use sdr_proto::{Datagram, MetaData};

use crate::error::Result;
use crate::meta_lifecycle::MetaLifecycle;
use crate::slot::Slot;
use crate::stats::ReassemblyStats;

/// Result of a reassembler drain: one frame's worth of contiguous payload,
/// plus whatever metadata and accounting that frame produced.
pub struct DrainedFrame {
    pub payload: Bytes,
    pub meta: Option<MetaData>,
    pub block_count: u32,
    pub recovery_count: u32,
}

/// Shared contract between the two receiver reassembly variants. Feeding a
/// datagram may complete and drain a previously-accumulating frame; if so,
/// the drained frame is returned.
pub trait Reassembler {
    fn write_and_read(&mut self, datagram: Datagram) -> Result<Option<DrainedFrame>>;
    fn stats(&self) -> &ReassemblyStats;
    fn meta_lifecycle(&self) -> &MetaLifecycle;
}

pub(crate) fn drain_slot(slot: &mut Slot, new_frame_index: u16) -> DrainedFrame {
    let mut payload = vec![0u8; FRAME_PAYLOAD_BYTES];
    for (i, block) in slot.payload_blocks.iter().enumerate() {
        let start = i * BLOCK_SIZE;
        payload[start..start + BLOCK_SIZE].copy_from_slice(block);
    }
    let meta = if slot.meta_retrieved {
        MetaData::decode(&slot.meta_block[..]).ok()
    } else {
        None
    };
    let block_count = slot.block_count;
    let recovery_count = slot.recovery_count as u32;

    slot.reinit(new_frame_index);

    DrainedFrame {
        payload: Bytes::from(payload),
        meta,
        block_count,
        recovery_count,
    }
}

/// Variant A: one decoder slot. A change in the wire frame index always
/// drains and reinitializes, regardless of completeness. Default variant
/// used by the receiver binary.
pub struct SingleSlotReassembler {
    slot: Slot,
    codec: CauchyCodec,
    stats: ReassemblyStats,
    meta_lifecycle: MetaLifecycle,
}

impl SingleSlotReassembler {
    pub fn new() -> Self {
        Self {
            slot: Slot::new(),
            codec: CauchyCodec::new(),
            stats: ReassemblyStats::new(),
            meta_lifecycle: MetaLifecycle::new(),
        }
    }

    fn record(&mut self, datagram: Datagram) -> Result<()> {
        crate::slot::record_into_slot(
            &mut self.slot,
            &self.codec,
            &mut self.meta_lifecycle,
            datagram.header.block_index,
            &datagram.block,
        )
    }
}

impl Default for SingleSlotReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler for SingleSlotReassembler {
    fn write_and_read(&mut self, datagram: Datagram) -> Result<Option<DrainedFrame>> {
        let frame_index = datagram.header.frame_index;
        let mut drained = None;

        if !self.slot.initialized {
            self.slot.reinit(frame_index);
        } else if frame_index != self.slot.frame_index {
            let frame = drain_slot(&mut self.slot, frame_index);
            self.stats.record_drain(frame.block_count, frame.recovery_count);
            if let Some(meta) = frame.meta {
                self.meta_lifecycle.commit_output(meta);
            }
            drained = Some(frame);
        }

        self.record(datagram)?;
        Ok(drained)
    }

    fn stats(&self) -> &ReassemblyStats {
        &self.stats
    }

    fn meta_lifecycle(&self) -> &MetaLifecycle {
        &self.meta_lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdr_proto::Header;

    fn sample_datagram(frame_index: u16, block_index: u8, fill: u8) -> Datagram {
        let block = vec![fill; BLOCK_SIZE];
        Datagram::new(Header::new(frame_index, block_index), Bytes::from(block)).unwrap()
    }

    fn meta_datagram(frame_index: u16, r: u8) -> Datagram {
        let meta = MetaData::new(100_000_000, 1_000_000, 0x02, 16, ORIGINAL_COUNT as u8, r, 1, 0);
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut cursor: &mut [u8] = &mut block[..MetaData::LEN];
        meta.encode(&mut cursor);
        Datagram::new(Header::new(frame_index, 0), Bytes::from(block)).unwrap()
    }

    #[test]
    fn complete_frame_drains_on_next_frame_index() {
        let mut r = SingleSlotReassembler::new();
        assert!(r.write_and_read(meta_datagram(0, 0)).unwrap().is_none());
        for i in 1..ORIGINAL_COUNT as u8 {
            assert!(r
                .write_and_read(sample_datagram(0, i, i))
                .unwrap()
                .is_none());
        }
        // first datagram of frame 1 triggers the drain of frame 0.
        let drained = r.write_and_read(meta_datagram(1, 0)).unwrap().unwrap();
        assert_eq!(drained.block_count, ORIGINAL_COUNT as u32);
        assert_eq!(drained.recovery_count, 0);
        assert!(drained.meta.is_some());
        assert_eq!(drained.payload.len(), FRAME_PAYLOAD_BYTES);
    }

    #[test]
    fn incomplete_frame_drains_with_zeroed_gaps() {
        let mut r = SingleSlotReassembler::new();
        r.write_and_read(meta_datagram(0, 0)).unwrap();
        r.write_and_read(sample_datagram(0, 1, 0xAB)).unwrap();
        let drained = r.write_and_read(meta_datagram(1, 0)).unwrap().unwrap();
        assert_eq!(drained.block_count, 2);
        assert_eq!(drained.payload[0], 0xAB);
        assert_eq!(drained.payload[BLOCK_SIZE], 0); // block 2 never arrived
    }

    #[test]
    fn recovery_reconstructs_missing_originals() {
        use sdr_fec::{CauchyCodec as Codec, CodecParams};
        use sdr_proto::constants::MAX_RECOVERY_COUNT;

        let recovery_count = 4;
        let params = CodecParams {
            block_bytes: BLOCK_SIZE,
            original_count: ORIGINAL_COUNT,
            max_recovery_count: MAX_RECOVERY_COUNT,
        };

        // Block 0 is the metadata record, blocks 1..K-1 a distinct fill byte.
        let mut meta_bytes = vec![0u8; BLOCK_SIZE];
        let meta = MetaData::new(100_000_000, 1_000_000, 0x02, 16, ORIGINAL_COUNT as u8, recovery_count as u8, 5, 0);
        {
            let mut cursor: &mut [u8] = &mut meta_bytes[..MetaData::LEN];
            meta.encode(&mut cursor);
        }
        let mut originals: Vec<Vec<u8>> = vec![meta_bytes];
        for i in 1..ORIGINAL_COUNT {
            originals.push(vec![i as u8; BLOCK_SIZE]);
        }

        let mut recovery = vec![vec![0u8; BLOCK_SIZE]; recovery_count];
        {
            let original_refs: Vec<&[u8]> = originals.iter().map(|b| b.as_slice()).collect();
            let mut recovery_refs: Vec<&mut [u8]> =
                recovery.iter_mut().map(|b| b.as_mut_slice()).collect();
            Codec::new()
                .encode(params, &original_refs, &mut recovery_refs)
                .unwrap();
        }

        let mut reassembler = SingleSlotReassembler::new();
        // Drop originals 5, 9 and 40; supply all 4 recovery blocks instead.
        let dropped = [5usize, 9, 40];
        reassembler
            .write_and_read(
                Datagram::new(Header::new(0, 0), Bytes::from(originals[0].clone())).unwrap(),
            )
            .unwrap();
        for i in 1..ORIGINAL_COUNT {
            if dropped.contains(&i) {
                continue;
            }
            reassembler
                .write_and_read(
                    Datagram::new(Header::new(0, i as u8), Bytes::from(originals[i].clone()))
                        .unwrap(),
                )
                .unwrap();
        }
        for (i, block) in recovery.iter().enumerate() {
            reassembler
                .write_and_read(
                    Datagram::new(
                        Header::new(0, (ORIGINAL_COUNT + i) as u8),
                        Bytes::from(block.clone()),
                    )
                    .unwrap(),
                )
                .unwrap();
        }

        let drained = reassembler
            .write_and_read(meta_datagram(1, 0))
            .unwrap()
            .unwrap();
        assert_eq!(drained.recovery_count, recovery_count as u32);
        for &i in &dropped {
            let start = (i - 1) * BLOCK_SIZE;
            assert_eq!(&drained.payload[start..start + BLOCK_SIZE], &originals[i][..]);
        }
    }

    #[test]
    fn frame_with_no_recovery_never_invokes_decode() {
        let mut slot = Slot::new();
        slot.reinit(0);
        slot.record_meta_block(&vec![0u8; BLOCK_SIZE]);
        for i in 0..ORIGINAL_COUNT - 2 {
            slot.record_payload_block(i, &vec![0u8; BLOCK_SIZE]);
        }
        let codec = CauchyCodec::new();
        slot.maybe_decode(&codec).unwrap();
        assert!(!slot.decoded);
    }
}
