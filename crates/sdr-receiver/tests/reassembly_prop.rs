use bytes::Bytes;
use proptest::prelude::*;
use sdr_proto::constants::{BLOCK_SIZE, FRAME_PAYLOAD_BYTES, ORIGINAL_COUNT};
use sdr_proto::{Datagram, Header, MetaData};
use sdr_receiver::{Reassembler, SingleSlotReassembler};

/// Small, fast xorshift PRNG used only to shuffle datagram arrival order.
struct Rng(u64);

impl Rng {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() as usize) % n
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }
}

fn meta_datagram(frame_index: u16, fill_byte: u8) -> Datagram {
    let meta = MetaData::new(100_000_000, 1_000_000, 0x02, 16, ORIGINAL_COUNT as u8, 0, 1, 0);
    let mut block = vec![0u8; BLOCK_SIZE];
    {
        let mut cursor: &mut [u8] = &mut block[..MetaData::LEN];
        meta.encode(&mut cursor);
    }
    // Stamp the unused tail of block 0 with a recognizable fill byte so
    // every original block in the frame has distinguishable content.
    for b in &mut block[MetaData::LEN..] {
        *b = fill_byte;
    }
    Datagram::new(Header::new(frame_index, 0), Bytes::from(block)).unwrap()
}

fn payload_datagram(frame_index: u16, block_index: u8, fill_byte: u8) -> Datagram {
    let block = vec![fill_byte; BLOCK_SIZE];
    Datagram::new(Header::new(frame_index, block_index), Bytes::from(block)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

    /// Reassembly order independence: a complete frame's datagrams, fed in
    /// any arrival order, drain to the exact same payload and block count
    /// once a datagram from the next frame triggers the drain.
    #[test]
    fn drained_frame_is_independent_of_arrival_order(seed in any::<u64>()) {
        let mut rng = Rng(seed | 1);

        let mut datagrams: Vec<Datagram> = (0..ORIGINAL_COUNT)
            .map(|i| {
                let fill = i as u8;
                if i == 0 {
                    meta_datagram(0, fill)
                } else {
                    payload_datagram(0, i as u8, fill)
                }
            })
            .collect();
        rng.shuffle(&mut datagrams);

        let mut reassembler = SingleSlotReassembler::new();
        for dg in datagrams {
            let drained = reassembler.write_and_read(dg).unwrap();
            prop_assert!(drained.is_none());
        }

        let drained = reassembler
            .write_and_read(meta_datagram(1, 0xFF))
            .unwrap()
            .unwrap();
        prop_assert_eq!(drained.block_count, ORIGINAL_COUNT as u32);
        prop_assert_eq!(drained.payload.len(), FRAME_PAYLOAD_BYTES);
        for i in 1..ORIGINAL_COUNT {
            let start = (i - 1) * BLOCK_SIZE;
            let expected = vec![i as u8; BLOCK_SIZE];
            prop_assert_eq!(&drained.payload[start..start + BLOCK_SIZE], &expected[..]);
        }
    }
}
