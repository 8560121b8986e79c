use bytes::Bytes;
use proptest::prelude::*;
use sdr_proto::{Datagram, Error, Header, MetaData};

proptest! {
    /// Header round-trips through encode/decode for any field values.
    #[test]
    fn header_round_trips(frame_index in any::<u16>(), block_index in any::<u8>()) {
        let h = Header::new(frame_index, block_index);
        let mut buf = Vec::new();
        h.encode(&mut buf);
        let decoded = Header::decode(&mut &buf[..]).unwrap();
        prop_assert_eq!(h, decoded);
    }

    /// Datagram round-trips for any header plus any protected-block content.
    #[test]
    fn datagram_round_trips(
        frame_index in any::<u16>(),
        block_index in any::<u8>(),
        block_byte in any::<u8>(),
    ) {
        let block = Bytes::from(vec![block_byte; sdr_proto::constants::BLOCK_SIZE]);
        let dg = Datagram::new(Header::new(frame_index, block_index), block).unwrap();
        let buf = dg.encode_to_bytes();
        prop_assert_eq!(buf.len(), Datagram::LEN);
        let decoded = Datagram::decode(&mut &buf[..]).unwrap();
        prop_assert_eq!(dg, decoded);
    }

    /// MetaData round-trips through encode/decode for any field values.
    #[test]
    fn metadata_round_trips(
        center_frequency_hz in any::<u32>(),
        sample_rate_hz in any::<u32>(),
        sample_bytes in any::<u8>(),
        sample_bits in any::<u8>(),
        original_blocks in any::<u8>(),
        fec_blocks in any::<u8>(),
        tx_tv_sec in any::<u32>(),
        tx_tv_usec in any::<u32>(),
    ) {
        let meta = MetaData::new(
            center_frequency_hz,
            sample_rate_hz,
            sample_bytes,
            sample_bits,
            original_blocks,
            fec_blocks,
            tx_tv_sec,
            tx_tv_usec,
        );
        let mut buf = Vec::new();
        meta.encode(&mut buf);
        let decoded = MetaData::decode(&buf[..]).unwrap();
        prop_assert_eq!(meta, decoded);
    }

    /// CRC32 is a deterministic function of the bytes it covers: flipping
    /// any single bit in the 20-byte body always changes the computed CRC,
    /// so `decode` always rejects a single-bit corruption of the body.
    #[test]
    fn metadata_detects_any_single_bit_flip(
        center_frequency_hz in any::<u32>(),
        sample_rate_hz in any::<u32>(),
        sample_bytes in any::<u8>(),
        sample_bits in any::<u8>(),
        original_blocks in any::<u8>(),
        fec_blocks in any::<u8>(),
        tx_tv_sec in any::<u32>(),
        tx_tv_usec in any::<u32>(),
        bit in 0usize..160, // 20 body bytes * 8 bits
    ) {
        let meta = MetaData::new(
            center_frequency_hz,
            sample_rate_hz,
            sample_bytes,
            sample_bits,
            original_blocks,
            fec_blocks,
            tx_tv_sec,
            tx_tv_usec,
        );
        let mut buf = Vec::new();
        meta.encode(&mut buf);
        buf[bit / 8] ^= 1 << (bit % 8);
        prop_assert!(matches!(
            MetaData::decode(&buf[..]),
            Err(Error::MetadataCrcMismatch)
        ));
    }
}
