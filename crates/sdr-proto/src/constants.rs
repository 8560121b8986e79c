//! Protocol constants shared by the sender framer and receiver reassembler.
//!
//! Both endpoints hard-code these; the wire protocol is unversioned.

/// Total size of one UDP datagram (header + protected block), in bytes.
pub const DATAGRAM_SIZE: usize = 512;

/// Size of the fixed datagram header, in bytes.
pub const HEADER_SIZE: usize = 4;

/// Size of the protected block carried by a datagram, in bytes.
pub const BLOCK_SIZE: usize = DATAGRAM_SIZE - HEADER_SIZE;

/// Number of original (protected) blocks per frame. Fixed by agreement
/// between sender and receiver; never negotiated on the wire.
pub const ORIGINAL_COUNT: usize = 128;

/// Upper bound on the runtime-configurable recovery block count.
pub const MAX_RECOVERY_COUNT: usize = 127;

/// Size in bytes of one complex I/Q sample (two i16 components).
pub const SAMPLE_SIZE: usize = 4;

/// Number of samples that fit in one protected block's payload.
pub const SAMPLES_PER_BLOCK: usize = BLOCK_SIZE / SAMPLE_SIZE;

/// Number of payload blocks per frame (block 0 carries metadata instead).
pub const PAYLOAD_BLOCKS_PER_FRAME: usize = ORIGINAL_COUNT - 1;

/// Total complex samples carried by one fully-received frame.
pub const SAMPLES_PER_FRAME: usize = PAYLOAD_BLOCKS_PER_FRAME * SAMPLES_PER_BLOCK;

/// Size, in bytes, of the contiguous payload emitted to the consumer per frame.
pub const FRAME_PAYLOAD_BYTES: usize = SAMPLES_PER_FRAME * SAMPLE_SIZE;

/// Size of the `MetaData` record carried (zero-padded) in block 0.
pub const METADATA_SIZE: usize = 24;

/// Number of leading bytes of `MetaData` compared for change detection
/// (tuning + geometry, excluding timestamps and CRC).
pub const METADATA_COMPARE_LEN: usize = 12;

const _: () = assert!(HEADER_SIZE + BLOCK_SIZE == DATAGRAM_SIZE);
const _: () = assert!(SAMPLES_PER_BLOCK == 127);
const _: () = assert!(SAMPLES_PER_FRAME == 16_129);
