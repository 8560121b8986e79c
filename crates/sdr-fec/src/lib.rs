//! Erasure codec adapter.
//!
//! Binds the core's codec contract (`encode`/`decode` over fixed-size
//! original and recovery blocks) to `reed-solomon-erasure`'s systematic
//! Reed-Solomon coder over GF(2^8). The core never sees
//! `reed_solomon_erasure` types; it only sees [`CodecParams`] and byte
//! slices.

pub mod error;

pub use error::{Error, Result};

use reed_solomon_erasure::galois_8::ReedSolomon;

/// Parameters shared by one `encode`/`decode` call.
///
/// `max_recovery_count` is the codec's parity dimension — the ceiling on
/// recovery blocks the protocol allows (fixed per wire format, not the
/// number a given frame actually produced or received). A Reed-Solomon
/// generator matrix is keyed by `(original_count, max_recovery_count)`:
/// changing the parity dimension between calls would change the matrix
/// and make encode-time and decode-time shard values inconsistent. A
/// frame that only produces `R < max_recovery_count` recovery blocks
/// still transmits the first `R` rows of the matrix built for the full
/// ceiling, so the receiver can always reconstruct using the same
/// fixed-size matrix regardless of how many recovery blocks that
/// particular frame actually carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    pub block_bytes: usize,
    pub original_count: usize,
    pub max_recovery_count: usize,
}

impl CodecParams {
    fn validate(&self) -> Result<()> {
        if self.block_bytes == 0 {
            return Err(Error::InvalidParams("block_bytes must be nonzero".into()));
        }
        if self.original_count == 0 {
            return Err(Error::InvalidParams(
                "original_count must be nonzero".into(),
            ));
        }
        if self.max_recovery_count == 0 {
            return Err(Error::InvalidParams(
                "max_recovery_count must be nonzero".into(),
            ));
        }
        Ok(())
    }

    fn build_codec(&self) -> Result<ReedSolomon> {
        ReedSolomon::new(self.original_count, self.max_recovery_count)
            .map_err(|e| Error::Codec(e.to_string()))
    }
}

/// A descriptor block as received off the wire: its logical index (which
/// may be `>= original_count` for a recovery block), its bytes, and
/// whether those bytes are genuine data (`present`) or scratch space for
/// `decode` to fill in.
///
/// `decode` expects exactly one descriptor per position `0..original_count
/// + max_recovery_count`. A descriptor with `present: false` is treated as
/// missing for reconstruction purposes; its `block` buffer (still required,
/// sized `block_bytes`) is where `decode` writes the recovered shard back,
/// if that position could be reconstructed.
pub struct Descriptor<'a> {
    pub index: u8,
    pub present: bool,
    pub block: &'a mut [u8],
}

/// Thin wrapper over `reed-solomon-erasure` implementing the core's codec
/// contract. Stateless: a fresh `ReedSolomon` matrix is built per call from
/// `params`, so the same `CauchyCodec` can serve frames with different
/// `original_count`/`max_recovery_count` geometries (though in practice
/// both endpoints always pass the same fixed protocol constants).
#[derive(Debug, Default)]
pub struct CauchyCodec;

impl CauchyCodec {
    pub fn new() -> Self {
        Self
    }

    /// Produce `recovery.len()` recovery blocks (`<= params.max_recovery_count`)
    /// from `originals` (length `params.original_count`), each block exactly
    /// `params.block_bytes` long. Deterministic: the same originals and the
    /// same `params.max_recovery_count` always produce the same recovery
    /// blocks, regardless of how many of them `recovery` actually asks for.
    pub fn encode(
        &self,
        params: CodecParams,
        originals: &[&[u8]],
        recovery: &mut [&mut [u8]],
    ) -> Result<()> {
        params.validate()?;
        if originals.len() != params.original_count {
            return Err(Error::InvalidParams(format!(
                "expected {} original blocks, got {}",
                params.original_count,
                originals.len()
            )));
        }
        if recovery.len() > params.max_recovery_count {
            return Err(Error::InvalidParams(format!(
                "requested {} recovery blocks, ceiling is {}",
                recovery.len(),
                params.max_recovery_count
            )));
        }
        if recovery.is_empty() {
            return Ok(());
        }
        for b in originals.iter().chain(recovery.iter().map(|r| &**r)) {
            if b.len() != params.block_bytes {
                return Err(Error::InvalidParams(
                    "all blocks must be block_bytes long".into(),
                ));
            }
        }

        let rs = params.build_codec()?;

        let mut shards: Vec<Vec<u8>> = originals.iter().map(|b| b.to_vec()).collect();
        shards.extend((0..params.max_recovery_count).map(|_| vec![0u8; params.block_bytes]));

        rs.encode(&mut shards).map_err(|e| Error::Codec(e.to_string()))?;

        for (dst, src) in recovery
            .iter_mut()
            .zip(shards[params.original_count..].iter())
        {
            dst.copy_from_slice(src);
        }
        Ok(())
    }

    /// Reconstruct every descriptor marked `present: false`, writing the
    /// recovered bytes directly into its `block` buffer. Descriptors are
    /// tagged with their true wire index, which is what lets this work even
    /// when a frame only ever produced and transmitted a strict subset of
    /// the recovery ceiling: absent positions — whether lost in transit or
    /// never sent — are both just "missing" to the underlying matrix.
    pub fn decode(&self, params: CodecParams, descriptors: &mut [Descriptor<'_>]) -> Result<()> {
        params.validate()?;
        let total = params.original_count + params.max_recovery_count;
        for d in descriptors.iter() {
            if d.block.len() != params.block_bytes {
                return Err(Error::InvalidParams(
                    "all blocks must be block_bytes long".into(),
                ));
            }
            if d.index as usize >= total {
                return Err(Error::InvalidParams(format!(
                    "descriptor index {} out of range for total {}",
                    d.index, total
                )));
            }
        }

        let missing_originals = (0..params.original_count as u8)
            .filter(|i| !descriptors.iter().any(|d| d.index == *i && d.present))
            .count();
        if missing_originals == 0 {
            return Ok(());
        }

        let recovery_have = descriptors
            .iter()
            .filter(|d| d.index as usize >= params.original_count && d.present)
            .count();
        if recovery_have == 0 {
            tracing::warn!(
                missing_originals,
                "no recovery blocks available, cannot reconstruct"
            );
            return Err(Error::TooFewBlocks {
                need: params.original_count,
                have: params.original_count - missing_originals,
            });
        }

        let rs = params.build_codec()?;

        let mut shards: Vec<Option<Vec<u8>>> = vec![None; total];
        for d in descriptors.iter() {
            if d.present {
                shards[d.index as usize] = Some(d.block.to_vec());
            }
        }

        rs.reconstruct(&mut shards).map_err(|e| {
            tracing::warn!(error = %e, "erasure reconstruction failed");
            Error::Codec(e.to_string())
        })?;

        for d in descriptors.iter_mut() {
            if !d.present {
                if let Some(shard) = &shards[d.index as usize] {
                    d.block.copy_from_slice(shard);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn make_blocks(count: usize, len: usize, seed: u8) -> Vec<Vec<u8>> {
        (0..count)
            .map(|i| vec![seed.wrapping_add(i as u8); len])
            .collect()
    }

    /// Build the full `blocks.len()`-position descriptor set for a `decode`
    /// call: positions in `dropped` carry zeroed scratch buffers decode is
    /// expected to fill in, everything else carries its real bytes.
    fn full_descriptor_set<'a>(
        blocks: &'a mut [Vec<u8>],
        dropped: &HashSet<usize>,
    ) -> Vec<Descriptor<'a>> {
        blocks
            .iter_mut()
            .enumerate()
            .map(|(i, block)| Descriptor {
                index: i as u8,
                present: !dropped.contains(&i),
                block: block.as_mut_slice(),
            })
            .collect()
    }

    #[test]
    fn decode_reconstructs_missing_original_blocks() {
        let params = CodecParams {
            block_bytes: 16,
            original_count: 8,
            max_recovery_count: 4,
        };
        let originals = make_blocks(8, 16, 7);
        let original_refs: Vec<&[u8]> = originals.iter().map(|b| b.as_slice()).collect();
        let mut recovery = make_blocks(4, 16, 0);
        {
            let mut recovery_refs: Vec<&mut [u8]> =
                recovery.iter_mut().map(|b| b.as_mut_slice()).collect();
            CauchyCodec::new()
                .encode(params, &original_refs, &mut recovery_refs)
                .unwrap();
        }

        // Drop originals 0, 1 and 2 (within tolerance since 4 recovery
        // blocks exist); keep the rest of the originals plus all 4
        // recovery blocks.
        let dropped: HashSet<usize> = [0usize, 1, 2].into_iter().collect();
        let mut blocks: Vec<Vec<u8>> = (0..12)
            .map(|i| {
                if i < 8 {
                    if dropped.contains(&i) {
                        vec![0u8; 16]
                    } else {
                        originals[i].clone()
                    }
                } else {
                    recovery[i - 8].clone()
                }
            })
            .collect();

        let mut descriptors = full_descriptor_set(&mut blocks, &dropped);
        CauchyCodec::new().decode(params, &mut descriptors).unwrap();
        drop(descriptors);

        for &i in &dropped {
            assert_eq!(blocks[i], originals[i], "block {i} was not reconstructed");
        }
        // A block that was already present must be left untouched.
        assert_eq!(blocks[5], originals[5]);
    }

    #[test]
    fn decode_reconstructs_with_fewer_recovery_blocks_than_the_ceiling() {
        // The ceiling is 6 but this frame only ever produced 2 recovery
        // blocks; decode must still succeed using the same fixed matrix.
        let params = CodecParams {
            block_bytes: 8,
            original_count: 8,
            max_recovery_count: 6,
        };
        let originals = make_blocks(8, 8, 2);
        let original_refs: Vec<&[u8]> = originals.iter().map(|b| b.as_slice()).collect();
        let mut recovery = make_blocks(2, 8, 0);
        {
            let mut recovery_refs: Vec<&mut [u8]> =
                recovery.iter_mut().map(|b| b.as_mut_slice()).collect();
            CauchyCodec::new()
                .encode(params, &original_refs, &mut recovery_refs)
                .unwrap();
        }

        // Total positions: 8 originals + a 6-block ceiling. Only 2 recovery
        // blocks were ever produced; the other 4 recovery positions are
        // simply never present, same as a lost datagram would be.
        let dropped: HashSet<usize> = [0usize, 1].into_iter().collect();
        let mut blocks: Vec<Vec<u8>> = (0..14)
            .map(|i| {
                if i < 8 {
                    if dropped.contains(&i) {
                        vec![0u8; 8]
                    } else {
                        originals[i].clone()
                    }
                } else if i < 10 {
                    recovery[i - 8].clone()
                } else {
                    vec![0u8; 8]
                }
            })
            .collect();

        let mut absent = dropped.clone();
        absent.extend(10..14);
        let mut descriptors = full_descriptor_set(&mut blocks, &absent);
        CauchyCodec::new().decode(params, &mut descriptors).unwrap();
        drop(descriptors);

        for &i in &dropped {
            assert_eq!(blocks[i], originals[i], "block {i} was not reconstructed");
        }
    }

    #[test]
    fn decode_fails_with_too_few_blocks() {
        let params = CodecParams {
            block_bytes: 16,
            original_count: 8,
            max_recovery_count: 2,
        };
        // Only 5 of the 8 originals present, no recovery blocks at all.
        let dropped: HashSet<usize> = [5usize, 6, 7].into_iter().collect();
        let mut blocks: Vec<Vec<u8>> = make_blocks(10, 16, 1);
        let mut absent = dropped.clone();
        absent.extend(8..10);
        let mut descriptors = full_descriptor_set(&mut blocks, &absent);
        let codec = CauchyCodec::new();
        assert!(codec.decode(params, &mut descriptors).is_err());
    }

    #[test]
    fn encode_is_deterministic() {
        let params = CodecParams {
            block_bytes: 8,
            original_count: 4,
            max_recovery_count: 2,
        };
        let originals = make_blocks(4, 8, 3);
        let original_refs: Vec<&[u8]> = originals.iter().map(|b| b.as_slice()).collect();

        let mut recovery_a = make_blocks(2, 8, 0);
        let mut recovery_b = make_blocks(2, 8, 0);
        let codec = CauchyCodec::new();
        {
            let mut refs_a: Vec<&mut [u8]> =
                recovery_a.iter_mut().map(|b| b.as_mut_slice()).collect();
            codec.encode(params, &original_refs, &mut refs_a).unwrap();
        }
        {
            let mut refs_b: Vec<&mut [u8]> =
                recovery_b.iter_mut().map(|b| b.as_mut_slice()).collect();
            codec.encode(params, &original_refs, &mut refs_b).unwrap();
        }
        assert_eq!(recovery_a, recovery_b);
    }
}
