//! Binary fingerprints of embeddings
//!
//! A fingerprint keeps one byte per dimension holding `0` or `1`. Both the
//! write path and the read path must quantize with the same threshold,
//! otherwise stored fingerprints are not comparable with query fingerprints.

use rayon::prelude::*;

/// Fixed-length bit vector stored as one byte per bit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// Wrap raw bytes as read back from storage
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hamming distance to another fingerprint
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        hamming_distance(&self.0, &other.0)
    }
}

/// Quantize a vector: `1` where `value >= threshold`, else `0`.
///
/// The element range is split into one segment per rayon worker; each
/// segment writes a disjoint slice of the output, and the call returns only
/// after every segment is done.
pub fn quantize(vector: &[f64], threshold: f64) -> Fingerprint {
    if vector.is_empty() {
        return Fingerprint::default();
    }

    let workers = rayon::current_num_threads().max(1);
    let segment = vector.len().div_ceil(workers);
    let mut bits = vec![0u8; vector.len()];

    bits.par_chunks_mut(segment)
        .zip(vector.par_chunks(segment))
        .for_each(|(output, input)| {
            for (bit, &value) in output.iter_mut().zip(input) {
                *bit = u8::from(value >= threshold);
            }
        });

    Fingerprint(bits)
}

/// Count differing bits between two byte-per-bit fingerprints.
///
/// Fingerprints of different lengths are compared on their common prefix
/// only; the tail of the longer one is ignored.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}
