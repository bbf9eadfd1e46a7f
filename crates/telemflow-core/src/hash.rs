//! Stable hashing helpers for group keys and schema fingerprints.

use blake3::Hasher;

use crate::types::{scalar_type_order, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

/// Hash a tuple of scalars, e.g. the group-by key of one row.
pub fn hash_scalars<'a>(values: impl IntoIterator<Item = &'a Scalar>) -> Hash256 {
    let mut hasher = Hasher::new();
    for value in values {
        hash_scalar(value, &mut hasher);
    }
    Hash256(hasher.finalize().into())
}

fn hash_scalar(scalar: &Scalar, hasher: &mut Hasher) {
    use Scalar::*;

    // Type discriminant first, so I64(1) and F64(1.0) differ.
    hasher.update(&[scalar_type_order(scalar)]);

    match scalar {
        Null => {}
        Bool(b) => {
            hasher.update(&[*b as u8]);
        }
        I64(i) => {
            hasher.update(&i.to_le_bytes());
        }
        F64(f) => {
            hasher.update(&f.to_bits().to_le_bytes());
        }
        Str(s) => {
            // Length prefix keeps ("ab", "c") apart from ("a", "bc").
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        Bin(b) => {
            hasher.update(&(b.len() as u64).to_le_bytes());
            hasher.update(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_tuples_hash_by_type_and_boundary() {
        let a = hash_scalars(&[Scalar::Str("ab".into()), Scalar::Str("c".into())]);
        let b = hash_scalars(&[Scalar::Str("a".into()), Scalar::Str("bc".into())]);
        assert_ne!(a, b);
        assert_ne!(
            hash_scalars(&[Scalar::I64(1)]),
            hash_scalars(&[Scalar::F64(1.0)])
        );
        assert_eq!(
            hash_scalars(&[Scalar::Bool(true)]),
            hash_scalars(&[Scalar::Bool(true)])
        );
    }

    #[test]
    fn hex_is_64_chars() {
        let h = hash_bytes(b"telemflow");
        assert_eq!(h.to_hex().len(), 64);
        assert_eq!(h.to_string(), h.to_hex());
    }
}
