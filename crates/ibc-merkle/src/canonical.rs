//! Canonical left/right pairing.
//!
//! The top bit of byte 0 of a digest is repurposed as its role in a pair: cleared for the
//! left operand, set for the right one. A path entry therefore tells the verifier which
//! side it sits on without a separate index array.

use sha2::{Digest as _, Sha256};

use crate::digest::Digest;

const ROLE_BIT: u8 = 0x80;

/// Clear the role bit, tagging the digest as a left operand
pub fn make_canonical_left(value: &Digest) -> Digest {
    let mut tagged = *value;
    tagged.0[0] &= !ROLE_BIT;
    tagged
}

/// Set the role bit, tagging the digest as a right operand
pub fn make_canonical_right(value: &Digest) -> Digest {
    let mut tagged = *value;
    tagged.0[0] |= ROLE_BIT;
    tagged
}

pub fn is_canonical_left(value: &Digest) -> bool {
    value.0[0] & ROLE_BIT == 0
}

pub fn is_canonical_right(value: &Digest) -> bool {
    value.0[0] & ROLE_BIT != 0
}

pub fn make_canonical_pair(left: &Digest, right: &Digest) -> (Digest, Digest) {
    (make_canonical_left(left), make_canonical_right(right))
}

/// `sha256(canonical_left(left) ++ canonical_right(right))`
pub fn pair_and_hash(left: &Digest, right: &Digest) -> Digest {
    let (left, right) = make_canonical_pair(left, right);
    let mut hasher = Sha256::new();
    hasher.update(left.0);
    hasher.update(right.0);
    Digest(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagging_only_touches_top_bit() {
        let value = Digest([0xff; 32]);
        let left = make_canonical_left(&value);
        assert_eq!(left.0[0], 0x7f);
        assert_eq!(&left.0[1..], &value.0[1..]);
        assert!(is_canonical_left(&left));
        assert!(!is_canonical_right(&left));

        let value = Digest([0x00; 32]);
        let right = make_canonical_right(&value);
        assert_eq!(right.0[0], 0x80);
        assert_eq!(&right.0[1..], &value.0[1..]);
        assert!(is_canonical_right(&right));
    }

    #[test]
    fn test_tagging_is_idempotent() {
        let value = Digest::hash(b"node");
        let left = make_canonical_left(&value);
        assert_eq!(make_canonical_left(&left), left);
        let right = make_canonical_right(&value);
        assert_eq!(make_canonical_right(&right), right);
    }

    #[test]
    fn test_pair_hash_matches_manual_concat() {
        let a = Digest::hash(b"a");
        let b = Digest::hash(b"b");
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&make_canonical_left(&a).0);
        buf.extend_from_slice(&make_canonical_right(&b).0);
        assert_eq!(pair_and_hash(&a, &b), Digest::hash(&buf));
    }

    #[test]
    fn test_pair_hash_ignores_incoming_tags() {
        let a = Digest::hash(b"a");
        let b = Digest::hash(b"b");
        assert_eq!(
            pair_and_hash(&make_canonical_right(&a), &make_canonical_left(&b)),
            pair_and_hash(&a, &b)
        );
        assert_ne!(pair_and_hash(&a, &b), pair_and_hash(&b, &a));
    }
}
