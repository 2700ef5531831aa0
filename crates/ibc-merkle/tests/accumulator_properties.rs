use ibc_merkle::{
    merkle, validate_frontier, verify, Digest, IncrementalMerkle, MerkleError, MerkleTree,
};

fn leaves(count: usize) -> Vec<Digest> {
    (0..count as u64).map(|i| Digest::hash(i.to_le_bytes())).collect()
}

fn accumulate(leaves: &[Digest]) -> IncrementalMerkle {
    let mut mkl = IncrementalMerkle::new();
    for leaf in leaves {
        mkl.append(*leaf).unwrap();
    }
    mkl
}

#[test]
fn test_power_of_two_roots_match_batch_reduction() {
    let all = leaves(1024);
    let mut mkl = IncrementalMerkle::new();
    for (i, leaf) in all.iter().enumerate() {
        mkl.append(*leaf).unwrap();
        let count = i + 1;
        if count.is_power_of_two() {
            assert_eq!(mkl.root(), merkle(&all[..count]), "{count} leaves");
        }
    }
    assert_eq!(IncrementalMerkle::new().root(), merkle(&[]));
}

#[test]
fn test_append_in_batches_matches_single_pass() {
    let all = leaves(77);
    let expected = accumulate(&all);
    for split in [0, 1, 2, 31, 32, 33, 76, 77] {
        let mut mkl = accumulate(&all[..split]);

        // Persist and restore between batches
        let restored = IncrementalMerkle::decode(&mkl.encode()).unwrap();
        assert_eq!(restored, mkl);
        mkl = restored;

        for leaf in &all[split..] {
            mkl.append(*leaf).unwrap();
        }
        assert_eq!(mkl.root(), expected.root(), "split at {split}");
        assert_eq!(mkl, expected);
    }
}

#[test]
fn test_validator_accepts_every_genuine_state_and_rejects_byte_flips() {
    let all = leaves(70);
    let mut mkl = IncrementalMerkle::new();
    for leaf in &all {
        mkl.append(*leaf).unwrap();
        validate_frontier(mkl.active_nodes(), mkl.leaf_count()).unwrap();

        // A lone root cannot be cross-checked against anything below it
        if mkl.active_nodes().len() < 2 {
            continue;
        }
        for position in 0..mkl.active_nodes().len() {
            for byte in [1usize, 15, 31] {
                let mut nodes = mkl.active_nodes().to_vec();
                nodes[position].0[byte] ^= 0x5a;
                let result = IncrementalMerkle::from_parts(nodes, mkl.leaf_count());
                assert!(
                    matches!(result, Err(MerkleError::StructuralCorruption(_))),
                    "count {} position {position} byte {byte}",
                    mkl.leaf_count()
                );
            }
        }
    }
}

#[test]
fn test_every_leaf_proves_against_accumulator_root() {
    for count in 1..=40 {
        let all = leaves(count);
        let mkl = accumulate(&all);
        let tree = MerkleTree::new(all.clone());
        for index in 0..count {
            let path = tree.proof(index).unwrap();
            assert!(
                verify(&all[index], &path, &mkl.root()),
                "count {count} index {index}"
            );
            for other in (0..count).filter(|other| all[*other] != all[index]) {
                assert!(!verify(&all[other], &path, &mkl.root()));
            }
        }
    }
}

#[test]
fn test_five_leaf_scenario() {
    let mkl = accumulate(&leaves(5));
    assert_eq!(mkl.active_nodes().len(), 3);
    assert_eq!(ibc_merkle::max_depth(mkl.leaf_count()), 4);
    mkl.validate().unwrap();

    let mut nodes = mkl.active_nodes().to_vec();
    nodes[1].0[7] ^= 0x01;
    assert!(validate_frontier(&nodes, 5).is_err());
}
