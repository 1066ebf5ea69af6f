//! An incremental quinary Merkle tree with sparse node storage.
//!
//! Nodes are addressed by a single flat index: leaves occupy `[0, 5^depth)`,
//! the level above starts at `5^depth`, and so on up to the root at
//! `num_nodes - 1`. With this layout the parent of node `i` is always
//! `capacity + i / 5`, and the children of an internal node `p` start at
//! `(p - capacity) * 5`. Unset nodes read as the zero hash of their level,
//! so the tree never materializes empty subtrees.

use crate::hashing::hash5;
use crate::{CryptoError, Field};

use std::collections::HashMap;

/// Every tree in the protocol is quinary.
pub const TREE_ARITY: usize = 5;

/// A Merkle path from a leaf (or a subtree root) up to the root.
///
/// `path_elements[i]` holds the 4 siblings at level `i`, and
/// `path_indices[i]` the position of the traversed child among its 5
/// siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub path_elements: Vec<Vec<Field>>,
    pub path_indices: Vec<usize>,
    pub root: Field,
    pub leaf: Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalQuinTree {
    depth: usize,
    zero_value: Field,
    /// Zero hash per level: `zeros[0]` is the zero leaf, `zeros[i + 1]` the
    /// hash of five `zeros[i]`.
    zeros: Vec<Field>,
    nodes: HashMap<usize, Field>,
    next_index: usize,
    num_nodes: usize,
    capacity: usize,
    root: Field,
}

impl IncrementalQuinTree {
    pub fn new(depth: usize, zero_value: Field) -> Self {
        let mut zeros = Vec::with_capacity(depth + 1);
        let mut current = zero_value;
        for _ in 0..=depth {
            zeros.push(current);
            current = hash5(&[current; TREE_ARITY]);
        }

        let capacity = TREE_ARITY.pow(depth as u32);
        let num_nodes = (TREE_ARITY.pow(depth as u32 + 1) - 1) / (TREE_ARITY - 1);
        let root = zeros[depth];

        Self {
            depth,
            zero_value,
            zeros,
            nodes: HashMap::new(),
            next_index: 0,
            num_nodes,
            capacity,
            root,
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn root(&self) -> Field {
        self.root
    }

    #[inline]
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    #[inline]
    pub fn zero_value(&self) -> Field {
        self.zero_value
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a leaf at the next free index.
    pub fn insert(&mut self, value: Field) -> Result<(), CryptoError> {
        if self.next_index >= self.capacity {
            return Err(CryptoError::TreeFull);
        }
        let index = self.next_index;
        self.next_index += 1;
        self.update(index, value)
    }

    /// Overwrites the leaf at `index` and rehashes its path to the root.
    pub fn update(&mut self, index: usize, value: Field) -> Result<(), CryptoError> {
        if index >= self.capacity {
            return Err(CryptoError::LeafIndexOutOfBounds(index, self.capacity));
        }

        self.nodes.insert(index, value);

        let mut current = index;
        for _ in 0..self.depth {
            let parent = self.capacity + current / TREE_ARITY;
            let child_start = (parent - self.capacity) * TREE_ARITY;

            let mut children = Vec::with_capacity(TREE_ARITY);
            for j in 0..TREE_ARITY {
                children.push(self.node(child_start + j));
            }
            self.nodes.insert(parent, hash5(&children));
            current = parent;
        }

        self.root = self.node(self.num_nodes - 1);
        Ok(())
    }

    /// Generates a Merkle path for the leaf at `index`.
    pub fn gen_proof(&self, index: usize) -> Result<MerkleProof, CryptoError> {
        if index >= self.capacity {
            return Err(CryptoError::LeafIndexOutOfBounds(index, self.capacity));
        }

        let mut path_elements = Vec::with_capacity(self.depth);
        let path_indices = self.leaf_digits(index);

        let mut level_index = index;
        let mut offset = 0;

        for i in 0..self.depth {
            let start = level_index - (level_index % TREE_ARITY) + offset;
            let mut siblings = Vec::with_capacity(TREE_ARITY - 1);
            for j in 0..TREE_ARITY {
                if j != path_indices[i] {
                    siblings.push(self.node(start + j));
                }
            }
            path_elements.push(siblings);
            level_index /= TREE_ARITY;
            offset += TREE_ARITY.pow((self.depth - i) as u32);
        }

        Ok(MerkleProof {
            path_elements,
            path_indices,
            root: self.root,
            leaf: self.node(index),
        })
    }

    /// Generates a Merkle path from the root of the whole subtree covering
    /// the leaves `[start, end)` up to the tree root. The range must be an
    /// aligned power-of-five block.
    pub fn gen_subroot_proof(&self, start: usize, end: usize) -> Result<MerkleProof, CryptoError> {
        if start >= end || end > self.capacity {
            return Err(CryptoError::InvalidSubrootRange(start, end));
        }
        let num_leaves = end - start;

        let mut sub_depth = 0;
        while TREE_ARITY.pow(sub_depth as u32) < num_leaves {
            sub_depth += 1;
        }
        if TREE_ARITY.pow(sub_depth as u32) != num_leaves || start % num_leaves != 0 {
            return Err(CryptoError::InvalidSubrootRange(start, end));
        }

        let mut subtree = IncrementalQuinTree::new(sub_depth, self.zero_value);
        for i in start..end {
            subtree.insert(self.node(i))?;
        }

        let full = self.gen_proof(start)?;
        Ok(MerkleProof {
            path_elements: full.path_elements[sub_depth..].to_vec(),
            path_indices: full.path_indices[sub_depth..].to_vec(),
            root: self.root,
            leaf: subtree.root(),
        })
    }

    /// Recomputes the root from a proof and checks it.
    pub fn verify_proof(proof: &MerkleProof) -> bool {
        let mut current = proof.leaf;
        for (siblings, &digit) in proof.path_elements.iter().zip(&proof.path_indices) {
            if digit >= TREE_ARITY || siblings.len() != TREE_ARITY - 1 {
                return false;
            }
            let mut level = siblings.clone();
            level.insert(digit, current);
            current = hash5(&level);
        }
        current == proof.root
    }

    /// Reads a node, falling back to the zero hash of its level.
    fn node(&self, index: usize) -> Field {
        if let Some(value) = self.nodes.get(&index) {
            return *value;
        }

        let mut level = 0;
        let mut block_end = self.capacity;
        while index >= block_end {
            level += 1;
            block_end += TREE_ARITY.pow((self.depth - level) as u32);
        }
        self.zeros[level]
    }

    /// The base-5 digits of a leaf index, least significant first.
    fn leaf_digits(&self, index: usize) -> Vec<usize> {
        let mut digits = Vec::with_capacity(self.depth);
        let mut r = index;
        for _ in 0..self.depth {
            digits.push(r % TREE_ARITY);
            r /= TREE_ARITY;
        }
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u64) -> Field {
        Field::from(n)
    }

    #[test]
    fn test_empty_tree_root_is_zero_hash() {
        let t1 = IncrementalQuinTree::new(3, leaf(0));
        let t2 = IncrementalQuinTree::new(3, leaf(0));
        assert_eq!(t1.root(), t2.root());
        assert_eq!(t1.next_index(), 0);
    }

    #[test]
    fn test_insert_changes_root() {
        let mut tree = IncrementalQuinTree::new(2, leaf(0));
        let empty_root = tree.root();
        tree.insert(leaf(42)).unwrap();
        assert_ne!(tree.root(), empty_root);
        assert_eq!(tree.next_index(), 1);
    }

    #[test]
    fn test_update_is_equivalent_to_fresh_insertions() {
        let mut a = IncrementalQuinTree::new(2, leaf(0));
        for i in 0..7 {
            a.insert(leaf(i)).unwrap();
        }
        a.update(3, leaf(99)).unwrap();

        let mut b = IncrementalQuinTree::new(2, leaf(0));
        for i in 0..7 {
            b.insert(if i == 3 { leaf(99) } else { leaf(i) }).unwrap();
        }
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_gen_proof_verifies() {
        let mut tree = IncrementalQuinTree::new(3, leaf(0));
        for i in 0..17 {
            tree.insert(leaf(i + 1)).unwrap();
        }
        for i in 0..17 {
            let proof = tree.gen_proof(i).unwrap();
            assert_eq!(proof.leaf, leaf(i as u64 + 1));
            assert!(IncrementalQuinTree::verify_proof(&proof));
        }
        // A proof for an untouched (zero) leaf also verifies.
        let proof = tree.gen_proof(24).unwrap();
        assert_eq!(proof.leaf, leaf(0));
        assert!(IncrementalQuinTree::verify_proof(&proof));
    }

    #[test]
    fn test_tampered_proof_fails() {
        let mut tree = IncrementalQuinTree::new(2, leaf(0));
        tree.insert(leaf(5)).unwrap();
        let mut proof = tree.gen_proof(0).unwrap();
        proof.leaf = leaf(6);
        assert!(!IncrementalQuinTree::verify_proof(&proof));
    }

    #[test]
    fn test_subroot_proof_verifies() {
        let mut tree = IncrementalQuinTree::new(3, leaf(0));
        for i in 0..30 {
            tree.insert(leaf(i)).unwrap();
        }
        // Second block of 5 leaves.
        let proof = tree.gen_subroot_proof(5, 10).unwrap();
        assert_eq!(proof.path_elements.len(), 2);
        assert!(IncrementalQuinTree::verify_proof(&proof));

        // A whole 25-leaf block.
        let proof = tree.gen_subroot_proof(0, 25).unwrap();
        assert_eq!(proof.path_elements.len(), 1);
        assert!(IncrementalQuinTree::verify_proof(&proof));
    }

    #[test]
    fn test_subroot_proof_rejects_unaligned_ranges() {
        let tree = IncrementalQuinTree::new(3, leaf(0));
        assert!(tree.gen_subroot_proof(3, 8).is_err());
        assert!(tree.gen_subroot_proof(0, 7).is_err());
        assert!(tree.gen_subroot_proof(10, 10).is_err());
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut tree = IncrementalQuinTree::new(1, leaf(0));
        assert!(tree.update(5, leaf(1)).is_err());
        for _ in 0..5 {
            tree.insert(leaf(1)).unwrap();
        }
        assert!(matches!(tree.insert(leaf(1)), Err(CryptoError::TreeFull)));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = IncrementalQuinTree::new(2, leaf(0));
        original.insert(leaf(1)).unwrap();
        let snapshot = original.clone();
        let root_before = snapshot.root();
        original.insert(leaf(2)).unwrap();
        assert_eq!(snapshot.root(), root_before);
        assert_ne!(original.root(), snapshot.root());
    }
}
