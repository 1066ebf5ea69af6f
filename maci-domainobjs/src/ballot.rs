//! A participant's per-poll ballot: their votes and next expected nonce.

use maci_crypto::hashing::hash_left_right;
use maci_crypto::quintree::{IncrementalQuinTree, TREE_ARITY};
use maci_crypto::serde_utils::field_to_decimal;
use maci_crypto::Field;

use serde::{Deserialize, Serialize};

/// One leaf of a poll's ballot tree. `votes[i]` is the weight cast for vote
/// option `i`; `nonce` counts the valid commands already applied, so the
/// next valid command must carry `nonce + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub nonce: u64,
    pub votes: Vec<u64>,
    pub vote_option_tree_depth: usize,
}

impl Ballot {
    /// Creates a blank ballot with `num_vote_options` zeroed slots.
    ///
    /// Panics if the vote option tree cannot hold that many options.
    pub fn new(num_vote_options: usize, vote_option_tree_depth: usize) -> Self {
        assert!(TREE_ARITY.pow(vote_option_tree_depth as u32) >= num_vote_options);
        Self {
            nonce: 0,
            votes: vec![0; num_vote_options],
            vote_option_tree_depth,
        }
    }

    /// The root of the vote option tree.
    ///
    /// Only votes up to the last nonzero slot are inserted; the rest of the
    /// tree reads as zero leaves, which hash identically.
    pub fn vote_option_root(&self) -> Field {
        let mut len = self.votes.len();
        while len > 1 && self.votes[len - 1] == 0 {
            len -= 1;
        }

        let mut tree = IncrementalQuinTree::new(self.vote_option_tree_depth, Field::from(0u64));
        for &vote in &self.votes[..len] {
            tree.insert(Field::from(vote))
                .expect("vote option tree holds every option by construction");
        }
        tree.root()
    }

    pub fn as_array(&self) -> [Field; 2] {
        [Field::from(self.nonce), self.vote_option_root()]
    }

    pub fn as_circuit_inputs(&self) -> Vec<String> {
        self.as_array().iter().map(field_to_decimal).collect()
    }

    pub fn hash(&self) -> Field {
        let [nonce, root] = self.as_array();
        hash_left_right(nonce, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_ballots_hash_equally() {
        let a = Ballot::new(25, 2);
        let b = Ballot::new(25, 2);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.nonce, 0);
        assert!(a.votes.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_trailing_zero_votes_do_not_change_the_root() {
        // Same nonzero prefix, different lengths of trailing zeros.
        let mut a = Ballot::new(3, 2);
        a.votes[1] = 9;
        let mut b = Ballot::new(25, 2);
        b.votes[1] = 9;
        assert_eq!(a.vote_option_root(), b.vote_option_root());
    }

    #[test]
    fn test_vote_changes_hash() {
        let blank = Ballot::new(25, 2);
        let mut voted = blank.clone();
        voted.votes[3] = 5;
        assert_ne!(blank.hash(), voted.hash());
    }

    #[test]
    fn test_nonce_changes_hash() {
        let blank = Ballot::new(25, 2);
        let mut bumped = blank.clone();
        bumped.nonce = 1;
        assert_ne!(blank.hash(), bumped.hash());
    }

    #[test]
    #[should_panic]
    fn test_too_many_options_panics() {
        Ballot::new(26, 2);
    }

    #[test]
    fn test_json_round_trip() {
        let mut ballot = Ballot::new(25, 2);
        ballot.nonce = 3;
        ballot.votes[7] = 4;
        let json = serde_json::to_string(&ballot).unwrap();
        let back: Ballot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ballot);
    }
}
