//! Per-batch circuit-input bundles.
//!
//! Each batch step of the poll state machine returns one of these structs.
//! They serialize to the exact JSON key set the proving layer consumes:
//! every field element renders as a decimal string, Merkle paths as nested
//! arrays of sibling groups.

use maci_crypto::serde_utils::FieldStr;
use maci_crypto::Field;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Inputs for one message-processing batch.
///
/// Per-slot arrays (`current_state_leaves`, `current_ballots`,
/// `current_vote_weights` and their path arrays) are ordered by ascending
/// message index even though the batch is executed in reverse.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMessagesInputs {
    #[serde_as(as = "FieldStr")]
    pub poll_end_timestamp: Field,
    #[serde_as(as = "FieldStr")]
    pub packed_vals: Field,
    #[serde_as(as = "FieldStr")]
    pub msg_root: Field,
    #[serde_as(as = "Vec<Vec<FieldStr>>")]
    pub msgs: Vec<Vec<Field>>,
    #[serde_as(as = "Vec<Vec<FieldStr>>")]
    pub msg_subroot_path_elements: Vec<Vec<Field>>,
    #[serde_as(as = "FieldStr")]
    pub coord_priv_key: Field,
    #[serde_as(as = "[FieldStr; 2]")]
    pub coord_pub_key: [Field; 2],
    #[serde_as(as = "Vec<[FieldStr; 2]>")]
    pub enc_pub_keys: Vec<[Field; 2]>,
    #[serde_as(as = "FieldStr")]
    pub current_state_root: Field,
    #[serde_as(as = "FieldStr")]
    pub current_ballot_root: Field,
    #[serde_as(as = "FieldStr")]
    pub current_sb_commitment: Field,
    #[serde_as(as = "FieldStr")]
    pub current_sb_salt: Field,
    #[serde_as(as = "Vec<[FieldStr; 4]>")]
    pub current_state_leaves: Vec<[Field; 4]>,
    #[serde_as(as = "Vec<Vec<Vec<FieldStr>>>")]
    pub current_state_leaves_path_elements: Vec<Vec<Vec<Field>>>,
    #[serde_as(as = "Vec<[FieldStr; 2]>")]
    pub current_ballots: Vec<[Field; 2]>,
    #[serde_as(as = "Vec<Vec<Vec<FieldStr>>>")]
    pub current_ballots_path_elements: Vec<Vec<Vec<Field>>>,
    #[serde_as(as = "Vec<FieldStr>")]
    pub current_vote_weights: Vec<Field>,
    #[serde_as(as = "Vec<Vec<Vec<FieldStr>>>")]
    pub current_vote_weights_path_elements: Vec<Vec<Vec<Field>>>,
    #[serde_as(as = "FieldStr")]
    pub new_sb_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub new_sb_commitment: Field,
    #[serde_as(as = "FieldStr")]
    pub input_hash: Field,
}

/// Inputs for one tally batch.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyVotesInputs {
    #[serde_as(as = "FieldStr")]
    pub state_root: Field,
    #[serde_as(as = "FieldStr")]
    pub ballot_root: Field,
    #[serde_as(as = "FieldStr")]
    pub sb_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub sb_commitment: Field,
    #[serde_as(as = "FieldStr")]
    pub current_tally_commitment: Field,
    #[serde_as(as = "FieldStr")]
    pub new_tally_commitment: Field,
    #[serde_as(as = "FieldStr")]
    pub packed_vals: Field,
    #[serde_as(as = "FieldStr")]
    pub input_hash: Field,
    #[serde_as(as = "Vec<[FieldStr; 2]>")]
    pub ballots: Vec<[Field; 2]>,
    #[serde_as(as = "Vec<Vec<FieldStr>>")]
    pub ballot_path_elements: Vec<Vec<Field>>,
    #[serde_as(as = "Vec<Vec<FieldStr>>")]
    pub votes: Vec<Vec<Field>>,
    #[serde_as(as = "Vec<FieldStr>")]
    pub current_results: Vec<Field>,
    #[serde_as(as = "FieldStr")]
    pub current_results_root_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub current_spent_voice_credit_subtotal: Field,
    #[serde_as(as = "FieldStr")]
    pub current_spent_voice_credit_subtotal_salt: Field,
    #[serde_as(as = "Vec<FieldStr>")]
    pub current_per_vo_spent_voice_credits: Vec<Field>,
    #[serde_as(as = "FieldStr")]
    pub current_per_vo_spent_voice_credits_root_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub new_results_root_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub new_per_vo_spent_voice_credits_root_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub new_spent_voice_credit_subtotal_salt: Field,
}

/// Inputs for one pairwise subsidy batch.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsidyInputs {
    #[serde_as(as = "FieldStr")]
    pub state_root: Field,
    #[serde_as(as = "FieldStr")]
    pub ballot_root: Field,
    #[serde_as(as = "FieldStr")]
    pub sb_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub current_subsidy_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub new_subsidy_salt: Field,
    #[serde_as(as = "FieldStr")]
    pub sb_commitment: Field,
    #[serde_as(as = "FieldStr")]
    pub current_subsidy_commitment: Field,
    #[serde_as(as = "FieldStr")]
    pub new_subsidy_commitment: Field,
    #[serde_as(as = "Vec<FieldStr>")]
    pub current_subsidy: Vec<Field>,
    #[serde_as(as = "FieldStr")]
    pub packed_vals: Field,
    #[serde_as(as = "FieldStr")]
    pub input_hash: Field,
    #[serde_as(as = "Vec<[FieldStr; 2]>")]
    pub ballots1: Vec<[Field; 2]>,
    #[serde_as(as = "Vec<[FieldStr; 2]>")]
    pub ballots2: Vec<[Field; 2]>,
    #[serde_as(as = "Vec<Vec<FieldStr>>")]
    pub votes1: Vec<Vec<Field>>,
    #[serde_as(as = "Vec<Vec<FieldStr>>")]
    pub votes2: Vec<Vec<Field>>,
    #[serde_as(as = "Vec<Vec<FieldStr>>")]
    pub ballot_path_elements1: Vec<Vec<Field>>,
    #[serde_as(as = "Vec<Vec<FieldStr>>")]
    pub ballot_path_elements2: Vec<Vec<Field>>,
}
