//! One voting round: its message log, its snapshot of the registry state,
//! and the three batch state machines (message processing, tallying, and
//! the optional pairwise subsidy calculation).
//!
//! Message batches are consumed in reverse order, and slots within a batch
//! in reverse index order; this mirrors the order the processing circuit
//! verifies. Tally and subsidy batches advance forward. Every batch emits
//! a circuit-input bundle chained to the previous batch through salted
//! commitments.

use crate::circuit_inputs::{ProcessMessagesInputs, SubsidyInputs, TallyVotesInputs};
use crate::errors::{CoreError, MessageError};
use crate::utils::{
    field_to_u128, field_to_u64, pack_process_message_small_vals, pack_subsidy_small_vals,
    pack_tally_votes_small_vals,
};

use maci_crypto::hashing::{hash3, hash_left_right, sha256_hash};
use maci_crypto::quintree::TREE_ARITY;
use maci_crypto::serde_utils::FieldStr;
use maci_crypto::{
    gen_random_salt, gen_tree_commitment, nothing_up_my_sleeve, Field, IncrementalQuinTree,
};
use maci_domainobjs::{
    Ballot, Command, Keypair, Message, MessageKind, PrivateKey, PublicKey, StateLeaf, TopupCommand,
    VoteCommand,
};

use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use tracing::{debug, info};

/// Fixed-point scale constants for the subsidy coefficient:
/// `k = (M * 10^W) / (M + sum)`.
const SUBSIDY_M: u128 = 50;
const SUBSIDY_W: u32 = 4;

/// Depths of the four trees a poll maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDepths {
    pub int_state_tree_depth: usize,
    pub message_tree_depth: usize,
    pub message_tree_sub_depth: usize,
    pub vote_option_tree_depth: usize,
}

/// Batch sizes of the three state machines. The tally and subsidy batch
/// sizes are derived from the intermediate state tree depth at deploy
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSizes {
    pub message_batch_size: usize,
    pub tally_batch_size: usize,
    pub subsidy_batch_size: usize,
}

/// Caps on the message log and the vote option space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxValues {
    pub max_messages: usize,
    pub max_vote_options: usize,
}

/// Whether vote weights cost their square in voice credits or their face
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VotingMode {
    Quadratic,
    NonQuadratic,
}

/// An accepted vote command, resolved against the current state.
struct AcceptedVote {
    state_index: usize,
    vote_option_index: usize,
    new_state_leaf: StateLeaf,
    new_ballot: Ballot,
}

/// Pre-mutation bookkeeping for one batch slot: the leaf, ballot and vote
/// weight the circuit must see, with their Merkle paths against the trees
/// as they stood before the slot executed.
struct SlotBookkeeping {
    state_leaf: StateLeaf,
    state_path: Vec<Vec<Field>>,
    ballot: Ballot,
    ballot_path: Vec<Vec<Field>>,
    vote_weight: Field,
    vote_weight_path: Vec<Vec<Field>>,
}

/// Circuit inputs shared by every slot of a processing batch, computed
/// against the pre-batch trees.
struct PartialProcessInputs {
    packed_vals: Field,
    msg_root: Field,
    msgs: Vec<Vec<Field>>,
    msg_subroot_path_elements: Vec<Vec<Field>>,
    enc_pub_keys: Vec<[Field; 2]>,
    current_state_root: Field,
    current_ballot_root: Field,
    current_sb_commitment: Field,
    current_sb_salt: Field,
}

pub struct Poll {
    poll_id: usize,
    poll_end_timestamp: u64,
    coordinator_keypair: Keypair,
    tree_depths: TreeDepths,
    batch_sizes: BatchSizes,
    max_values: MaxValues,
    voting_mode: VotingMode,
    state_tree_depth: usize,
    num_sign_ups: usize,

    state_copied: bool,
    state_leaves: Vec<StateLeaf>,
    state_tree: IncrementalQuinTree,
    ballots: Vec<Ballot>,
    ballot_tree: IncrementalQuinTree,

    messages: Vec<Message>,
    enc_public_keys: Vec<PublicKey>,
    commands: Vec<Command>,
    message_tree: IncrementalQuinTree,

    num_batches_processed: usize,
    current_message_batch_index: Option<usize>,
    sb_salts: BTreeMap<usize, Field>,

    results: Vec<u128>,
    per_option_spent: Vec<u128>,
    total_spent: u128,
    num_batches_tallied: usize,
    result_salts: BTreeMap<usize, Field>,
    per_option_spent_salts: BTreeMap<usize, Field>,
    spent_subtotal_salts: BTreeMap<usize, Field>,

    subsidy: Vec<u128>,
    subsidy_salts: BTreeMap<(usize, usize), Field>,
    row_batch_index: usize,
    col_batch_index: usize,
}

fn fresh_salt(previous: Field) -> Field {
    loop {
        let salt = gen_random_salt();
        if salt != previous {
            return salt;
        }
    }
}

fn scalar_as_field(private_key: &PrivateKey) -> Field {
    Field::from_le_bytes_mod_order(&private_key.scalar().into_bigint().to_bytes_le())
}

impl Poll {
    pub fn new(
        poll_id: usize,
        poll_end_timestamp: u64,
        coordinator_keypair: Keypair,
        tree_depths: TreeDepths,
        batch_sizes: BatchSizes,
        max_values: MaxValues,
        voting_mode: VotingMode,
        state_tree_depth: usize,
    ) -> Result<Self, CoreError> {
        if TREE_ARITY.pow(tree_depths.vote_option_tree_depth as u32) < max_values.max_vote_options {
            return Err(CoreError::VoteOptionsExceedCapacity(
                max_values.max_vote_options,
                tree_depths.vote_option_tree_depth,
            ));
        }

        let blank_leaf = StateLeaf::blank();
        let mut state_tree = IncrementalQuinTree::new(state_tree_depth, nothing_up_my_sleeve());
        state_tree.insert(blank_leaf.hash())?;

        let blank_ballot = Ballot::new(max_values.max_vote_options, tree_depths.vote_option_tree_depth);
        let mut ballot_tree = IncrementalQuinTree::new(state_tree_depth, blank_ballot.hash());
        ballot_tree.insert(blank_ballot.hash())?;

        let message_tree =
            IncrementalQuinTree::new(tree_depths.message_tree_depth, nothing_up_my_sleeve());

        Ok(Self {
            poll_id,
            poll_end_timestamp,
            coordinator_keypair,
            tree_depths,
            batch_sizes,
            max_values,
            voting_mode,
            state_tree_depth,
            num_sign_ups: 1,
            state_copied: false,
            state_leaves: vec![blank_leaf],
            state_tree,
            ballots: vec![blank_ballot],
            ballot_tree,
            messages: Vec::new(),
            enc_public_keys: Vec::new(),
            commands: Vec::new(),
            message_tree,
            num_batches_processed: 0,
            current_message_batch_index: None,
            sb_salts: BTreeMap::new(),
            results: vec![0; max_values.max_vote_options],
            per_option_spent: vec![0; max_values.max_vote_options],
            total_spent: 0,
            num_batches_tallied: 0,
            result_salts: BTreeMap::new(),
            per_option_spent_salts: BTreeMap::new(),
            spent_subtotal_salts: BTreeMap::new(),
            subsidy: vec![0; max_values.max_vote_options],
            subsidy_salts: BTreeMap::new(),
            row_batch_index: 0,
            col_batch_index: 0,
        })
    }

    #[inline]
    pub fn poll_id(&self) -> usize {
        self.poll_id
    }

    #[inline]
    pub fn voting_mode(&self) -> VotingMode {
        self.voting_mode
    }

    #[inline]
    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn num_sign_ups(&self) -> usize {
        self.num_sign_ups
    }

    #[inline]
    pub fn state_leaves(&self) -> &[StateLeaf] {
        &self.state_leaves
    }

    #[inline]
    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    pub fn results(&self) -> &[u128] {
        &self.results
    }

    #[inline]
    pub fn per_option_spent_voice_credits(&self) -> &[u128] {
        &self.per_option_spent
    }

    #[inline]
    pub fn total_spent_voice_credits(&self) -> u128 {
        self.total_spent
    }

    #[inline]
    pub fn subsidy(&self) -> &[u128] {
        &self.subsidy
    }

    #[inline]
    pub fn num_batches_processed(&self) -> usize {
        self.num_batches_processed
    }

    #[inline]
    pub fn coordinator_public_key(&self) -> &PublicKey {
        self.coordinator_keypair.public_key()
    }

    /// Re-supplies the coordinator's private key, e.g. after loading a
    /// snapshot (the private half is never serialized).
    pub fn set_coordinator_keypair(&mut self, private_key: PrivateKey) {
        self.coordinator_keypair = Keypair::from_private_key(private_key);
    }

    /// Copies the registry's leaves into the poll, rebuilds the state tree
    /// and grows the parallel ballot set to match. Additive only: calling
    /// with fewer leaves than already copied is a no-op.
    pub(crate) fn update(&mut self, registry_leaves: &[StateLeaf]) -> Result<(), CoreError> {
        if self.state_copied && registry_leaves.len() <= self.state_leaves.len() {
            return Ok(());
        }

        self.state_leaves = registry_leaves.to_vec();
        self.state_tree = IncrementalQuinTree::new(self.state_tree_depth, nothing_up_my_sleeve());
        for leaf in &self.state_leaves {
            self.state_tree.insert(leaf.hash())?;
        }

        let blank_ballot =
            Ballot::new(self.max_values.max_vote_options, self.tree_depths.vote_option_tree_depth);
        while self.ballots.len() < self.state_leaves.len() {
            self.ballots.push(blank_ballot.clone());
        }
        self.ballot_tree = IncrementalQuinTree::new(self.state_tree_depth, blank_ballot.hash());
        for ballot in &self.ballots {
            self.ballot_tree.insert(ballot.hash())?;
        }

        self.num_sign_ups = self.state_leaves.len();
        self.state_copied = true;
        Ok(())
    }

    /// Appends an encrypted vote message and the ephemeral public key its
    /// sender used for the ECDH shared key.
    ///
    /// The message is decrypted eagerly so the command log stays aligned
    /// with the message log; a failed decryption is recorded as a blank
    /// placeholder command, never an error. Validity is enforced at
    /// processing time.
    pub fn publish_message(
        &mut self,
        message: Message,
        enc_public_key: PublicKey,
    ) -> Result<(), CoreError> {
        if message.kind != MessageKind::Vote {
            return Err(CoreError::WrongMessageKind { expected: 1, got: 2 });
        }

        let leaf = message.hash(&enc_public_key);
        self.message_tree.insert(leaf)?;

        let shared_key = Keypair::gen_ecdh_shared_key(
            self.coordinator_keypair.private_key(),
            &enc_public_key,
        );
        let command = match VoteCommand::decrypt(&message, &shared_key) {
            Ok((command, _)) => command,
            Err(_) => {
                let placeholder = Keypair::new();
                VoteCommand::with_salt(0, *placeholder.public_key(), 0, 0, 0, 0, Field::from(0u64))
            }
        };
        self.commands.push(Command::Vote(command));
        self.messages.push(message);
        self.enc_public_keys.push(enc_public_key);
        Ok(())
    }

    /// Appends a plaintext top-up message. The reserved padding key stands
    /// in for the ephemeral key when hashing into the accumulator.
    pub fn topup_message(&mut self, message: Message) -> Result<(), CoreError> {
        if message.kind != MessageKind::Topup {
            return Err(CoreError::WrongMessageKind { expected: 2, got: 1 });
        }
        let state_index = field_to_u64(&message.data[0])
            .ok_or_else(|| CoreError::DataOutOfRange("stateIndex".to_string()))?;
        let amount = field_to_u128(&message.data[1])
            .ok_or_else(|| CoreError::DataOutOfRange("amount".to_string()))?;

        let padding_key = PublicKey::padding_key();
        let leaf = message.hash(&padding_key);
        self.message_tree.insert(leaf)?;

        self.commands.push(Command::Topup(TopupCommand::new(
            state_index,
            amount,
            self.poll_id as u64,
        )));
        self.messages.push(message);
        self.enc_public_keys.push(padding_key);
        Ok(())
    }

    /// True while message batches remain. Zero messages still count as one
    /// (empty) batch.
    pub fn has_unprocessed_messages(&self) -> bool {
        let batch_size = self.batch_sizes.message_batch_size;
        let mut total_batches = if self.messages.len() <= batch_size {
            1
        } else {
            self.messages.len() / batch_size
        };
        if self.messages.len() > batch_size && self.messages.len() % batch_size > 0 {
            total_batches += 1;
        }
        self.num_batches_processed < total_batches
    }

    pub fn has_untallied_ballots(&self) -> bool {
        self.num_batches_tallied * self.batch_sizes.tally_batch_size < self.ballots.len()
    }

    pub fn has_unfinished_subsidy_calculation(&self) -> bool {
        let batch_size = self.batch_sizes.subsidy_batch_size;
        self.row_batch_index * batch_size < self.ballots.len()
            && self.col_batch_index * batch_size < self.ballots.len()
    }

    /// Consumes one message batch, in reverse slot order, and returns the
    /// circuit inputs for it. The registry drives this through its
    /// processing lock; it is not called directly.
    pub(crate) fn process_message_batch(&mut self) -> Result<ProcessMessagesInputs, CoreError> {
        if !self.has_unprocessed_messages() {
            return Err(CoreError::NoMoreMessageBatches);
        }
        if !self.state_copied {
            return Err(CoreError::PollNotUpdated);
        }

        let batch_size = self.batch_sizes.message_batch_size;

        // On the first batch, start at the last (possibly partial) batch:
        // the largest batch-aligned index below the message count.
        if self.num_batches_processed == 0 {
            let remainder = self.messages.len() % batch_size;
            let mut index = if remainder == 0 {
                self.messages.len()
            } else {
                self.messages.len() - remainder
            };
            if remainder == 0 && index > 0 {
                index -= batch_size;
            }
            self.current_message_batch_index = Some(index);
            self.sb_salts.insert(index, Field::from(0u64));
        }

        let batch_index = match self.current_message_batch_index {
            Some(index) => index,
            None => return Err(CoreError::PollNotUpdated),
        };
        debug_assert!(batch_index % batch_size == 0);

        let partial = self.process_inputs_partial(batch_index)?;

        let mut slots: Vec<SlotBookkeeping> = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let index = batch_index + batch_size - 1 - i;
            let kind = self
                .messages
                .get(index)
                .map(|message| message.kind)
                .unwrap_or(MessageKind::Vote);
            let slot = match kind {
                MessageKind::Vote => self.execute_vote_slot(index)?,
                MessageKind::Topup => self.execute_topup_slot(index)?,
            };
            slots.push(slot);
        }
        // Slots were visited in reverse; the bundle lists them in message
        // order.
        slots.reverse();

        self.num_batches_processed += 1;
        let next_index = batch_index.saturating_sub(batch_size);
        self.current_message_batch_index = Some(next_index);

        let new_sb_salt = fresh_salt(partial.current_sb_salt);
        self.sb_salts.insert(next_index, new_sb_salt);

        let new_sb_commitment = hash3(&[
            self.state_tree.root(),
            self.ballot_tree.root(),
            new_sb_salt,
        ]);
        let input_hash = sha256_hash(&[
            partial.packed_vals,
            self.coordinator_keypair.public_key().hash(),
            partial.msg_root,
            partial.current_sb_commitment,
            new_sb_commitment,
            Field::from(self.poll_end_timestamp),
        ]);

        info!(
            poll_id = self.poll_id,
            batch_index,
            batches_processed = self.num_batches_processed,
            "processed message batch"
        );

        Ok(ProcessMessagesInputs {
            poll_end_timestamp: Field::from(self.poll_end_timestamp),
            packed_vals: partial.packed_vals,
            msg_root: partial.msg_root,
            msgs: partial.msgs,
            msg_subroot_path_elements: partial.msg_subroot_path_elements,
            coord_priv_key: scalar_as_field(self.coordinator_keypair.private_key()),
            coord_pub_key: self.coordinator_keypair.public_key().as_array(),
            enc_pub_keys: partial.enc_pub_keys,
            current_state_root: partial.current_state_root,
            current_ballot_root: partial.current_ballot_root,
            current_sb_commitment: partial.current_sb_commitment,
            current_sb_salt: partial.current_sb_salt,
            current_state_leaves: slots.iter().map(|s| s.state_leaf.as_array()).collect(),
            current_state_leaves_path_elements: slots
                .iter()
                .map(|s| s.state_path.clone())
                .collect(),
            current_ballots: slots.iter().map(|s| s.ballot.as_array()).collect(),
            current_ballots_path_elements: slots.iter().map(|s| s.ballot_path.clone()).collect(),
            current_vote_weights: slots.iter().map(|s| s.vote_weight).collect(),
            current_vote_weights_path_elements: slots
                .iter()
                .map(|s| s.vote_weight_path.clone())
                .collect(),
            new_sb_salt,
            new_sb_commitment,
            input_hash,
        })
    }

    fn process_inputs_partial(
        &mut self,
        batch_index: usize,
    ) -> Result<PartialProcessInputs, CoreError> {
        let batch_size = self.batch_sizes.message_batch_size;
        let batch_end_index = (batch_index + batch_size).min(self.messages.len());

        let mut msgs: Vec<Vec<Field>> = self
            .messages
            .iter()
            .map(|message| message.as_array().to_vec())
            .collect();
        while !msgs.is_empty() && msgs.len() % batch_size != 0 {
            let last = msgs[msgs.len() - 1].clone();
            msgs.push(last);
        }
        let msgs = if batch_index < msgs.len() {
            msgs[batch_index..batch_index + batch_size].to_vec()
        } else {
            Vec::new()
        };

        let mut enc_pub_keys: Vec<[Field; 2]> =
            self.enc_public_keys.iter().map(|key| key.as_array()).collect();
        while !enc_pub_keys.is_empty() && enc_pub_keys.len() % batch_size != 0 {
            let last = enc_pub_keys[enc_pub_keys.len() - 1];
            enc_pub_keys.push(last);
        }
        let enc_pub_keys = if batch_index < enc_pub_keys.len() {
            enc_pub_keys[batch_index..batch_index + batch_size].to_vec()
        } else {
            Vec::new()
        };

        // The sub-root proof needs the whole batch range to exist in the
        // accumulator, so pad it with zero leaves.
        while self.message_tree.next_index() < batch_index + batch_size {
            let zero = self.message_tree.zero_value();
            self.message_tree.insert(zero)?;
        }
        let msg_subroot_path_elements = self
            .message_tree
            .gen_subroot_proof(batch_index, batch_index + batch_size)?
            .path_elements;

        let current_sb_salt = self
            .sb_salts
            .get(&batch_index)
            .copied()
            .ok_or(CoreError::MessagesNotProcessed)?;
        let current_state_root = self.state_tree.root();
        let current_ballot_root = self.ballot_tree.root();
        // The very first batch chains from the zero sentinel.
        let current_sb_commitment = if self.num_batches_processed == 0 {
            Field::from(0u64)
        } else {
            hash3(&[current_state_root, current_ballot_root, current_sb_salt])
        };

        Ok(PartialProcessInputs {
            packed_vals: pack_process_message_small_vals(
                self.max_values.max_vote_options,
                self.num_sign_ups,
                batch_index,
                batch_end_index,
            ),
            msg_root: self.message_tree.root(),
            msgs,
            msg_subroot_path_elements,
            enc_pub_keys,
            current_state_root,
            current_ballot_root,
            current_sb_commitment,
            current_sb_salt,
        })
    }

    /// Validates one vote message against the current state without
    /// mutating anything.
    fn try_vote_message(&self, index: usize) -> Result<AcceptedVote, MessageError> {
        if index >= self.messages.len() {
            // Padding slot past the end of the log.
            return Err(MessageError::Decryption);
        }
        let message = &self.messages[index];
        let enc_public_key = &self.enc_public_keys[index];

        let shared_key = Keypair::gen_ecdh_shared_key(
            self.coordinator_keypair.private_key(),
            enc_public_key,
        );
        let (command, signature) =
            VoteCommand::decrypt(message, &shared_key).map_err(|_| MessageError::Decryption)?;

        let state_index = command.state_index as usize;
        if command.state_index < 1 || state_index >= self.ballots.len() {
            return Err(MessageError::InvalidStateIndex(command.state_index));
        }

        let state_leaf = &self.state_leaves[state_index];
        let ballot = &self.ballots[state_index];

        if !command.verify_signature(&signature, &state_leaf.public_key) {
            return Err(MessageError::InvalidSignature);
        }
        if command.nonce != ballot.nonce + 1 {
            return Err(MessageError::InvalidNonce {
                current: ballot.nonce,
                got: command.nonce,
            });
        }

        let vote_option_index = command.vote_option_index as usize;
        if vote_option_index >= self.max_values.max_vote_options {
            return Err(MessageError::InvalidVoteOption(
                command.vote_option_index,
                self.max_values.max_vote_options,
            ));
        }

        let previous_weight = ballot.votes[vote_option_index];
        let credits_left = match self.voting_mode {
            VotingMode::Quadratic => (state_leaf.voice_credit_balance
                + u128::from(previous_weight) * u128::from(previous_weight))
            .checked_sub(u128::from(command.new_vote_weight) * u128::from(command.new_vote_weight)),
            VotingMode::NonQuadratic => (state_leaf.voice_credit_balance
                + u128::from(previous_weight))
            .checked_sub(u128::from(command.new_vote_weight)),
        }
        .ok_or(MessageError::InsufficientVoiceCredits)?;

        let mut new_state_leaf = state_leaf.clone();
        new_state_leaf.voice_credit_balance = credits_left;
        new_state_leaf.public_key = command.new_public_key;

        let mut new_ballot = ballot.clone();
        new_ballot.nonce += 1;
        new_ballot.votes[vote_option_index] = command.new_vote_weight;

        Ok(AcceptedVote {
            state_index,
            vote_option_index,
            new_state_leaf,
            new_ballot,
        })
    }

    /// Records the pre-mutation leaf, ballot and vote weight at `index`
    /// with their Merkle paths.
    fn capture_slot(
        &self,
        index: usize,
        vote_option_index: usize,
    ) -> Result<SlotBookkeeping, CoreError> {
        let state_leaf = self.state_leaves[index].clone();
        let ballot = self.ballots[index].clone();
        let state_path = self.state_tree.gen_proof(index)?.path_elements;
        let ballot_path = self.ballot_tree.gen_proof(index)?.path_elements;

        let mut vote_tree = IncrementalQuinTree::new(
            self.tree_depths.vote_option_tree_depth,
            Field::from(0u64),
        );
        for &vote in &ballot.votes {
            vote_tree.insert(Field::from(vote))?;
        }
        let vote_weight = Field::from(ballot.votes[vote_option_index]);
        let vote_weight_path = vote_tree.gen_proof(vote_option_index)?.path_elements;

        Ok(SlotBookkeeping {
            state_leaf,
            state_path,
            ballot,
            ballot_path,
            vote_weight,
            vote_weight_path,
        })
    }

    fn execute_vote_slot(&mut self, index: usize) -> Result<SlotBookkeeping, CoreError> {
        match self.try_vote_message(index) {
            Ok(accepted) => {
                let slot = self.capture_slot(accepted.state_index, accepted.vote_option_index)?;

                self.state_tree
                    .update(accepted.state_index, accepted.new_state_leaf.hash())?;
                self.state_leaves[accepted.state_index] = accepted.new_state_leaf;
                self.ballot_tree
                    .update(accepted.state_index, accepted.new_ballot.hash())?;
                self.ballots[accepted.state_index] = accepted.new_ballot;

                Ok(slot)
            }
            Err(reason) => {
                debug!(message_index = index, %reason, "message rejected");
                // Rejected slots record the sentinel pre-images.
                self.capture_slot(0, 0)
            }
        }
    }

    fn execute_topup_slot(&mut self, index: usize) -> Result<SlotBookkeeping, CoreError> {
        let message = &self.messages[index];
        let mut state_index = field_to_u64(&message.data[0])
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(usize::MAX);
        let mut amount = field_to_u128(&message.data[1]).unwrap_or(0);
        if state_index >= self.ballots.len() {
            state_index = 0;
            amount = 0;
        }

        let slot = self.capture_slot(state_index, 0)?;

        let mut new_leaf = self.state_leaves[state_index].clone();
        new_leaf.voice_credit_balance = new_leaf.voice_credit_balance.saturating_add(amount);
        self.state_tree.update(state_index, new_leaf.hash())?;
        self.state_leaves[state_index] = new_leaf;

        Ok(slot)
    }

    /// The voice credit cost of a vote weight under the poll's mode.
    #[inline]
    fn vote_cost(&self, weight: u64) -> u128 {
        match self.voting_mode {
            VotingMode::Quadratic => u128::from(weight) * u128::from(weight),
            VotingMode::NonQuadratic => u128::from(weight),
        }
    }

    /// Tallies the next forward batch of ballots into the running totals
    /// and returns the circuit inputs for it.
    pub fn tally_votes(&mut self) -> Result<TallyVotesInputs, CoreError> {
        if !self.has_untallied_ballots() {
            return Err(CoreError::NoMoreTallyBatches);
        }
        let sb_salt = self.final_sb_salt()?;

        let batch_size = self.batch_sizes.tally_batch_size;
        let batch_start = self.num_batches_tallied * batch_size;
        let zero = Field::from(0u64);

        let current_results_root_salt = if batch_start == 0 {
            zero
        } else {
            self.result_salts[&(batch_start - batch_size)]
        };
        let current_per_vo_salt = if batch_start == 0 {
            zero
        } else {
            self.per_option_spent_salts[&(batch_start - batch_size)]
        };
        let current_subtotal_salt = if batch_start == 0 {
            zero
        } else {
            self.spent_subtotal_salts[&(batch_start - batch_size)]
        };

        let current_results_commitment = self.results_commitment(current_results_root_salt)?;
        let current_per_vo_commitment =
            self.per_option_spent_commitment(current_per_vo_salt, batch_start)?;
        let current_subtotal_commitment =
            self.spent_subtotal_commitment(current_subtotal_salt, batch_start);
        // The combined commitment for the very first batch is the zero
        // sentinel.
        let current_tally_commitment = if batch_start == 0 {
            zero
        } else {
            hash3(&[
                current_results_commitment,
                current_subtotal_commitment,
                current_per_vo_commitment,
            ])
        };

        let current_results: Vec<Field> = self.results.iter().map(|&v| Field::from(v)).collect();
        let current_per_vo_spent: Vec<Field> =
            self.per_option_spent.iter().map(|&v| Field::from(v)).collect();
        let current_subtotal = Field::from(self.total_spent);

        let mut batch_ballots: Vec<Ballot> = Vec::with_capacity(batch_size);
        let batch_end = (batch_start + batch_size).min(self.ballots.len());
        for i in batch_start..batch_end {
            batch_ballots.push(self.ballots[i].clone());
            for option in 0..self.max_values.max_vote_options {
                let weight = self.ballots[i].votes[option];
                let cost = self.vote_cost(weight);
                self.results[option] += u128::from(weight);
                self.per_option_spent[option] += cost;
                self.total_spent += cost;
            }
        }
        let blank_ballot =
            Ballot::new(self.max_values.max_vote_options, self.tree_depths.vote_option_tree_depth);
        while batch_ballots.len() < batch_size {
            batch_ballots.push(blank_ballot.clone());
        }

        let new_results_root_salt = fresh_salt(current_results_root_salt);
        let new_per_vo_salt = fresh_salt(current_per_vo_salt);
        let new_subtotal_salt = fresh_salt(current_subtotal_salt);
        self.result_salts.insert(batch_start, new_results_root_salt);
        self.per_option_spent_salts.insert(batch_start, new_per_vo_salt);
        self.spent_subtotal_salts.insert(batch_start, new_subtotal_salt);

        let new_results_commitment = self.results_commitment(new_results_root_salt)?;
        let new_subtotal_commitment =
            self.spent_subtotal_commitment(new_subtotal_salt, batch_start + batch_size);
        let new_per_vo_commitment =
            self.per_option_spent_commitment(new_per_vo_salt, batch_start + batch_size)?;
        let new_tally_commitment = hash3(&[
            new_results_commitment,
            new_subtotal_commitment,
            new_per_vo_commitment,
        ]);

        let state_root = self.state_tree.root();
        let ballot_root = self.ballot_tree.root();
        let sb_commitment = hash3(&[state_root, ballot_root, sb_salt]);
        let packed_vals =
            pack_tally_votes_small_vals(batch_start, batch_size, self.num_sign_ups);
        let input_hash = sha256_hash(&[
            packed_vals,
            sb_commitment,
            current_tally_commitment,
            new_tally_commitment,
        ]);

        let ballot_path_elements = self
            .ballot_tree
            .gen_subroot_proof(batch_start, batch_start + batch_size)?
            .path_elements;
        let votes: Vec<Vec<Field>> = batch_ballots
            .iter()
            .map(|ballot| ballot.votes.iter().map(|&v| Field::from(v)).collect())
            .collect();

        self.num_batches_tallied += 1;
        info!(
            poll_id = self.poll_id,
            batch_start,
            batches_tallied = self.num_batches_tallied,
            "tallied ballot batch"
        );

        Ok(TallyVotesInputs {
            state_root,
            ballot_root,
            sb_salt,
            sb_commitment,
            current_tally_commitment,
            new_tally_commitment,
            packed_vals,
            input_hash,
            ballots: batch_ballots.iter().map(|b| b.as_array()).collect(),
            ballot_path_elements,
            votes,
            current_results,
            current_results_root_salt,
            current_spent_voice_credit_subtotal: current_subtotal,
            current_spent_voice_credit_subtotal_salt: current_subtotal_salt,
            current_per_vo_spent_voice_credits: current_per_vo_spent,
            current_per_vo_spent_voice_credits_root_salt: current_per_vo_salt,
            new_results_root_salt,
            new_per_vo_spent_voice_credits_root_salt: new_per_vo_salt,
            new_spent_voice_credit_subtotal_salt: new_subtotal_salt,
        })
    }

    /// Computes one pairwise subsidy batch over the (row, column) ballot
    /// cursor and advances it in upper-triangular order.
    pub fn subsidy_per_batch(&mut self) -> Result<SubsidyInputs, CoreError> {
        if !self.has_unfinished_subsidy_calculation() {
            return Err(CoreError::NoMoreSubsidyBatches);
        }
        let sb_salt = self.final_sb_salt()?;

        let batch_size = self.batch_sizes.subsidy_batch_size;
        let state_root = self.state_tree.root();
        let ballot_root = self.ballot_tree.root();
        let sb_commitment = hash3(&[state_root, ballot_root, sb_salt]);

        let current_subsidy: Vec<Field> = self.subsidy.iter().map(|&v| Field::from(v)).collect();
        let (current_subsidy_salt, current_subsidy_commitment) =
            if self.row_batch_index == 0 && self.col_batch_index == 0 {
                (Field::from(0u64), Field::from(0u64))
            } else {
                let salt = self.subsidy_salts[&self.previous_subsidy_index()];
                let commitment = gen_tree_commitment(
                    &current_subsidy,
                    salt,
                    self.tree_depths.vote_option_tree_depth,
                )?;
                (salt, commitment)
            };

        let row_start = self.row_batch_index * batch_size;
        let col_start = self.col_batch_index * batch_size;
        let (row_ballots, col_ballots) = self.accumulate_subsidy(row_start, col_start);

        let ballot_path_elements1 = self
            .ballot_tree
            .gen_subroot_proof(row_start, row_start + batch_size)?
            .path_elements;
        let ballot_path_elements2 = self
            .ballot_tree
            .gen_subroot_proof(col_start, col_start + batch_size)?
            .path_elements;

        let new_subsidy_salt = fresh_salt(current_subsidy_salt);
        self.subsidy_salts
            .insert((self.row_batch_index, self.col_batch_index), new_subsidy_salt);
        let new_subsidy: Vec<Field> = self.subsidy.iter().map(|&v| Field::from(v)).collect();
        let new_subsidy_commitment = gen_tree_commitment(
            &new_subsidy,
            new_subsidy_salt,
            self.tree_depths.vote_option_tree_depth,
        )?;

        let packed_vals = pack_subsidy_small_vals(
            self.row_batch_index,
            self.col_batch_index,
            self.num_sign_ups,
        );
        let input_hash = sha256_hash(&[
            packed_vals,
            sb_commitment,
            current_subsidy_commitment,
            new_subsidy_commitment,
        ]);

        info!(
            poll_id = self.poll_id,
            row = self.row_batch_index,
            col = self.col_batch_index,
            "calculated subsidy batch"
        );
        self.increase_subsidy_index();

        Ok(SubsidyInputs {
            state_root,
            ballot_root,
            sb_salt,
            current_subsidy_salt,
            new_subsidy_salt,
            sb_commitment,
            current_subsidy_commitment,
            new_subsidy_commitment,
            current_subsidy,
            packed_vals,
            input_hash,
            ballots1: row_ballots.iter().map(|b| b.as_array()).collect(),
            ballots2: col_ballots.iter().map(|b| b.as_array()).collect(),
            votes1: row_ballots
                .iter()
                .map(|b| b.votes.iter().map(|&v| Field::from(v)).collect())
                .collect(),
            votes2: col_ballots
                .iter()
                .map(|b| b.votes.iter().map(|&v| Field::from(v)).collect())
                .collect(),
            ballot_path_elements1,
            ballot_path_elements2,
        })
    }

    /// The fixed-point pairing coefficient
    /// `k = (M * 10^W) / (M + Σ_p row_p · col_p)`, truncating.
    fn subsidy_coefficient(&self, row_ballot: &Ballot, col_ballot: &Ballot) -> u128 {
        let mut sum: u128 = 0;
        for option in 0..self.max_values.max_vote_options {
            sum += u128::from(row_ballot.votes[option]) * u128::from(col_ballot.votes[option]);
        }
        SUBSIDY_M * 10u128.pow(SUBSIDY_W) / (SUBSIDY_M + sum)
    }

    /// Accumulates the pairwise subsidy terms for one (row, column) batch
    /// pair, skipping diagonal self-pairings so no pair is counted twice.
    fn accumulate_subsidy(
        &mut self,
        row_start: usize,
        col_start: usize,
    ) -> (Vec<Ballot>, Vec<Ballot>) {
        let batch_size = self.batch_sizes.subsidy_batch_size;
        let blank_ballot =
            Ballot::new(self.max_values.max_vote_options, self.tree_depths.vote_option_tree_depth);

        let ballot_at = |ballots: &[Ballot], index: usize| -> Ballot {
            ballots.get(index).cloned().unwrap_or_else(|| blank_ballot.clone())
        };

        let row_ballots: Vec<Ballot> = (0..batch_size)
            .map(|i| ballot_at(&self.ballots, row_start + i))
            .collect();
        let col_ballots: Vec<Ballot> = (0..batch_size)
            .map(|i| ballot_at(&self.ballots, col_start + i))
            .collect();

        for (i, row_ballot) in row_ballots.iter().enumerate() {
            for (j, col_ballot) in col_ballots.iter().enumerate() {
                if row_start == col_start && i >= j {
                    continue;
                }
                let k = self.subsidy_coefficient(row_ballot, col_ballot);
                for option in 0..self.max_values.max_vote_options {
                    let vip = u128::from(row_ballot.votes[option]);
                    let vjp = u128::from(col_ballot.votes[option]);
                    self.subsidy[option] += 2 * k * vip * vjp;
                }
            }
        }

        (row_ballots, col_ballots)
    }

    fn increase_subsidy_index(&mut self) {
        let batch_size = self.batch_sizes.subsidy_batch_size;
        if self.col_batch_index * batch_size + batch_size < self.ballots.len() {
            self.col_batch_index += 1;
        } else {
            self.row_batch_index += 1;
            self.col_batch_index = self.row_batch_index;
        }
    }

    /// The cursor position whose salt the current subsidy batch chains
    /// from.
    fn previous_subsidy_index(&self) -> (usize, usize) {
        let batch_size = self.batch_sizes.subsidy_batch_size;
        let num_batches = (self.ballots.len() + batch_size - 1) / batch_size;
        if self.col_batch_index > self.row_batch_index {
            (self.row_batch_index, self.col_batch_index - 1)
        } else {
            (self.row_batch_index - 1, num_batches - 1)
        }
    }

    /// The state-ballot salt established by message processing; tallying
    /// and subsidy both chain from it.
    fn final_sb_salt(&self) -> Result<Field, CoreError> {
        let index = self
            .current_message_batch_index
            .ok_or(CoreError::MessagesNotProcessed)?;
        self.sb_salts
            .get(&index)
            .copied()
            .ok_or(CoreError::MessagesNotProcessed)
    }

    fn results_commitment(&self, salt: Field) -> Result<Field, CoreError> {
        let leaves: Vec<Field> = self.results.iter().map(|&v| Field::from(v)).collect();
        Ok(gen_tree_commitment(
            &leaves,
            salt,
            self.tree_depths.vote_option_tree_depth,
        )?)
    }

    /// Commitment to the total credits spent by the first
    /// `num_ballots_to_count` ballots, recomputed from the ballots rather
    /// than the running total.
    fn spent_subtotal_commitment(&self, salt: Field, num_ballots_to_count: usize) -> Field {
        let mut subtotal: u128 = 0;
        for ballot in self.ballots.iter().take(num_ballots_to_count) {
            for option in 0..self.max_values.max_vote_options {
                subtotal += self.vote_cost(ballot.votes[option]);
            }
        }
        hash_left_right(Field::from(subtotal), salt)
    }

    fn per_option_spent_commitment(
        &self,
        salt: Field,
        num_ballots_to_count: usize,
    ) -> Result<Field, CoreError> {
        let mut leaves: Vec<u128> = vec![0; self.max_values.max_vote_options];
        for ballot in self.ballots.iter().take(num_ballots_to_count) {
            for option in 0..self.max_values.max_vote_options {
                leaves[option] += self.vote_cost(ballot.votes[option]);
            }
        }
        let leaves: Vec<Field> = leaves.into_iter().map(Field::from).collect();
        Ok(gen_tree_commitment(
            &leaves,
            salt,
            self.tree_depths.vote_option_tree_depth,
        )?)
    }

    /// Builds the serializable snapshot of this poll. Trees and the
    /// coordinator's private key are not persisted; trees are rebuilt on
    /// load, the key is re-supplied.
    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            poll_id: self.poll_id,
            poll_end_timestamp: self.poll_end_timestamp,
            coordinator_public_key: *self.coordinator_keypair.public_key(),
            tree_depths: self.tree_depths,
            batch_sizes: self.batch_sizes,
            max_values: self.max_values,
            voting_mode: self.voting_mode,
            state_tree_depth: self.state_tree_depth,
            num_sign_ups: self.num_sign_ups,
            state_copied: self.state_copied,
            state_leaves: self.state_leaves.clone(),
            ballots: self.ballots.clone(),
            messages: self.messages.clone(),
            enc_public_keys: self.enc_public_keys.clone(),
            commands: self.commands.clone(),
            num_batches_processed: self.num_batches_processed,
            current_message_batch_index: self.current_message_batch_index,
            sb_salts: self.sb_salts.clone(),
            results: self.results.iter().map(|v| v.to_string()).collect(),
            per_option_spent: self.per_option_spent.iter().map(|v| v.to_string()).collect(),
            total_spent: self.total_spent.to_string(),
            num_batches_tallied: self.num_batches_tallied,
            result_salts: self.result_salts.clone(),
            per_option_spent_salts: self.per_option_spent_salts.clone(),
            spent_subtotal_salts: self.spent_subtotal_salts.clone(),
            subsidy: self.subsidy.iter().map(|v| v.to_string()).collect(),
            subsidy_salts: self
                .subsidy_salts
                .iter()
                .map(|((row, col), salt)| (format!("{}-{}", row, col), *salt))
                .collect(),
            row_batch_index: self.row_batch_index,
            col_batch_index: self.col_batch_index,
        }
    }

    /// Restores a poll from its snapshot, rebuilding all trees. The
    /// coordinator keypair starts out random; callers re-supply the real
    /// private key with [`Poll::set_coordinator_keypair`].
    pub fn from_snapshot(snapshot: PollSnapshot) -> Result<Self, CoreError> {
        let mut poll = Poll::new(
            snapshot.poll_id,
            snapshot.poll_end_timestamp,
            Keypair::new(),
            snapshot.tree_depths,
            snapshot.batch_sizes,
            snapshot.max_values,
            snapshot.voting_mode,
            snapshot.state_tree_depth,
        )?;

        poll.num_sign_ups = snapshot.num_sign_ups;
        poll.state_copied = snapshot.state_copied;
        poll.num_batches_processed = snapshot.num_batches_processed;
        poll.current_message_batch_index = snapshot.current_message_batch_index;
        poll.sb_salts = snapshot.sb_salts;
        poll.num_batches_tallied = snapshot.num_batches_tallied;
        poll.result_salts = snapshot.result_salts;
        poll.per_option_spent_salts = snapshot.per_option_spent_salts;
        poll.spent_subtotal_salts = snapshot.spent_subtotal_salts;
        poll.row_batch_index = snapshot.row_batch_index;
        poll.col_batch_index = snapshot.col_batch_index;
        poll.commands = snapshot.commands;

        let parse_u128 = |s: &String| -> Result<u128, CoreError> {
            s.parse().map_err(|_| CoreError::DataOutOfRange(s.clone()))
        };
        poll.results = snapshot.results.iter().map(parse_u128).collect::<Result<_, _>>()?;
        poll.per_option_spent = snapshot
            .per_option_spent
            .iter()
            .map(parse_u128)
            .collect::<Result<_, _>>()?;
        poll.total_spent = parse_u128(&snapshot.total_spent)?;
        poll.subsidy = snapshot.subsidy.iter().map(parse_u128).collect::<Result<_, _>>()?;

        poll.subsidy_salts = snapshot
            .subsidy_salts
            .into_iter()
            .map(|(key, salt)| {
                let mut parts = key.splitn(2, '-');
                let row = parts
                    .next()
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(|| CoreError::DataOutOfRange(key.clone()))?;
                let col = parts
                    .next()
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(|| CoreError::DataOutOfRange(key.clone()))?;
                Ok(((row, col), salt))
            })
            .collect::<Result<_, CoreError>>()?;

        // Rebuild the message accumulator in publish order.
        poll.message_tree =
            IncrementalQuinTree::new(snapshot.tree_depths.message_tree_depth, nothing_up_my_sleeve());
        for (message, enc_public_key) in
            snapshot.messages.iter().zip(&snapshot.enc_public_keys)
        {
            poll.message_tree.insert(message.hash(enc_public_key))?;
        }
        poll.messages = snapshot.messages;
        poll.enc_public_keys = snapshot.enc_public_keys;

        // Rebuild the state and ballot trees from the persisted leaves.
        poll.state_tree =
            IncrementalQuinTree::new(snapshot.state_tree_depth, nothing_up_my_sleeve());
        for leaf in &snapshot.state_leaves {
            poll.state_tree.insert(leaf.hash())?;
        }
        poll.state_leaves = snapshot.state_leaves;

        let blank_ballot = Ballot::new(
            snapshot.max_values.max_vote_options,
            snapshot.tree_depths.vote_option_tree_depth,
        );
        poll.ballot_tree =
            IncrementalQuinTree::new(snapshot.state_tree_depth, blank_ballot.hash());
        for ballot in &snapshot.ballots {
            poll.ballot_tree.insert(ballot.hash())?;
        }
        poll.ballots = snapshot.ballots;

        Ok(poll)
    }
}

// Tree node maps are not compared directly: processing pads the message
// accumulator with zero leaves, which changes the stored node set but not
// the root.
impl PartialEq for Poll {
    fn eq(&self, other: &Self) -> bool {
        self.poll_id == other.poll_id
            && self.poll_end_timestamp == other.poll_end_timestamp
            && self.coordinator_keypair == other.coordinator_keypair
            && self.tree_depths == other.tree_depths
            && self.batch_sizes == other.batch_sizes
            && self.max_values == other.max_values
            && self.voting_mode == other.voting_mode
            && self.state_tree_depth == other.state_tree_depth
            && self.num_sign_ups == other.num_sign_ups
            && self.state_copied == other.state_copied
            && self.state_leaves == other.state_leaves
            && self.ballots == other.ballots
            && self.messages == other.messages
            && self.enc_public_keys == other.enc_public_keys
            && self.commands == other.commands
            && self.state_tree.root() == other.state_tree.root()
            && self.ballot_tree.root() == other.ballot_tree.root()
            && self.message_tree.root() == other.message_tree.root()
            && self.num_batches_processed == other.num_batches_processed
            && self.current_message_batch_index == other.current_message_batch_index
            && self.sb_salts == other.sb_salts
            && self.results == other.results
            && self.per_option_spent == other.per_option_spent
            && self.total_spent == other.total_spent
            && self.num_batches_tallied == other.num_batches_tallied
            && self.result_salts == other.result_salts
            && self.per_option_spent_salts == other.per_option_spent_salts
            && self.spent_subtotal_salts == other.spent_subtotal_salts
            && self.subsidy == other.subsidy
            && self.subsidy_salts == other.subsidy_salts
            && self.row_batch_index == other.row_batch_index
            && self.col_batch_index == other.col_batch_index
    }
}

impl Clone for Poll {
    fn clone(&self) -> Self {
        Self {
            poll_id: self.poll_id,
            poll_end_timestamp: self.poll_end_timestamp,
            coordinator_keypair: self.coordinator_keypair.clone(),
            tree_depths: self.tree_depths,
            batch_sizes: self.batch_sizes,
            max_values: self.max_values,
            voting_mode: self.voting_mode,
            state_tree_depth: self.state_tree_depth,
            num_sign_ups: self.num_sign_ups,
            state_copied: self.state_copied,
            state_leaves: self.state_leaves.clone(),
            state_tree: self.state_tree.clone(),
            ballots: self.ballots.clone(),
            ballot_tree: self.ballot_tree.clone(),
            messages: self.messages.clone(),
            enc_public_keys: self.enc_public_keys.clone(),
            commands: self.commands.clone(),
            message_tree: self.message_tree.clone(),
            num_batches_processed: self.num_batches_processed,
            current_message_batch_index: self.current_message_batch_index,
            sb_salts: self.sb_salts.clone(),
            results: self.results.clone(),
            per_option_spent: self.per_option_spent.clone(),
            total_spent: self.total_spent,
            num_batches_tallied: self.num_batches_tallied,
            result_salts: self.result_salts.clone(),
            per_option_spent_salts: self.per_option_spent_salts.clone(),
            spent_subtotal_salts: self.spent_subtotal_salts.clone(),
            subsidy: self.subsidy.clone(),
            subsidy_salts: self.subsidy_salts.clone(),
            row_batch_index: self.row_batch_index,
            col_batch_index: self.col_batch_index,
        }
    }
}

impl std::fmt::Debug for Poll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poll")
            .field("poll_id", &self.poll_id)
            .field("num_sign_ups", &self.num_sign_ups)
            .field("num_messages", &self.messages.len())
            .field("num_batches_processed", &self.num_batches_processed)
            .field("num_batches_tallied", &self.num_batches_tallied)
            .finish()
    }
}

/// The tree-free serialized form of a [`Poll`].
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
    pub poll_id: usize,
    pub poll_end_timestamp: u64,
    pub coordinator_public_key: PublicKey,
    pub tree_depths: TreeDepths,
    pub batch_sizes: BatchSizes,
    pub max_values: MaxValues,
    pub voting_mode: VotingMode,
    pub state_tree_depth: usize,
    pub num_sign_ups: usize,
    pub state_copied: bool,
    pub state_leaves: Vec<StateLeaf>,
    pub ballots: Vec<Ballot>,
    pub messages: Vec<Message>,
    pub enc_public_keys: Vec<PublicKey>,
    pub commands: Vec<Command>,
    pub num_batches_processed: usize,
    pub current_message_batch_index: Option<usize>,
    #[serde_as(as = "BTreeMap<DisplayFromStr, FieldStr>")]
    pub sb_salts: BTreeMap<usize, Field>,
    pub results: Vec<String>,
    pub per_option_spent: Vec<String>,
    pub total_spent: String,
    pub num_batches_tallied: usize,
    #[serde_as(as = "BTreeMap<DisplayFromStr, FieldStr>")]
    pub result_salts: BTreeMap<usize, Field>,
    #[serde_as(as = "BTreeMap<DisplayFromStr, FieldStr>")]
    pub per_option_spent_salts: BTreeMap<usize, Field>,
    #[serde_as(as = "BTreeMap<DisplayFromStr, FieldStr>")]
    pub spent_subtotal_salts: BTreeMap<usize, Field>,
    pub subsidy: Vec<String>,
    #[serde_as(as = "BTreeMap<_, FieldStr>")]
    pub subsidy_salts: BTreeMap<String, Field>,
    pub row_batch_index: usize,
    pub col_batch_index: usize,
}
