//! The global state registry: signups, poll deployment, and the lock that
//! serializes message processing across polls.

use crate::errors::CoreError;
use crate::poll::{BatchSizes, MaxValues, Poll, PollSnapshot, TreeDepths, VotingMode};
use crate::ProcessMessagesInputs;

use maci_crypto::quintree::TREE_ARITY;
use maci_crypto::{nothing_up_my_sleeve, Field, IncrementalQuinTree};
use maci_domainobjs::{Ballot, Keypair, PublicKey, StateLeaf};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Depth of the global signup tree.
pub const STATE_TREE_DEPTH: usize = 10;

/// Whether some poll currently holds the message-processing lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Idle,
    Processing(usize),
}

/// The signup registry and the polls deployed against it.
///
/// Index 0 of the leaf set is the blank sentinel; real signups start at
/// index 1. Rejected messages resolve to the sentinel during processing,
/// which is why it can never belong to a voter.
#[derive(Debug, Clone)]
pub struct MaciState {
    state_tree_depth: usize,
    state_leaves: Vec<StateLeaf>,
    state_tree: IncrementalQuinTree,
    polls: Vec<Poll>,
    processing_status: ProcessingStatus,
}

impl MaciState {
    pub fn new() -> Result<Self, CoreError> {
        Self::with_depth(STATE_TREE_DEPTH)
    }

    pub fn with_depth(state_tree_depth: usize) -> Result<Self, CoreError> {
        let blank = StateLeaf::blank();
        let mut state_tree = IncrementalQuinTree::new(state_tree_depth, nothing_up_my_sleeve());
        state_tree.insert(blank.hash())?;

        Ok(Self {
            state_tree_depth,
            state_leaves: vec![blank],
            state_tree,
            polls: Vec::new(),
            processing_status: ProcessingStatus::Idle,
        })
    }

    /// Leaf count including the sentinel at index 0.
    #[inline]
    pub fn num_sign_ups(&self) -> usize {
        self.state_leaves.len()
    }

    #[inline]
    pub fn state_leaves(&self) -> &[StateLeaf] {
        &self.state_leaves
    }

    #[inline]
    pub fn state_root(&self) -> Field {
        self.state_tree.root()
    }

    #[inline]
    pub fn num_polls(&self) -> usize {
        self.polls.len()
    }

    #[inline]
    pub fn processing_status(&self) -> ProcessingStatus {
        self.processing_status
    }

    pub fn poll(&self, poll_id: usize) -> Result<&Poll, CoreError> {
        self.polls
            .get(poll_id)
            .ok_or(CoreError::PollDoesNotExist(poll_id))
    }

    pub fn poll_mut(&mut self, poll_id: usize) -> Result<&mut Poll, CoreError> {
        self.polls
            .get_mut(poll_id)
            .ok_or(CoreError::PollDoesNotExist(poll_id))
    }

    /// Registers a voter and returns their state index.
    pub fn sign_up(
        &mut self,
        public_key: PublicKey,
        voice_credit_balance: u128,
        timestamp: u64,
    ) -> Result<usize, CoreError> {
        let leaf = StateLeaf::new(public_key, voice_credit_balance, timestamp);
        self.state_tree.insert(leaf.hash())?;
        self.state_leaves.push(leaf);
        let state_index = self.state_leaves.len() - 1;
        info!(state_index, "signup");
        Ok(state_index)
    }

    /// Deploys a poll and returns its id. The tally and subsidy batch
    /// sizes are one full intermediate state subtree.
    pub fn deploy_poll(
        &mut self,
        poll_end_timestamp: u64,
        max_values: MaxValues,
        tree_depths: TreeDepths,
        message_batch_size: usize,
        coordinator_keypair: Keypair,
        voting_mode: VotingMode,
    ) -> Result<usize, CoreError> {
        let poll_id = self.polls.len();
        let batch_size = TREE_ARITY.pow(tree_depths.int_state_tree_depth as u32);
        let poll = Poll::new(
            poll_id,
            poll_end_timestamp,
            coordinator_keypair,
            tree_depths,
            BatchSizes {
                message_batch_size,
                tally_batch_size: batch_size,
                subsidy_batch_size: batch_size,
            },
            max_values,
            voting_mode,
            self.state_tree_depth,
        )?;
        self.polls.push(poll);
        info!(poll_id, "deployed poll");
        Ok(poll_id)
    }

    /// Copies the first `num_sign_ups` registry leaves into the poll,
    /// freezing the electorate it will process. The count is clamped to
    /// the registry size and always includes the sentinel.
    pub fn update_poll(&mut self, poll_id: usize, num_sign_ups: usize) -> Result<(), CoreError> {
        let count = num_sign_ups.max(1).min(self.state_leaves.len());
        let leaves = self.state_leaves[..count].to_vec();
        self.poll_mut(poll_id)?.update(&leaves)
    }

    /// Processes the next message batch of `poll_id`, holding the global
    /// lock for the duration of that poll's processing phase. The lock is
    /// taken on the first batch and released after the last one.
    pub fn process_messages(
        &mut self,
        poll_id: usize,
    ) -> Result<ProcessMessagesInputs, CoreError> {
        match self.processing_status {
            ProcessingStatus::Idle => {}
            ProcessingStatus::Processing(current) if current == poll_id => {}
            ProcessingStatus::Processing(current) => {
                return Err(CoreError::PollAlreadyBeingProcessed {
                    current,
                    requested: poll_id,
                });
            }
        }

        let poll = self
            .polls
            .get_mut(poll_id)
            .ok_or(CoreError::PollDoesNotExist(poll_id))?;
        let inputs = poll.process_message_batch()?;

        self.processing_status = if poll.has_unprocessed_messages() {
            ProcessingStatus::Processing(poll_id)
        } else {
            ProcessingStatus::Idle
        };
        Ok(inputs)
    }

    /// Drives the poll through every remaining message batch and returns
    /// the resulting leaves and ballots.
    pub fn process_all_messages(
        &mut self,
        poll_id: usize,
    ) -> Result<(Vec<StateLeaf>, Vec<Ballot>), CoreError> {
        while self.poll(poll_id)?.has_unprocessed_messages() {
            self.process_messages(poll_id)?;
        }
        let poll = self.poll(poll_id)?;
        Ok((poll.state_leaves().to_vec(), poll.ballots().to_vec()))
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        let snapshot = MaciStateSnapshot {
            state_tree_depth: self.state_tree_depth,
            state_leaves: self.state_leaves.clone(),
            polls: self.polls.iter().map(Poll::snapshot).collect(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Restores a registry from JSON. Coordinator private keys are not
    /// part of the snapshot; re-supply them per poll with
    /// [`Poll::set_coordinator_keypair`].
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let snapshot: MaciStateSnapshot = serde_json::from_str(json)?;

        let mut state = Self::with_depth(snapshot.state_tree_depth)?;
        for leaf in snapshot.state_leaves.iter().skip(1) {
            state.state_tree.insert(leaf.hash())?;
        }
        state.state_leaves = snapshot.state_leaves;
        state.polls = snapshot
            .polls
            .into_iter()
            .map(Poll::from_snapshot)
            .collect::<Result<_, _>>()?;
        Ok(state)
    }
}

// The processing lock is transient bookkeeping, not state.
impl PartialEq for MaciState {
    fn eq(&self, other: &Self) -> bool {
        self.state_tree_depth == other.state_tree_depth
            && self.state_leaves == other.state_leaves
            && self.polls == other.polls
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaciStateSnapshot {
    state_tree_depth: usize,
    state_leaves: Vec<StateLeaf>,
    polls: Vec<PollSnapshot>,
}
