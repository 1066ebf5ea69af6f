//! Off-chain replica of the MACI on-chain contracts.
//!
//! The [`MaciState`] registry mirrors signups and poll deployments; each
//! [`Poll`] replays published messages, tallies ballots and (optionally)
//! computes pairwise subsidies, batch by batch, emitting the circuit-input
//! bundle each proof consumes. All state transitions are deterministic so
//! a replica can be rebuilt from the on-chain log alone.

pub mod circuit_inputs;
pub mod errors;
pub mod maci_state;
pub mod poll;
pub mod utils;

pub use circuit_inputs::{ProcessMessagesInputs, SubsidyInputs, TallyVotesInputs};
pub use errors::{CoreError, MessageError};
pub use maci_state::{MaciState, ProcessingStatus, STATE_TREE_DEPTH};
pub use poll::{BatchSizes, MaxValues, Poll, TreeDepths, VotingMode};
