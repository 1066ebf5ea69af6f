//! Shared fixtures for the engine tests: a registry with signed-up voters
//! and one deployed poll, plus helpers to publish signed vote messages.
#![allow(dead_code)]

use maci_core::{MaciState, MaxValues, TreeDepths, VotingMode};
use maci_domainobjs::{Keypair, PublicKey, VoteCommand};

pub const MESSAGE_BATCH_SIZE: usize = 5;
pub const VOICE_CREDITS: u128 = 100;
pub const SIGNUP_TIMESTAMP: u64 = 1_650_000_000;
pub const POLL_END_TIMESTAMP: u64 = 1_660_000_000;

pub fn tree_depths() -> TreeDepths {
    TreeDepths {
        int_state_tree_depth: 1,
        message_tree_depth: 2,
        message_tree_sub_depth: 1,
        vote_option_tree_depth: 2,
    }
}

pub fn max_values() -> MaxValues {
    MaxValues {
        max_messages: 25,
        max_vote_options: 25,
    }
}

pub struct Fixture {
    pub state: MaciState,
    pub coordinator: Keypair,
    pub poll_id: usize,
    pub voters: Vec<Keypair>,
}

/// Hooks engine logs into the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A registry with `num_voters` signups and one deployed poll, already
/// updated to cover the whole electorate. Voter `i` sits at state index
/// `i + 1`.
pub fn fixture(num_voters: usize, mode: VotingMode) -> Fixture {
    init_logging();
    let mut state = MaciState::new().unwrap();
    let coordinator = Keypair::new();

    let voters: Vec<Keypair> = (0..num_voters).map(|_| Keypair::new()).collect();
    for voter in &voters {
        state
            .sign_up(*voter.public_key(), VOICE_CREDITS, SIGNUP_TIMESTAMP)
            .unwrap();
    }

    let poll_id = state
        .deploy_poll(
            POLL_END_TIMESTAMP,
            max_values(),
            tree_depths(),
            MESSAGE_BATCH_SIZE,
            coordinator.clone(),
            mode,
        )
        .unwrap();
    let num_sign_ups = state.num_sign_ups();
    state.update_poll(poll_id, num_sign_ups).unwrap();

    Fixture {
        state,
        coordinator,
        poll_id,
        voters,
    }
}

/// Signs a vote command with `signing_key`, encrypts it under a fresh
/// ephemeral key and publishes it.
#[allow(clippy::too_many_arguments)]
pub fn publish_vote(
    fixture: &mut Fixture,
    signing_key: &Keypair,
    new_public_key: PublicKey,
    state_index: u64,
    vote_option_index: u64,
    weight: u64,
    nonce: u64,
) {
    let command = VoteCommand::new(
        state_index,
        new_public_key,
        vote_option_index,
        weight,
        nonce,
        fixture.poll_id as u64,
    );
    let signature = command.sign(signing_key.private_key());

    let ephemeral = Keypair::new();
    let shared =
        Keypair::gen_ecdh_shared_key(ephemeral.private_key(), fixture.coordinator.public_key());
    let message = command.encrypt(&signature, &shared);

    let poll_id = fixture.poll_id;
    fixture
        .state
        .poll_mut(poll_id)
        .unwrap()
        .publish_message(message, *ephemeral.public_key())
        .unwrap();
}

/// Publishes a vote for voter `i` (state index `i + 1`) that keeps their
/// key unchanged.
pub fn publish_simple_vote(
    fixture: &mut Fixture,
    voter: usize,
    vote_option_index: u64,
    weight: u64,
    nonce: u64,
) {
    let signing_key = fixture.voters[voter].clone();
    let new_public_key = *signing_key.public_key();
    publish_vote(
        fixture,
        &signing_key,
        new_public_key,
        voter as u64 + 1,
        vote_option_index,
        weight,
        nonce,
    );
}
