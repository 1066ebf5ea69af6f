//! Message processing: acceptance, rejection, reverse batch order and the
//! cross-poll processing lock.

mod common;

use common::*;
use maci_core::utils::unpack_process_message_small_vals;
use maci_core::{CoreError, MaciState, ProcessingStatus, VotingMode};
use maci_crypto::Field;
use maci_domainobjs::{Keypair, MessageKind, StateLeaf, TopupCommand, VoteCommand};

#[test]
fn accepted_vote_updates_leaf_and_ballot() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    publish_simple_vote(&mut fx, 0, 0, 9, 1);

    let poll_id = fx.poll_id;
    let (leaves, ballots) = fx.state.process_all_messages(poll_id).unwrap();

    assert_eq!(leaves[1].voice_credit_balance, VOICE_CREDITS - 81);
    assert_eq!(ballots[1].nonce, 1);
    assert_eq!(ballots[1].votes[0], 9);
}

#[test]
fn non_quadratic_mode_charges_face_value() {
    let mut fx = fixture(1, VotingMode::NonQuadratic);
    publish_simple_vote(&mut fx, 0, 0, 9, 1);

    let poll_id = fx.poll_id;
    let (leaves, ballots) = fx.state.process_all_messages(poll_id).unwrap();
    assert_eq!(leaves[1].voice_credit_balance, VOICE_CREDITS - 9);
    assert_eq!(ballots[1].votes[0], 9);
}

#[test]
fn overweight_vote_is_rejected() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    // cost 121 > 100 credits
    publish_simple_vote(&mut fx, 0, 0, 11, 1);

    let poll_id = fx.poll_id;
    let (leaves, ballots) = fx.state.process_all_messages(poll_id).unwrap();

    assert_eq!(leaves[1].voice_credit_balance, VOICE_CREDITS);
    assert_eq!(ballots[1].nonce, 0);
    assert!(ballots[1].votes.iter().all(|&v| v == 0));
}

#[test]
fn wrong_nonce_is_rejected() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    publish_simple_vote(&mut fx, 0, 0, 5, 2);

    let poll_id = fx.poll_id;
    let (_, ballots) = fx.state.process_all_messages(poll_id).unwrap();
    assert_eq!(ballots[1].nonce, 0);
    assert_eq!(ballots[1].votes[0], 0);
}

#[test]
fn bad_signature_is_rejected() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    let imposter = Keypair::new();
    let target_key = *fx.voters[0].public_key();
    publish_vote(&mut fx, &imposter, target_key, 1, 0, 5, 1);

    let poll_id = fx.poll_id;
    let (_, ballots) = fx.state.process_all_messages(poll_id).unwrap();
    assert_eq!(ballots[1].votes[0], 0);
}

#[test]
fn sentinel_leaf_survives_rejections() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    // State index 0 is never a valid target.
    let signer = fx.voters[0].clone();
    let key = *signer.public_key();
    publish_vote(&mut fx, &signer, key, 0, 0, 1, 1);
    publish_simple_vote(&mut fx, 0, 0, 11, 1);

    let poll_id = fx.poll_id;
    let (leaves, ballots) = fx.state.process_all_messages(poll_id).unwrap();

    assert_eq!(leaves[0], StateLeaf::blank());
    assert_eq!(ballots[0].nonce, 0);
    assert!(ballots[0].votes.iter().all(|&v| v == 0));
}

#[test]
fn rejected_messages_leave_state_untouched() {
    let mut fx = fixture(2, VotingMode::Quadratic);
    let leaves_before = fx.state.poll(fx.poll_id).unwrap().state_leaves().to_vec();

    publish_simple_vote(&mut fx, 0, 0, 11, 1);
    publish_simple_vote(&mut fx, 1, 0, 3, 7);

    let poll_id = fx.poll_id;
    let (leaves, ballots) = fx.state.process_all_messages(poll_id).unwrap();
    assert_eq!(leaves, leaves_before);
    assert!(ballots.iter().all(|b| b.nonce == 0));
}

#[test]
fn identical_invalid_message_rejects_twice_without_effect() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    let leaves_before = fx.state.poll(fx.poll_id).unwrap().state_leaves().to_vec();

    // One overweight command, encrypted once, published twice verbatim.
    let voter = fx.voters[0].clone();
    let command = VoteCommand::new(1, *voter.public_key(), 0, 11, 1, fx.poll_id as u64);
    let signature = command.sign(voter.private_key());
    let ephemeral = Keypair::new();
    let shared =
        Keypair::gen_ecdh_shared_key(ephemeral.private_key(), fx.coordinator.public_key());
    let message = command.encrypt(&signature, &shared);

    let poll_id = fx.poll_id;
    let poll = fx.state.poll_mut(poll_id).unwrap();
    poll.publish_message(message.clone(), *ephemeral.public_key()).unwrap();
    poll.publish_message(message, *ephemeral.public_key()).unwrap();

    let (leaves, ballots) = fx.state.process_all_messages(poll_id).unwrap();
    assert_eq!(leaves, leaves_before);
    assert_eq!(ballots[1].nonce, 0);
    assert!(ballots[1].votes.iter().all(|&v| v == 0));
}

#[test]
fn key_change_invalidates_earlier_messages() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    let old_key = fx.voters[0].clone();
    let new_key = Keypair::new();

    // Published first, processed last: a vote signed with the old key.
    publish_vote(&mut fx, &old_key, *old_key.public_key(), 1, 0, 9, 2);
    // Published second, processed first: vote + key change to the new key.
    publish_vote(&mut fx, &old_key, *new_key.public_key(), 1, 0, 3, 1);

    let poll_id = fx.poll_id;
    let (leaves, ballots) = fx.state.process_all_messages(poll_id).unwrap();

    // The key change applied; the earlier vote no longer verifies.
    assert_eq!(leaves[1].public_key, *new_key.public_key());
    assert_eq!(ballots[1].votes[0], 3);
    assert_eq!(ballots[1].nonce, 1);
}

#[test]
fn last_batch_is_processed_first() {
    let mut fx = fixture(7, VotingMode::Quadratic);
    for voter in 0..7 {
        publish_simple_vote(&mut fx, voter, voter as u64, 1, 1);
    }

    let poll_id = fx.poll_id;
    let first = fx.state.process_messages(poll_id).unwrap();
    let (_, _, batch_start, batch_end) = unpack_process_message_small_vals(first.packed_vals);
    assert_eq!((batch_start, batch_end), (5, 7));

    let second = fx.state.process_messages(poll_id).unwrap();
    let (_, _, batch_start, batch_end) = unpack_process_message_small_vals(second.packed_vals);
    assert_eq!((batch_start, batch_end), (0, 5));

    assert!(!fx.state.poll(poll_id).unwrap().has_unprocessed_messages());
}

#[test]
fn commitments_chain_across_batches() {
    let mut fx = fixture(7, VotingMode::Quadratic);
    for voter in 0..7 {
        publish_simple_vote(&mut fx, voter, 0, 1, 1);
    }

    let poll_id = fx.poll_id;
    let first = fx.state.process_messages(poll_id).unwrap();
    assert_eq!(first.current_sb_commitment, Field::from(0u64));
    assert_ne!(first.new_sb_commitment, Field::from(0u64));

    let second = fx.state.process_messages(poll_id).unwrap();
    assert_eq!(second.current_sb_commitment, first.new_sb_commitment);
    assert_ne!(second.new_sb_salt, first.new_sb_salt);
}

#[test]
fn empty_poll_still_produces_one_batch() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    let poll_id = fx.poll_id;

    let inputs = fx.state.process_messages(poll_id).unwrap();
    assert_eq!(inputs.current_sb_commitment, Field::from(0u64));
    assert!(!fx.state.poll(poll_id).unwrap().has_unprocessed_messages());
    assert!(matches!(
        fx.state.process_messages(poll_id),
        Err(CoreError::NoMoreMessageBatches)
    ));
}

#[test]
fn processing_requires_update() {
    let mut state = MaciState::new().unwrap();
    let coordinator = Keypair::new();
    let poll_id = state
        .deploy_poll(
            POLL_END_TIMESTAMP,
            max_values(),
            tree_depths(),
            MESSAGE_BATCH_SIZE,
            coordinator,
            VotingMode::Quadratic,
        )
        .unwrap();

    assert!(matches!(
        state.process_messages(poll_id),
        Err(CoreError::PollNotUpdated)
    ));
}

#[test]
fn processing_lock_is_exclusive_and_released() {
    let mut fx = fixture(7, VotingMode::Quadratic);
    let first_poll = fx.poll_id;
    let coordinator = fx.coordinator.clone();

    let second_poll = fx
        .state
        .deploy_poll(
            POLL_END_TIMESTAMP,
            max_values(),
            tree_depths(),
            MESSAGE_BATCH_SIZE,
            coordinator,
            VotingMode::Quadratic,
        )
        .unwrap();
    let num_sign_ups = fx.state.num_sign_ups();
    fx.state.update_poll(second_poll, num_sign_ups).unwrap();

    // Two batches in the first poll; the first one takes the lock.
    for voter in 0..7 {
        publish_simple_vote(&mut fx, voter, 0, 1, 1);
    }
    fx.state.process_messages(first_poll).unwrap();
    assert_eq!(
        fx.state.processing_status(),
        ProcessingStatus::Processing(first_poll)
    );
    assert!(matches!(
        fx.state.process_messages(second_poll),
        Err(CoreError::PollAlreadyBeingProcessed { current, requested })
            if current == first_poll && requested == second_poll
    ));

    fx.state.process_messages(first_poll).unwrap();
    assert_eq!(fx.state.processing_status(), ProcessingStatus::Idle);
    fx.state.process_messages(second_poll).unwrap();
}

#[test]
fn topup_increases_balance_without_touching_ballot() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    let poll_id = fx.poll_id;

    let topup = TopupCommand::new(1, 50, poll_id as u64);
    fx.state
        .poll_mut(poll_id)
        .unwrap()
        .topup_message(topup.to_message())
        .unwrap();

    let (leaves, ballots) = fx.state.process_all_messages(poll_id).unwrap();
    assert_eq!(leaves[1].voice_credit_balance, VOICE_CREDITS + 50);
    assert_eq!(ballots[1].nonce, 0);
    assert!(ballots[1].votes.iter().all(|&v| v == 0));
}

#[test]
fn topup_for_unknown_index_is_a_noop() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    let poll_id = fx.poll_id;

    let topup = TopupCommand::new(99, 50, poll_id as u64);
    fx.state
        .poll_mut(poll_id)
        .unwrap()
        .topup_message(topup.to_message())
        .unwrap();

    let (leaves, _) = fx.state.process_all_messages(poll_id).unwrap();
    assert_eq!(leaves[0], StateLeaf::blank());
    assert_eq!(leaves[1].voice_credit_balance, VOICE_CREDITS);
}

#[test]
fn publish_rejects_mismatched_kinds() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    let poll_id = fx.poll_id;
    let topup = TopupCommand::new(1, 50, poll_id as u64).to_message();
    let ephemeral = Keypair::new();

    let poll = fx.state.poll_mut(poll_id).unwrap();
    assert!(matches!(
        poll.publish_message(topup.clone(), *ephemeral.public_key()),
        Err(CoreError::WrongMessageKind { .. })
    ));

    let mut vote = topup;
    vote.kind = MessageKind::Vote;
    assert!(matches!(
        poll.topup_message(vote),
        Err(CoreError::WrongMessageKind { .. })
    ));
}
