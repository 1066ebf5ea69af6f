//! Tallying and pairwise subsidy: accumulator correctness, commitment
//! chaining and phase ordering.

mod common;

use common::*;
use maci_core::{CoreError, VotingMode};
use maci_crypto::Field;

#[test]
fn tally_accumulates_votes_and_spent_credits() {
    let mut fx = fixture(2, VotingMode::Quadratic);
    publish_simple_vote(&mut fx, 0, 0, 9, 1);
    publish_simple_vote(&mut fx, 1, 3, 4, 1);

    let poll_id = fx.poll_id;
    fx.state.process_all_messages(poll_id).unwrap();

    let poll = fx.state.poll_mut(poll_id).unwrap();
    poll.tally_votes().unwrap();

    assert_eq!(poll.results()[0], 9);
    assert_eq!(poll.results()[3], 4);
    assert_eq!(poll.per_option_spent_voice_credits()[0], 81);
    assert_eq!(poll.per_option_spent_voice_credits()[3], 16);
    assert_eq!(poll.total_spent_voice_credits(), 97);
    assert!(!poll.has_untallied_ballots());
}

#[test]
fn non_quadratic_tally_spends_face_value() {
    let mut fx = fixture(1, VotingMode::NonQuadratic);
    publish_simple_vote(&mut fx, 0, 2, 7, 1);

    let poll_id = fx.poll_id;
    fx.state.process_all_messages(poll_id).unwrap();

    let poll = fx.state.poll_mut(poll_id).unwrap();
    poll.tally_votes().unwrap();
    assert_eq!(poll.results()[2], 7);
    assert_eq!(poll.per_option_spent_voice_credits()[2], 7);
    assert_eq!(poll.total_spent_voice_credits(), 7);
}

#[test]
fn rejected_votes_do_not_reach_the_tally() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    publish_simple_vote(&mut fx, 0, 0, 11, 1);

    let poll_id = fx.poll_id;
    fx.state.process_all_messages(poll_id).unwrap();

    let poll = fx.state.poll_mut(poll_id).unwrap();
    poll.tally_votes().unwrap();
    assert!(poll.results().iter().all(|&v| v == 0));
    assert_eq!(poll.total_spent_voice_credits(), 0);
}

#[test]
fn tally_commitments_chain_across_batches() {
    // 6 voters plus the sentinel span two tally batches of 5.
    let mut fx = fixture(6, VotingMode::Quadratic);
    for voter in 0..6 {
        publish_simple_vote(&mut fx, voter, 0, 2, 1);
    }

    let poll_id = fx.poll_id;
    fx.state.process_all_messages(poll_id).unwrap();

    let poll = fx.state.poll_mut(poll_id).unwrap();
    let first = poll.tally_votes().unwrap();
    assert_eq!(first.current_tally_commitment, Field::from(0u64));
    assert_ne!(first.new_tally_commitment, Field::from(0u64));

    let second = poll.tally_votes().unwrap();
    assert_eq!(second.current_tally_commitment, first.new_tally_commitment);

    assert_eq!(poll.results()[0], 12);
    assert!(matches!(
        poll.tally_votes(),
        Err(CoreError::NoMoreTallyBatches)
    ));
}

#[test]
fn tally_requires_processed_messages() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    publish_simple_vote(&mut fx, 0, 0, 1, 1);

    let poll_id = fx.poll_id;
    let poll = fx.state.poll_mut(poll_id).unwrap();
    assert!(matches!(
        poll.tally_votes(),
        Err(CoreError::MessagesNotProcessed)
    ));
}

#[test]
fn subsidy_accumulates_pairwise_terms() {
    let mut fx = fixture(2, VotingMode::Quadratic);
    publish_simple_vote(&mut fx, 0, 0, 2, 1);
    publish_simple_vote(&mut fx, 1, 0, 3, 1);

    let poll_id = fx.poll_id;
    fx.state.process_all_messages(poll_id).unwrap();

    let poll = fx.state.poll_mut(poll_id).unwrap();
    let inputs = poll.subsidy_per_batch().unwrap();
    assert_eq!(inputs.current_subsidy_commitment, Field::from(0u64));

    // One cross pair with product 2 * 3 = 6:
    // k = 50 * 10^4 / (50 + 6) = 8928, term = 2 * k * 6.
    assert_eq!(poll.subsidy()[0], 2 * 8928 * 6);
    assert!(poll.subsidy()[1..].iter().all(|&v| v == 0));
    assert!(!poll.has_unfinished_subsidy_calculation());
    assert!(matches!(
        poll.subsidy_per_batch(),
        Err(CoreError::NoMoreSubsidyBatches)
    ));
}

#[test]
fn subsidy_commitments_chain_across_batches() {
    let mut fx = fixture(6, VotingMode::Quadratic);
    for voter in 0..6 {
        publish_simple_vote(&mut fx, voter, 0, 1, 1);
    }

    let poll_id = fx.poll_id;
    fx.state.process_all_messages(poll_id).unwrap();

    // 7 ballots over batches of 5: cursor walks (0,0), (0,1), (1,1).
    let poll = fx.state.poll_mut(poll_id).unwrap();
    let first = poll.subsidy_per_batch().unwrap();
    assert_eq!(first.current_subsidy_commitment, Field::from(0u64));

    let second = poll.subsidy_per_batch().unwrap();
    assert_eq!(second.current_subsidy_commitment, first.new_subsidy_commitment);

    let third = poll.subsidy_per_batch().unwrap();
    assert_eq!(third.current_subsidy_commitment, second.new_subsidy_commitment);

    assert!(!poll.has_unfinished_subsidy_calculation());
}

#[test]
fn subsidy_requires_processed_messages() {
    let mut fx = fixture(1, VotingMode::Quadratic);
    publish_simple_vote(&mut fx, 0, 0, 1, 1);

    let poll_id = fx.poll_id;
    let poll = fx.state.poll_mut(poll_id).unwrap();
    assert!(matches!(
        poll.subsidy_per_batch(),
        Err(CoreError::MessagesNotProcessed)
    ));
}
