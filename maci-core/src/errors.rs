//! Error taxonomy for the replica engine.
//!
//! Message-level rejections are the expected outcome for adversarial or
//! stale input: they are caught per slot, logged, and degrade to sentinel
//! bookkeeping without aborting the batch. Core errors are precondition
//! violations and abort the call without touching committed state.

use maci_crypto::CryptoError;

use thiserror::Error;

/// Why a single message was rejected during processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("state index {0} is outside the signed-up range")]
    InvalidStateIndex(u64),

    #[error("signature does not verify against the voter's current public key")]
    InvalidSignature,

    #[error("command nonce {got} does not follow the ballot nonce {current}")]
    InvalidNonce { current: u64, got: u64 },

    #[error("vote option index {0} exceeds the maximum of {1}")]
    InvalidVoteOption(u64, usize),

    #[error("insufficient voice credits for the requested vote weight")]
    InsufficientVoiceCredits,

    #[error("message could not be decrypted with the coordinator's key")]
    Decryption,
}

/// A fatal precondition or serialization failure.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("poll {0} does not exist")]
    PollDoesNotExist(usize),

    #[error("poll state has not been copied from the registry")]
    PollNotUpdated,

    #[error("no more message batches to process")]
    NoMoreMessageBatches,

    #[error("no more ballot batches to tally")]
    NoMoreTallyBatches,

    #[error("no more subsidy batches to calculate")]
    NoMoreSubsidyBatches,

    #[error("messages must be processed before tallying or subsidy calculation")]
    MessagesNotProcessed,

    #[error("poll {current} is being processed; cannot start poll {requested}")]
    PollAlreadyBeingProcessed { current: usize, requested: usize },

    #[error("expected a message of kind {expected}, got kind {got}")]
    WrongMessageKind { expected: u8, got: u8 },

    #[error("message word {0} does not fit the expected integer range")]
    DataOutOfRange(String),

    #[error("{0} vote options exceed the capacity of a depth-{1} tree")]
    VoteOptionsExceedCapacity(usize, usize),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
