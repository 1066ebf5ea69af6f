//! Domain records for the MACI replica engine.
//!
//! These are the value types the registry and poll state machines operate
//! on: keypairs, state leaves, ballots, plaintext commands and their
//! encrypted wire form. Each type carries its own hashing, circuit-input
//! and JSON contracts; the state machines never reach into raw field
//! arithmetic themselves.

pub mod ballot;
pub mod commands;
pub mod keypair;
pub mod message;
pub mod state_leaf;

pub use ballot::Ballot;
pub use commands::{Command, TopupCommand, VoteCommand};
pub use keypair::{Keypair, PrivateKey, PublicKey};
pub use message::{Message, MessageKind, MESSAGE_DATA_LENGTH};
pub use state_leaf::StateLeaf;
