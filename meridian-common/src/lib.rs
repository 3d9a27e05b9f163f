// lib.rs

pub mod action;
pub mod crypto;
pub mod name;

pub use action::{Action, ActionType, InternalAction, SignerPayload};
pub use crypto::{keccak256, pubkey_to_address, rlp_hash, PubKey};
pub use name::{AccountName, NameError, NameFormat};
