use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};

use crate::crypto::PubKey;
use crate::name::AccountName;

/// The type tag of an action.
///
/// The numeric values are part of the transaction wire format. Contract
/// execution types are listed so the envelope can carry them, but the account
/// core rejects them as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u64)]
pub enum ActionType {
    CreateContract = 0x1,
    CallContract = 0x2,

    CreateAccount = 0x100,
    UpdateAccount = 0x101,
    UpdateAccountAuthor = 0x102,

    IssueAsset = 0x200,
    IncreaseAsset = 0x201,
    DestroyAsset = 0x202,
    UpdateAsset = 0x203,
    SetAssetOwner = 0x204,
    Transfer = 0x205,
}

impl ActionType {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0x1 => Some(Self::CreateContract),
            0x2 => Some(Self::CallContract),
            0x100 => Some(Self::CreateAccount),
            0x101 => Some(Self::UpdateAccount),
            0x102 => Some(Self::UpdateAccountAuthor),
            0x200 => Some(Self::IssueAsset),
            0x201 => Some(Self::IncreaseAsset),
            0x202 => Some(Self::DestroyAsset),
            0x203 => Some(Self::UpdateAsset),
            0x204 => Some(Self::SetAssetOwner),
            0x205 => Some(Self::Transfer),
            _ => None,
        }
    }

    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// True for the action that rewrites an account's authority set; it is
    /// gated by `update_author_threshold` instead of the general threshold.
    pub fn is_author_update(self) -> bool {
        matches!(self, Self::UpdateAccountAuthor)
    }
}

/// One recovered signature: the public key plus the sign-index path naming,
/// at each step, which author entry of the current account to follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerPayload {
    pub public_key: PubKey,
    pub index: Vec<u64>,
}

impl SignerPayload {
    pub fn new(public_key: PubKey, index: Vec<u64>) -> Self {
        Self { public_key, index }
    }
}

/// The smallest unit of intent inside a transaction.
///
/// Signature material has already been recovered upstream; `signers` carries
/// the result. `author_versions` is filled by the authority resolver on
/// successful verification and becomes part of the action's canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: ActionType,
    pub sender: AccountName,
    pub recipient: AccountName,
    pub asset_id: u64,
    pub value: U256,
    /// Type-dependent payload, RLP-encoded.
    pub data: Vec<u8>,
    pub signers: Vec<SignerPayload>,
    /// Visited-account name → author version at verification time, sorted by
    /// name.
    pub author_versions: Vec<(AccountName, H256)>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        sender: AccountName,
        recipient: AccountName,
        asset_id: u64,
        value: U256,
        data: Vec<u8>,
    ) -> Self {
        Self {
            action_type,
            sender,
            recipient,
            asset_id,
            value,
            data,
            signers: Vec::new(),
            author_versions: Vec::new(),
        }
    }

    pub fn push_signer(&mut self, signer: SignerPayload) {
        self.signers.push(signer);
    }
}

/// A state change performed by a handler on behalf of an action, reported to
/// the caller for receipts and indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalAction {
    pub action_type: ActionType,
    pub from: AccountName,
    pub to: AccountName,
    pub asset_id: u64,
    pub value: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_tags() {
        assert_eq!(ActionType::CreateAccount.as_u64(), 0x100);
        assert_eq!(ActionType::Transfer.as_u64(), 0x205);
        assert_eq!(ActionType::from_u64(0x102), Some(ActionType::UpdateAccountAuthor));
        assert_eq!(ActionType::from_u64(0x999), None);
    }

    #[test]
    fn test_author_update_gating_flag() {
        assert!(ActionType::UpdateAccountAuthor.is_author_update());
        assert!(!ActionType::Transfer.is_author_update());
        assert!(!ActionType::IssueAsset.is_author_update());
    }
}
