//! RLP payloads carried in the `data` field of account and asset actions.

use meridian_common::crypto::PubKey;
use meridian_common::name::AccountName;
use primitive_types::U256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::author::AuthorAction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountPayload {
    pub account_name: AccountName,
    /// Empty means the new account founds itself.
    pub founder: AccountName,
    pub public_key: PubKey,
    pub description: String,
}

impl Encodable for CreateAccountPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.account_name);
        s.append(&self.founder);
        s.append(&self.public_key);
        s.append(&self.description);
    }
}

impl Decodable for CreateAccountPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            account_name: rlp.val_at(0)?,
            founder: rlp.val_at(1)?,
            public_key: rlp.val_at(2)?,
            description: rlp.val_at(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAccountPayload {
    /// Empty means reset to the account's own name.
    pub founder: AccountName,
}

impl Encodable for UpdateAccountPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(1);
        s.append(&self.founder);
    }
}

impl Decodable for UpdateAccountPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            founder: rlp.val_at(0)?,
        })
    }
}

/// Ordered authority-set edit. Thresholds of zero mean "leave unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAuthorPayload {
    pub threshold: u64,
    pub update_author_threshold: u64,
    pub author_actions: Vec<AuthorAction>,
}

impl Encodable for UpdateAuthorPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.threshold);
        s.append(&self.update_author_threshold);
        s.append_list::<AuthorAction, _>(&self.author_actions);
    }
}

impl Decodable for UpdateAuthorPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            threshold: rlp.val_at(0)?,
            update_author_threshold: rlp.val_at(1)?,
            author_actions: rlp.list_at(2)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueAssetPayload {
    pub asset_name: AccountName,
    pub symbol: String,
    pub amount: U256,
    pub decimals: u64,
    /// Empty means the owner founds the asset.
    pub founder: AccountName,
    pub owner: AccountName,
    pub upper_limit: U256,
    /// Empty means transfers are unrestricted.
    pub contract: AccountName,
    pub description: String,
}

impl Encodable for IssueAssetPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(9);
        s.append(&self.asset_name);
        s.append(&self.symbol);
        s.append(&self.amount);
        s.append(&self.decimals);
        s.append(&self.founder);
        s.append(&self.owner);
        s.append(&self.upper_limit);
        s.append(&self.contract);
        s.append(&self.description);
    }
}

impl Decodable for IssueAssetPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            asset_name: rlp.val_at(0)?,
            symbol: rlp.val_at(1)?,
            amount: rlp.val_at(2)?,
            decimals: rlp.val_at(3)?,
            founder: rlp.val_at(4)?,
            owner: rlp.val_at(5)?,
            upper_limit: rlp.val_at(6)?,
            contract: rlp.val_at(7)?,
            description: rlp.val_at(8)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncreaseAssetPayload {
    pub asset_id: u64,
    pub amount: U256,
    pub to: AccountName,
}

impl Encodable for IncreaseAssetPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.asset_id);
        s.append(&self.amount);
        s.append(&self.to);
    }
}

impl Decodable for IncreaseAssetPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            asset_id: rlp.val_at(0)?,
            amount: rlp.val_at(1)?,
            to: rlp.val_at(2)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAssetPayload {
    pub asset_id: u64,
    /// Empty means reset to the asset owner.
    pub founder: AccountName,
}

impl Encodable for UpdateAssetPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.asset_id);
        s.append(&self.founder);
    }
}

impl Decodable for UpdateAssetPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            asset_id: rlp.val_at(0)?,
            founder: rlp.val_at(1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAssetOwnerPayload {
    pub asset_id: u64,
    pub owner: AccountName,
}

impl Encodable for SetAssetOwnerPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.asset_id);
        s.append(&self.owner);
    }
}

impl Decodable for SetAssetOwnerPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            asset_id: rlp.val_at(0)?,
            owner: rlp.val_at(1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::author::{Author, AuthorOp, Owner};

    #[test]
    fn test_create_account_payload_round_trip() {
        let payload = CreateAccountPayload {
            account_name: AccountName::new("alice01.sub"),
            founder: AccountName::empty(),
            public_key: PubKey::new(vec![0x04; 65]),
            description: "test account".to_string(),
        };
        let back: CreateAccountPayload =
            rlp::decode(&rlp::encode(&payload)).expect("round trip");
        assert_eq!(back, payload);
        assert!(back.founder.is_empty());
    }

    #[test]
    fn test_update_author_payload_round_trip() {
        let payload = UpdateAuthorPayload {
            threshold: 3,
            update_author_threshold: 0,
            author_actions: vec![AuthorAction {
                op: AuthorOp::Add,
                author: Author::new(Owner::Account(AccountName::new("bob00001")), 2),
            }],
        };
        let back: UpdateAuthorPayload =
            rlp::decode(&rlp::encode(&payload)).expect("round trip");
        assert_eq!(back, payload);
    }
}
