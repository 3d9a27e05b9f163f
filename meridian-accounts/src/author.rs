use meridian_common::crypto::PubKey;
use meridian_common::name::AccountName;
use primitive_types::H160;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// The identity an author entry resolves to.
///
/// Encoded on the wire as a two-item list `[tag, payload]`; the tag byte is
/// part of the canonical format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    PublicKey(PubKey),
    Address(H160),
    /// A delegation link to another account's authority set.
    Account(AccountName),
}

const OWNER_TAG_PUBKEY: u8 = 0;
const OWNER_TAG_ADDRESS: u8 = 1;
const OWNER_TAG_ACCOUNT: u8 = 2;

impl Owner {
    /// The delegated account, if this owner is a delegation link.
    pub fn as_account(&self) -> Option<&AccountName> {
        match self {
            Owner::Account(name) => Some(name),
            _ => None,
        }
    }

    /// Whether `recovered` proves control of this owner. Delegation links are
    /// never satisfied directly by a key.
    pub fn satisfied_by(&self, recovered: &PubKey) -> bool {
        match self {
            Owner::PublicKey(key) => key == recovered,
            Owner::Address(addr) => recovered.to_address() == *addr,
            Owner::Account(_) => false,
        }
    }
}

impl Encodable for Owner {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        match self {
            Owner::PublicKey(key) => {
                s.append(&OWNER_TAG_PUBKEY);
                s.append(key);
            }
            Owner::Address(addr) => {
                s.append(&OWNER_TAG_ADDRESS);
                s.append(addr);
            }
            Owner::Account(name) => {
                s.append(&OWNER_TAG_ACCOUNT);
                s.append(name);
            }
        }
    }
}

impl Decodable for Owner {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        match rlp.val_at::<u8>(0)? {
            OWNER_TAG_PUBKEY => Ok(Owner::PublicKey(rlp.val_at(1)?)),
            OWNER_TAG_ADDRESS => Ok(Owner::Address(rlp.val_at(1)?)),
            OWNER_TAG_ACCOUNT => Ok(Owner::Account(rlp.val_at(1)?)),
            _ => Err(DecoderError::Custom("unknown owner tag")),
        }
    }
}

/// One entry of an account's authority set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub owner: Owner,
    pub weight: u64,
    /// Opaque status byte, carried through the wire format untouched.
    pub status: u8,
}

impl Author {
    pub fn new(owner: Owner, weight: u64) -> Self {
        Self {
            owner,
            weight,
            status: 0,
        }
    }
}

impl Encodable for Author {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.owner);
        s.append(&self.weight);
        s.append(&self.status);
    }
}

impl Decodable for Author {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            owner: rlp.val_at(0)?,
            weight: rlp.val_at(1)?,
            status: rlp.val_at(2)?,
        })
    }
}

/// One step of an `UpdateAccountAuthor` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AuthorOp {
    Add = 0,
    Update = 1,
    Delete = 2,
}

impl AuthorOp {
    fn from_u8(value: u8) -> Result<Self, DecoderError> {
        match value {
            0 => Ok(Self::Add),
            1 => Ok(Self::Update),
            2 => Ok(Self::Delete),
            _ => Err(DecoderError::Custom("unknown author op")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorAction {
    pub op: AuthorOp,
    pub author: Author,
}

impl Encodable for AuthorAction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&(self.op as u8));
        s.append(&self.author);
    }
}

impl Decodable for AuthorAction {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            op: AuthorOp::from_u8(rlp.val_at(0)?)?,
            author: rlp.val_at(1)?,
        })
    }
}
