use primitive_types::{H160, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Computes the Keccak-256 digest of the given data.
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_slice(&hasher.finalize())
}

/// Keccak-256 over the canonical RLP encoding of a value.
///
/// This is the content hash used wherever a persisted structure needs a
/// deterministic summary (e.g. the author-version tag).
pub fn rlp_hash<E: Encodable>(value: &E) -> H256 {
    keccak256(&rlp::encode(value))
}

/// An uncompressed public key as recovered by the signature primitive.
///
/// The first byte is the curve tag; it is skipped when deriving the
/// on-chain address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey(#[serde(with = "hex::serde")] pub Vec<u8>);

impl PubKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derives the 20-byte address of this key:
    /// `keccak256(key[1..])[12..]`.
    pub fn to_address(&self) -> H160 {
        let body = self.0.get(1..).unwrap_or_default();
        H160::from_slice(&keccak256(body)[12..])
    }
}

/// See [`PubKey::to_address`].
pub fn pubkey_to_address(key: &PubKey) -> H160 {
    key.to_address()
}

impl Encodable for PubKey {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.0);
    }
}

impl Decodable for PubKey {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self(rlp.as_val::<Vec<u8>>()?))
    }
}
