use std::collections::BTreeMap;

use meridian_common::crypto::{keccak256, PubKey};
use meridian_common::name::AccountName;
use primitive_types::{H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::author::{Author, Owner};
use crate::error::{AccountError, Result};

/// An on-chain account record.
///
/// Pure in-memory operations; persistence and cross-account rules live in the
/// manager. Balances are kept ordered by asset id so every enumeration is
/// deterministic. An absent balance entry and an explicit zero are distinct
/// states: absence means the asset was never held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: AccountName,
    pub id: u64,
    pub nonce: u64,
    pub founder: AccountName,
    pub description: String,
    pub code: Vec<u8>,
    pub code_hash: H256,
    pub code_size: u64,
    pub threshold: u64,
    pub update_author_threshold: u64,
    pub authors: Vec<Author>,
    pub author_version: H256,
    pub balances: BTreeMap<u64, U256>,
    pub destroyed: bool,
}

impl Account {
    /// Creates a fresh record controlled by `public_key` with weight 1 and
    /// both thresholds at 1.
    pub fn new(
        id: u64,
        name: AccountName,
        founder: AccountName,
        public_key: PubKey,
        description: String,
    ) -> Self {
        let mut account = Self {
            name,
            id,
            nonce: 0,
            founder,
            description,
            code: Vec::new(),
            code_hash: H256::zero(),
            code_size: 0,
            threshold: 1,
            update_author_threshold: 1,
            authors: vec![Author::new(Owner::PublicKey(public_key), 1)],
            author_version: H256::zero(),
            balances: BTreeMap::new(),
            destroyed: false,
        };
        account.recompute_author_version();
        account
    }

    // --- balances ---

    /// The held amount of `asset_id`; an account that never held the asset
    /// gets `AssetNotHeld`, not zero.
    pub fn balance(&self, asset_id: u64) -> Result<U256> {
        self.balances
            .get(&asset_id)
            .copied()
            .ok_or(AccountError::AssetNotHeld(asset_id))
    }

    pub fn has_asset(&self, asset_id: u64) -> bool {
        self.balances.contains_key(&asset_id)
    }

    pub fn set_balance(&mut self, asset_id: u64, value: U256) {
        self.balances.insert(asset_id, value);
    }

    /// Adds `value`, inserting the entry if the asset was never held.
    pub fn add_balance(&mut self, asset_id: u64, value: U256) -> Result<()> {
        let current = self.balances.get(&asset_id).copied().unwrap_or_default();
        let updated = current
            .checked_add(value)
            .ok_or(AccountError::AmountOverflow)?;
        self.balances.insert(asset_id, updated);
        Ok(())
    }

    /// Subtracts `value`; a missing entry or an underflow is an error, and a
    /// drained balance stays as an explicit zero.
    pub fn sub_balance(&mut self, asset_id: u64, value: U256) -> Result<()> {
        let current = self
            .balances
            .get(&asset_id)
            .copied()
            .ok_or(AccountError::AssetNotHeld(asset_id))?;
        let updated = current
            .checked_sub(value)
            .ok_or(AccountError::InsufficientBalance)?;
        self.balances.insert(asset_id, updated);
        Ok(())
    }

    /// First-ever touch of an asset: inserts the entry, failing if one is
    /// already present.
    pub fn add_new_asset(&mut self, asset_id: u64, initial: U256) -> Result<()> {
        if self.balances.contains_key(&asset_id) {
            return Err(AccountError::AssetAlreadyHeld(asset_id));
        }
        self.balances.insert(asset_id, initial);
        Ok(())
    }

    /// All held balances, ordered by asset id.
    pub fn enumerate_balances(&self) -> impl Iterator<Item = (u64, U256)> + '_ {
        self.balances.iter().map(|(id, amount)| (*id, *amount))
    }

    // --- authority set ---

    pub fn add_author(&mut self, author: Author) -> Result<()> {
        if self.authors.iter().any(|a| a.owner == author.owner) {
            return Err(AccountError::AuthorExists);
        }
        self.authors.push(author);
        Ok(())
    }

    /// Replaces the entry with the same owner identity.
    pub fn update_author(&mut self, author: Author) -> Result<()> {
        match self.authors.iter_mut().find(|a| a.owner == author.owner) {
            Some(existing) => {
                *existing = author;
                Ok(())
            }
            None => Err(AccountError::AuthorNotFound),
        }
    }

    pub fn delete_author(&mut self, owner: &Owner) -> Result<()> {
        match self.authors.iter().position(|a| &a.owner == owner) {
            Some(idx) => {
                self.authors.remove(idx);
                Ok(())
            }
            None => Err(AccountError::AuthorNotFound),
        }
    }

    pub fn set_threshold(&mut self, threshold: u64) {
        self.threshold = threshold;
    }

    pub fn set_update_author_threshold(&mut self, threshold: u64) {
        self.update_author_threshold = threshold;
    }

    /// Refreshes the content hash over `(authors, threshold,
    /// update_author_threshold)`. Must be called after every authority
    /// mutation; the persisted record always carries a matching version.
    pub fn recompute_author_version(&mut self) {
        let mut s = RlpStream::new_list(3);
        s.append_list::<Author, _>(&self.authors);
        s.append(&self.threshold);
        s.append(&self.update_author_threshold);
        self.author_version = keccak256(&s.out());
    }

    // --- code ---

    pub fn set_code(&mut self, code: Vec<u8>) {
        self.code_hash = keccak256(&code);
        self.code_size = code.len() as u64;
        self.code = code;
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn code_hash(&self) -> H256 {
        self.code_hash
    }

    pub fn code_size(&self) -> u64 {
        self.code_size
    }

    pub fn has_code(&self) -> bool {
        self.code_size > 0
    }

    // --- lifecycle ---

    /// One-way: a destroyed record stays readable but rejects all mutation at
    /// the manager level.
    pub fn set_destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_empty(&self) -> bool {
        !self.has_code() && self.balances.is_empty() && self.nonce == 0
    }
}

// Field order below is wire-stable; both sides must agree byte-for-byte.
impl Encodable for Account {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(14);
        s.append(&self.name);
        s.append(&self.id);
        s.append(&self.nonce);
        s.append(&self.founder);
        s.append(&self.description);
        s.append(&self.code);
        s.append(&self.code_hash);
        s.append(&self.code_size);
        s.append(&self.threshold);
        s.append(&self.update_author_threshold);
        s.append_list::<Author, _>(&self.authors);
        s.append(&self.author_version);
        s.begin_list(self.balances.len());
        for (asset_id, amount) in &self.balances {
            s.begin_list(2);
            s.append(asset_id);
            s.append(amount);
        }
        s.append(&self.destroyed);
    }
}

impl Decodable for Account {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        eprintln!("DEBUG decode start, item_count={:?}", rlp.item_count());
        let balances_rlp = match rlp.at(12) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("DEBUG at(12) failed: {:?}", e);
                return Err(e);
            }
        };
        eprintln!("DEBUG balances_rlp ok");
        let mut balances = BTreeMap::new();
        for i in 0..balances_rlp.item_count()? {
            let entry = balances_rlp.at(i)?;
            balances.insert(entry.val_at::<u64>(0)?, entry.val_at::<U256>(1)?);
        }
        eprintln!("DEBUG balances done");
        let name = rlp.val_at(0)?;
        eprintln!("DEBUG name ok");
        let id = rlp.val_at(1)?;
        eprintln!("DEBUG id ok");
        let nonce = rlp.val_at(2)?;
        eprintln!("DEBUG nonce ok");
        let founder = rlp.val_at(3)?;
        eprintln!("DEBUG founder ok");
        let description = rlp.val_at(4)?;
        eprintln!("DEBUG description ok");
        let code = rlp.val_at(5)?;
        eprintln!("DEBUG code ok");
        let code_hash = rlp.val_at(6)?;
        eprintln!("DEBUG code_hash ok");
        let code_size = rlp.val_at(7)?;
        eprintln!("DEBUG code_size ok");
        let threshold = rlp.val_at(8)?;
        eprintln!("DEBUG threshold ok");
        let update_author_threshold = rlp.val_at(9)?;
        eprintln!("DEBUG uat ok");
        let authors = rlp.list_at(10)?;
        eprintln!("DEBUG authors ok");
        let author_version = rlp.val_at(11)?;
        eprintln!("DEBUG author_version ok");
        let destroyed = rlp.val_at(13)?;
        eprintln!("DEBUG destroyed ok");
        Ok(Self {
            name,
            id,
            nonce,
            founder,
            description,
            code,
            code_hash,
            code_size,
            threshold,
            update_author_threshold,
            authors,
            author_version,
            balances,
            destroyed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key(tag: u8) -> PubKey {
        let mut bytes = vec![0x04];
        bytes.extend_from_slice(&[tag; 64]);
        PubKey::new(bytes)
    }

    fn sample_account() -> Account {
        Account::new(
            4097,
            AccountName::new("alice01"),
            AccountName::new("alice01"),
            sample_key(0x11),
            String::new(),
        )
    }

    #[test]
    fn test_new_account_authority() {
        let account = sample_account();
        assert_eq!(account.authors.len(), 1);
        assert_eq!(account.authors[0].weight, 1);
        assert_eq!(account.threshold, 1);
        assert_ne!(account.author_version, H256::zero());
        assert!(account.is_empty());
    }

    #[test]
    fn test_absence_differs_from_zero() {
        let mut account = sample_account();
        assert_eq!(account.balance(1), Err(AccountError::AssetNotHeld(1)));

        account.add_new_asset(1, U256::from(10)).unwrap();
        account.sub_balance(1, U256::from(10)).unwrap();
        // Drained, but held: the entry stays as an explicit zero.
        assert_eq!(account.balance(1), Ok(U256::zero()));
        assert!(account.has_asset(1));
    }

    #[test]
    fn test_sub_balance_underflow() {
        let mut account = sample_account();
        account.add_new_asset(1, U256::from(5)).unwrap();
        assert_eq!(
            account.sub_balance(1, U256::from(6)),
            Err(AccountError::InsufficientBalance)
        );
        assert_eq!(account.balance(1), Ok(U256::from(5)));
    }

    #[test]
    fn test_add_new_asset_rejects_existing() {
        let mut account = sample_account();
        account.add_new_asset(1, U256::from(1)).unwrap();
        assert_eq!(
            account.add_new_asset(1, U256::from(1)),
            Err(AccountError::AssetAlreadyHeld(1))
        );
    }

    #[test]
    fn test_author_ops_refresh_version() {
        let mut account = sample_account();
        let before = account.author_version;

        account
            .add_author(Author::new(Owner::Account(AccountName::new("bob00001")), 2))
            .unwrap();
        account.recompute_author_version();
        assert_ne!(account.author_version, before);

        let dup = Author::new(Owner::Account(AccountName::new("bob00001")), 9);
        assert_eq!(account.add_author(dup.clone()), Err(AccountError::AuthorExists));
        account.update_author(dup).unwrap();
        assert_eq!(account.authors[1].weight, 9);

        account
            .delete_author(&Owner::Account(AccountName::new("bob00001")))
            .unwrap();
        assert_eq!(account.authors.len(), 1);
        assert_eq!(
            account.delete_author(&Owner::Account(AccountName::new("bob00001"))),
            Err(AccountError::AuthorNotFound)
        );
    }

    #[test]
    fn test_code_ops() {
        let mut account = sample_account();
        assert!(!account.has_code());
        account.set_code(vec![0x60, 0x00]);
        assert!(account.has_code());
        assert_eq!(account.code_size(), 2);
        assert_eq!(account.code_hash(), keccak256(&[0x60, 0x00]));
    }

    #[test]
    fn test_destroy_is_sticky() {
        let mut account = sample_account();
        account.set_destroy();
        assert!(account.is_destroyed());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut account = sample_account();
        account.nonce = 3;
        account.add_new_asset(7, U256::from(1_000u64)).unwrap();
        account.add_new_asset(2, U256::zero()).unwrap();
        account.set_code(vec![1, 2, 3]);
        account
            .add_author(Author::new(Owner::Address(sample_key(0x22).to_address()), 4))
            .unwrap();
        account.set_threshold(5);
        account.recompute_author_version();

        let decoded: Account = rlp::decode(&rlp::encode(&account)).expect("round trip");
        assert_eq!(decoded, account);
    }
}



#[cfg(test)]
mod debug_bisect3 {
    use super::*;

    #[test]
    fn bisect3() {
        let account = Account::new(
            4097,
            AccountName::new("alice01"),
            AccountName::new("alice01"),
            PubKey::new(vec![0x04; 65]),
            String::new(),
        );
        let bytes = rlp::encode(&account);
        let rlp = rlp::Rlp::new(&bytes);
        eprintln!("name: {:?}", rlp.val_at::<AccountName>(0).is_ok());
        eprintln!("id: {:?}", rlp.val_at::<u64>(1));
        eprintln!("nonce: {:?}", rlp.val_at::<u64>(2));
        eprintln!("founder: {:?}", rlp.val_at::<AccountName>(3).is_ok());
        eprintln!("description: {:?}", rlp.val_at::<String>(4));
        eprintln!("code: {:?}", rlp.val_at::<Vec<u8>>(5));
        eprintln!("code_hash: {:?}", rlp.val_at::<H256>(6));
        eprintln!("code_size: {:?}", rlp.val_at::<u64>(7));
        eprintln!("threshold: {:?}", rlp.val_at::<u64>(8));
        eprintln!("uat: {:?}", rlp.val_at::<u64>(9));
        eprintln!("authors: {:?}", rlp.list_at::<Author>(10));
        eprintln!("author_version: {:?}", rlp.val_at::<H256>(11));
        eprintln!("balances count: {:?}", rlp.at(12).unwrap().item_count());
        eprintln!("destroyed: {:?}", rlp.val_at::<bool>(13));
    }
}

#[cfg(test)]
mod debug_bisect4 {
    use super::*;

    #[test]
    fn bisect4() {
        let account = Account::new(
            4097,
            AccountName::new("alice01"),
            AccountName::new("alice01"),
            PubKey::new(vec![0x04; 65]),
            String::new(),
        );
        let bytes = rlp::encode(&account);
        let rlp = rlp::Rlp::new(&bytes);
        let decoded = Account::decode(&rlp);
        eprintln!("decoded: {:?}", decoded);
    }
}

#[cfg(test)]
mod debug_bisect5 {
    use super::*;

    #[test]
    fn bisect5() {
        let account = Account::new(
            4097,
            AccountName::new("alice01"),
            AccountName::new("alice01"),
            PubKey::new(vec![0x04; 65]),
            String::new(),
        );
        let bytes = rlp::encode(&account);
        let rlp = rlp::Rlp::new(&bytes);
        // call at(12) FIRST, cold
        eprintln!("cold at(12): {:?}", rlp.at(12).is_ok());
    }
}


#[cfg(test)]
mod debug_bisect7 {
    use super::*;

    #[test]
    fn bisect7() {
        let account = Account::new(
            4097,
            AccountName::new("alice01"),
            AccountName::new("alice01"),
            PubKey::new(vec![0x04; 65]),
            String::new(),
        );
        let bytes = rlp::encode(&account);
        eprintln!("total len = {}", bytes.len());
        eprintln!("header byte0={:#x} byte1={:#x}", bytes[0], bytes[1]);
    }
}





#[cfg(test)]
mod debug_bisect12 {
    use super::*;

    #[test]
    fn bisect12() {
        let account = Account::new(
            4097,
            AccountName::new("alice01"),
            AccountName::new("alice01"),
            PubKey::new(vec![0x04; 65]),
            String::new(),
        );
        let mut s = RlpStream::new();
        s.begin_list(14);
        s.append(&account.name);
        s.append(&account.id);
        s.append(&account.nonce);
        s.append(&account.founder);
        s.append(&account.description);
        s.append(&account.code);
        s.append(&account.code_hash);
        s.append(&account.code_size);
        s.append(&account.threshold);
        s.append(&account.update_author_threshold);
        eprintln!("after 10 plain fields: finished={}", s.is_finished());
        s.append(&7u8); // placeholder instead of authors
        eprintln!("after placeholder(item10): finished={}", s.is_finished());
        s.append(&account.author_version);
        eprintln!("after author_version(item11): finished={}", s.is_finished());
        s.begin_list(account.balances.len());
        eprintln!("after balances begin_list(item12): finished={}", s.is_finished());
        s.append(&account.destroyed);
        eprintln!("after destroyed(item13): finished={}", s.is_finished());
    }
}

#[cfg(test)]
mod debug_bisect13 {
    use super::*;

    fn count_until_finish(push: impl Fn(&mut RlpStream)) -> usize {
        let mut s = RlpStream::new();
        s.begin_list(100);
        let mut n = 0;
        loop {
            push(&mut s);
            n += 1;
            if s.is_finished() { break; }
            if n > 50 { break; }
        }
        n
    }

    #[test]
    fn bisect13() {
        let account = Account::new(
            4097,
            AccountName::new("alice01"),
            AccountName::new("alice01"),
            PubKey::new(vec![0x04; 65]),
            String::new(),
        );
        eprintln!("u8 baseline: {}", count_until_finish(|s| { s.append(&7u8); }));
        eprintln!("AccountName (name): {}", count_until_finish(|s| { s.append(&account.name); }));
        eprintln!("AccountName (founder): {}", count_until_finish(|s| { s.append(&account.founder); }));
        eprintln!("String (description): {}", count_until_finish(|s| { s.append(&account.description); }));
        eprintln!("Vec<u8> (code): {}", count_until_finish(|s| { s.append(&account.code); }));
        eprintln!("H256 (code_hash): {}", count_until_finish(|s| { s.append(&account.code_hash); }));
        eprintln!("u64 (code_size): {}", count_until_finish(|s| { s.append(&account.code_size); }));
    }
}
