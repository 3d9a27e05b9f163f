use meridian_common::name::{AccountName, NameFormat};
use primitive_types::U256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AccountError, Result};
use crate::store::{SnapshotReader, StateDb};

const ASSET_COUNTER_KEY: &[u8] = b"assetCounter";
const ASSET_NAME_ID_PREFIX: &[u8] = b"assetName";
const ASSET_INFO_PREFIX: &[u8] = b"assetInfo";

/// A registered fungible asset.
///
/// `amount` is the current total supply: issuance and increases add to it,
/// destruction subtracts. `add_issue` is the cumulative issued amount, which
/// is what the upper limit bounds. An `upper_limit` of zero means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    pub asset_id: u64,
    pub asset_name: AccountName,
    pub symbol: String,
    pub amount: U256,
    pub decimals: u64,
    pub founder: AccountName,
    pub owner: AccountName,
    pub add_issue: U256,
    pub upper_limit: U256,
    /// Gating contract account; empty means transfers are unrestricted.
    pub contract: AccountName,
    pub description: String,
    /// Block height the asset was issued at.
    pub block_number: u64,
}

// Field order below is wire-stable.
impl Encodable for AssetObject {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(12);
        s.append(&self.asset_id);
        s.append(&self.asset_name);
        s.append(&self.symbol);
        s.append(&self.amount);
        s.append(&self.decimals);
        s.append(&self.founder);
        s.append(&self.owner);
        s.append(&self.add_issue);
        s.append(&self.upper_limit);
        s.append(&self.contract);
        s.append(&self.description);
        s.append(&self.block_number);
    }
}

impl Decodable for AssetObject {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self {
            asset_id: rlp.val_at(0)?,
            asset_name: rlp.val_at(1)?,
            symbol: rlp.val_at(2)?,
            amount: rlp.val_at(3)?,
            decimals: rlp.val_at(4)?,
            founder: rlp.val_at(5)?,
            owner: rlp.val_at(6)?,
            add_issue: rlp.val_at(7)?,
            upper_limit: rlp.val_at(8)?,
            contract: rlp.val_at(9)?,
            description: rlp.val_at(10)?,
            block_number: rlp.val_at(11)?,
        })
    }
}

/// The asset registry: name↔id mapping, supply accounting and the
/// owner/founder/contract permission checks, persisted in its own store
/// scope.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    scope: String,
    format: NameFormat,
    burn_account: AccountName,
}

impl AssetRegistry {
    pub fn new(cfg: &Config) -> Self {
        Self {
            scope: cfg.asset_manager_scope.clone(),
            format: cfg.asset_name_format,
            burn_account: cfg.asset_account.clone(),
        }
    }

    pub fn name_format(&self) -> &NameFormat {
        &self.format
    }

    fn info_key(asset_id: u64) -> Vec<u8> {
        let mut key = ASSET_INFO_PREFIX.to_vec();
        key.extend_from_slice(asset_id.to_string().as_bytes());
        key
    }

    fn name_key(name: &str) -> Vec<u8> {
        let mut key = ASSET_NAME_ID_PREFIX.to_vec();
        key.extend_from_slice(name.as_bytes());
        key
    }

    fn counter<S: StateDb>(&self, db: &S) -> Result<u64> {
        match db.get(&self.scope, ASSET_COUNTER_KEY)? {
            Some(bytes) => Ok(rlp::decode(&bytes)?),
            None => Ok(0),
        }
    }

    fn save<S: StateDb>(&self, db: &mut S, asset: &AssetObject) -> Result<()> {
        db.put(
            &self.scope,
            &Self::info_key(asset.asset_id),
            rlp::encode(asset).to_vec(),
        )
    }

    pub fn asset_id_by_name<S: StateDb>(&self, db: &S, name: &AccountName) -> Result<Option<u64>> {
        match db.get(&self.scope, &Self::name_key(name.as_str()))? {
            Some(bytes) => Ok(Some(rlp::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn asset_by_id<S: StateDb>(&self, db: &S, asset_id: u64) -> Result<Option<AssetObject>> {
        if asset_id == 0 {
            return Err(AccountError::InvalidId);
        }
        match db.get(&self.scope, &Self::info_key(asset_id))? {
            Some(bytes) => Ok(Some(rlp::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn asset_by_name<S: StateDb>(
        &self,
        db: &S,
        name: &AccountName,
    ) -> Result<Option<AssetObject>> {
        match self.asset_id_by_name(db, name)? {
            Some(id) => self.asset_by_id(db, id),
            None => Ok(None),
        }
    }

    fn require<S: StateDb>(&self, db: &S, asset_id: u64) -> Result<AssetObject> {
        self.asset_by_id(db, asset_id)?
            .ok_or(AccountError::AssetNotExist(asset_id))
    }

    /// Registers a new asset and returns its id. The caller has already
    /// checked that the name does not collide with an account and that the
    /// sender may issue it.
    pub fn issue<S: StateDb>(&self, db: &mut S, mut asset: AssetObject) -> Result<u64> {
        self.format.validate(asset.asset_name.as_str())?;
        if self.asset_id_by_name(db, &asset.asset_name)?.is_some() {
            return Err(AccountError::NameIsExist(asset.asset_name.to_string()));
        }
        if !asset.upper_limit.is_zero() && asset.amount > asset.upper_limit {
            return Err(AccountError::UpperLimitExceeded);
        }

        let asset_id = self.counter(db)? + 1;
        asset.asset_id = asset_id;
        asset.add_issue = asset.amount;

        db.put(
            &self.scope,
            ASSET_COUNTER_KEY,
            rlp::encode(&asset_id).to_vec(),
        )?;
        db.put(
            &self.scope,
            &Self::name_key(asset.asset_name.as_str()),
            rlp::encode(&asset_id).to_vec(),
        )?;
        self.save(db, &asset)?;
        tracing::info!(asset = %asset.asset_name, id = asset_id, "issued asset");
        Ok(asset_id)
    }

    /// Mints `delta` more of an existing asset. Founder-gated; the cumulative
    /// issued amount must stay within the upper limit.
    pub fn increase<S: StateDb>(
        &self,
        db: &mut S,
        caller: &AccountName,
        asset_id: u64,
        delta: U256,
    ) -> Result<()> {
        let mut asset = self.require(db, asset_id)?;
        if &asset.founder != caller {
            return Err(AccountError::NotAssetFounder);
        }
        let add_issue = asset
            .add_issue
            .checked_add(delta)
            .ok_or(AccountError::AmountOverflow)?;
        if !asset.upper_limit.is_zero() && add_issue > asset.upper_limit {
            return Err(AccountError::UpperLimitExceeded);
        }
        asset.add_issue = add_issue;
        asset.amount = asset
            .amount
            .checked_add(delta)
            .ok_or(AccountError::AmountOverflow)?;
        self.save(db, &asset)
    }

    /// Burns `value` of total supply. Only the designated burn account may
    /// destroy.
    pub fn destroy<S: StateDb>(
        &self,
        db: &mut S,
        caller: &AccountName,
        asset_id: u64,
        value: U256,
    ) -> Result<()> {
        if caller != &self.burn_account {
            return Err(AccountError::NotBurnAccount);
        }
        let mut asset = self.require(db, asset_id)?;
        asset.amount = asset
            .amount
            .checked_sub(value)
            .ok_or(AccountError::SupplyUnderflow)?;
        self.save(db, &asset)
    }

    /// Owner-gated founder change.
    pub fn update<S: StateDb>(
        &self,
        db: &mut S,
        caller: &AccountName,
        asset_id: u64,
        founder: AccountName,
    ) -> Result<()> {
        let mut asset = self.require(db, asset_id)?;
        if &asset.owner != caller {
            return Err(AccountError::NotAssetOwner);
        }
        asset.founder = founder;
        self.save(db, &asset)
    }

    /// Owner-gated ownership transfer.
    pub fn set_owner<S: StateDb>(
        &self,
        db: &mut S,
        caller: &AccountName,
        asset_id: u64,
        owner: AccountName,
    ) -> Result<()> {
        let mut asset = self.require(db, asset_id)?;
        if &asset.owner != caller {
            return Err(AccountError::NotAssetOwner);
        }
        asset.owner = owner;
        self.save(db, &asset)
    }

    /// Transfer capability check: a contract-gated asset only moves through
    /// its contract account.
    pub fn has_access<S: StateDb>(
        &self,
        db: &S,
        asset_id: u64,
        from: &AccountName,
        to: &AccountName,
    ) -> Result<()> {
        let asset = self.require(db, asset_id)?;
        if asset.contract.is_empty() || &asset.contract == from || &asset.contract == to {
            Ok(())
        } else {
            Err(AccountError::AssetAccessDenied(asset_id))
        }
    }

    /// Whether `name` may issue an asset called `asset_name`: root names are
    /// open, sub-asset names require owning the parent asset.
    pub fn is_valid_owner<S: StateDb>(
        &self,
        db: &S,
        name: &AccountName,
        asset_name: &AccountName,
    ) -> Result<bool> {
        self.format.validate(asset_name.as_str())?;
        let parent = match asset_name.parent() {
            Some(parent) => parent,
            None => return Ok(true),
        };
        match self.asset_by_name(db, &parent)? {
            Some(parent_asset) => Ok(&parent_asset.owner == name),
            None => Ok(false),
        }
    }

    /// Total supply at or before `time`, zero if the asset did not exist yet.
    pub fn get_amount_at<R: SnapshotReader>(
        &self,
        reader: &R,
        asset_id: u64,
        time: u64,
    ) -> Result<U256> {
        if asset_id == 0 {
            return Err(AccountError::InvalidId);
        }
        match reader.snapshot_msg(&self.scope, &Self::info_key(asset_id), time)? {
            Some(bytes) => {
                let asset: AssetObject = rlp::decode(&bytes)?;
                Ok(asset.amount)
            }
            None => Ok(U256::zero()),
        }
    }
}
