use meridian_common::action::{Action, ActionType, InternalAction};
use meridian_common::crypto::PubKey;
use meridian_common::name::AccountName;
use primitive_types::{H256, U256};

use crate::account::Account;
use crate::asset::{AssetObject, AssetRegistry};
use crate::author::AuthorOp;
use crate::config::Config;
use crate::error::{AccountError, Result};
use crate::payload::{
    CreateAccountPayload, IncreaseAssetPayload, IssueAssetPayload, SetAssetOwnerPayload,
    UpdateAccountPayload, UpdateAssetPayload, UpdateAuthorPayload,
};
use crate::store::{SnapshotReader, StateDb};

/// Account ids start above this value; everything at or below it is reserved
/// for system use.
pub const ACCOUNT_COUNTER_SEED: u64 = 4096;

const ACCOUNT_COUNTER_KEY: &[u8] = b"accountCounter";
const ACCOUNT_NAME_ID_PREFIX: &[u8] = b"accountNameId";
const ACCOUNT_INFO_PREFIX: &[u8] = b"acctInfo";
// Destroyed records are additionally written under `name || "acctInfo"`.
// The inverted key shape is observable by existing readers; keep it.
const DESTROYED_INFO_SUFFIX: &[u8] = b"acctInfo";

/// The account and asset state manager.
///
/// Single entry point for every mutation a transaction may make to accounts
/// and assets. Single-threaded by design: the execution layer feeds actions
/// one at a time, and each [`AccountManager::process`] call either commits or
/// reverts to its own snapshot.
pub struct AccountManager<S: StateDb> {
    pub(crate) db: S,
    pub(crate) cfg: Config,
    pub(crate) assets: AssetRegistry,
    pub(crate) block_number: u64,
}

impl<S: StateDb> AccountManager<S> {
    /// Wraps a store, seeding the account counter on first use.
    pub fn new(db: S, cfg: Config) -> Result<Self> {
        let assets = AssetRegistry::new(&cfg);
        let mut manager = Self {
            db,
            cfg,
            assets,
            block_number: 0,
        };
        if manager
            .db
            .get(&manager.cfg.acct_manager_scope, ACCOUNT_COUNTER_KEY)?
            .is_none()
        {
            manager.db.put(
                &manager.cfg.acct_manager_scope,
                ACCOUNT_COUNTER_KEY,
                rlp::encode(&ACCOUNT_COUNTER_SEED).to_vec(),
            )?;
        }
        Ok(manager)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    pub fn db(&self) -> &S {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut S {
        &mut self.db
    }

    /// Height stamped onto newly issued assets; the execution layer updates
    /// it once per block.
    pub fn set_block_number(&mut self, number: u64) {
        self.block_number = number;
    }

    fn info_key(id: u64) -> Vec<u8> {
        let mut key = ACCOUNT_INFO_PREFIX.to_vec();
        key.extend_from_slice(id.to_string().as_bytes());
        key
    }

    fn name_key(name: &AccountName) -> Vec<u8> {
        let mut key = ACCOUNT_NAME_ID_PREFIX.to_vec();
        key.extend_from_slice(name.as_str().as_bytes());
        key
    }

    fn destroyed_key(name: &AccountName) -> Vec<u8> {
        let mut key = name.as_str().as_bytes().to_vec();
        key.extend_from_slice(DESTROYED_INFO_SUFFIX);
        key
    }

    // --- reads ---

    pub fn account_counter(&self) -> Result<u64> {
        match self
            .db
            .get(&self.cfg.acct_manager_scope, ACCOUNT_COUNTER_KEY)?
        {
            Some(bytes) => Ok(rlp::decode(&bytes)?),
            None => Err(AccountError::CounterNotExist),
        }
    }

    pub fn account_id_by_name(&self, name: &AccountName) -> Result<Option<u64>> {
        match self
            .db
            .get(&self.cfg.acct_manager_scope, &Self::name_key(name))?
        {
            Some(bytes) => Ok(Some(rlp::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn account_by_id(&self, id: u64) -> Result<Option<Account>> {
        if id == 0 {
            return Err(AccountError::InvalidId);
        }
        match self
            .db
            .get(&self.cfg.acct_manager_scope, &Self::info_key(id))?
        {
            Some(bytes) => Ok(Some(rlp::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn account_by_name(&self, name: &AccountName) -> Result<Option<Account>> {
        match self.account_id_by_name(name)? {
            Some(id) => self.account_by_id(id),
            None => Ok(None),
        }
    }

    pub fn account_is_exist(&self, name: &AccountName) -> Result<bool> {
        Ok(self.account_id_by_name(name)?.is_some())
    }

    pub(crate) fn require_account(&self, name: &AccountName) -> Result<Account> {
        self.account_by_name(name)?
            .ok_or_else(|| AccountError::AccountNotExist(name.to_string()))
    }

    /// Loads an account that is about to be mutated; destroyed records reject
    /// every mutation.
    pub(crate) fn require_live(&self, name: &AccountName) -> Result<Account> {
        let account = self.require_account(name)?;
        if account.is_destroyed() {
            return Err(AccountError::AccountIsDestroyed(name.to_string()));
        }
        Ok(account)
    }

    pub(crate) fn save_account(&mut self, account: &Account) -> Result<()> {
        self.db.put(
            &self.cfg.acct_manager_scope,
            &Self::info_key(account.id),
            rlp::encode(account).to_vec(),
        )
    }

    // --- account lifecycle ---

    /// Creates and persists a fresh account. Name-grammar, collision and
    /// founder rules are enforced here; the parent/child rule lives in the
    /// action handler because it needs the sender.
    pub fn create_account(
        &mut self,
        name: AccountName,
        founder: AccountName,
        public_key: PubKey,
        description: String,
    ) -> Result<Account> {
        self.cfg.account_name_format.validate(name.as_str())?;
        if self.account_is_exist(&name)? {
            return Err(AccountError::AccountIsExist(name.to_string()));
        }
        if self.assets.asset_id_by_name(&self.db, &name)?.is_some() {
            return Err(AccountError::NameIsExist(name.to_string()));
        }
        if public_key.is_empty() {
            return Err(AccountError::InvalidPubKey);
        }

        let founder = if founder.is_empty() || founder == name {
            name.clone()
        } else {
            self.require_account(&founder)?;
            founder
        };

        let id = self.account_counter()? + 1;
        let account = Account::new(id, name.clone(), founder, public_key, description);
        self.save_account(&account)?;

        // The counter is rewritten with the new account's encoded id. The
        // bytes are identical to the re-encoded counter, and the name index
        // shares them.
        let id_bytes = rlp::encode(&id).to_vec();
        self.db.put(
            &self.cfg.acct_manager_scope,
            &Self::name_key(&name),
            id_bytes.clone(),
        )?;
        self.db
            .put(&self.cfg.acct_manager_scope, ACCOUNT_COUNTER_KEY, id_bytes)?;

        tracing::info!(account = %name, id, "created account");
        Ok(account)
    }

    /// Marks an account destroyed, keeping its record for audit. The record
    /// is also written under the legacy destroyed-record key.
    pub fn delete_account(&mut self, name: &AccountName) -> Result<()> {
        let mut account = self.require_live(name)?;
        account.set_destroy();
        self.db.put(
            &self.cfg.acct_manager_scope,
            &Self::destroyed_key(name),
            rlp::encode(&account).to_vec(),
        )?;
        self.save_account(&account)?;
        tracing::info!(account = %name, "destroyed account");
        Ok(())
    }

    // --- per-field accessors ---

    pub fn get_nonce(&self, name: &AccountName) -> Result<u64> {
        Ok(self.require_account(name)?.nonce)
    }

    pub fn set_nonce(&mut self, name: &AccountName, nonce: u64) -> Result<()> {
        let mut account = self.require_live(name)?;
        account.nonce = nonce;
        self.save_account(&account)
    }

    pub fn get_code(&self, name: &AccountName) -> Result<Vec<u8>> {
        Ok(self.require_account(name)?.code().to_vec())
    }

    pub fn set_code(&mut self, name: &AccountName, code: Vec<u8>) -> Result<()> {
        let mut account = self.require_live(name)?;
        account.set_code(code);
        self.save_account(&account)
    }

    pub fn get_code_hash(&self, name: &AccountName) -> Result<H256> {
        Ok(self.require_account(name)?.code_hash())
    }

    pub fn get_code_size(&self, name: &AccountName) -> Result<u64> {
        Ok(self.require_account(name)?.code_size())
    }

    /// Height of the last change to the account.
    pub fn account_last_change(&self, name: &AccountName) -> Result<u64> {
        let _ = self.require_account(name)?;
        // TODO: wire this to the store's per-key change log once that log is
        // exposed through the StateDb trait.
        Ok(0)
    }

    // --- balances ---

    pub fn get_balance(&self, name: &AccountName, asset_id: u64) -> Result<U256> {
        self.require_account(name)?.balance(asset_id)
    }

    /// The balance of `asset_id` plus the balances of every child asset name
    /// held by the account. Iteration order over the balance map is fixed, so
    /// the fold is deterministic.
    pub fn get_all_balance_by_asset_id(&self, name: &AccountName, asset_id: u64) -> Result<U256> {
        let account = self.require_account(name)?;
        let target = self
            .assets
            .asset_by_id(&self.db, asset_id)?
            .ok_or(AccountError::AssetNotExist(asset_id))?;
        let format = self.assets.name_format();

        let mut total = U256::zero();
        for (held_id, amount) in account.enumerate_balances() {
            let include = if held_id == asset_id {
                true
            } else {
                match self.assets.asset_by_id(&self.db, held_id)? {
                    Some(held) => format
                        .is_child_of(target.asset_name.as_str(), held.asset_name.as_str()),
                    None => false,
                }
            };
            if include {
                total = total
                    .checked_add(amount)
                    .ok_or(AccountError::AmountOverflow)?;
            }
        }
        Ok(total)
    }

    /// Moves `(asset_id, value)` between accounts. Zero value and
    /// self-transfer are no-ops; the recipient must exist and be live, and
    /// its first-ever touch of the asset inserts the balance entry.
    pub fn transfer_asset(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        asset_id: u64,
        value: U256,
    ) -> Result<()> {
        if value.is_zero() || from == to {
            return Ok(());
        }
        if asset_id == 0 {
            return Err(AccountError::InvalidId);
        }

        let mut from_account = self.require_live(from)?;
        self.assets.has_access(&self.db, asset_id, from, to)?;
        let mut to_account = self.require_live(to)?;

        from_account.sub_balance(asset_id, value)?;
        if to_account.has_asset(asset_id) {
            to_account.add_balance(asset_id, value)?;
        } else {
            to_account.add_new_asset(asset_id, value)?;
        }

        self.save_account(&from_account)?;
        self.save_account(&to_account)?;
        tracing::debug!(%from, %to, asset_id, %value, "transferred");
        Ok(())
    }

    // --- the action pipeline ---

    /// Executes one action inside a snapshot boundary: on any error the store
    /// is reverted to its pre-action state before the error is returned.
    pub fn process(&mut self, action: &mut Action) -> Result<Vec<InternalAction>> {
        let token = self.db.snapshot();
        match self.apply(action) {
            Ok(internal) => {
                tracing::debug!(
                    action = ?action.action_type,
                    sender = %action.sender,
                    "processed action"
                );
                Ok(internal)
            }
            Err(err) => {
                tracing::warn!(
                    action = ?action.action_type,
                    sender = %action.sender,
                    %err,
                    "action failed, reverting"
                );
                self.db.revert_to_snapshot(token);
                Err(err)
            }
        }
    }

    fn apply(&mut self, action: &mut Action) -> Result<Vec<InternalAction>> {
        action.author_versions = self.authorize(action)?;

        // Every action starts with the implicit value transfer.
        self.transfer_asset(
            &action.sender,
            &action.recipient,
            action.asset_id,
            action.value,
        )?;

        match action.action_type {
            ActionType::CreateAccount => self.handle_create_account(action),
            ActionType::UpdateAccount => self.handle_update_account(action),
            ActionType::UpdateAccountAuthor => self.handle_update_author(action),
            ActionType::IssueAsset => self.handle_issue_asset(action),
            ActionType::IncreaseAsset => self.handle_increase_asset(action),
            ActionType::DestroyAsset => self.handle_destroy_asset(action),
            ActionType::UpdateAsset => self.handle_update_asset(action),
            ActionType::SetAssetOwner => self.handle_set_asset_owner(action),
            ActionType::Transfer => Ok(Vec::new()),
            ActionType::CreateContract | ActionType::CallContract => {
                Err(AccountError::UnknownTxType)
            }
        }
    }

    fn handle_create_account(&mut self, action: &Action) -> Result<Vec<InternalAction>> {
        let payload: CreateAccountPayload = rlp::decode(&action.data)?;
        let name = payload.account_name;

        if name.parent().is_some()
            && !self
                .cfg
                .account_name_format
                .is_child_of(action.sender.as_str(), name.as_str())
        {
            return Err(AccountError::AccountInvalid(action.sender.to_string()));
        }

        self.create_account(
            name.clone(),
            payload.founder,
            payload.public_key,
            payload.description,
        )?;

        let mut internal = Vec::new();
        if !action.value.is_zero() {
            let funding_source = self.cfg.system_account.clone();
            self.transfer_asset(&funding_source, &name, action.asset_id, action.value)?;
            internal.push(InternalAction {
                action_type: ActionType::Transfer,
                from: funding_source,
                to: name,
                asset_id: action.asset_id,
                value: action.value,
            });
        }
        Ok(internal)
    }

    fn handle_update_account(&mut self, action: &Action) -> Result<Vec<InternalAction>> {
        let payload: UpdateAccountPayload = rlp::decode(&action.data)?;
        let mut account = self.require_live(&action.sender)?;

        account.founder = if payload.founder.is_empty() {
            account.name.clone()
        } else {
            self.require_account(&payload.founder)?;
            payload.founder
        };
        self.save_account(&account)?;
        Ok(Vec::new())
    }

    fn handle_update_author(&mut self, action: &Action) -> Result<Vec<InternalAction>> {
        let payload: UpdateAuthorPayload = rlp::decode(&action.data)?;
        let mut account = self.require_live(&action.sender)?;

        for step in payload.author_actions {
            match step.op {
                AuthorOp::Add => account.add_author(step.author)?,
                AuthorOp::Update => account.update_author(step.author)?,
                AuthorOp::Delete => account.delete_author(&step.author.owner)?,
            }
        }
        if payload.threshold != 0 {
            account.set_threshold(payload.threshold);
        }
        if payload.update_author_threshold != 0 {
            account.set_update_author_threshold(payload.update_author_threshold);
        }
        account.recompute_author_version();
        self.save_account(&account)?;
        Ok(Vec::new())
    }

    fn handle_issue_asset(&mut self, action: &Action) -> Result<Vec<InternalAction>> {
        let payload: IssueAssetPayload = rlp::decode(&action.data)?;

        self.require_account(&payload.owner)?;
        let founder = if payload.founder.is_empty() {
            payload.owner.clone()
        } else {
            self.require_account(&payload.founder)?;
            payload.founder
        };
        if !payload.contract.is_empty() {
            self.cfg
                .account_name_format
                .validate(payload.contract.as_str())?;
        }
        if self.account_is_exist(&payload.asset_name)? {
            return Err(AccountError::NameIsExist(payload.asset_name.to_string()));
        }
        if !self
            .assets
            .is_valid_owner(&self.db, &action.sender, &payload.asset_name)?
        {
            return Err(AccountError::OwnerMismatch(
                action.sender.to_string(),
                payload.asset_name.to_string(),
            ));
        }

        let asset = AssetObject {
            asset_id: 0,
            asset_name: payload.asset_name,
            symbol: payload.symbol,
            amount: payload.amount,
            decimals: payload.decimals,
            founder,
            owner: payload.owner.clone(),
            add_issue: U256::zero(),
            upper_limit: payload.upper_limit,
            contract: payload.contract,
            description: payload.description,
            block_number: self.block_number,
        };
        let asset_id = self.assets.issue(&mut self.db, asset)?;

        let mut owner_account = self.require_live(&payload.owner)?;
        owner_account.add_new_asset(asset_id, payload.amount)?;
        self.save_account(&owner_account)?;

        Ok(vec![InternalAction {
            action_type: ActionType::IssueAsset,
            from: self.cfg.chain_name.clone(),
            to: payload.owner,
            asset_id,
            value: payload.amount,
        }])
    }

    fn handle_increase_asset(&mut self, action: &Action) -> Result<Vec<InternalAction>> {
        let payload: IncreaseAssetPayload = rlp::decode(&action.data)?;

        self.assets
            .increase(&mut self.db, &action.sender, payload.asset_id, payload.amount)?;

        let mut to_account = self.require_live(&payload.to)?;
        if to_account.has_asset(payload.asset_id) {
            to_account.add_balance(payload.asset_id, payload.amount)?;
        } else {
            to_account.add_new_asset(payload.asset_id, payload.amount)?;
        }
        self.save_account(&to_account)?;

        Ok(vec![InternalAction {
            action_type: ActionType::IncreaseAsset,
            from: self.cfg.chain_name.clone(),
            to: payload.to,
            asset_id: payload.asset_id,
            value: payload.amount,
        }])
    }

    fn handle_destroy_asset(&mut self, action: &Action) -> Result<Vec<InternalAction>> {
        if action.value.is_zero() {
            return Ok(Vec::new());
        }
        let burn_account = self.cfg.asset_account.clone();

        let mut burned = self.require_live(&burn_account)?;
        burned.sub_balance(action.asset_id, action.value)?;
        self.save_account(&burned)?;

        self.assets
            .destroy(&mut self.db, &burn_account, action.asset_id, action.value)?;

        Ok(vec![InternalAction {
            action_type: ActionType::DestroyAsset,
            from: burn_account,
            to: AccountName::empty(),
            asset_id: action.asset_id,
            value: action.value,
        }])
    }

    fn handle_update_asset(&mut self, action: &Action) -> Result<Vec<InternalAction>> {
        let payload: UpdateAssetPayload = rlp::decode(&action.data)?;
        let asset = self
            .assets
            .asset_by_id(&self.db, payload.asset_id)?
            .ok_or(AccountError::AssetNotExist(payload.asset_id))?;

        let founder = if payload.founder.is_empty() {
            asset.owner
        } else {
            self.require_account(&payload.founder)?;
            payload.founder
        };
        self.assets
            .update(&mut self.db, &action.sender, payload.asset_id, founder)?;
        Ok(Vec::new())
    }

    fn handle_set_asset_owner(&mut self, action: &Action) -> Result<Vec<InternalAction>> {
        let payload: SetAssetOwnerPayload = rlp::decode(&action.data)?;
        self.require_account(&payload.owner)?;
        self.assets
            .set_owner(&mut self.db, &action.sender, payload.asset_id, payload.owner)?;
        Ok(Vec::new())
    }
}

impl<S: StateDb + SnapshotReader> AccountManager<S> {
    /// The account record as of the last snapshot at or before `time`.
    pub fn account_by_time(&self, name: &AccountName, time: u64) -> Result<Option<Account>> {
        let id = match self.account_id_by_name(name)? {
            Some(id) => id,
            None => return Ok(None),
        };
        match self
            .db
            .snapshot_msg(&self.cfg.acct_manager_scope, &Self::info_key(id), time)?
        {
            Some(bytes) => Ok(Some(rlp::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn balance_by_time(&self, name: &AccountName, asset_id: u64, time: u64) -> Result<U256> {
        self.account_by_time(name, time)?
            .ok_or_else(|| AccountError::AccountNotExist(name.to_string()))?
            .balance(asset_id)
    }

    pub fn asset_amount_by_time(&self, asset_id: u64, time: u64) -> Result<U256> {
        self.assets.get_amount_at(&self.db, asset_id, time)
    }
}
