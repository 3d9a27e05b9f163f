use std::{fs, io, path::Path};

use meridian_common::name::{AccountName, NameFormat};
use serde::{Deserialize, Serialize};

/// Static configuration of the account core.
///
/// Threaded explicitly through [`AccountManager::new`](crate::AccountManager::new)
/// and the asset registry; there is no process-wide mutable state. Treat this
/// as a one-shot bootstrap value: changing the grammar bounds or the store
/// scopes after genesis changes the meaning of persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grammar bounds for account names.
    pub account_name_format: NameFormat,
    /// Grammar bounds for asset names (same shape, shorter roots).
    pub asset_name_format: NameFormat,
    /// Store scope holding account records, the name index and the counter.
    pub acct_manager_scope: String,
    /// Store scope holding the asset registry.
    pub asset_manager_scope: String,
    /// Chain root account, the mint source reported for issuance.
    pub chain_name: AccountName,
    /// System account funding newborn accounts.
    pub system_account: AccountName,
    /// Burn account; the only account assets may be destroyed from.
    pub asset_account: AccountName,
    /// Maximum number of recovered signatures per action.
    pub max_sign_length: usize,
    /// Maximum length of a sign-index path through the delegation graph.
    pub max_sign_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_name_format: NameFormat::default(),
            asset_name_format: NameFormat::asset(),
            acct_manager_scope: "sysAccount".to_string(),
            asset_manager_scope: "sysAsset".to_string(),
            chain_name: AccountName::new("meridian"),
            system_account: AccountName::new("meridian.account"),
            asset_account: AccountName::new("meridian.asset"),
            max_sign_length: 32,
            max_sign_depth: 10,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_system_names_are_valid() {
        let cfg = Config::default();
        assert!(cfg.account_name_format.is_valid(cfg.chain_name.as_str()));
        assert!(cfg
            .account_name_format
            .is_valid(cfg.system_account.as_str()));
        assert!(cfg.account_name_format.is_valid(cfg.asset_account.as_str()));
        assert!(cfg
            .account_name_format
            .is_child_of(cfg.chain_name.as_str(), cfg.system_account.as_str()));
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: Config = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.acct_manager_scope, cfg.acct_manager_scope);
        assert_eq!(back.max_sign_depth, cfg.max_sign_depth);
    }
}
