//! The multi-signature authority resolver.
//!
//! An account's authority set may delegate to other accounts, forming a DAG.
//! Each recovered signature carries a sign-index path naming which author
//! entry to follow at every account along the way; the resolver walks the
//! paths iteratively, accumulates the contributed weights per visited
//! account, and checks every visited account against its required threshold.

use std::collections::BTreeMap;

use meridian_common::action::Action;
use meridian_common::name::AccountName;
use primitive_types::H256;

use crate::author::Owner;
use crate::error::{AccountError, Result};
use crate::manager::AccountManager;
use crate::store::StateDb;

impl<S: StateDb> AccountManager<S> {
    /// Decides whether `action` is sufficiently signed.
    ///
    /// On success returns the author-version cache: each visited account's
    /// name paired with its `author_version` at verification time, sorted by
    /// name. The pipeline attaches it to the action so downstream consumers
    /// can assert the authority sets used for verification.
    pub fn authorize(&self, action: &Action) -> Result<Vec<(AccountName, H256)>> {
        if action.signers.len() > self.cfg.max_sign_length {
            return Err(AccountError::SignCountExceeded(self.cfg.max_sign_length));
        }

        // account -> author index -> weight. The inner map deduplicates: one
        // author entry contributes at most once however many paths cross it.
        let mut weights: BTreeMap<AccountName, BTreeMap<u64, u64>> = BTreeMap::new();
        let mut versions: BTreeMap<AccountName, H256> = BTreeMap::new();
        weights.entry(action.sender.clone()).or_default();

        for signer in &action.signers {
            if signer.index.is_empty() || signer.index.len() > self.cfg.max_sign_depth {
                return Err(AccountError::SignDepthExceeded(self.cfg.max_sign_depth));
            }

            let mut current = action.sender.clone();
            for (step, &idx) in signer.index.iter().enumerate() {
                let account = self.require_account(&current)?;
                versions.insert(current.clone(), account.author_version);

                // An out-of-range index means the authority set changed
                // between sign time and verify time.
                let author = account
                    .authors
                    .get(idx as usize)
                    .ok_or(AccountError::AuthorsModified)?;

                let last = step + 1 == signer.index.len();
                if last {
                    match &author.owner {
                        Owner::PublicKey(key) => {
                            if key != &signer.public_key {
                                return Err(AccountError::KeyMismatch);
                            }
                        }
                        Owner::Address(addr) => {
                            if signer.public_key.to_address() != *addr {
                                return Err(AccountError::AddressMismatch);
                            }
                        }
                        Owner::Account(_) => return Err(AccountError::AuthorsModified),
                    }
                    weights
                        .entry(current.clone())
                        .or_default()
                        .insert(idx, author.weight);
                } else {
                    let next = match author.owner.as_account() {
                        Some(next) => next.clone(),
                        None => return Err(AccountError::AuthorsModified),
                    };
                    weights
                        .entry(current.clone())
                        .or_default()
                        .insert(idx, author.weight);
                    current = next;
                }
            }
        }

        for (name, contributions) in &weights {
            let account = self.require_account(name)?;
            versions
                .entry(name.clone())
                .or_insert(account.author_version);

            let sum = contributions
                .values()
                .fold(0u64, |acc, w| acc.saturating_add(*w));
            let required = if action.action_type.is_author_update()
                && name == &action.sender
                && account.update_author_threshold != 0
            {
                account.update_author_threshold
            } else {
                account.threshold
            };
            if sum < required {
                return Err(AccountError::ThresholdNotMet(name.to_string()));
            }
        }

        Ok(versions.into_iter().collect())
    }
}
