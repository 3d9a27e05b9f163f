use std::fmt;

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the hierarchical name grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The string does not match the name grammar.
    #[error("invalid name: {0}")]
    Invalid(String),
}

/// Bounds of the hierarchical name grammar.
///
/// A name is a root label followed by up to `max_levels` dot-separated
/// sub-labels: the root starts with a lowercase letter and continues with
/// lowercase letters and digits, sub-labels are lowercase letters and digits.
///
/// The same shape is used for account names and asset names; the two differ
/// only in their configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFormat {
    /// Minimum length of the root label.
    pub root_min: usize,
    /// Maximum length of the root label.
    pub root_max: usize,
    /// Maximum length of each sub-label.
    pub sub_max: usize,
    /// Maximum number of sub-levels below the root.
    pub max_levels: usize,
}

impl Default for NameFormat {
    fn default() -> Self {
        Self {
            root_min: 7,
            root_max: 16,
            sub_max: 8,
            max_levels: 1,
        }
    }
}

impl NameFormat {
    /// Format used for asset names: same shape as account names but with a
    /// shorter minimum root, so tickers like `usd` are representable.
    pub fn asset() -> Self {
        Self {
            root_min: 2,
            ..Self::default()
        }
    }

    /// Checks `s` against the grammar.
    pub fn is_valid(&self, s: &str) -> bool {
        self.parse(s).is_some()
    }

    /// Checks `s` against the grammar, reporting the offending string.
    pub fn validate(&self, s: &str) -> Result<(), NameError> {
        if self.is_valid(s) {
            Ok(())
        } else {
            Err(NameError::Invalid(s.to_owned()))
        }
    }

    /// Splits `s` into `(root, sub_labels)` if it matches the grammar.
    pub fn parse<'a>(&self, s: &'a str) -> Option<(&'a str, Vec<&'a str>)> {
        let mut parts = s.split('.');
        let root = parts.next()?;
        if root.len() < self.root_min || root.len() > self.root_max {
            return None;
        }
        let mut chars = root.chars();
        if !chars.next()?.is_ascii_lowercase() {
            return None;
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return None;
        }

        let subs: Vec<&str> = parts.collect();
        if subs.len() > self.max_levels {
            return None;
        }
        for sub in &subs {
            if sub.is_empty() || sub.len() > self.sub_max {
                return None;
            }
            if !sub
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            {
                return None;
            }
        }
        Some((root, subs))
    }

    /// True iff `child` is exactly one grammar level below `parent`.
    pub fn is_child_of(&self, parent: &str, child: &str) -> bool {
        if !self.is_valid(parent) || !self.is_valid(child) {
            return false;
        }
        match child.strip_prefix(parent) {
            Some(rest) => match rest.strip_prefix('.') {
                Some(label) => !label.is_empty() && !label.contains('.'),
                None => false,
            },
            None => false,
        }
    }
}

/// A hierarchical on-chain name.
///
/// The wrapper itself does not enforce the grammar; validation happens at the
/// action boundaries where a [`NameFormat`] is in scope. Wire decoding trusts
/// the store, the way every other persisted field does.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The empty name, used where a field is optional on the wire.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name one level up, if this name has any sub-levels.
    pub fn parent(&self) -> Option<AccountName> {
        self.0.rsplit_once('.').map(|(p, _)| AccountName::new(p))
    }

    /// The top-level label of this name.
    pub fn root(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Encodable for AccountName {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.0);
    }
}

impl Decodable for AccountName {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self(rlp.as_val::<String>()?))
    }
}
