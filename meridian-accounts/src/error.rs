use meridian_common::name::NameError;
use thiserror::Error;

/// Errors surfaced by the account and asset state core.
///
/// Validation, authorization, balance and most state errors are recoverable:
/// `process` rolls the store back to its pre-action snapshot and returns
/// them. Decode and store variants indicate corruption and are treated as
/// fatal by callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccountError {
    // --- validation ---
    #[error(transparent)]
    Name(#[from] NameError),
    #[error("invalid id: zero is reserved")]
    InvalidId,
    #[error("account {0} does not exist")]
    AccountNotExist(String),
    #[error("asset {0} does not exist")]
    AssetNotExist(u64),
    #[error("name {0} already exists")]
    NameIsExist(String),
    #[error("account {0} already exists")]
    AccountIsExist(String),
    #[error("account {0} may not perform this action")]
    AccountInvalid(String),
    #[error("account {0} may not issue asset {1}")]
    OwnerMismatch(String, String),
    #[error("invalid public key")]
    InvalidPubKey,

    // --- authorization ---
    #[error("recovered key does not match the author public key")]
    KeyMismatch,
    #[error("recovered key does not match the author address")]
    AddressMismatch,
    #[error("account {0} signing weight below threshold")]
    ThresholdNotMet(String),
    #[error("sign depth exceeds limit {0}")]
    SignDepthExceeded(usize),
    #[error("sign count exceeds limit {0}")]
    SignCountExceeded(usize),
    #[error("author set changed since signing")]
    AuthorsModified,

    // --- balance / supply ---
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("asset {0} not held")]
    AssetNotHeld(u64),
    #[error("asset {0} already held")]
    AssetAlreadyHeld(u64),
    #[error("amount overflow")]
    AmountOverflow,
    #[error("issue would exceed the asset upper limit")]
    UpperLimitExceeded,
    #[error("destroy exceeds total supply")]
    SupplyUnderflow,
    #[error("transfer of asset {0} not permitted by its contract")]
    AssetAccessDenied(u64),
    #[error("caller is not the asset founder")]
    NotAssetFounder,
    #[error("caller is not the asset owner")]
    NotAssetOwner,
    #[error("destroy is only permitted from the burn account")]
    NotBurnAccount,

    // --- state ---
    #[error("account {0} is destroyed")]
    AccountIsDestroyed(String),
    #[error("account counter missing")]
    CounterNotExist,
    #[error("author already exists")]
    AuthorExists,
    #[error("author not found")]
    AuthorNotFound,
    #[error("unknown action type")]
    UnknownTxType,

    // --- serialization / store ---
    #[error("decode failure: {0}")]
    Decode(#[from] rlp::DecoderError),
    #[error("store failure: {0}")]
    Store(String),
}

pub type Result<T, E = AccountError> = std::result::Result<T, E>;
