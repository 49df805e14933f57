//! Secret synchronization between the remote store and the local cache.
//!
//! The remote store is authoritative for which secrets exist but never returns
//! values; the local cache holds plaintext for every secret written through
//! this service.
//!
//! ## Write path
//!
//! ```text
//! upsert(name, value)
//!   1. remote.recipient_key()          -- RemoteError aborts
//!   2. crypto::seal_base64()           -- CryptoError aborts
//!   3. remote.put_sealed_secret()      -- RemoteError aborts
//!   4. store.upsert()                  -- local plaintext cache
//!   5. audit.append("updated")
//! ```
//!
//! Nothing local is touched until the remote write has succeeded. A failure in
//! step 4 or 5 leaves the remote changed and the cache unknown; callers re-list
//! to reconcile.

mod sync;

pub use sync::{MergedSecretView, Synchronizer};

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Validation(String),

    #[error("Remote secret store request failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Failed to seal secret value: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Local secret store failed: {0}")]
    Store(String),
}
