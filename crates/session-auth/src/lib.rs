//! Session credential library
//!
//! Holds everything that touches the credential pair directly: the redacted
//! `Token` type, durable key-value storage, the `CredentialStore` that owns
//! the persisted access/refresh pair, and the authorization endpoint calls
//! that mint new credentials. This crate knows nothing about request replay
//! or refresh coordination, which lives in `session-client`.
//!
//! Credential flow:
//! 1. Caller logs in via `token::login()` → `TokenResponse`
//! 2. Pair persisted via `CredentialStore::store_pair()`
//! 3. On expiry, `token::refresh()` trades the refresh token for a new pair
//! 4. Rotated tokens saved via `CredentialStore::rotate()`
//! 5. On logout or refresh denial, `CredentialStore::clear()` purges everything

pub mod constants;
pub mod credentials;
pub mod error;
pub mod secret;
pub mod storage;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialPair, CredentialStore, StorageKeys};
pub use error::{Error, Result};
pub use secret::Token;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageFuture};
pub use token::{TokenResponse, login, logout, refresh};
