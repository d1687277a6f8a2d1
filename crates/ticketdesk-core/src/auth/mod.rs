//! Authentication state shared by every request.
//!
//! This module provides:
//! - `CredentialStore`: single-slot bearer token over a pluggable storage backend
//! - `SessionProvider`: async session lookup, sign-in and sign-out
//! - `UnauthorizedBridge`: publish/subscribe signal for 401 responses
//! - `RedirectHandler`: clears credentials and navigates to login once per episode

pub mod redirect;
pub mod session;
pub mod token_store;
pub mod unauthorized;

pub use redirect::{MountError, MountedRedirectHandler, Navigator, RedirectHandler, RedirectState};
pub use session::{FileSessionProvider, NoSession, Role, Session, SessionData, SessionError, SessionProvider};
pub use token_store::{
    Credential, CredentialStore, FileStorage, KeyringStorage, MemoryStorage, StorageBackend, StorageError,
};
pub use unauthorized::{Subscription, UnauthorizedBridge};
