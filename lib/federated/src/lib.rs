//! Federated OAuth2 authentication strategy.
//!
//! Establishes identity via an authorization-code exchange with the Entra ID
//! identity platform: the user is redirected to the provider, comes back with
//! a `code` and CSRF `state`, the code is exchanged server-to-server for an
//! access token, and the user profile and group memberships are read from the
//! Graph API. Group gating uses exact-match IDs via
//! [`GroupAllowList::permits_exact`](authgate_access::GroupAllowList::permits_exact).

pub mod client;
pub mod config;
pub mod error;
pub mod flow;

pub use client::{FederatedClient, TokenGrant};
pub use config::FederatedConfig;
pub use error::FederatedError;
pub use flow::{CallbackQuery, FederatedFlow};
