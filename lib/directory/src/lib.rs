//! Directory-bind authentication strategy.
//!
//! Establishes identity against an LDAP directory (Active Directory in
//! practice): a service bind locates the unique entry for the submitted
//! username, a rebind as that entry checks the password, and the entry's
//! `memberOf` values gate access. Group gating uses loose case-insensitive
//! substring matching via
//! [`GroupAllowList::permits_contains`](authgate_access::GroupAllowList::permits_contains).

pub mod client;
pub mod config;
pub mod error;
pub mod flow;

pub use client::{DirectoryClient, UserRecord};
pub use config::DirectoryConfig;
pub use error::DirectoryError;
pub use flow::DirectoryFlow;
