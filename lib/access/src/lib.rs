//! Group authorization, session state, and request outcomes for authgate.
//!
//! This crate is the strategy-neutral layer shared by both authentication
//! strategies:
//! - `GroupAllowList`: binary group-membership authorization
//! - `SessionStore` / `MemorySessionStore`: the per-session key-value seam
//! - `AuthOutcome`: the typed result of an authentication decision, which the
//!   outer request handler interprets instead of strategies terminating the
//!   request inline

pub mod allow_list;
pub mod outcome;
pub mod session;

pub use allow_list::GroupAllowList;
pub use outcome::{AuthOutcome, LoginForm, LoginSubmission};
pub use session::{
    DirectoryIdentity, DirectorySession, FederatedIdentity, FederatedSession, MemorySessionStore,
    SessionData, SessionId, SessionStore, generate_session_id,
};
