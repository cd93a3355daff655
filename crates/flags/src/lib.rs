//! Remote flags for the sales worker.
//!
//! A [`FlagSource`] is the remote lookup; [`FlagCache`] wraps it with a
//! per-key TTL and is shared by every worker in the process. The site state
//! kill-switch is parsed from a flag value into [`SiteState`].

pub mod cache;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod site_state;
pub mod source;

pub use cache::{DEFAULT_TTL, FlagCache};
pub use error::{FlagError, Result};
pub use memory::InMemoryFlagSource;
pub use postgres::PostgresFlagSource;
pub use site_state::SiteState;
pub use source::FlagSource;
