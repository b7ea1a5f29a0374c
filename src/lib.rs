//! nftprof - nftables profile manager
//!
//! Keeps named firewall profiles (allowed source addresses, allowed TCP ports
//! and a comment) in `/etc/nftables.conf` and loads that file with `nft -f`.
//!
//! # Architecture
//!
//! - [`core`] - Profile store, config parsing/serialization, nftables interaction
//! - [`audit`] - Audit logging for all mutating and privileged operations
//! - [`validators`] - Operator input validation
//! - [`config`] - Application settings persistence
//! - [`elevation`] - Privilege escalation for `nft` and file installs
//! - [`formatting`] - Terminal output (profile table, diffs)
//! - [`utils`] - Utility functions (XDG directories, terminal detection)

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

pub mod audit;
pub mod config;
pub mod core;
pub mod elevation;
pub mod formatting;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use crate::core::error::{Error, Result};
pub use crate::core::profiles::{Profile, ProfileStore};
