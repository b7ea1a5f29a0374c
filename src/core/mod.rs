//! Core profile management functionality
//!
//! - [`profiles`]: Profile data model and the ordered profile store
//! - [`parser`]: Token-stream extraction of profiles from nftables.conf
//! - [`ruleset`]: Serialization of a store into nftables.conf text
//! - [`conf_file`]: Loading and atomically writing the configuration file
//! - [`apply`]: Loading the written file into the kernel with `nft -f`
//! - [`verify`]: Dry-run checks with `nft --check`
//! - [`error`]: Error types and nftables error translation

pub mod apply;
pub mod conf_file;
pub mod error;
pub mod parser;
pub mod profiles;
pub mod ruleset;
pub mod verify;

#[cfg(test)]
pub mod test_helpers;

#[cfg(test)]
mod tests;
