//! Privilege elevation for system operations
//!
//! nftprof runs as whatever user invokes it and only elevates for specific
//! operations:
//!
//! - **nft**: listing, checking and loading rulesets
//! - **install**: writing the configuration file to a system location the
//!   invoking user cannot write (e.g. `/etc/nftables.conf`)
//!
//! # Elevation Strategy
//!
//! - **Root**: commands run directly
//! - **Preferred**: `run0` when available (systemd v256+, no SUID)
//! - **Terminal fallback**: `sudo`
//! - **No terminal**: `pkexec`
//!
//! # Environment Variables
//!
//! - `NFTPROF_ELEVATION_METHOD`: Force a specific elevation method (`sudo`, `run0`, or `pkexec`).
//!   Useful for scripts with sudoers NOPASSWD rules.
//! - `NFTPROF_NO_ELEVATION`: Bypass elevation entirely (for testing only).
//!
//! # Security
//!
//! - Only specific programs can be elevated (nft, install)
//! - Commands are constructed without shell interpolation

use std::io;
use tokio::process::Command;

/// Forces a specific elevation method
pub const ELEVATION_METHOD_ENV: &str = "NFTPROF_ELEVATION_METHOD";

/// Disables elevation (tests and already-privileged wrappers)
pub const NO_ELEVATION_ENV: &str = "NFTPROF_NO_ELEVATION";

/// Error type for privilege elevation operations
#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    /// pkexec binary not found in PATH
    #[error("pkexec not found - please install PolicyKit or run from a terminal")]
    PkexecNotFound,

    /// Requested elevation method is not available (binary not found)
    #[error("Elevation method '{0}' is not available (binary not found)")]
    MethodNotAvailable(String),

    /// Invalid value for `NFTPROF_ELEVATION_METHOD`
    #[error("Invalid NFTPROF_ELEVATION_METHOD '{0}'. Valid options: sudo, run0, pkexec")]
    InvalidMethod(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Checks if a binary exists in PATH
fn binary_exists(name: &str) -> bool {
    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths).find_map(|dir| {
                let full_path = dir.join(name);
                if full_path.is_file() {
                    Some(full_path)
                } else {
                    None
                }
            })
        })
        .is_some()
}

fn wrapped(wrapper: &str, program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(wrapper);
    cmd.arg(program).args(args);
    cmd
}

/// Builds an elevated command for an approved program.
///
/// Not exposed publicly - callers use [`create_elevated_nft_command`] or
/// [`create_elevated_install_command`].
fn build_elevated_command(program: &str, args: &[&str]) -> Result<Command, ElevationError> {
    // 1. Test mode and direct root execution need no wrapper
    if std::env::var_os(NO_ELEVATION_ENV).is_some() || crate::utils::is_root() {
        let mut cmd = Command::new(program);
        cmd.args(args);
        return Ok(cmd);
    }

    // 2. Explicit elevation method override
    if let Ok(method) = std::env::var(ELEVATION_METHOD_ENV) {
        let method = method.to_lowercase();
        if !method.is_empty() {
            return match method.as_str() {
                "sudo" | "run0" | "pkexec" => {
                    if !binary_exists(&method) {
                        return Err(ElevationError::MethodNotAvailable(method));
                    }
                    Ok(wrapped(&method, program, args))
                }
                _ => Err(ElevationError::InvalidMethod(method)),
            };
        }
    }

    // 3. Automatic detection - prefer run0, then sudo on a terminal, then pkexec
    if binary_exists("run0") {
        return Ok(wrapped("run0", program, args));
    }

    if crate::utils::stdin_is_tty() {
        Ok(wrapped("sudo", program, args))
    } else {
        if !binary_exists("pkexec") {
            return Err(ElevationError::PkexecNotFound);
        }
        Ok(wrapped("pkexec", program, args))
    }
}

/// Creates an elevated `nft` command with the specified arguments
///
/// `nft` is the binary name or path to run (normally `"nft"`, see
/// [`crate::config::AppConfig::nft_command`]). Arguments are passed directly
/// without shell interpretation.
///
/// # Example
///
/// ```no_run
/// use nftprof::elevation::create_elevated_nft_command;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut cmd = create_elevated_nft_command("nft", &["list", "ruleset"])?;
/// let output = cmd.output().await?;
/// # Ok(())
/// # }
/// ```
pub fn create_elevated_nft_command(nft: &str, args: &[&str]) -> Result<Command, ElevationError> {
    build_elevated_command(nft, args)
}

/// Creates an elevated `install` command with the specified arguments
///
/// Used to place a staged configuration file at a system location such as
/// `/etc/nftables.conf`.
pub fn create_elevated_install_command(args: &[&str]) -> Result<Command, ElevationError> {
    build_elevated_command("install", args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::ENV_VAR_MUTEX;

    #[test]
    fn test_binary_exists() {
        // sh should exist on all Unix systems
        assert!(binary_exists("sh"));
        assert!(!binary_exists("nftprof_nonexistent_binary_xyz"));
    }

    #[test]
    fn test_no_elevation_runs_program_directly() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();
        unsafe {
            std::env::set_var(NO_ELEVATION_ENV, "1");
        }

        let cmd = create_elevated_nft_command("nft", &["list", "ruleset"]).unwrap();
        assert_eq!(cmd.as_std().get_program(), "nft");
        assert_eq!(
            cmd.as_std().get_args().collect::<Vec<_>>(),
            vec!["list", "ruleset"]
        );
    }

    #[test]
    fn test_create_install_command_test_mode() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();
        unsafe {
            std::env::set_var(NO_ELEVATION_ENV, "1");
        }

        let cmd = create_elevated_install_command(&["-m", "644", "/tmp/a", "/tmp/b"]).unwrap();
        assert_eq!(cmd.as_std().get_program(), "install");
    }

    #[test]
    fn test_invalid_elevation_method() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();
        if crate::utils::is_root() {
            return; // root never consults the method
        }

        unsafe {
            std::env::remove_var(NO_ELEVATION_ENV);
            std::env::set_var(ELEVATION_METHOD_ENV, "invalid_method");
        }

        let result = create_elevated_nft_command("nft", &["list", "ruleset"]);

        unsafe {
            std::env::set_var(NO_ELEVATION_ENV, "1");
            std::env::remove_var(ELEVATION_METHOD_ENV);
        }

        assert!(matches!(result, Err(ElevationError::InvalidMethod(_))));
    }

    #[test]
    fn test_elevation_method_case_insensitive() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();

        unsafe {
            std::env::remove_var(NO_ELEVATION_ENV);
            std::env::set_var(ELEVATION_METHOD_ENV, "SUDO");
        }

        let result = create_elevated_nft_command("nft", &["list", "ruleset"]);

        unsafe {
            std::env::set_var(NO_ELEVATION_ENV, "1");
            std::env::remove_var(ELEVATION_METHOD_ENV);
        }

        // Succeeds (sudo exists) or fails with MethodNotAvailable, but never InvalidMethod
        assert!(!matches!(result, Err(ElevationError::InvalidMethod(_))));
    }
}
