/// Verification of configuration files before they are loaded
///
/// Runs `nft --check -f <file>`, which parses and validates the whole file
/// against the kernel without committing it.
use crate::core::error::{Error, Result};
use std::path::Path;
use tracing::{info, warn};

/// Result of a ruleset verification operation
#[derive(Debug, Clone)]
pub struct VerifyResult {
    pub success: bool,
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// Creates a successful verification result
    pub fn success() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    /// Creates a failed verification result with errors
    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
        }
    }
}

/// Checks a configuration file with `nft --check -f` (elevated)
///
/// A failed check is reported through [`VerifyResult`], not as `Err`.
///
/// # Errors
///
/// Returns `Err` if:
/// - no elevation method is available
/// - the nft command cannot be spawned
pub async fn verify_conf(nft: &str, path: &Path) -> Result<VerifyResult> {
    let path_arg = path.to_string_lossy();

    info!("Verifying {} via nft --check (elevated)", path.display());

    let output = crate::elevation::create_elevated_nft_command(nft, &["--check", "-f", &*path_arg])?
        .output()
        .await
        .map_err(|e| Error::Nftables {
            message: format!("Failed to run {nft}: {e}"),
            stderr: None,
            exit_code: None,
        })?;

    let result = if output.status.success() {
        info!("Ruleset verification passed");
        VerifyResult::success()
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("Ruleset verification failed: {}", stderr);
        let mut errors = parse_nft_errors(&stderr);
        if errors.is_empty() {
            errors.push(format!(
                "nft --check exited with status {}",
                output.status.code().unwrap_or(-1)
            ));
        }
        VerifyResult::failure(errors)
    };

    crate::audit::log_verify(
        result.success,
        result.errors.len(),
        (!result.success).then(|| result.errors.join("; ")),
    )
    .await;

    Ok(result)
}

/// Parses nft error output into user-friendly messages
///
/// nft prints the offending source line and a caret marker under each error;
/// only the message lines are kept.
pub(crate) fn parse_nft_errors(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.chars().all(|c| c == '^' || c == '~' || c.is_whitespace()))
        .filter(|line| line.contains("Error:") || line.starts_with("nft:"))
        .map(|line| {
            // Drop the "file:line:col-col: " location prefix
            let line = line.find("Error: ").map_or(line, |idx| &line[idx..]);
            line.trim_start_matches("Error: ")
                .trim_start_matches("nft: ")
                .to_string()
        })
        .collect()
}
