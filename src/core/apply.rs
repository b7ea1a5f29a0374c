//! Loading configuration files into the kernel with `nft`

use crate::core::error::{Error, NftablesErrorPattern, Result};
use crate::core::profiles::ProfileStore;
use std::path::Path;
use std::process::Output;
use tracing::{error, info};

async fn run_nft(nft: &str, args: &[&str]) -> Result<Output> {
    crate::elevation::create_elevated_nft_command(nft, args)?
        .output()
        .await
        .map_err(|e| {
            error!("Failed to spawn {nft}: {e}");
            Error::Nftables {
                message: format!("Failed to run {nft}: {e}"),
                stderr: None,
                exit_code: None,
            }
        })
}

fn failure(output: &Output) -> Error {
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let message = if stderr.trim().is_empty() {
        format!(
            "command returned non-zero exit status {}",
            output.status.code().unwrap_or(-1)
        )
    } else {
        NftablesErrorPattern::match_error(&stderr).to_string()
    };

    Error::Nftables {
        message,
        stderr: Some(stderr),
        exit_code: output.status.code(),
    }
}

/// Loads the file at `path` into the kernel with `nft -f` (elevated).
///
/// # Errors
///
/// Returns [`Error::Nftables`] with the translated stderr when nft exits
/// non-zero. The file is left as written.
pub async fn apply_conf(nft: &str, path: &Path) -> Result<()> {
    let path_arg = path.to_string_lossy();
    info!("Applying {} via {nft} -f", path.display());

    let output = run_nft(nft, &["-f", &*path_arg]).await?;

    if output.status.success() {
        info!("Apply successful");
        Ok(())
    } else {
        let err = failure(&output);
        error!("Apply failed: {}", String::from_utf8_lossy(&output.stderr));
        Err(err)
    }
}

/// Applies the file written for `store` and records the outcome in the audit log.
///
/// # Errors
///
/// See [`apply_conf`].
pub async fn apply_store(nft: &str, path: &Path, store: &ProfileStore) -> Result<()> {
    let result = apply_conf(nft, path).await;
    let rule_count = store.iter().filter(|p| p.has_rule()).count();

    crate::audit::log_apply(
        store.len(),
        rule_count,
        result.is_ok(),
        result.as_ref().err().map(ToString::to_string),
    )
    .await;

    result
}

/// Returns the live kernel ruleset as printed by `nft list ruleset`.
///
/// # Errors
///
/// Returns [`Error::Nftables`] when nft exits non-zero.
pub async fn list_ruleset(nft: &str) -> Result<String> {
    let output = run_nft(nft, &["list", "ruleset"]).await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(failure(&output))
    }
}
