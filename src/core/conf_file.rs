//! Reading and writing the managed nftables configuration file
//!
//! Loading parses the whole file into a [`ProfileStore`]; saving rewrites the
//! whole file from the store. Writes go through a temporary file and a rename
//! in the same directory. When the invoking user cannot write the target
//! (the usual case for `/etc/nftables.conf`), the text is staged in the state
//! directory and moved into place with an elevated `install`. Either way an
//! existing file keeps its permission bits (Debian ships a 0755 file so its
//! `#!/usr/sbin/nft -f` line runs); a new file is created 0644.
//!
//! A SHA-256 of every written file is kept in the state directory so edits
//! made outside nftprof can be reported on the next load.

use crate::core::error::{Error, Result};
use crate::core::parser::parse_conf;
use crate::core::profiles::ProfileStore;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Mode for a configuration file that does not exist yet
const NEW_FILE_MODE: u32 = 0o644;

/// A parsed configuration file
#[derive(Debug, Clone, Default)]
pub struct LoadedConf {
    pub store: ProfileStore,
    /// Raw file contents, `None` when the file does not exist yet
    pub text: Option<String>,
    /// The file no longer matches the checksum recorded at the last save
    pub externally_modified: bool,
}

/// Computes the SHA-256 checksum of configuration text
pub fn compute_checksum(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Location of the recorded checksum for a configuration path.
///
/// Keyed by a hash of the path so several managed files can coexist.
fn checksum_path(state_dir: &Path, conf_path: &Path) -> PathBuf {
    let key = compute_checksum(&conf_path.to_string_lossy());
    state_dir.join(format!("conf-{}.sha256", &key[..16]))
}

/// Loads and parses the configuration file.
///
/// A missing file is the first-run case and yields an empty store.
///
/// # Errors
///
/// Returns `Err` if the file exists but cannot be read.
pub async fn load_store(path: &Path) -> Result<LoadedConf> {
    load_store_in(path, crate::utils::get_state_dir().as_deref()).await
}

pub(crate) async fn load_store_in(path: &Path, state_dir: Option<&Path>) -> Result<LoadedConf> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("{} not found, starting with no profiles", path.display());
            return Ok(LoadedConf::default());
        }
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            return Err(e.into());
        }
    };

    let store = parse_conf(&text);
    info!("Loaded {} profile(s) from {}", store.len(), path.display());

    let externally_modified = match state_dir {
        Some(dir) => match tokio::fs::read_to_string(checksum_path(dir, path)).await {
            Ok(recorded) => recorded.trim() != compute_checksum(&text),
            Err(_) => false,
        },
        None => false,
    };

    if externally_modified {
        warn!(
            "{} was modified outside nftprof since the last save",
            path.display()
        );
    }

    Ok(LoadedConf {
        store,
        text: Some(text),
        externally_modified,
    })
}

/// Serializes the store and writes it to `path`.
///
/// # Errors
///
/// Returns `Err` if neither the direct write nor the elevated install
/// succeeds.
pub async fn save_store(path: &Path, store: &ProfileStore) -> Result<()> {
    let state_dir = crate::utils::get_state_dir();
    let result = save_store_in(path, store, state_dir.as_deref()).await;

    crate::audit::log_save(
        path,
        store.len(),
        result.is_ok(),
        result.as_ref().err().map(ToString::to_string),
    )
    .await;

    result
}

pub(crate) async fn save_store_in(
    path: &Path,
    store: &ProfileStore,
    state_dir: Option<&Path>,
) -> Result<()> {
    let text = store.to_nft_text();
    let mode = target_mode(path).await;

    match write_atomic(path, &text, mode).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            info!(
                "No write access to {}, installing through elevation",
                path.display()
            );
            let dir = state_dir.ok_or_else(|| {
                Error::Internal("State directory unavailable for staging".to_string())
            })?;
            install_elevated(path, &text, mode, dir).await?;
        }
        Err(e) => {
            error!("Failed to write {}: {}", path.display(), e);
            return Err(e.into());
        }
    }

    info!("Wrote {} profile(s) to {}", store.len(), path.display());

    if let Some(dir) = state_dir
        && let Err(e) = tokio::fs::write(checksum_path(dir, path), compute_checksum(&text)).await
    {
        warn!("Failed to record checksum for {}: {}", path.display(), e);
    }

    Ok(())
}

/// Permission bits the written file should carry.
///
/// An existing target keeps its own; anything else gets [`NEW_FILE_MODE`].
async fn target_mode(path: &Path) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = tokio::fs::metadata(path).await {
            return metadata.permissions().mode() & 0o7777;
        }
    }

    #[cfg(not(unix))]
    let _ = path;

    NEW_FILE_MODE
}

/// Writes `text` next to `path` with `mode` and renames it into place.
async fn write_atomic(path: &Path, text: &str, mode: u32) -> std::io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".nftprof.tmp");
    let temp_path = path.with_file_name(temp_name);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(mode)
            .open(&temp_path)
            .await?;

        // The umask may have masked bits off at creation
        file.set_permissions(std::fs::Permissions::from_mode(mode))
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.sync_all().await?;
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        tokio::fs::write(&temp_path, text).await?;
    }

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    Ok(())
}

/// Arguments for `install` copying `staged` over `target` with `mode`
fn install_args(staged: &Path, target: &Path, mode: u32) -> Vec<String> {
    vec![
        "-m".to_string(),
        format!("{mode:o}"),
        staged.to_string_lossy().into_owned(),
        target.to_string_lossy().into_owned(),
    ]
}

/// Stages `text` in `state_dir` and copies it over `path` with elevated `install`.
async fn install_elevated(path: &Path, text: &str, mode: u32, state_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(state_dir).await?;
    let staged = state_dir.join("staged-nftables.conf");
    write_atomic(&staged, text, NEW_FILE_MODE).await?;

    let args = install_args(&staged, path, mode);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = crate::elevation::create_elevated_install_command(&args)?
        .output()
        .await;

    let _ = tokio::fs::remove_file(&staged).await;

    let output = output.map_err(|e| {
        error!("Failed to spawn elevated install: {e}");
        Error::Internal(format!("Failed to spawn elevated install: {e}"))
    })?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        error!("Elevated install failed: {stderr}");
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("Cannot write {}: {}", path.display(), stderr.trim()),
        )))
    }
}
