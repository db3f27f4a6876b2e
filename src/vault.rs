//! EAB Credential Store
//!
//! Persists the ZeroSSL External Account Binding pair (kid + hmac) in a
//! private directory. Each value lives in its own file because the
//! issuance script reads them directly:
//!
//! ```text
//! <state_dir>/            0700
//!   zerossl_kid           0600
//!   zerossl_hmac          0600
//! ```
//!
//! Every file is replaced via write-to-temp + fsync + rename, so a reader
//! in another process sees either the old or the new value, never a torn
//! write. The pair itself is not written as one unit: a crash between the
//! two renames leaves a mixed pair, which is why [`EabCredentials::is_configured`]
//! is the only gate callers should trust.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::masking::mask_secret;

const KID_FILE: &str = "zerossl_kid";
const HMAC_FILE: &str = "zerossl_hmac";

static SAVE_LOCK: Mutex<()> = Mutex::new(());

/// Credential store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// ZeroSSL External Account Binding pair
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EabCredentials {
    pub kid: String,
    pub hmac: String,
}

impl EabCredentials {
    pub fn new(kid: impl Into<String>, hmac: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            hmac: hmac.into(),
        }
    }

    /// Both halves present. Anything less counts as "not saved yet".
    pub fn is_configured(&self) -> bool {
        !self.kid.is_empty() && !self.hmac.is_empty()
    }

    pub fn masked_kid(&self) -> String {
        mask_secret(&self.kid)
    }

    pub fn masked_hmac(&self) -> String {
        mask_secret(&self.hmac)
    }
}

impl std::fmt::Debug for EabCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EabCredentials")
            .field("kid", &self.masked_kid())
            .field("hmac", &self.masked_hmac())
            .finish()
    }
}

/// Filesystem-backed store for the EAB pair
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Open a store rooted at `dir`. Nothing touches the disk until `save` or `load`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn kid_path(&self) -> PathBuf {
        self.dir.join(KID_FILE)
    }

    pub fn hmac_path(&self) -> PathBuf {
        self.dir.join(HMAC_FILE)
    }

    /// Persist both values. Callers pass already-trimmed, non-empty strings.
    pub fn save(&self, kid: &str, hmac: &str) -> Result<(), StoreError> {
        // Keep the pair consistent between writers in this process
        let _guard = SAVE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.ensure_dir()?;

        let kid_line = Zeroizing::new(format!("{kid}\n"));
        let hmac_line = Zeroizing::new(format!("{hmac}\n"));
        write_private(&self.kid_path(), kid_line.as_bytes())?;
        write_private(&self.hmac_path(), hmac_line.as_bytes())?;

        info!(
            dir = %self.dir.display(),
            kid = %mask_secret(kid),
            "Saved EAB credentials"
        );
        Ok(())
    }

    /// Read the stored pair.
    ///
    /// Returns `Ok(None)` when either file does not exist. Values are trimmed.
    pub fn load(&self) -> Result<Option<EabCredentials>, StoreError> {
        let Some(kid) = read_optional(&self.kid_path())? else {
            debug!("No stored EAB kid");
            return Ok(None);
        };
        let Some(hmac) = read_optional(&self.hmac_path())? else {
            debug!("No stored EAB hmac");
            return Ok(None);
        };

        let creds = EabCredentials::new(kid.trim(), hmac.trim());
        debug!(credentials = ?creds, "Loaded EAB credentials");
        Ok(Some(creds))
    }

    /// Load and keep only a complete pair
    pub fn load_configured(&self) -> Result<Option<EabCredentials>, StoreError> {
        Ok(self.load()?.filter(EabCredentials::is_configured))
    }

    /// [`save`](Self::save) on the blocking pool, keeping fsync off the async workers
    pub async fn save_blocking(&self, kid: &str, hmac: &str) -> Result<(), StoreError> {
        let store = self.clone();
        let kid = Zeroizing::new(kid.to_string());
        let hmac = Zeroizing::new(hmac.to_string());
        tokio::task::spawn_blocking(move || store.save(&kid, &hmac)).await?
    }

    /// [`load_configured`](Self::load_configured) on the blocking pool
    pub async fn load_configured_blocking(&self) -> Result<Option<EabCredentials>, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load_configured()).await?
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        let err = |source: std::io::Error| StoreError::CreateDir {
            path: self.dir.clone(),
            source,
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(&self.dir)
                .map_err(err)?;
            // An existing directory keeps its mode through DirBuilder
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700)).map_err(err)?;
        }

        #[cfg(not(unix))]
        {
            fs::create_dir_all(&self.dir).map_err(err)?;
        }

        Ok(())
    }
}

/// Write `data` to `path` atomically with owner-only permissions.
///
/// Each call gets its own uniquely named temp file in the target directory,
/// so concurrent writers never share a half-written file.
fn write_private(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );

    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o600));
    }

    // Dropping the temp file on an early return removes it
    let mut tmp = builder.tempfile_in(parent).map_err(err)?;
    tmp.write_all(data).map_err(err)?;
    tmp.as_file().sync_all().map_err(err)?;
    tmp.persist(path).map_err(|e| err(e.error))?;
    File::open(parent).and_then(|dir| dir.sync_all()).map_err(err)?;
    Ok(())
}

fn read_optional(path: &Path) -> Result<Option<Zeroizing<String>>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(Zeroizing::new(content))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
