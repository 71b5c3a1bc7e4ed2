//! # Snapshot Store
//!
//! The node keeps the whole ledger as one JSON snapshot on disk. Writes go
//! to a sibling temp file that is then renamed over the snapshot, so a
//! crash mid-write leaves the previous snapshot intact.
//!
//! A snapshot that fails the ledger's invariant check is refused at load
//! time rather than served.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};

use comrade_protocol::{GenesisConfig, Ledger};

/// On-disk location of the ledger snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Reads the snapshot, or `None` if there is none yet.
    pub fn load(&self) -> Result<Option<Ledger>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read snapshot {}", self.path.display()))
            }
        };

        let ledger: Ledger = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse snapshot {}", self.path.display()))?;
        ledger
            .check_invariants()
            .map_err(|v| anyhow!("snapshot {} is inconsistent: {}", self.path.display(), v))?;
        Ok(Some(ledger))
    }

    /// Atomically replaces the snapshot with the current ledger state.
    pub async fn save(&self, ledger: &Ledger) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(ledger).context("failed to serialize ledger")?;
        let tmp = self.temp_path();

        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to move snapshot into {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

/// Reads and parses a genesis file.
pub fn read_genesis(path: &Path) -> Result<GenesisConfig> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read genesis file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse genesis file {}", path.display()))
}

/// Writes a genesis file, refusing to clobber one unless `force` is set.
pub fn write_genesis(path: &Path, genesis: &GenesisConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (pass --force to overwrite)", path.display());
    }
    let bytes = serde_json::to_vec_pretty(genesis).context("failed to serialize genesis")?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write genesis file {}", path.display()))
}

/// Restores the ledger from its snapshot, or builds it from genesis when
/// no snapshot exists.
pub fn open_ledger(store: &SnapshotStore, genesis: Option<&Path>) -> Result<Ledger> {
    if let Some(ledger) = store.load()? {
        tracing::info!(
            path = %store.path().display(),
            accounts = ledger.account_count(),
            digest = %ledger.state_digest(),
            "ledger restored from snapshot"
        );
        return Ok(ledger);
    }

    let Some(genesis_path) = genesis else {
        bail!(
            "no snapshot at {} and no genesis file given",
            store.path().display()
        );
    };
    let config = read_genesis(genesis_path)?;
    let mut ledger = Ledger::new(config).context("invalid genesis configuration")?;
    // The mint event has no subscribers yet.
    ledger.drain_events();
    tracing::info!(genesis = %genesis_path.display(), "ledger created from genesis");
    Ok(ledger)
}
