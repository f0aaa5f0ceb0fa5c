//! Persisted local state.
//!
//! A single JSON blob (default `~/Library/Application Support/run-mcp/
//! results.json`) holding scanned entities, the local allow/deny lists, and
//! the host/org identity UUIDs. Loading self-heals: an invalid `org_uuid` is
//! cleared, a missing `host_uuid` is generated. Saves are atomic
//! (write-then-rename, `0o600`). A system-managed config may seed identity
//! overrides before the blob is read.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Default location of the persisted blob.
pub const DEFAULT_STORAGE_PATH: &str = "~/Library/Application Support/run-mcp/results.json";

/// System-managed config consulted for identity overrides. Uses the legacy
/// `org_uid` key spelling for compatibility with deployed MDM profiles.
const SYSTEM_MANAGED_CONFIG_PATH: &str = "/Library/Application Support/run-mcp/config.yaml";

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("storage file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("cannot resolve home directory for {0}")]
    NoHome(String),
}

/// The persisted document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageData {
    /// Previously scanned entities, keyed by entity type then identifier.
    #[serde(default)]
    pub scanned_entities: HashMap<String, HashMap<String, String>>,

    /// Locally approved entities, keyed by entity type.
    #[serde(default)]
    pub allowlist: HashMap<String, Vec<String>>,

    /// Locally rejected entities, keyed by entity type.
    #[serde(default)]
    pub denylist: HashMap<String, Vec<String>>,

    /// Host UUID (v4), generated on first run.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_uuid: String,

    /// Organization UUID (RFC 4122), operator-provided.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub org_uuid: String,
}

/// Handle to the persisted blob.
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    pub data: StorageData,
}

impl Storage {
    /// Open the blob at `path` (tilde-expanded), creating in-memory defaults
    /// when the file does not exist yet. Identity overrides from the
    /// system-managed config are applied first, then the file contents, then
    /// self-healing.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let expanded = expand_tilde(path)?;
        let mut storage = Self {
            path: expanded,
            data: StorageData::default(),
        };

        if let Some(overrides) = read_system_managed_config(Path::new(SYSTEM_MANAGED_CONFIG_PATH)) {
            if let Some(org) = overrides.org_uuid {
                storage.data.org_uuid = org;
            }
            if let Some(host) = overrides.host_uuid {
                storage.data.host_uuid = host;
            }
        }

        match storage.load() {
            Ok(()) => {}
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        if storage.data.host_uuid.is_empty() {
            storage.data.host_uuid = Uuid::new_v4().to_string();
        }
        Ok(storage)
    }

    /// Open the blob, persisting the initial structure to disk when the file
    /// does not exist yet so the host UUID survives the first run.
    pub fn open_or_create(path: &str) -> Result<Self, StoreError> {
        let storage = Self::open(path)?;
        if !storage.path.exists() {
            storage.save()?;
        }
        Ok(storage)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<(), StoreError> {
        debug!(path = %self.path.display(), "loading storage file");
        let raw = std::fs::read(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.data = serde_json::from_slice(&raw)?;

        let mut changed = false;
        if !self.data.host_uuid.is_empty()
            && Uuid::parse_str(&self.data.host_uuid).is_err()
        {
            self.data.host_uuid = Uuid::new_v4().to_string();
            changed = true;
        }
        if !self.data.org_uuid.is_empty() && !is_rfc4122_uuid(&self.data.org_uuid) {
            warn!("invalid org_uuid found in storage; clearing");
            self.data.org_uuid.clear();
            changed = true;
        }
        if changed {
            self.save()?;
        }
        Ok(())
    }

    /// Write the blob atomically with owner-only permissions.
    pub fn save(&self) -> Result<(), StoreError> {
        debug!(path = %self.path.display(), "saving storage file");
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let payload = serde_json::to_vec_pretty(&self.data)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, payload).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    /// Whether `allowlist[entity_type]` contains `entry`.
    pub fn is_allowlisted(&self, entity_type: &str, entry: &str) -> bool {
        self.data
            .allowlist
            .get(entity_type)
            .is_some_and(|entries| entries.iter().any(|e| e == entry))
    }

    /// Append `hash` to `allowlist[entity_type]` and persist.
    pub fn allowlist_add(&mut self, entity_type: &str, hash: &str) -> Result<(), StoreError> {
        self.data
            .allowlist
            .entry(entity_type.to_string())
            .or_default()
            .push(hash.to_string());
        self.save()
    }

    /// Clear the allowlist and persist.
    pub fn allowlist_reset(&mut self) -> Result<(), StoreError> {
        self.data.allowlist.clear();
        self.save()
    }
}

/// Whether `value` parses as an RFC 4122 UUID.
pub fn is_rfc4122_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok_and(|u| u.get_variant() == uuid::Variant::RFC4122)
}

fn expand_tilde(path: &str) -> Result<PathBuf, StoreError> {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        let home = dirs::home_dir().ok_or_else(|| StoreError::NoHome(path.to_string()))?;
        return Ok(home.join(rest));
    }
    if path == "~" {
        return dirs::home_dir().ok_or_else(|| StoreError::NoHome(path.to_string()));
    }
    Ok(PathBuf::from(path))
}

#[derive(Debug, Default, Deserialize)]
struct SystemManagedConfig {
    // Legacy key spelling kept for compatibility.
    #[serde(default, rename = "org_uid")]
    org_uuid: Option<String>,
    #[serde(default)]
    host_uuid: Option<String>,
}

/// Read identity overrides from the system-managed config, dropping values
/// that do not parse as UUIDs.
fn read_system_managed_config(path: &Path) -> Option<SystemManagedConfig> {
    let raw = std::fs::read_to_string(path).ok()?;
    let mut config: SystemManagedConfig = match serde_yaml::from_str(&raw) {
        Ok(config) => config,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable system config");
            return None;
        }
    };
    if let Some(org) = &config.org_uuid {
        if Uuid::parse_str(org).is_err() {
            warn!("invalid org_uid in system config; ignoring");
            config.org_uuid = None;
        }
    }
    if let Some(host) = &config.host_uuid {
        if Uuid::parse_str(host).is_err() {
            warn!("invalid host_uuid in system config; ignoring");
            config.host_uuid = None;
        }
    }
    Some(config)
}
