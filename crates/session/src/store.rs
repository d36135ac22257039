use crate::error::{Result, SessionError};
use crate::manifest::SessionManifest;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";

/// Filesystem persistence for session manifests.
///
/// Each session gets its own directory under the store root, so sessions
/// never share state and purging one cannot touch another. Manifest writes
/// go through a temp file plus rename, never leaving a half-written
/// manifest behind.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding one session's state
    #[must_use]
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(sanitize_id(session_id))
    }

    fn manifest_path(&self, session_id: &str) -> PathBuf {
        self.session_dir(session_id).join(MANIFEST_FILE)
    }

    /// Whether a manifest has ever been persisted for this session
    #[must_use]
    pub fn exists(&self, session_id: &str) -> bool {
        self.manifest_path(session_id).exists()
    }

    /// Load a session's manifest, or start a fresh one.
    ///
    /// A corrupt manifest is quarantined and replaced with an empty one:
    /// the session simply re-ingests from scratch. Other sessions are
    /// unaffected.
    pub fn load_or_create(&self, session_id: &str) -> Result<SessionManifest> {
        validate_id(session_id)?;

        let path = self.manifest_path(session_id);
        if !path.exists() {
            return Ok(SessionManifest::new(session_id));
        }

        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str::<SessionManifest>(&raw) {
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                log::warn!(
                    "corrupt manifest for session '{session_id}', forcing reindex: {e}"
                );
                self.quarantine(&path)?;
                Ok(SessionManifest::new(session_id))
            }
        }
    }

    /// Persist a manifest atomically
    pub fn save(&self, manifest: &SessionManifest) -> Result<()> {
        validate_id(&manifest.session_id)?;

        let dir = self.session_dir(&manifest.session_id);
        fs::create_dir_all(&dir)?;

        let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.manifest_path(&manifest.session_id))?;
        Ok(())
    }

    /// Delete all stored state for a session; missing sessions are a no-op
    pub fn purge(&self, session_id: &str) -> Result<()> {
        validate_id(session_id)?;

        let dir = self.session_dir(session_id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    fn quarantine(&self, manifest_path: &Path) -> Result<()> {
        let backup = manifest_path.with_extension("json.corrupt");
        fs::rename(manifest_path, backup)?;
        Ok(())
    }
}

fn validate_id(session_id: &str) -> Result<()> {
    if session_id.trim().is_empty() {
        return Err(SessionError::InvalidSessionId(
            "session id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Map arbitrary session ids onto safe directory names
fn sanitize_id(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
