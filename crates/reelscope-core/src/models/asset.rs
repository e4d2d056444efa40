use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Local media staged for a single job.
///
/// The bytes live in a temp file owned exclusively by the asset. Dropping the
/// asset deletes the file, so the file cannot outlive the job on any exit
/// path, including unwinding. Use [`MediaAsset::close`] to observe removal
/// errors.
#[derive(Debug)]
pub struct MediaAsset {
    name: String,
    size_bytes: u64,
    mime_type: String,
    file: NamedTempFile,
}

impl MediaAsset {
    /// Write `data` into a fresh temp file under `dir`.
    ///
    /// The temp file keeps the extension of `name` because container probing
    /// relies on it.
    pub fn stage(dir: &Path, name: &str, data: &[u8], mime_type: &str) -> io::Result<Self> {
        let mut file = Self::temp_file(dir, name)?;
        file.write_all(data)?;
        file.flush()?;

        Ok(Self {
            name: name.to_string(),
            size_bytes: data.len() as u64,
            mime_type: mime_type.to_string(),
            file,
        })
    }

    /// Stream the contents of `source` into a fresh temp file under `dir`
    /// without buffering the whole file in memory.
    pub fn stage_file(dir: &Path, name: &str, source: &Path, mime_type: &str) -> io::Result<Self> {
        let mut file = Self::temp_file(dir, name)?;
        let mut reader = File::open(source)?;
        let size_bytes = io::copy(&mut reader, file.as_file_mut())?;
        file.flush()?;

        Ok(Self {
            name: name.to_string(),
            size_bytes,
            mime_type: mime_type.to_string(),
            file,
        })
    }

    fn temp_file(dir: &Path, name: &str) -> io::Result<NamedTempFile> {
        let suffix = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();

        tempfile::Builder::new()
            .prefix("reelscope-")
            .suffix(&suffix)
            .tempfile_in(dir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Declared MIME type, passed through unchanged.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temp file, reporting removal errors.
    pub fn close(self) -> io::Result<()> {
        self.file.close()
    }
}

/// Processing state of an asset held by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteState {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl RemoteState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteState::Succeeded | RemoteState::Failed)
    }
}

impl Display for RemoteState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RemoteState::Pending => write!(f, "PENDING"),
            RemoteState::Processing => write!(f, "PROCESSING"),
            RemoteState::Succeeded => write!(f, "SUCCEEDED"),
            RemoteState::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for RemoteState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RemoteState::Pending),
            "PROCESSING" => Ok(RemoteState::Processing),
            "SUCCEEDED" => Ok(RemoteState::Succeeded),
            "FAILED" => Ok(RemoteState::Failed),
            _ => Err(anyhow::anyhow!("Invalid remote state: {}", s)),
        }
    }
}

/// Handle to an asset stored by the remote service.
///
/// A handle is a snapshot: the state only changes by re-querying the service,
/// which yields a new handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAssetHandle {
    name: String,
    state: RemoteState,
    uri: Option<String>,
    mime_type: Option<String>,
    error_message: Option<String>,
}

impl RemoteAssetHandle {
    pub fn new(name: impl Into<String>, state: RemoteState) -> Self {
        Self {
            name: name.into(),
            state,
            uri: None,
            mime_type: None,
            error_message: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Service-side identifier (e.g. `files/abc123`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RemoteState {
        self.state
    }

    /// URI used to reference the asset in a generation request.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Service-provided reason when the state is FAILED.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.state == RemoteState::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_writes_bytes_and_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let asset = MediaAsset::stage(dir.path(), "Clip.MP4", b"fake video", "video/mp4").unwrap();

        assert_eq!(asset.name(), "Clip.MP4");
        assert_eq!(asset.size_bytes(), 10);
        assert_eq!(asset.mime_type(), "video/mp4");
        assert_eq!(asset.path().extension().unwrap(), "mp4");
        assert_eq!(std::fs::read(asset.path()).unwrap(), b"fake video");
    }

    #[test]
    fn test_stage_file_copies_source_and_leaves_it_alone() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("input.mov");
        std::fs::write(&source, b"source bytes").unwrap();

        let asset =
            MediaAsset::stage_file(dir.path(), "input.mov", &source, "video/quicktime").unwrap();
        assert_eq!(asset.size_bytes(), 12);
        assert_eq!(asset.path().extension().unwrap(), "mov");
        assert_ne!(asset.path(), source.as_path());
        assert_eq!(std::fs::read(asset.path()).unwrap(), b"source bytes");

        asset.close().unwrap();
        assert!(source.exists());
    }

    #[test]
    fn test_stage_file_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let result = MediaAsset::stage_file(
            dir.path(),
            "gone.mp4",
            &dir.path().join("gone.mp4"),
            "video/mp4",
        );
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_close_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let asset = MediaAsset::stage(dir.path(), "a.mov", b"x", "video/quicktime").unwrap();
        let path = asset.path().to_path_buf();

        asset.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let asset = MediaAsset::stage(dir.path(), "a.avi", b"x", "video/x-msvideo").unwrap();
            asset.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_remote_state_round_trips_through_str() {
        for state in [
            RemoteState::Pending,
            RemoteState::Processing,
            RemoteState::Succeeded,
            RemoteState::Failed,
        ] {
            assert_eq!(state.to_string().parse::<RemoteState>().unwrap(), state);
        }
        assert!("ACTIVE".parse::<RemoteState>().is_err());
    }

    #[test]
    fn test_handle_readiness() {
        let handle = RemoteAssetHandle::new("files/abc", RemoteState::Processing);
        assert!(!handle.is_ready());
        assert!(!handle.state().is_terminal());

        let ready = RemoteAssetHandle::new("files/abc", RemoteState::Succeeded)
            .with_uri("https://example.test/files/abc");
        assert!(ready.is_ready());
        assert_eq!(ready.uri(), Some("https://example.test/files/abc"));
    }
}
