//! Places to fetch raw snapshots from.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use derive_more::{Display, From};

use crate::normalize::RawSnapshot;

/// Why a poll produced no snapshot.
#[derive(Debug, Display, From)]
pub enum PollError {
    /// The request never got a response.
    #[display("request failed: {_0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[display("HTTP {_0}")]
    Status(u16),
    /// The body could not be read.
    #[display("read failed: {_0}")]
    #[from]
    Io(std::io::Error),
    /// The body was not JSON.
    #[display("invalid JSON: {_0}")]
    #[from]
    Parse(serde_json::Error),
}

impl std::error::Error for PollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Transport(_) | Self::Status(_) => None,
        }
    }
}

/// Something that can be asked for the latest snapshot.
pub trait SnapshotSource {
    /// Fetch and parse the latest snapshot.
    fn fetch(&mut self) -> Result<RawSnapshot, PollError>;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    fn fetch(&mut self) -> Result<RawSnapshot, PollError> {
        (**self).fetch()
    }
}

/// Poll an HTTP endpoint, bypassing any caches along the way.
pub struct HttpSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(url: String, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { url, agent }
    }
}

/// A token that differs between consecutive requests.
fn cache_busting_token() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

impl SnapshotSource for HttpSource {
    fn fetch(&mut self) -> Result<RawSnapshot, PollError> {
        let response = self
            .agent
            .get(&self.url)
            .query("_", &cache_busting_token())
            .set("Cache-Control", "no-cache")
            .set("Pragma", "no-cache")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => PollError::Status(code),
                ureq::Error::Transport(t) => PollError::Transport(t.to_string()),
            })?;
        let body = response.into_string()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl fmt::Display for HttpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Read the snapshot file the tracker writes to disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SnapshotSource for FileSource {
    fn fetch(&mut self) -> Result<RawSnapshot, PollError> {
        let body = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
