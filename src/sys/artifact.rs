// src/sys/artifact.rs

use async_trait::async_trait;
use nix::unistd::{access, AccessFlags};
use std::path::{Path, PathBuf};

use crate::error::ArtifactError;
use crate::sys::traits::ArtifactResolver;

const DEFAULT_TYPE: &str = "exe";

/// `group:artifact:version[:type[:classifier]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub kind: String,
    pub classifier: Option<String>,
}

impl Coordinate {
    pub fn parse(raw: &str) -> Result<Self, ArtifactError> {
        let invalid = || ArtifactError::InvalidCoordinate(raw.to_string());

        let parts: Vec<&str> = raw.trim().split(':').collect();
        if !(3..=5).contains(&parts.len()) {
            return Err(invalid());
        }
        // Segments become path components in the repository layout.
        if !parts.iter().all(|p| {
            !p.is_empty()
                && *p != "."
                && *p != ".."
                && p.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        }) {
            return Err(invalid());
        }

        Ok(Self {
            group: parts[0].to_string(),
            artifact: parts[1].to_string(),
            version: parts[2].to_string(),
            kind: parts.get(3).copied().unwrap_or(DEFAULT_TYPE).to_string(),
            classifier: parts.get(4).map(|c| c.to_string()),
        })
    }

    /// Repository-relative location: `g/r/p/artifact/version/artifact-version[-classifier].type`
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.artifact);
        path.push(&self.version);

        let mut file = format!("{}-{}", self.artifact, self.version);
        if let Some(classifier) = &self.classifier {
            file.push('-');
            file.push_str(classifier);
        }
        file.push('.');
        file.push_str(&self.kind);
        path.push(file);
        path
    }
}

/// Resolves plugin binaries out of a local, already-populated repository directory.
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactResolver for LocalRepository {
    async fn resolve_binary(&self, coordinate: &str) -> Result<PathBuf, ArtifactError> {
        let coordinate = Coordinate::parse(coordinate)?;
        let path = self.root.join(coordinate.relative_path());

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(path));
            }
            Err(e) => return Err(ArtifactError::Io(e.to_string())),
        };
        if !meta.is_file() {
            return Err(ArtifactError::NotFound(path));
        }

        if access(path.as_path(), AccessFlags::X_OK).is_err() {
            return Err(ArtifactError::NotExecutable(path));
        }

        Ok(path)
    }
}
