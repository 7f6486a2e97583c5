use std::path::PathBuf;

/// A manifest that cannot back a module.
///
/// Raised when a manifest is read, when a module is constructed from it, and
/// whenever a module field is (re-)validated.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// A field, class or file reference violates a manifest rule.
    #[error("{message} Module [{}].", path.display())]
    Invalid { message: String, path: PathBuf },

    /// The manifest file could not be read.
    #[error("File [{}] cannot be read.", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The manifest file is not valid JSON.
    #[error("File [{}] cannot be decoded as JSON format.", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A module directory entry could not be scanned for manifests.
    #[error("Directory [{}] cannot be scanned.", path.display())]
    Unscannable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ManifestError {
    pub(crate) fn invalid(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ManifestError::Invalid {
            message: message.into(),
            path: path.into(),
        }
    }

    /// The module directory, manifest file or directory entry the error
    /// refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            ManifestError::Invalid { path, .. }
            | ManifestError::Unreadable { path, .. }
            | ManifestError::Malformed { path, .. }
            | ManifestError::Unscannable { path, .. } => path,
        }
    }
}
