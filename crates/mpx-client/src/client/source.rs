//! Input document locations.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Where an image or PDF is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// File on the local filesystem, uploaded as multipart form data.
    Path(PathBuf),
    /// Remote document fetched by the Mathpix service.
    Url(Url),
}

impl DocumentSource {
    /// Local file source.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Remote source; fails if `url` is not an absolute URL.
    pub fn url(url: &str) -> Result<Self> {
        Url::parse(url)
            .map(Self::Url)
            .map_err(|e| Error::validation(format!("Invalid file URL '{}': {}", url, e)))
    }

    /// Build a source from optional path and URL arguments.
    ///
    /// Exactly one of the two must be provided.
    pub fn from_parts(file_path: Option<PathBuf>, file_url: Option<&str>) -> Result<Self> {
        match (file_path, file_url) {
            (Some(path), None) => Ok(Self::Path(path)),
            (None, Some(url)) => Self::url(url),
            _ => {
                tracing::error!(
                    target: crate::TRACING_TARGET_CLIENT,
                    "Invalid parameters: exactly one of file_path or file_url must be provided"
                );
                Err(Error::validation(
                    "Exactly one of file_path or file_url must be provided",
                ))
            }
        }
    }

    /// Local path, if this is a file source.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Url(_) => None,
        }
    }

    /// Remote URL, if this is a URL source.
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Path(_) => None,
            Self::Url(url) => Some(url),
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "path={}", path.display()),
            Self::Url(url) => write!(f, "url={}", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_requires_exactly_one() {
        assert!(matches!(
            DocumentSource::from_parts(None, None),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            DocumentSource::from_parts(
                Some(PathBuf::from("paper.pdf")),
                Some("https://example.com/paper.pdf")
            ),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_from_parts() {
        let source = DocumentSource::from_parts(Some(PathBuf::from("scan.png")), None).unwrap();
        assert_eq!(source.as_path(), Some(Path::new("scan.png")));
        assert_eq!(source.to_string(), "path=scan.png");

        let source = DocumentSource::from_parts(None, Some("https://example.com/a.jpg")).unwrap();
        assert_eq!(
            source.as_url().map(Url::as_str),
            Some("https://example.com/a.jpg")
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            DocumentSource::url("not a url"),
            Err(Error::Validation { .. })
        ));
    }
}
