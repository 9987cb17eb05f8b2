use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Failure reported by a durable blob store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded for key `{key}`")]
    QuotaExceeded { key: String },
    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("catalog contains duplicate product id `{0}`")]
    DuplicateProduct(String),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApplicationError {
    /// Stable machine-readable class used in command output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config_validation",
            Self::Catalog(_) => "catalog",
            Self::Storage(_) => "storage",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Catalog(_) => 3,
            Self::Storage(_) => 4,
            Self::InvalidInput(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::ConfigError;
    use crate::errors::{ApplicationError, CatalogError, StorageError};

    #[test]
    fn config_error_maps_to_config_validation_class() {
        let error = ApplicationError::from(ConfigError::Validation("bad".to_owned()));

        assert_eq!(error.error_class(), "config_validation");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn storage_error_is_transparent() {
        let error =
            ApplicationError::from(StorageError::QuotaExceeded { key: "session".to_owned() });

        assert_eq!(error.to_string(), "storage quota exceeded for key `session`");
        assert_eq!(error.error_class(), "storage");
    }

    #[test]
    fn catalog_error_mentions_path() {
        let error = ApplicationError::from(CatalogError::ReadFile {
            path: PathBuf::from("missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        });

        assert!(error.to_string().contains("missing.json"));
        assert_eq!(error.exit_code(), 3);
    }
}
