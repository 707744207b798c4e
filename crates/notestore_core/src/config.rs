//! Startup configuration for the note store.
//!
//! # Responsibility
//! - Describe backend selection, index key/policy and logging settings.
//! - Parse them once from environment-style key/value lookups.
//! - Build the configured backend and repository.
//!
//! # Invariants
//! - Configuration is an explicit value passed to constructors; nothing here
//!   is stored globally.
//! - The index key is never empty.

use crate::logging::default_log_level;
use crate::repo::{BlobNoteRepository, IndexWritePolicy, DEFAULT_INDEX_KEY};
use crate::store::{
    Backend, FsBlobStore, MemoryBlobStore, S3BlobStore, S3Credentials, S3Settings, SqliteBlobStore,
    StoreError,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Environment variable names.
pub mod env_vars {
    pub const BACKEND: &str = "NOTESTORE_BACKEND";
    pub const ROOT: &str = "NOTESTORE_ROOT";
    pub const INDEX_KEY: &str = "NOTESTORE_INDEX_KEY";
    pub const INDEX_WRITES: &str = "NOTESTORE_INDEX_WRITES";
    pub const LOG_LEVEL: &str = "NOTESTORE_LOG_LEVEL";
    pub const LOG_DIR: &str = "NOTESTORE_LOG_DIR";
    pub const BUCKET: &str = "NOTESTORE_BUCKET";
    pub const REGION: &str = "NOTESTORE_REGION";
    pub const S3_ENDPOINT: &str = "NOTESTORE_S3_ENDPOINT";

    /// Standard AWS variables, read for the `s3` backend.
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
    pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
    pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
}

/// Region used when neither `NOTESTORE_REGION` nor `AWS_REGION` is set.
pub const DEFAULT_REGION: &str = "us-east-1";

const SQLITE_FILE_NAME: &str = "notestore.sqlite3";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    /// A variable holds a value outside its accepted set.
    Invalid { var: &'static str, message: String },
    /// A variable required by the selected backend is unset.
    Missing(&'static str),
    /// The configured backend could not be opened.
    Backend(StoreError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { var, message } => write!(f, "invalid {var}: {message}"),
            Self::Missing(var) => write!(f, "missing required setting {var}"),
            Self::Backend(err) => write!(f, "failed to open backend: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ConfigError {
    fn from(value: StoreError) -> Self {
        Self::Backend(value)
    }
}

/// Which blob store backs the repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendConfig {
    /// Process-local map; contents vanish on exit.
    #[default]
    Memory,
    /// One file per key under `root`.
    Filesystem { root: PathBuf },
    /// `blobs` table in the SQLite file at `path`.
    Sqlite { path: PathBuf },
    /// Objects in an S3-compatible bucket.
    S3 {
        bucket: String,
        region: String,
        /// Custom endpoint (MinIO, LocalStack). `None` targets AWS.
        endpoint: Option<String>,
        credentials: S3Credentials,
    },
}

impl BackendConfig {
    /// Whether stored notes outlive the process.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// Complete store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub index_key: String,
    pub index_write_policy: IndexWritePolicy,
    pub log_level: String,
    /// Rolling log directory. `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            index_key: DEFAULT_INDEX_KEY.to_string(),
            index_write_policy: IndexWritePolicy::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let root = get(env_vars::ROOT).map(PathBuf::from);
        let backend = match get(env_vars::BACKEND)
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("memory") => BackendConfig::Memory,
            Some("fs") | Some("filesystem") => BackendConfig::Filesystem {
                root: root.ok_or(ConfigError::Missing(env_vars::ROOT))?,
            },
            Some("sqlite") => BackendConfig::Sqlite {
                path: root
                    .ok_or(ConfigError::Missing(env_vars::ROOT))?
                    .join(SQLITE_FILE_NAME),
            },
            Some("s3") => BackendConfig::S3 {
                bucket: get(env_vars::BUCKET).ok_or(ConfigError::Missing(env_vars::BUCKET))?,
                region: get(env_vars::REGION)
                    .or_else(|| get(env_vars::AWS_REGION))
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                endpoint: get(env_vars::S3_ENDPOINT),
                credentials: S3Credentials {
                    access_key_id: get(env_vars::AWS_ACCESS_KEY_ID)
                        .ok_or(ConfigError::Missing(env_vars::AWS_ACCESS_KEY_ID))?,
                    secret_access_key: get(env_vars::AWS_SECRET_ACCESS_KEY)
                        .ok_or(ConfigError::Missing(env_vars::AWS_SECRET_ACCESS_KEY))?,
                    session_token: get(env_vars::AWS_SESSION_TOKEN),
                },
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: env_vars::BACKEND,
                    message: format!(
                        "unsupported backend `{other}`; expected memory|fs|sqlite|s3"
                    ),
                })
            }
        };

        let index_write_policy = match get(env_vars::INDEX_WRITES) {
            Some(value) => value.parse().map_err(|message| ConfigError::Invalid {
                var: env_vars::INDEX_WRITES,
                message,
            })?,
            None => defaults.index_write_policy,
        };

        Ok(Self {
            backend,
            index_key: get(env_vars::INDEX_KEY).unwrap_or(defaults.index_key),
            index_write_policy,
            log_level: get(env_vars::LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: get(env_vars::LOG_DIR).map(PathBuf::from),
        })
    }

    /// Opens the configured backend.
    pub fn open_backend(&self) -> ConfigResult<Backend> {
        let backend = match &self.backend {
            BackendConfig::Memory => Backend::Memory(MemoryBlobStore::new()),
            BackendConfig::Filesystem { root } => Backend::Filesystem(FsBlobStore::open(root)?),
            BackendConfig::Sqlite { path } => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(StoreError::from)?;
                }
                Backend::Sqlite(SqliteBlobStore::open(path)?)
            }
            BackendConfig::S3 {
                bucket,
                region,
                endpoint,
                credentials,
            } => Backend::S3(S3BlobStore::connect(&S3Settings {
                bucket: bucket.clone(),
                region: region.clone(),
                endpoint: endpoint.clone(),
                credentials: credentials.clone(),
            })?),
        };
        info!(
            "event=backend_open module=config status=ok backend={}",
            backend.name()
        );
        Ok(backend)
    }

    /// Opens the configured backend and wraps it in a repository.
    pub fn open_repository(&self) -> ConfigResult<BlobNoteRepository<Backend>> {
        Ok(BlobNoteRepository::with_index(
            self.open_backend()?,
            self.index_key.clone(),
            self.index_write_policy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{env_vars, BackendConfig, ConfigError, StoreConfig, DEFAULT_REGION};
    use crate::store::S3Credentials;
    use crate::repo::IndexWritePolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.index_key, "index");
        assert_eq!(config.backend, BackendConfig::Memory);
    }

    #[test]
    fn sqlite_backend_places_database_under_root() {
        let config = StoreConfig::from_lookup(lookup(&[
            (env_vars::BACKEND, "SQLite"),
            (env_vars::ROOT, "/var/lib/notes"),
            (env_vars::INDEX_WRITES, "single_writer"),
            (env_vars::INDEX_KEY, "__index__"),
        ]))
        .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Sqlite {
                path: PathBuf::from("/var/lib/notes/notestore.sqlite3")
            }
        );
        assert_eq!(config.index_write_policy, IndexWritePolicy::SingleWriter);
        assert_eq!(config.index_key, "__index__");
    }

    #[test]
    fn fs_backend_requires_root() {
        let err = StoreConfig::from_lookup(lookup(&[(env_vars::BACKEND, "fs")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(var) if var == env_vars::ROOT));
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config = StoreConfig::from_lookup(lookup(&[
            (env_vars::INDEX_KEY, "   "),
            (env_vars::LOG_DIR, ""),
        ]))
        .unwrap();
        assert_eq!(config.index_key, "index");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[(env_vars::BACKEND, "dynamo")])).unwrap_err();
        assert!(err.to_string().contains("unsupported backend"));

        let err =
            StoreConfig::from_lookup(lookup(&[(env_vars::INDEX_WRITES, "cas")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == env_vars::INDEX_WRITES));
    }

    #[test]
    fn filesystem_backend_opens_under_temp_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: BackendConfig::Filesystem {
                root: dir.path().join("blobs"),
            },
            ..StoreConfig::default()
        };
        let backend = config.open_backend().unwrap();
        assert_eq!(backend.name(), "fs");
        assert!(dir.path().join("blobs").is_dir());
    }

    #[test]
    fn s3_backend_reads_bucket_region_and_credentials() {
        let config = StoreConfig::from_lookup(lookup(&[
            (env_vars::BACKEND, "s3"),
            (env_vars::BUCKET, "team-notes"),
            (env_vars::AWS_REGION, "eu-central-1"),
            (env_vars::S3_ENDPOINT, "http://localhost:9000"),
            (env_vars::AWS_ACCESS_KEY_ID, "AKID"),
            (env_vars::AWS_SECRET_ACCESS_KEY, "shh"),
        ]))
        .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::S3 {
                bucket: "team-notes".to_string(),
                region: "eu-central-1".to_string(),
                endpoint: Some("http://localhost:9000".to_string()),
                credentials: S3Credentials {
                    access_key_id: "AKID".to_string(),
                    secret_access_key: "shh".to_string(),
                    session_token: None,
                },
            }
        );
        assert!(!format!("{config:?}").contains("shh"));

        let backend = config.open_backend().unwrap();
        assert_eq!(backend.name(), "s3");
    }

    #[test]
    fn s3_backend_requires_bucket_and_credentials() {
        let err = StoreConfig::from_lookup(lookup(&[(env_vars::BACKEND, "s3")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(var) if var == env_vars::BUCKET));

        let err = StoreConfig::from_lookup(lookup(&[
            (env_vars::BACKEND, "s3"),
            (env_vars::BUCKET, "notes"),
            (env_vars::AWS_ACCESS_KEY_ID, "AKID"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(var) if var == env_vars::AWS_SECRET_ACCESS_KEY));

    }

    #[test]
    fn s3_region_prefers_own_variable_then_aws_then_default() {
        fn region_of(extra: &[(&'static str, &'static str)]) -> String {
            let mut pairs = vec![
                (env_vars::BACKEND, "s3"),
                (env_vars::BUCKET, "notes"),
                (env_vars::AWS_ACCESS_KEY_ID, "AKID"),
                (env_vars::AWS_SECRET_ACCESS_KEY, "shh"),
            ];
            pairs.extend_from_slice(extra);
            match StoreConfig::from_lookup(lookup(&pairs)).unwrap().backend {
                BackendConfig::S3 { region, .. } => region,
                other => panic!("unexpected backend {other:?}"),
            }
        }

        assert_eq!(region_of(&[]), DEFAULT_REGION);
        assert_eq!(region_of(&[(env_vars::AWS_REGION, "eu-central-1")]), "eu-central-1");
        assert_eq!(
            region_of(&[
                (env_vars::REGION, "ap-south-1"),
                (env_vars::AWS_REGION, "eu-central-1"),
            ]),
            "ap-south-1"
        );
    }

    #[test]
    fn only_the_memory_backend_is_ephemeral() {
        assert!(!BackendConfig::Memory.is_persistent());
        assert!(BackendConfig::Filesystem {
            root: PathBuf::from("/tmp/notes")
        }
        .is_persistent());
        assert!(BackendConfig::Sqlite {
            path: PathBuf::from("/tmp/notes.sqlite3")
        }
        .is_persistent());
    }
}
