use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use iroh::SecretKey;
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.toml";
const LOCK_FILE: &str = "repo.lock";
const BLOBS_DIR: &str = "blobs";

/// Size of the Ed25519 seed backing a node identity
pub const SECRET_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("repo error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("repo i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config encode error: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("repo already initialized at {0}")]
    AlreadyInitialized(PathBuf),
    #[error("no repo at {0}")]
    NotInitialized(PathBuf),
    #[error("repo at {0} is locked by another process")]
    Locked(PathBuf),
    #[error("invalid identity in repo config: {0}")]
    InvalidIdentity(String),
}

/// Node identity persisted in the repo config.
///
/// The peer id is the public half of the key, rendered the way
/// the endpoint renders node ids, so the repo directory name and
/// the identity the node dials out with always agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub peer_id: String,
    secret: String,
}

impl Identity {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_SIZE];
        getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
        let secret = SecretKey::from_bytes(&bytes);
        Identity {
            peer_id: secret.public().to_string(),
            secret: hex::encode(bytes),
        }
    }

    pub fn secret_key(&self) -> Result<SecretKey, RepoError> {
        let mut bytes = [0u8; SECRET_SIZE];
        hex::decode_to_slice(&self.secret, &mut bytes)
            .map_err(|err| RepoError::InvalidIdentity(err.to_string()))?;
        Ok(SecretKey::from_bytes(&bytes))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub identity: Identity,
}

impl RepoConfig {
    /// Generate a config with a fresh identity
    pub fn generate() -> Self {
        RepoConfig {
            identity: Identity::generate(),
        }
    }
}

/// An opened on-disk repository.
///
/// Holds the parsed config and the repo lock; the lock file is
/// created by [`Repo::open`] and removed by [`Repo::close`].
#[derive(Debug)]
pub struct Repo {
    path: PathBuf,
    config: RepoConfig,
}

impl Repo {
    /// Initialize a repository directory: the blobs subdirectory
    /// and the config file. Fails if a config already exists.
    pub fn init(path: &Path, config: &RepoConfig) -> Result<(), RepoError> {
        if path.join(CONFIG_FILE).exists() {
            return Err(RepoError::AlreadyInitialized(path.to_path_buf()));
        }
        fs::create_dir_all(path.join(BLOBS_DIR))?;
        fs::write(path.join(CONFIG_FILE), toml::to_string_pretty(config)?)?;
        Ok(())
    }

    /// Open an initialized repository, taking its lock.
    pub fn open(path: &Path) -> Result<Repo, RepoError> {
        let raw = match fs::read_to_string(path.join(CONFIG_FILE)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(RepoError::NotInitialized(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };
        let config: RepoConfig = toml::from_str(&raw)?;

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.join(LOCK_FILE))
        {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(RepoError::Locked(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Repo {
            path: path.to_path_buf(),
            config,
        })
    }

    /// Release the repo lock.
    pub fn close(&self) -> Result<(), RepoError> {
        fs::remove_file(self.path.join(LOCK_FILE))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn blobs_path(&self) -> PathBuf {
        self.path.join(BLOBS_DIR)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_and_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repo");
        let config = RepoConfig::generate();

        Repo::init(&path, &config).unwrap();
        let repo = Repo::open(&path).unwrap();

        assert_eq!(repo.config().identity.peer_id, config.identity.peer_id);
        assert!(repo.blobs_path().is_dir());
        repo.close().unwrap();
    }

    #[test]
    fn test_double_init_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repo");
        let config = RepoConfig::generate();

        Repo::init(&path, &config).unwrap();
        let err = Repo::init(&path, &config).unwrap_err();
        assert!(matches!(err, RepoError::AlreadyInitialized(_)));
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let temp = TempDir::new().unwrap();
        let err = Repo::open(temp.path()).unwrap_err();
        assert!(matches!(err, RepoError::NotInitialized(_)));
    }

    #[test]
    fn test_lock_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repo");
        Repo::init(&path, &RepoConfig::generate()).unwrap();

        let repo = Repo::open(&path).unwrap();
        let err = Repo::open(&path).unwrap_err();
        assert!(matches!(err, RepoError::Locked(_)));

        // releasing the lock makes the repo openable again
        repo.close().unwrap();
        let repo = Repo::open(&path).unwrap();
        repo.close().unwrap();
    }

    #[test]
    fn test_identity_round_trip() {
        let identity = Identity::generate();
        let key = identity.secret_key().unwrap();
        assert_eq!(key.public().to_string(), identity.peer_id);
    }
}
