use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use scribe_envelope::Envelope;
use scribe_store::{Database, ObjectStore};
use scribe_types::{Digest, ObjectKind};

use crate::config::Config;
use crate::error::RepoError;

const SCRIBE_DIR_NAME: &str = ".scribe";
const DB_FILE_NAME: &str = "scribe.db";
const CONFIG_FILE_NAME: &str = "config.json";
const OBJECTS_DIR_NAME: &str = "objects";

const SCHEMA_VERSION: &str = "1";

/// An open Scribe repository.
///
/// Owns the commit store and the object store; they close when the
/// repository drops. A repository is a single-writer handle — share it across
/// threads only behind external mutual exclusion.
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    db: Database,
    objects: ObjectStore,
}

impl Repository {
    /// Walk upward from `start` looking for a `.scribe` directory. Returns
    /// the `.scribe` path itself.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        let mut current = start.canonicalize().ok()?;
        loop {
            let candidate = current.join(SCRIBE_DIR_NAME);
            if candidate.is_dir() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Open the repository containing `path` (or the working directory).
    pub fn open(path: Option<&Path>) -> Result<Self, RepoError> {
        let start = match path {
            Some(p) => p.to_path_buf(),
            None => env::current_dir()?,
        };
        let root = Self::discover(&start)
            .ok_or_else(|| RepoError::NotARepo(start.display().to_string()))?;

        let db = Database::open(&root.join(DB_FILE_NAME))?;
        let objects = ObjectStore::new(root.join(OBJECTS_DIR_NAME));

        let repo = Self { root, db, objects };
        repo.check_schema_version()?;
        debug!(root = %repo.root.display(), "opened repository");
        Ok(repo)
    }

    /// Create a new repository at `path` (or the working directory).
    pub fn init(path: Option<&Path>) -> Result<Self, RepoError> {
        let base = match path {
            Some(p) => p.to_path_buf(),
            None => env::current_dir()?,
        };
        fs::create_dir_all(&base)?;

        if let Some(existing) = Self::discover(&base) {
            return Err(RepoError::RepoExists(existing.display().to_string()));
        }

        let root = base.join(SCRIBE_DIR_NAME);
        fs::create_dir_all(root.join(OBJECTS_DIR_NAME))?;

        let db = Database::open(&root.join(DB_FILE_NAME))?;
        db.init_schema()?;

        Config::initial().save(&root.join(CONFIG_FILE_NAME))?;

        info!(root = %root.display(), "initialized repository");
        let objects = ObjectStore::new(root.join(OBJECTS_DIR_NAME));
        Ok(Self { root, db, objects })
    }

    fn check_schema_version(&self) -> Result<(), RepoError> {
        let version = self
            .db
            .schema_version()
            .map_err(|e| RepoError::Corrupt(format!("cannot read schema version: {e}")))?;
        match version.as_deref() {
            Some(SCHEMA_VERSION) => Ok(()),
            Some(other) => Err(RepoError::Corrupt(format!(
                "unsupported schema version {other:?} (expected {SCHEMA_VERSION:?})"
            ))),
            None => Err(RepoError::Corrupt("schema version missing".into())),
        }
    }

    // -- layout ------------------------------------------------------------

    /// The `.scribe` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(DB_FILE_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn objects_path(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR_NAME)
    }

    /// The filesystem object store.
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    // -- config ------------------------------------------------------------

    pub fn load_config(&self) -> Result<Config, RepoError> {
        Config::load(&self.config_path())
    }

    pub fn save_config(&self, config: &Config) -> Result<(), RepoError> {
        config.save(&self.config_path())
    }

    // -- commit pipeline ---------------------------------------------------

    /// Finalize and persist an envelope, advancing `HEAD` in the same
    /// transaction. On any failure the transaction is rolled back and `HEAD`
    /// is untouched.
    pub fn store_commit(&mut self, env: &mut Envelope) -> Result<Digest, RepoError> {
        env.finalize()?;

        self.db.begin()?;
        let result = (|| -> Result<(), RepoError> {
            self.db.store_commit(env)?;
            self.db.set_ref("HEAD", &env.commit_id)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.db.commit_txn()?;
                debug!(commit = %env.commit_id.short_hex(), "advanced HEAD");
                Ok(env.commit_id)
            }
            Err(e) => {
                let _ = self.db.rollback();
                Err(e)
            }
        }
    }

    // -- queries -----------------------------------------------------------

    pub fn load_commit(&self, id: &Digest) -> Result<Option<Envelope>, RepoError> {
        Ok(self.db.load_commit(id)?)
    }

    pub fn commit_exists(&self, id: &Digest) -> Result<bool, RepoError> {
        Ok(self.db.commit_exists(id)?)
    }

    pub fn get_history(
        &self,
        from: Option<&Digest>,
        limit: usize,
    ) -> Result<Vec<Digest>, RepoError> {
        Ok(self.db.get_history(from, limit)?)
    }

    pub fn all_commits(&self) -> Result<Vec<Digest>, RepoError> {
        Ok(self.db.all_commits()?)
    }

    pub fn find_by_author(&self, author_id: &str) -> Result<Vec<Digest>, RepoError> {
        Ok(self.db.find_by_author(author_id)?)
    }

    pub fn find_by_process(&self, process_name: &str) -> Result<Vec<Digest>, RepoError> {
        Ok(self.db.find_by_process(process_name)?)
    }

    pub fn commit_count(&self) -> Result<u64, RepoError> {
        Ok(self.db.commit_count()?)
    }

    /// Current `HEAD`. Zero when the repository has no commits.
    pub fn get_head(&self) -> Result<Digest, RepoError> {
        Ok(self.db.get_ref("HEAD")?)
    }

    pub fn set_head(&mut self, digest: &Digest) -> Result<(), RepoError> {
        Ok(self.db.set_ref("HEAD", digest)?)
    }

    // -- auxiliary objects -------------------------------------------------

    pub fn store_object(&self, kind: ObjectKind, content: &[u8]) -> Result<Digest, RepoError> {
        Ok(self.db.store_object(kind, content)?)
    }

    pub fn load_object(&self, id: &Digest) -> Result<(ObjectKind, Vec<u8>), RepoError> {
        Ok(self.db.load_object(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_crypto::hash_bytes;
    use scribe_types::Operation;
    use tempfile::TempDir;

    fn test_envelope(message: &str) -> Envelope {
        let mut env = Envelope::new();
        env.set_author("user:alice", "data_engineer");
        env.set_process("etl.py", Some("v1".into()), Some("--dry-run".into()));
        env.set_message(message);
        env.timestamp = 1_700_000_000;
        env.add_change(
            "orders",
            Operation::Insert,
            r#"{"id":1}"#,
            Digest::zero(),
            hash_bytes(b"{a:1}"),
        );
        env
    }

    #[test]
    fn init_creates_layout() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(Some(dir.path())).unwrap();

        assert!(repo.db_path().is_file());
        assert!(repo.objects_path().is_dir());
        assert!(repo.config_path().is_file());
        assert!(repo.get_head().unwrap().is_zero());

        let config = repo.load_config().unwrap();
        assert_eq!(config.author_id.as_deref(), Some("user:anonymous"));
    }

    #[test]
    fn reinit_fails_with_repo_exists() {
        let dir = TempDir::new().unwrap();
        Repository::init(Some(dir.path())).unwrap();
        let err = Repository::init(Some(dir.path())).unwrap_err();
        assert!(matches!(err, RepoError::RepoExists(_)));
    }

    #[test]
    fn init_inside_existing_repo_fails() {
        let dir = TempDir::new().unwrap();
        Repository::init(Some(dir.path())).unwrap();
        let nested = dir.path().join("data/jobs");
        fs::create_dir_all(&nested).unwrap();
        let err = Repository::init(Some(&nested)).unwrap_err();
        assert!(matches!(err, RepoError::RepoExists(_)));
    }

    #[test]
    fn open_discovers_from_nested_directory() {
        let dir = TempDir::new().unwrap();
        Repository::init(Some(dir.path())).unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repository::open(Some(&nested)).unwrap();
        assert_eq!(
            repo.root().file_name().unwrap().to_str().unwrap(),
            SCRIBE_DIR_NAME
        );
    }

    #[test]
    fn open_outside_any_repo_fails() {
        let dir = TempDir::new().unwrap();
        let err = Repository::open(Some(dir.path())).unwrap_err();
        assert!(matches!(err, RepoError::NotARepo(_)));
    }

    #[test]
    fn commit_pipeline_advances_head() {
        let dir = TempDir::new().unwrap();
        let mut repo = Repository::init(Some(dir.path())).unwrap();

        let mut env = test_envelope("seed");
        let id = repo.store_commit(&mut env).unwrap();
        assert_eq!(id.to_hex().len(), 64);
        assert_eq!(repo.get_head().unwrap(), id);

        let loaded = repo.load_commit(&id).unwrap().unwrap();
        assert_eq!(loaded.message.as_deref(), Some("seed"));
        loaded.verify().unwrap();
    }

    #[test]
    fn chained_commits_build_history() {
        let dir = TempDir::new().unwrap();
        let mut repo = Repository::init(Some(dir.path())).unwrap();

        let mut first = test_envelope("seed");
        let c1 = repo.store_commit(&mut first).unwrap();

        let mut second = Envelope::new();
        second.set_author("user:alice", "data_engineer");
        second.set_process("etl.py", Some("v1".into()), None);
        second.set_message("update row");
        second.set_parent(repo.get_head().unwrap());
        second.timestamp = 1_700_000_060;
        second.add_change(
            "orders",
            Operation::Update,
            r#"{"id":1}"#,
            hash_bytes(b"{a:1}"),
            hash_bytes(b"{a:2}"),
        );
        let c2 = repo.store_commit(&mut second).unwrap();

        assert_eq!(repo.get_head().unwrap(), c2);
        let history = repo.get_history(None, 10).unwrap();
        assert_eq!(history, vec![c2, c1]);

        // Over-asking stops at the root.
        assert_eq!(repo.get_history(None, 3).unwrap().len(), 2);
        assert_eq!(repo.commit_count().unwrap(), 2);
    }

    #[test]
    fn double_store_fails_without_moving_head() {
        let dir = TempDir::new().unwrap();
        let mut repo = Repository::init(Some(dir.path())).unwrap();

        let mut env = test_envelope("once");
        let id = repo.store_commit(&mut env).unwrap();

        // Re-finalizing produces the same id; the second insert must fail and
        // leave HEAD where it was.
        let mut dup = env.clone();
        assert!(repo.store_commit(&mut dup).is_err());
        assert_eq!(repo.get_head().unwrap(), id);
        assert_eq!(repo.commit_count().unwrap(), 1);
    }

    #[test]
    fn unfinalized_fields_roll_back_cleanly() {
        let dir = TempDir::new().unwrap();
        let mut repo = Repository::init(Some(dir.path())).unwrap();

        let mut env = Envelope::new();
        env.set_process("p", None, None);
        assert!(repo.store_commit(&mut env).is_err());
        assert!(repo.get_head().unwrap().is_zero());
        assert_eq!(repo.commit_count().unwrap(), 0);
    }

    #[test]
    fn full_chain_verifies_commit_by_commit() {
        let dir = TempDir::new().unwrap();
        let mut repo = Repository::init(Some(dir.path())).unwrap();

        let mut first = test_envelope("one");
        repo.store_commit(&mut first).unwrap();
        let mut second = test_envelope("two");
        second.set_parent(repo.get_head().unwrap());
        repo.store_commit(&mut second).unwrap();

        for id in repo.get_history(None, 10).unwrap() {
            let env = repo.load_commit(&id).unwrap().unwrap();
            env.verify().unwrap();
            if !env.parent_id.is_zero() {
                assert!(repo.commit_exists(&env.parent_id).unwrap());
            }
        }
    }

    #[test]
    fn unknown_schema_version_is_rejected_on_open() {
        let dir = TempDir::new().unwrap();
        {
            let repo = Repository::init(Some(dir.path())).unwrap();
            repo.db.set_config("schema_version", "99").unwrap();
        }
        let err = Repository::open(Some(dir.path())).unwrap_err();
        assert!(matches!(err, RepoError::Corrupt(_)));
    }

    #[test]
    fn config_save_load_through_repo() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(Some(dir.path())).unwrap();
        let mut config = repo.load_config().unwrap();
        config.author_id = Some("user:carol".into());
        config.watched_tables = vec!["orders".into()];
        repo.save_config(&config).unwrap();
        assert_eq!(repo.load_config().unwrap(), config);
    }

    #[test]
    fn auxiliary_objects_roundtrip_through_repo() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(Some(dir.path())).unwrap();
        let id = repo.store_object(ObjectKind::Blob, b"aux payload").unwrap();
        let (kind, content) = repo.load_object(&id).unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(content, b"aux payload");
    }

    #[test]
    fn filesystem_object_store_is_wired() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(Some(dir.path())).unwrap();
        let digest = hash_bytes(b"blob");
        repo.objects().store(&digest, b"blob").unwrap();
        assert_eq!(repo.objects().load(&digest).unwrap(), b"blob");
    }
}
