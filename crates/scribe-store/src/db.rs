use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use scribe_crypto::hash_object;
use scribe_envelope::Envelope;
use scribe_types::{Digest, ObjectKind, Operation};

use crate::error::{StoreError, StoreResult};

/// Default number of ids returned by a history walk.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// The schema, executed as one batch. `IF NOT EXISTS` throughout, so running
/// it against an initialized database is harmless.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS objects (
    hash TEXT PRIMARY KEY,
    type TEXT NOT NULL CHECK(type IN ('blob', 'tree', 'commit')),
    content BLOB NOT NULL,
    size INTEGER NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);
CREATE TABLE IF NOT EXISTS commits (
    hash TEXT PRIMARY KEY,
    parent_hash TEXT,
    tree_hash TEXT NOT NULL,
    author_id TEXT NOT NULL,
    author_role TEXT,
    author_email TEXT,
    process_name TEXT NOT NULL,
    process_version TEXT,
    process_params TEXT,
    process_source TEXT,
    message TEXT,
    timestamp INTEGER NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_commits_parent ON commits(parent_hash);
CREATE INDEX IF NOT EXISTS idx_commits_author ON commits(author_id);
CREATE INDEX IF NOT EXISTS idx_commits_process ON commits(process_name);
CREATE INDEX IF NOT EXISTS idx_commits_timestamp ON commits(timestamp);
CREATE TABLE IF NOT EXISTS changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    commit_hash TEXT NOT NULL,
    table_name TEXT NOT NULL,
    operation TEXT NOT NULL CHECK(operation IN ('INSERT', 'UPDATE', 'DELETE')),
    primary_key TEXT NOT NULL,
    before_hash TEXT,
    after_hash TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (commit_hash) REFERENCES commits(hash)
);
CREATE INDEX IF NOT EXISTS idx_changes_commit ON changes(commit_hash);
CREATE INDEX IF NOT EXISTS idx_changes_table ON changes(table_name);
CREATE TABLE IF NOT EXISTS refs (
    name TEXT PRIMARY KEY,
    hash TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now'))
);
INSERT OR IGNORE INTO refs (name, hash) VALUES ('HEAD', '');
CREATE TABLE IF NOT EXISTS config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
INSERT OR IGNORE INTO config (key, value) VALUES ('schema_version', '1');
";

/// The SQLite-backed commit store.
///
/// Holds commits keyed by hex `commit_id`, one row per change, the mutable
/// `refs` map (`HEAD` included), repository config, and auxiliary objects.
/// One writer at a time; transactions via [`begin`]/[`commit_txn`]/
/// [`rollback`] do not nest.
///
/// [`begin`]: Database::begin
/// [`commit_txn`]: Database::commit_txn
/// [`rollback`]: Database::rollback
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (or create) the database file and enable foreign keys.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        debug!(path = %path.display(), "opened commit store");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create tables, indexes, and the seed rows (`HEAD`, `schema_version`).
    pub fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// The stored schema version, if the config table exists.
    pub fn schema_version(&self) -> StoreResult<Option<String>> {
        let version = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    // -- transactions ------------------------------------------------------

    pub fn begin(&self) -> StoreResult<()> {
        self.conn.execute_batch("BEGIN TRANSACTION;")?;
        Ok(())
    }

    pub fn commit_txn(&self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn rollback(&self) -> StoreResult<()> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    // -- commits -----------------------------------------------------------

    /// Insert a finalized envelope and its changes.
    ///
    /// A zero `parent_id` is stored as SQL NULL, never as the hex of zero.
    /// Storing the same `commit_id` twice violates the primary key and fails.
    pub fn store_commit(&self, env: &Envelope) -> StoreResult<()> {
        if env.commit_id.is_zero() {
            return Err(StoreError::InvalidArg("envelope is not finalized".into()));
        }
        let author_id = env
            .author
            .id
            .as_deref()
            .ok_or_else(|| StoreError::InvalidArg("envelope has no author id".into()))?;
        let process_name = env
            .process
            .name
            .as_deref()
            .ok_or_else(|| StoreError::InvalidArg("envelope has no process name".into()))?;

        let commit_hex = env.commit_id.to_hex();
        let parent_hex = (!env.parent_id.is_zero()).then(|| env.parent_id.to_hex());

        self.conn.execute(
            "INSERT INTO commits (hash, parent_hash, tree_hash, author_id, author_role,
                 author_email, process_name, process_version, process_params,
                 process_source, message, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                commit_hex,
                parent_hex,
                env.tree_hash.to_hex(),
                author_id,
                env.author.role,
                env.author.email,
                process_name,
                env.process.version,
                env.process.params,
                env.process.source,
                env.message,
                env.timestamp,
            ],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO changes (commit_hash, table_name, operation, primary_key,
                 before_hash, after_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for change in &env.changes {
            let before_hex = (!change.before_digest.is_zero()).then(|| change.before_digest.to_hex());
            let after_hex = (!change.after_digest.is_zero()).then(|| change.after_digest.to_hex());
            stmt.execute(params![
                commit_hex,
                change.table_name,
                change.operation.as_str(),
                change.primary_key,
                before_hex,
                after_hex,
            ])?;
        }

        debug!(commit = %env.commit_id.short_hex(), changes = env.changes.len(), "stored commit");
        Ok(())
    }

    /// Load a complete envelope, changes in insertion order. `None` if the
    /// commit does not exist.
    pub fn load_commit(&self, id: &Digest) -> StoreResult<Option<Envelope>> {
        let hex = id.to_hex();
        let row = self
            .conn
            .query_row(
                "SELECT hash, parent_hash, tree_hash, author_id, author_role, author_email,
                        process_name, process_version, process_params, process_source,
                        message, timestamp
                 FROM commits WHERE hash = ?1",
                params![hex],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, Option<String>>(8)?,
                        row.get::<_, Option<String>>(9)?,
                        row.get::<_, Option<String>>(10)?,
                        row.get::<_, i64>(11)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            commit_hex,
            parent_hex,
            tree_hex,
            author_id,
            author_role,
            author_email,
            process_name,
            process_version,
            process_params,
            process_source,
            message,
            timestamp,
        )) = row
        else {
            return Ok(None);
        };

        let mut env = Envelope::new();
        env.commit_id = parse_digest(&commit_hex)?;
        if let Some(parent) = parent_hex {
            env.parent_id = parse_digest(&parent)?;
        }
        env.tree_hash = parse_digest(&tree_hex)?;
        env.author.id = Some(author_id);
        env.author.role = author_role;
        env.author.email = author_email;
        env.set_process(process_name, process_version, process_params);
        if let Some(source) = process_source {
            env.set_process_source(source);
        }
        env.message = message;
        env.timestamp = timestamp;

        let mut stmt = self.conn.prepare(
            "SELECT table_name, operation, primary_key, before_hash, after_hash
             FROM changes WHERE commit_hash = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![hex], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        for row in rows {
            let (table, op, pk, before, after) = row?;
            let operation: Operation = op
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("bad operation tag {op:?}")))?;
            let before = match before {
                Some(hex) => parse_digest(&hex)?,
                None => Digest::zero(),
            };
            let after = match after {
                Some(hex) => parse_digest(&hex)?,
                None => Digest::zero(),
            };
            env.add_change(table, operation, pk, before, after);
        }

        Ok(Some(env))
    }

    pub fn commit_exists(&self, id: &Digest) -> StoreResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM commits WHERE hash = ?1 LIMIT 1",
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Walk the parent chain from `from` (or `HEAD` when `None`), newest
    /// first. Stops on a zero parent, a missing parent, or after `limit` ids
    /// (0 means the default of 100).
    pub fn get_history(&self, from: Option<&Digest>, limit: usize) -> StoreResult<Vec<Digest>> {
        let limit = if limit == 0 { DEFAULT_HISTORY_LIMIT } else { limit };

        let mut current = match from {
            Some(d) if !d.is_zero() => *d,
            _ => match self.get_ref("HEAD") {
                Ok(head) => head,
                Err(StoreError::NotFound(_)) => return Ok(Vec::new()),
                Err(e) => return Err(e),
            },
        };

        let mut out = Vec::new();
        let mut stmt = self
            .conn
            .prepare("SELECT parent_hash FROM commits WHERE hash = ?1")?;
        while out.len() < limit && !current.is_zero() {
            out.push(current);
            let parent: Option<Option<String>> = stmt
                .query_row(params![current.to_hex()], |row| row.get(0))
                .optional()?;
            current = match parent.flatten() {
                Some(hex) => parse_digest(&hex)?,
                None => Digest::zero(),
            };
        }
        Ok(out)
    }

    /// All commits by an author id, timestamp descending.
    pub fn find_by_author(&self, author_id: &str) -> StoreResult<Vec<Digest>> {
        self.find_by_column(
            "SELECT hash FROM commits WHERE author_id = ?1 ORDER BY timestamp DESC",
            author_id,
        )
    }

    /// All commits by a process name, timestamp descending.
    pub fn find_by_process(&self, process_name: &str) -> StoreResult<Vec<Digest>> {
        self.find_by_column(
            "SELECT hash FROM commits WHERE process_name = ?1 ORDER BY timestamp DESC",
            process_name,
        )
    }

    fn find_by_column(&self, sql: &str, value: &str) -> StoreResult<Vec<Digest>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![value], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(parse_digest(&row?)?);
        }
        Ok(out)
    }

    /// Every commit in the store, newest first. Used by full verification.
    pub fn all_commits(&self) -> StoreResult<Vec<Digest>> {
        let mut stmt = self
            .conn
            .prepare("SELECT hash FROM commits ORDER BY timestamp DESC, rowid DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(parse_digest(&row?)?);
        }
        Ok(out)
    }

    pub fn commit_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // -- refs --------------------------------------------------------------

    /// Resolve a named ref. The empty-string sentinel (an unborn `HEAD`)
    /// resolves to the zero digest; an absent name is `NotFound`.
    pub fn get_ref(&self, name: &str) -> StoreResult<Digest> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT hash FROM refs WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match value {
            None => Err(StoreError::NotFound(format!("ref {name:?}"))),
            Some(hex) if hex.len() == 64 => parse_digest(&hex),
            Some(_) => Ok(Digest::zero()),
        }
    }

    /// Upsert a named ref.
    pub fn set_ref(&self, name: &str, digest: &Digest) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO refs (name, hash, updated_at)
             VALUES (?1, ?2, datetime('now'))",
            params![name, digest.to_hex()],
        )?;
        Ok(())
    }

    // -- config ------------------------------------------------------------

    pub fn get_config(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_config(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // -- auxiliary objects -------------------------------------------------

    /// Store a typed blob content-addressed by its Git-style digest.
    /// Re-storing identical content is a no-op.
    pub fn store_object(&self, kind: ObjectKind, content: &[u8]) -> StoreResult<Digest> {
        let digest = hash_object(kind, content);
        self.conn.execute(
            "INSERT OR IGNORE INTO objects (hash, type, content, size)
             VALUES (?1, ?2, ?3, ?4)",
            params![digest.to_hex(), kind.as_str(), content, content.len() as i64],
        )?;
        Ok(digest)
    }

    pub fn load_object(&self, id: &Digest) -> StoreResult<(ObjectKind, Vec<u8>)> {
        let row: Option<(String, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT type, content FROM objects WHERE hash = ?1",
                params![id.to_hex()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            None => Err(StoreError::ObjectMissing(*id)),
            Some((kind, content)) => {
                let kind = kind
                    .parse()
                    .map_err(|_| StoreError::Corrupt(format!("bad object type {kind:?}")))?;
                Ok((kind, content))
            }
        }
    }

    pub fn object_exists(&self, id: &Digest) -> StoreResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM objects WHERE hash = ?1 LIMIT 1",
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn parse_digest(hex: &str) -> StoreResult<Digest> {
    Digest::from_hex(hex).map_err(|e| StoreError::Corrupt(format!("bad digest {hex:?}: {e}")))
}
