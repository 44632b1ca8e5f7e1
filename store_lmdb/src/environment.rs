//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use reval_types::Clock;

use crate::schema;
use crate::verification::LmdbVerificationStore;
use crate::LmdbError;

/// Named databases inside the environment.
pub(crate) const RECORDS_DB: &str = "records";
pub(crate) const LIVE_BY_MEMBER_DB: &str = "live_by_member";
pub(crate) const META_DB: &str = "meta";

const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    /// `link` -> bincode(VerificationRecord)
    pub(crate) records_db: Database<Bytes, Bytes>,
    /// `group_id \0 member_id` -> `link`, only for unverified records.
    pub(crate) live_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Fails with [`LmdbError::UnsupportedSchema`] when the database was
    /// written by a newer release.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and the
        // directory is not shared with another process using different flags.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let records_db = env.create_database(&mut wtxn, Some(RECORDS_DB))?;
        let live_db = env.create_database(&mut wtxn, Some(LIVE_BY_MEMBER_DB))?;
        let meta_db = env.create_database(&mut wtxn, Some(META_DB))?;
        schema::ensure(&mut wtxn, meta_db)?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            records_db,
            live_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Version stamped on this database.
    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        Ok(schema::read_version(&rtxn, self.meta_db)?.unwrap_or(0))
    }

    /// Overwrite the schema stamp. Only useful for exercising the open check.
    #[doc(hidden)]
    pub fn force_schema_version(&self, version: u32) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        schema::write_version(&mut wtxn, self.meta_db, version)?;
        wtxn.commit()?;
        Ok(())
    }

    /// A verification store backed by this environment.
    pub fn verification_store(&self, clock: Arc<dyn Clock>) -> LmdbVerificationStore {
        LmdbVerificationStore {
            env: self.env.clone(),
            records_db: self.records_db,
            live_db: self.live_db,
            clock,
        }
    }
}
