//! On-disk schema version, kept under a single key in the `meta` database.

use heed::types::Bytes;
use heed::{Database, RwTxn};

use crate::LmdbError;

/// Layout written by this release: `records` plus the `live_by_member` index.
pub const SCHEMA_VERSION: u32 = 1;

const VERSION_KEY: &[u8] = b"schema_version";

pub(crate) fn read_version(
    txn: &heed::RoTxn<'_>,
    meta_db: Database<Bytes, Bytes>,
) -> Result<Option<u32>, LmdbError> {
    let Some(bytes) = meta_db.get(txn, VERSION_KEY)? else {
        return Ok(None);
    };
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization("schema version is not 4 bytes".to_string()))?;
    Ok(Some(u32::from_le_bytes(arr)))
}

pub(crate) fn write_version(
    txn: &mut RwTxn<'_>,
    meta_db: Database<Bytes, Bytes>,
    version: u32,
) -> Result<(), LmdbError> {
    meta_db.put(txn, VERSION_KEY, &version.to_le_bytes())?;
    Ok(())
}

/// Stamp a fresh database, accept a current one, refuse a newer one.
///
/// There is only one layout so far, so an older stamp cannot exist.
pub(crate) fn ensure(
    txn: &mut RwTxn<'_>,
    meta_db: Database<Bytes, Bytes>,
) -> Result<(), LmdbError> {
    match read_version(txn, meta_db)? {
        None => {
            tracing::info!(version = SCHEMA_VERSION, "stamping new database");
            write_version(txn, meta_db, SCHEMA_VERSION)
        }
        Some(SCHEMA_VERSION) => Ok(()),
        Some(found) => Err(LmdbError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        }),
    }
}
