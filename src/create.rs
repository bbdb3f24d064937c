//! Creation of empty primary databases.

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use failure::ResultExt;
use log::{debug, info};

use crate::errors::{ErrorKind, StoreError};
use crate::fs::{create_parent_all, remove_database, sqlite_uri};
use crate::schema::db_info;

/// `db_info.dbversion` of databases created and accepted by this crate.
pub const SCHEMA_VERSION: i64 = 10;

/// Tables every primary database has.
pub const TABLES: [&str; 7] =
    ["db_info", "packages", "files", "requires", "provides", "conflicts", "obsoletes"];

const CREATE_TABLES: &str = "
CREATE TABLE db_info (dbversion INTEGER, checksum TEXT);
CREATE TABLE packages (
  pkgKey INTEGER PRIMARY KEY,
  pkgId TEXT,
  name TEXT,
  arch TEXT,
  version TEXT,
  epoch TEXT,
  release TEXT,
  summary TEXT,
  description TEXT,
  url TEXT,
  time_file INTEGER,
  time_build INTEGER,
  rpm_license TEXT,
  rpm_vendor TEXT,
  rpm_group TEXT,
  rpm_buildhost TEXT,
  rpm_sourcerpm TEXT,
  rpm_header_start INTEGER,
  rpm_header_end INTEGER,
  rpm_packager TEXT,
  size_package INTEGER,
  size_installed INTEGER,
  size_archive INTEGER,
  location_href TEXT,
  location_base TEXT,
  checksum_type TEXT);
CREATE TABLE files (name TEXT, type TEXT, pkgKey INTEGER);
CREATE TABLE requires (
  name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgKey INTEGER,
  pre BOOLEAN DEFAULT FALSE);
CREATE TABLE provides (
  name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgKey INTEGER);
CREATE TABLE conflicts (
  name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgKey INTEGER);
CREATE TABLE obsoletes (
  name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgKey INTEGER);
";

const CREATE_INDEXES: &str = "
CREATE INDEX packagename ON packages (name);
CREATE INDEX packageId ON packages (pkgId);
CREATE INDEX filenames ON files (name);
CREATE INDEX pkgfiles ON files (pkgKey);
CREATE INDEX pkgrequires ON requires (pkgKey);
CREATE INDEX requiresname ON requires (name);
CREATE INDEX pkgprovides ON provides (pkgKey);
CREATE INDEX providesname ON provides (name);
CREATE INDEX pkgconflicts ON conflicts (pkgKey);
CREATE INDEX pkgobsoletes ON obsoletes (pkgKey);
";

const CREATE_TRIGGERS: &str = "
CREATE TRIGGER removals AFTER DELETE ON packages
BEGIN
  DELETE FROM files WHERE pkgKey = old.pkgKey;
  DELETE FROM requires WHERE pkgKey = old.pkgKey;
  DELETE FROM provides WHERE pkgKey = old.pkgKey;
  DELETE FROM conflicts WHERE pkgKey = old.pkgKey;
  DELETE FROM obsoletes WHERE pkgKey = old.pkgKey;
END;
";

fn init_error(what: &str) -> ErrorKind {
    ErrorKind::StoreInit(what.to_owned())
}

/// Creates an empty primary database at `path`, replacing whatever was there.
///
/// `checksum` is the digest of the metadata the database is going to be filled from;
/// it is stored in `db_info` alongside [`SCHEMA_VERSION`].
///
/// On error the file at `path` is unusable and must be recreated.
pub fn create_store(path: &Path, checksum: &str) -> Result<(), StoreError> {
    info!("Creating primary database {:?}...", path);
    if remove_database(path).context(init_error("failed to remove the old database"))? {
        debug!("Removed the old database {:?}", path);
    }
    create_parent_all(path).context(init_error("failed to create the parent directory"))?;
    let database_url = sqlite_uri(path, "rwc").context(init_error("malformed path"))?;
    let conn = SqliteConnection::establish(&database_url)
        .with_context(|_| init_error(&format!(
            "SqliteConnection::establish({}) failed", database_url)))?;
    conn.batch_execute(CREATE_TABLES)
        .context(init_error("failed to create tables"))?;
    conn.batch_execute(CREATE_INDEXES)
        .context(init_error("failed to create indexes"))?;
    conn.batch_execute(CREATE_TRIGGERS)
        .context(init_error("failed to create triggers"))?;
    diesel::insert_into(db_info::table)
        .values((
            db_info::dbversion.eq(SCHEMA_VERSION),
            db_info::checksum.eq(checksum),
        ))
        .execute(&conn)
        .context(init_error("failed to insert into db_info"))?;
    debug!("Created primary database {:?} (dbversion {})", path, SCHEMA_VERSION);
    Ok(())
}
