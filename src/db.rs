//! Reading and writing package records of a primary database.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use failure::{bail, Error, ResultExt};
use itertools::Itertools;
use log::{debug, info, warn};

use crate::create::{SCHEMA_VERSION, TABLES};
use crate::errors::{ErrorKind, StoreError};
use crate::fs::sqlite_uri;
use crate::models::*;
use crate::package::*;
use crate::schema::*;

no_arg_sql_function!(
    last_insert_rowid, BigInt, "Represents the SQLite last_insert_rowid() function");

/// Tables whose rows belong to a package through `pkgKey`.
pub const DEPENDENT_TABLES: [&str; 5] =
    ["files", "requires", "provides", "conflicts", "obsoletes"];

/// The `db_info` row of a store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DbInfo {
    pub version: i64,
    /// Checksum of the metadata the store was built from.
    pub checksum: Option<String>,
}

/// Handle to an existing primary database.
///
/// The handle holds no connection: every operation connects, does its work and
/// disconnects before returning.
#[derive(Debug)]
pub struct PackageStore {
    path: PathBuf,
    info: DbInfo,
}

fn connect(path: &Path, mode: &str) -> Result<SqliteConnection, Error> {
    let database_url = sqlite_uri(path, mode)?;
    let conn = SqliteConnection::establish(&database_url)
        .with_context(|_| format!("SqliteConnection::establish({}) failed", database_url))?;
    Ok(conn)
}

fn validate(conn: &SqliteConnection) -> Result<DbInfo, Error> {
    let tables = sql::<Text>("SELECT name FROM sqlite_master WHERE type = 'table'")
        .load::<String>(conn)
        .context("Failed to list tables")?;
    let missing: Vec<&str> = TABLES
        .iter()
        .cloned()
        .filter(|table| !tables.iter().any(|t| t == *table))
        .collect();
    if !missing.is_empty() {
        bail!("Missing tables: {}", missing.join(", "));
    }
    let rows = db_info::table
        .select((db_info::dbversion, db_info::checksum))
        .load::<(Option<i64>, Option<String>)>(conn)
        .context("Failed to query db_info")?;
    let (version, checksum) = match rows.as_slice() {
        [(Some(version), checksum)] => (*version, checksum.clone()),
        [(None, _)] => bail!("db_info.dbversion is NULL"),
        _ => bail!("db_info has {} rows, expected 1", rows.len()),
    };
    if version != SCHEMA_VERSION {
        bail!("Unsupported dbversion {}, expected {}", version, SCHEMA_VERSION);
    }
    Ok(DbInfo { version, checksum })
}

fn group_by_pkg_key<R: DecodeRow>(table: &str, rows: Vec<R>) -> HashMap<i64, Vec<R>> {
    let mut map = HashMap::new();
    for (pkg_key, group) in &rows.into_iter().group_by(|r| r.pkg_key()) {
        match pkg_key {
            Some(pkg_key) => map.entry(pkg_key).or_insert_with(Vec::new).extend(group),
            None => warn!("Ignoring {} {} rows without pkgKey", group.count(), table),
        }
    }
    map
}

macro_rules! load_dependencies {
    ($conn:expr, $table:ident) => {
        $table::table
            .select((
                $table::pkgKey,
                $table::name,
                $table::flags,
                $table::epoch,
                $table::version,
                $table::release,
            ))
            .order(($table::pkgKey, $table::rowid))
            .load::<DependencyRow>($conn)
            .context(ErrorKind::Query(format!("SELECT FROM {}", stringify!($table))))
    }
}

struct Relations {
    requires: HashMap<i64, Vec<RequiresRow>>,
    provides: HashMap<i64, Vec<DependencyRow>>,
    conflicts: HashMap<i64, Vec<DependencyRow>>,
    obsoletes: HashMap<i64, Vec<DependencyRow>>,
    files: HashMap<i64, Vec<FileRow>>,
}

impl Relations {
    fn load(conn: &SqliteConnection) -> Result<Relations, StoreError> {
        let requires = requires::table
            .select((
                requires::pkgKey,
                requires::name,
                requires::flags,
                requires::epoch,
                requires::version,
                requires::release,
                requires::pre,
            ))
            .order((requires::pkgKey, requires::rowid))
            .load::<RequiresRow>(conn)
            .context(ErrorKind::Query("SELECT FROM requires".to_owned()))?;
        let provides = load_dependencies!(conn, provides)?;
        let conflicts = load_dependencies!(conn, conflicts)?;
        let obsoletes = load_dependencies!(conn, obsoletes)?;
        let files = files::table
            .select((files::pkgKey, files::name, files::file_type))
            .order((files::pkgKey, files::rowid))
            .load::<FileRow>(conn)
            .context(ErrorKind::Query("SELECT FROM files".to_owned()))?;
        debug!("Loaded {} requires, {} provides, {} conflicts, {} obsoletes, {} files",
               requires.len(), provides.len(), conflicts.len(), obsoletes.len(), files.len());
        Ok(Relations {
            requires: group_by_pkg_key("requires", requires),
            provides: group_by_pkg_key("provides", provides),
            conflicts: group_by_pkg_key("conflicts", conflicts),
            obsoletes: group_by_pkg_key("obsoletes", obsoletes),
            files: group_by_pkg_key("files", files),
        })
    }

    fn orphan_count(&self) -> usize {
        self.requires.values().map(Vec::len).sum::<usize>() +
            self.provides.values().map(Vec::len).sum::<usize>() +
            self.conflicts.values().map(Vec::len).sum::<usize>() +
            self.obsoletes.values().map(Vec::len).sum::<usize>() +
            self.files.values().map(Vec::len).sum::<usize>()
    }
}

fn take_decoded<R: DecodeRow>(
    map: &mut HashMap<i64, Vec<R>>, pkg_key: i64, table: &str,
) -> Result<Vec<R::Decoded>, Error> {
    map.remove(&pkg_key)
        .unwrap_or_default()
        .into_iter()
        .map(DecodeRow::decode)
        .collect::<Result<Vec<_>, Error>>()
        .with_context(|_| format!("table `{}`", table))
        .map_err(Error::from)
}

/// Package records of a store, decoded one at a time.
///
/// Yields at most one error, after which it is exhausted.
pub struct Packages {
    rows: std::vec::IntoIter<PackageRow>,
    relations: Relations,
    total: usize,
    read: usize,
    done: bool,
}

impl Packages {
    /// Number of package rows in the store.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of records yielded so far.
    pub fn read(&self) -> usize {
        self.read
    }

    fn decode(&mut self, row: PackageRow) -> Result<PackageRecord, Error> {
        let pkg_key = row.pkg_key;
        let mut record = row.decode().context("table `packages`")?;
        record.requires = take_decoded(&mut self.relations.requires, pkg_key, "requires")?;
        record.provides = take_decoded(&mut self.relations.provides, pkg_key, "provides")?;
        record.conflicts = take_decoded(&mut self.relations.conflicts, pkg_key, "conflicts")?;
        record.obsoletes = take_decoded(&mut self.relations.obsoletes, pkg_key, "obsoletes")?;
        record.files = take_decoded(&mut self.relations.files, pkg_key, "files")?;
        Ok(record)
    }
}

impl Iterator for Packages {
    type Item = Result<PackageRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let row = match self.rows.next() {
            Some(t) => t,
            None => {
                self.done = true;
                let orphans = self.relations.orphan_count();
                if orphans > 0 {
                    warn!("{} relation and file rows reference no package", orphans);
                }
                return None;
            }
        };
        let pkg_key = row.pkg_key;
        let position = self.read + 1;
        match self.decode(row) {
            Ok(record) => {
                self.read = position;
                Some(Ok(record))
            }
            Err(e) => {
                self.done = true;
                let kind = ErrorKind::RowDecode(format!(
                    "row {} of {} (pkgKey {}), {} read before failure",
                    position, self.total, pkg_key, self.read));
                Some(Err(e.context(kind).into()))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.total - self.read))
        }
    }
}

macro_rules! insert_into_returning_rowid {
    ($conn:expr, $table:expr, $desc:expr, ($($vs:expr),* $(,)?)) => {{
        diesel::insert_into($table)
            .values(($($vs,)*))
            .execute($conn)
            .context(format!("Failed to insert {}", $desc))?;
        diesel::select(last_insert_rowid)
            .get_result::<i64>($conn)
            .context(format!("Failed to query the rowid of {}", $desc))?
    }}
}

macro_rules! insert_dependencies {
    ($conn:expr, $table:ident, $pkg_key:expr, $dependencies:expr) => {
        for d in $dependencies {
            diesel::insert_into($table::table)
                .values((
                    $table::name.eq(&d.name),
                    $table::flags.eq(d.flags.map(Flags::as_str)),
                    $table::epoch.eq(&d.epoch),
                    $table::version.eq(&d.version),
                    $table::release.eq(&d.release),
                    $table::pkgKey.eq($pkg_key),
                ))
                .execute($conn)
                .context(format!("Failed to insert into {}", stringify!($table)))?;
        }
    }
}

fn insert_package(conn: &SqliteConnection, p: &PackageRecord) -> Result<i64, Error> {
    // Older writers spell some checksum types differently, e.g. `sha` for sha1.
    let stored = packages::table
        .select(packages::checksum_type)
        .filter(packages::pkgId.eq(&p.pkg_id))
        .load::<Option<String>>(conn)
        .context("Failed to query packages by pkgId")?;
    let duplicate = stored
        .iter()
        .flatten()
        .any(|t| t.parse::<ChecksumType>().ok() == Some(p.checksum_type));
    if duplicate {
        bail!("{} {} is already stored", p.checksum_type, p.pkg_id);
    }
    let pkg_key = insert_into_returning_rowid![
        conn,
        packages::table,
        "a package",
        (
            packages::pkgId.eq(&p.pkg_id),
            packages::name.eq(&p.name),
            packages::arch.eq(&p.arch),
            packages::version.eq(&p.evr.version),
            packages::epoch.eq(&p.evr.epoch),
            packages::release.eq(&p.evr.release),
            packages::summary.eq(&p.summary),
            packages::description.eq(&p.description),
            packages::url.eq(&p.url),
            packages::time_file.eq(p.time.file.to_string()),
            packages::time_build.eq(p.time.build.to_string()),
            packages::rpm_license.eq(&p.rpm.license),
            packages::rpm_vendor.eq(&p.rpm.vendor),
            packages::rpm_group.eq(&p.rpm.group),
            packages::rpm_buildhost.eq(&p.rpm.buildhost),
            packages::rpm_sourcerpm.eq(&p.rpm.sourcerpm),
            packages::rpm_header_start.eq(p.rpm.header_start.map(|v| v.to_string())),
            packages::rpm_header_end.eq(p.rpm.header_end.map(|v| v.to_string())),
            packages::rpm_packager.eq(&p.rpm.packager),
            packages::size_package.eq(p.size.package.to_string()),
            packages::size_installed.eq(p.size.installed.to_string()),
            packages::size_archive.eq(p.size.archive.to_string()),
            packages::location_href.eq(&p.location.href),
            packages::location_base.eq(&p.location.base),
            packages::checksum_type.eq(p.checksum_type.as_str()),
        )];
    for r in &p.requires {
        let d = &r.dependency;
        diesel::insert_into(requires::table)
            .values((
                requires::name.eq(&d.name),
                requires::flags.eq(d.flags.map(Flags::as_str)),
                requires::epoch.eq(&d.epoch),
                requires::version.eq(&d.version),
                requires::release.eq(&d.release),
                requires::pkgKey.eq(pkg_key),
                requires::pre.eq(if r.pre { "1" } else { "0" }),
            ))
            .execute(conn)
            .context("Failed to insert into requires")?;
    }
    insert_dependencies!(conn, provides, pkg_key, &p.provides);
    insert_dependencies!(conn, conflicts, pkg_key, &p.conflicts);
    insert_dependencies!(conn, obsoletes, pkg_key, &p.obsoletes);
    for f in &p.files {
        diesel::insert_into(files::table)
            .values((
                files::name.eq(&f.name),
                files::file_type.eq(f.file_type.as_str()),
                files::pkgKey.eq(pkg_key),
            ))
            .execute(conn)
            .context("Failed to insert into files")?;
    }
    Ok(pkg_key)
}

impl PackageStore {
    /// Opens the primary database at `path` after checking its tables and `db_info`.
    ///
    /// The file is opened read-only, so a missing file is an error rather than
    /// being created.
    pub fn open(path: &Path) -> Result<PackageStore, StoreError> {
        let conn = connect(path, "ro")
            .context(ErrorKind::Open(format!("{:?}", path)))?;
        let info = validate(&conn)
            .context(ErrorKind::Open(format!("{:?}", path)))?;
        debug!("Opened primary database {:?} (dbversion {})", path, info.version);
        Ok(PackageStore {
            path: path.to_owned(),
            info,
        })
    }

    pub fn info(&self) -> &DbInfo {
        &self.info
    }

    /// Loads every package with its relations and files; records are decoded as the
    /// returned iterator advances.
    ///
    /// Packages come in `pkgKey` order, which is the order they were inserted in
    /// unless keys were reused after deletion.
    pub fn packages(&self) -> Result<Packages, StoreError> {
        info!("Reading package lists from {:?}...", self.path);
        let conn = connect(&self.path, "ro")
            .context(ErrorKind::Query(format!("{:?}", self.path)))?;
        let rows = packages::table
            .order(packages::pkgKey)
            .load::<PackageRow>(&conn)
            .context(ErrorKind::Query("SELECT FROM packages".to_owned()))?;
        let relations = Relations::load(&conn)?;
        Ok(Packages {
            total: rows.len(),
            rows: rows.into_iter(),
            relations,
            read: 0,
            done: false,
        })
    }

    /// All package records; fails on the first row that does not decode.
    pub fn list_packages(&self) -> Result<Vec<PackageRecord>, StoreError> {
        self.packages()?.collect()
    }

    /// Stores `record` with its relations and files in a single transaction.
    ///
    /// A package with the same `pkg_id` and `checksum_type` must not already be stored.
    pub fn insert_package(&self, record: &PackageRecord) -> Result<(), StoreError> {
        debug!("Inserting package {}...", record.nevra());
        let conn = connect(&self.path, "rw")
            .context(ErrorKind::Write(format!("{:?}", self.path)))?;
        conn.transaction::<_, Error, _>(|| insert_package(&conn, record))
            .with_context(|_| ErrorKind::Write(format!("insert {}", record.nevra())))?;
        Ok(())
    }

    /// Deletes the packages whose `pkgId` is `pkg_id`. Their relations and files go
    /// away with them through the `removals` trigger.
    ///
    /// Returns the number of packages deleted.
    pub fn delete_package(&self, pkg_id: &str) -> Result<usize, StoreError> {
        info!("Deleting package {}...", pkg_id);
        let conn = connect(&self.path, "rw")
            .context(ErrorKind::Write(format!("{:?}", self.path)))?;
        let count = diesel::delete(packages::table.filter(packages::pkgId.eq(pkg_id)))
            .execute(&conn)
            .with_context(|_| ErrorKind::Write(format!("delete {}", pkg_id)))?;
        Ok(count)
    }

    /// Number of rows in each dependent table whose `pkgKey` matches no package.
    pub fn check_integrity(&self) -> Result<Vec<(&'static str, i64)>, StoreError> {
        let conn = connect(&self.path, "ro")
            .context(ErrorKind::Query(format!("{:?}", self.path)))?;
        DEPENDENT_TABLES
            .iter()
            .map(|&table| -> Result<(&'static str, i64), StoreError> {
                let query = format!(
                    "SELECT COUNT(*) FROM {} WHERE pkgKey IS NULL OR \
                     pkgKey NOT IN (SELECT pkgKey FROM packages)",
                    table);
                let count = sql::<BigInt>(&query)
                    .get_result::<i64>(&conn)
                    .with_context(|_| ErrorKind::Query(format!("count orphans in {}", table)))?;
                Ok((table, count))
            })
            .collect()
    }
}
