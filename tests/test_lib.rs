extern crate primary_db;

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use diesel::connection::SimpleConnection;
    use diesel::dsl::sql;
    use diesel::prelude::*;
    use diesel::sql_types::{BigInt, Text};
    use failure::Error;
    use tempfile::TempDir;

    use primary_db::*;

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("primary.sqlite")
    }

    fn new_store(checksum: &str) -> Result<(TempDir, PackageStore), Error> {
        let dir = tempfile::tempdir()?;
        let path = store_path(&dir);
        create_store(&path, checksum)?;
        let store = PackageStore::open(&path)?;
        Ok((dir, store))
    }

    fn connect(path: &Path) -> Result<SqliteConnection, Error> {
        Ok(SqliteConnection::establish(path.to_str().unwrap())?)
    }

    fn count(conn: &SqliteConnection, table: &str, pkg_key: i64) -> Result<i64, Error> {
        let query = format!("SELECT COUNT(*) FROM {} WHERE pkgKey = {}", table, pkg_key);
        Ok(sql::<BigInt>(&query).get_result::<i64>(conn)?)
    }

    fn schema_objects(path: &Path) -> Result<Vec<(String, String)>, Error> {
        let conn = connect(path)?;
        Ok(sql::<(Text, Text)>("SELECT type, name FROM sqlite_master ORDER BY type, name")
            .load::<(String, String)>(&conn)?)
    }

    fn expect_kind(err: StoreError, expected: fn(&ErrorKind) -> bool) {
        assert!(expected(err.kind()), "unexpected error: {}", err);
    }

    fn coreutils() -> PackageRecord {
        let mut p = PackageRecord::new(
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
            ChecksumType::Sha256,
            "coreutils",
            "x86_64",
            Evr::new("0", "8.32", "31.fc34"),
            "Packages/c/coreutils-8.32-31.fc34.x86_64.rpm");
        p.summary = Some("A set of basic GNU tools commonly used in shell scripts".to_owned());
        p.description = Some("These are the GNU core utilities.".to_owned());
        p.url = Some("https://www.gnu.org/software/coreutils/".to_owned());
        p.time = Times { file: 1_630_000_000, build: 1_629_000_000 };
        p.rpm = RpmInfo {
            license: Some("GPLv3+".to_owned()),
            vendor: Some("Fedora Project".to_owned()),
            group: Some("Unspecified".to_owned()),
            buildhost: Some("buildhw-x86-01.iad2.fedoraproject.org".to_owned()),
            sourcerpm: Some("coreutils-8.32-31.fc34.src.rpm".to_owned()),
            header_start: Some(4504),
            header_end: Some(22_068),
            packager: Some("Fedora Project".to_owned()),
        };
        p.size = Sizes { package: 1_215_892, installed: 6_086_394, archive: 6_100_000 };
        p.location.base = Some("https://mirror.example.org/fedora/".to_owned());
        p.requires = vec![
            Requirement {
                dependency: Dependency::versioned(
                    "coreutils-common", Flags::Eq, "0", "8.32", Some("31.fc34")),
                pre: false,
            },
            Requirement {
                dependency: Dependency::new("/bin/sh"),
                pre: true,
            },
        ];
        p.provides = vec![
            Dependency::versioned("coreutils", Flags::Eq, "0", "8.32", Some("31.fc34")),
            Dependency::new("/bin/ls"),
        ];
        p.conflicts = vec![Dependency::versioned("coreutils-single", Flags::Lt, "0", "8.0", None)];
        p.obsoletes = vec![Dependency::versioned("fileutils", Flags::Le, "0", "4.1", None)];
        p.files = vec![
            FileEntry { name: "/usr/bin/ls".to_owned(), file_type: FileType::File },
            FileEntry { name: "/usr/libexec/coreutils".to_owned(), file_type: FileType::Dir },
            FileEntry { name: "/var/log/coreutils.log".to_owned(), file_type: FileType::Ghost },
        ];
        p
    }

    fn zlib() -> PackageRecord {
        let mut p = PackageRecord::new(
            "60303ae22b998861bce3b28f33eec1be758a213c86c93c076dbe9f558c11c752",
            ChecksumType::Sha256,
            "zlib",
            "x86_64",
            Evr::new("0", "1.2.11", "26.fc34"),
            "Packages/z/zlib-1.2.11-26.fc34.x86_64.rpm");
        p.requires = vec![Requirement {
            dependency: Dependency::new("libc.so.6()(64bit)"),
            pre: false,
        }];
        p.provides = vec![Dependency::new("libz.so.1()(64bit)")];
        p.files = vec![
            FileEntry { name: "/usr/lib64/libz.so.1".to_owned(), file_type: FileType::File },
        ];
        p
    }

    #[test]
    fn empty_store() -> Result<(), Error> {
        let (_dir, store) = new_store("")?;
        assert!(store.list_packages()?.is_empty());
        Ok(())
    }

    #[test]
    fn db_info_is_stamped() -> Result<(), Error> {
        let (_dir, store) = new_store("e4007b1ed6155e2ab087f0afe99ceb85")?;
        assert_eq!(store.info(), &DbInfo {
            version: SCHEMA_VERSION,
            checksum: Some("e4007b1ed6155e2ab087f0afe99ceb85".to_owned()),
        });
        Ok(())
    }

    #[test]
    fn create_honors_location() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("repodata").join("nested").join("primary.sqlite");
        create_store(&path, "")?;
        assert!(path.exists());
        PackageStore::open(&path)?;
        Ok(())
    }

    #[test]
    fn rebuild_replaces_everything() -> Result<(), Error> {
        let (dir, store) = new_store("first")?;
        let path = store_path(&dir);
        let objects = schema_objects(&path)?;
        assert_eq!(objects.iter().filter(|(t, _)| t == "table").count(), 7);
        assert_eq!(objects.iter().filter(|(t, _)| t == "index").count(), 10);
        assert_eq!(objects.iter().filter(|(t, _)| t == "trigger").count(), 1);
        store.insert_package(&coreutils())?;
        create_store(&path, "second")?;
        assert_eq!(schema_objects(&path)?, objects);
        let store = PackageStore::open(&path)?;
        assert_eq!(store.info().checksum, Some("second".to_owned()));
        assert!(store.list_packages()?.is_empty());
        Ok(())
    }

    #[test]
    fn round_trip() -> Result<(), Error> {
        let (_dir, store) = new_store("")?;
        let expected = vec![coreutils(), zlib()];
        for p in &expected {
            store.insert_package(p)?;
        }
        let mut actual = store.list_packages()?;
        actual.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(actual, expected);
        Ok(())
    }

    #[test]
    fn bash_with_two_requires() -> Result<(), Error> {
        let (dir, store) = new_store("")?;
        let conn = connect(&store_path(&dir))?;
        conn.batch_execute("
            INSERT INTO packages (pkgKey, pkgId, name, arch, version, epoch, release,
                                  time_file, time_build, size_package, size_installed,
                                  size_archive, location_href, checksum_type)
            VALUES (1, 'abc123def456', 'bash', 'x86_64', '5.1', '0', '2.fc34',
                    1615000000, 1614000000, 1700000, 7500000, 7600000,
                    'Packages/b/bash-5.1-2.fc34.x86_64.rpm', 'sha256');
            INSERT INTO requires (name, flags, epoch, version, release, pkgKey, pre)
            VALUES ('libtinfo.so.6()(64bit)', NULL, NULL, NULL, NULL, 1, 'FALSE'),
                   ('filesystem', 'GE', '0', '3', NULL, 1, 'TRUE');
        ")?;
        let packages = store.list_packages()?;
        assert_eq!(packages.len(), 1);
        let bash = &packages[0];
        assert_eq!(bash.name, "bash");
        assert_eq!(bash.evr.version, "5.1");
        assert_eq!(bash.pkg_id, "abc123def456");
        assert_eq!(bash.checksum_type, ChecksumType::Sha256);
        assert_eq!(bash.location.base, None);
        assert_eq!(bash.requires, vec![
            Requirement { dependency: Dependency::new("libtinfo.so.6()(64bit)"), pre: false },
            Requirement {
                dependency: Dependency::versioned("filesystem", Flags::Ge, "0", "3", None),
                pre: true,
            },
        ]);
        assert!(bash.provides.is_empty());
        assert!(bash.files.is_empty());
        Ok(())
    }

    #[test]
    fn delete_cascades_to_owned_rows_only() -> Result<(), Error> {
        let (dir, store) = new_store("")?;
        store.insert_package(&coreutils())?;
        store.insert_package(&zlib())?;
        let conn = connect(&store_path(&dir))?;
        let keys = sql::<BigInt>("SELECT pkgKey FROM packages ORDER BY pkgKey")
            .load::<i64>(&conn)?;
        let (coreutils_key, zlib_key) = (keys[0], keys[1]);
        let tables = ["files", "requires", "provides", "conflicts", "obsoletes"];
        let zlib_counts = tables
            .iter()
            .map(|t| count(&conn, t, zlib_key))
            .collect::<Result<Vec<_>, Error>>()?;
        assert_eq!(zlib_counts, vec![1, 1, 1, 0, 0]);
        assert_eq!(store.delete_package(&coreutils().pkg_id)?, 1);
        for (t, expected) in tables.iter().zip(&zlib_counts) {
            assert_eq!(count(&conn, t, coreutils_key)?, 0, "{}", t);
            assert_eq!(count(&conn, t, zlib_key)?, *expected, "{}", t);
        }
        assert_eq!(store.list_packages()?, vec![zlib()]);
        assert_eq!(store.delete_package(&coreutils().pkg_id)?, 0);
        Ok(())
    }

    #[test]
    fn integrity_check_finds_orphans() -> Result<(), Error> {
        let (dir, store) = new_store("")?;
        store.insert_package(&coreutils())?;
        assert!(store.check_integrity()?.iter().all(|(_, n)| *n == 0));
        let conn = connect(&store_path(&dir))?;
        conn.batch_execute("
            INSERT INTO provides (name, pkgKey) VALUES ('ghost-capability', 4242);
            INSERT INTO files (name, type, pkgKey) VALUES ('/nowhere', 'file', NULL);
        ")?;
        let counts = store.check_integrity()?;
        assert_eq!(counts, vec![
            ("files", 1),
            ("requires", 0),
            ("provides", 1),
            ("conflicts", 0),
            ("obsoletes", 0),
        ]);
        // Orphans are not attached to any record.
        assert_eq!(store.list_packages()?, vec![coreutils()]);
        Ok(())
    }

    #[test]
    fn duplicate_pkg_id_is_rejected() -> Result<(), Error> {
        let (_dir, store) = new_store("")?;
        store.insert_package(&zlib())?;
        let err = store.insert_package(&zlib()).unwrap_err();
        expect_kind(err, |k| match k { ErrorKind::Write(_) => true, _ => false });
        assert_eq!(store.list_packages()?.len(), 1);
        Ok(())
    }

    #[test]
    fn duplicate_is_found_under_legacy_checksum_spelling() -> Result<(), Error> {
        let (dir, store) = new_store("")?;
        connect(&store_path(&dir))?.batch_execute("
            INSERT INTO packages (pkgId, name, arch, version, epoch, release, time_file,
                                  time_build, size_package, size_installed, size_archive,
                                  location_href, checksum_type)
            VALUES ('0123456789abcdef0123456789abcdef01234567', 'which', 'x86_64', '2.21',
                    '0', '13.el7', 1, 2, 3, 4, 5, 'which-2.21-13.el7.x86_64.rpm', 'sha');
        ")?;
        let packages = store.list_packages()?;
        assert_eq!(packages[0].checksum_type, ChecksumType::Sha1);
        let err = store.insert_package(&packages[0]).unwrap_err();
        expect_kind(err, |k| match k { ErrorKind::Write(_) => true, _ => false });
        assert_eq!(store.list_packages()?.len(), 1);
        Ok(())
    }

    #[test]
    fn create_reports_the_failing_stage() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("repodata");
        std::fs::write(&blocker, b"not a directory")?;
        let err = create_store(&blocker.join("primary.sqlite"), "").unwrap_err();
        let message = err.to_string();
        expect_kind(err, |k| match k { ErrorKind::StoreInit(_) => true, _ => false });
        assert!(message.starts_with("Failed to initialize store: failed to remove the old"),
                "{}", message);
        assert!(blocker.is_file());
        Ok(())
    }

    #[test]
    fn decode_failure_stops_the_sequence() -> Result<(), Error> {
        let (dir, store) = new_store("")?;
        store.insert_package(&zlib())?;
        let conn = connect(&store_path(&dir))?;
        conn.batch_execute("
            INSERT INTO packages (pkgId, name, arch, version, epoch, release, time_file,
                                  time_build, size_package, size_installed, size_archive,
                                  location_href, checksum_type)
            VALUES ('deadbeef', NULL, 'noarch', '1', '0', '1', 0, 0, 0, 0, 0,
                    'broken.rpm', 'sha256');
        ")?;
        store.insert_package(&coreutils())?;

        let mut packages = store.packages()?;
        assert_eq!(packages.total(), 3);
        assert_eq!(packages.next().unwrap()?, zlib());
        let err = packages.next().unwrap().unwrap_err();
        let message = err.to_string();
        expect_kind(err, |k| match k { ErrorKind::RowDecode(_) => true, _ => false });
        assert!(message.contains("row 2 of 3"), "{}", message);
        assert!(message.contains("column `name` is NULL"), "{}", message);
        assert_eq!(packages.read(), 1);
        assert!(packages.next().is_none());

        let err = store.list_packages().unwrap_err();
        expect_kind(err, |k| match k { ErrorKind::RowDecode(_) => true, _ => false });
        Ok(())
    }

    #[test]
    fn unknown_flags_fail_to_decode() -> Result<(), Error> {
        let (dir, store) = new_store("")?;
        store.insert_package(&zlib())?;
        let conn = connect(&store_path(&dir))?;
        conn.batch_execute("
            INSERT INTO obsoletes (name, flags, pkgKey)
            SELECT 'zlib-old', 'NE', pkgKey FROM packages;
        ")?;
        let err = store.list_packages().unwrap_err();
        let message = err.to_string();
        expect_kind(err, |k| match k { ErrorKind::RowDecode(_) => true, _ => false });
        assert!(message.contains("obsoletes"), "{}", message);
        Ok(())
    }

    #[test]
    fn non_integer_cells_fail_to_decode() -> Result<(), Error> {
        let (dir, store) = new_store("")?;
        let conn = connect(&store_path(&dir))?;
        conn.batch_execute("
            INSERT INTO packages (pkgId, name, arch, version, epoch, release, time_file,
                                  time_build, size_package, size_installed, size_archive,
                                  location_href, checksum_type)
            VALUES ('cafe', 'tzdata', 'noarch', '2021a', '0', '1', 'yesterday', 0,
                    'huge', 1.9, 0, 'tzdata.rpm', 'sha256');
        ")?;
        let err = store.list_packages().unwrap_err();
        let message = err.to_string();
        expect_kind(err, |k| match k { ErrorKind::RowDecode(_) => true, _ => false });
        assert!(message.contains("column `time_file` is not an integer"), "{}", message);

        conn.batch_execute("UPDATE packages SET time_file = 1630000000;")?;
        let err = store.list_packages().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("column `size_package` is not an integer"), "{}", message);

        conn.batch_execute("UPDATE packages SET size_package = 1024;")?;
        let err = store.list_packages().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("column `size_installed` is not an integer (\"1.9\")"),
                "{}", message);

        conn.batch_execute("UPDATE packages SET size_installed = 2048;")?;
        let packages = store.list_packages()?;
        assert_eq!(packages[0].time.file, 1_630_000_000);
        assert_eq!(packages[0].size, Sizes { package: 1024, installed: 2048, archive: 0 });
        Ok(())
    }

    #[test]
    fn open_missing_file() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let path = store_path(&dir);
        let err = PackageStore::open(&path).unwrap_err();
        expect_kind(err, |k| match k { ErrorKind::Open(_) => true, _ => false });
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn open_rejects_other_versions() -> Result<(), Error> {
        let (dir, _store) = new_store("")?;
        let path = store_path(&dir);
        connect(&path)?.batch_execute("UPDATE db_info SET dbversion = 9;")?;
        let err = PackageStore::open(&path).unwrap_err();
        let message = err.to_string();
        expect_kind(err, |k| match k { ErrorKind::Open(_) => true, _ => false });
        assert!(message.contains("Unsupported dbversion 9"), "{}", message);
        Ok(())
    }

    #[test]
    fn open_rejects_missing_tables() -> Result<(), Error> {
        let (dir, _store) = new_store("")?;
        let path = store_path(&dir);
        connect(&path)?.batch_execute("DROP TABLE conflicts;")?;
        let err = PackageStore::open(&path).unwrap_err();
        let message = err.to_string();
        expect_kind(err, |k| match k { ErrorKind::Open(_) => true, _ => false });
        assert!(message.contains("Missing tables: conflicts"), "{}", message);
        Ok(())
    }

    #[test]
    fn query_error_after_schema_change() -> Result<(), Error> {
        let (dir, store) = new_store("")?;
        connect(&store_path(&dir))?.batch_execute("DROP TABLE files;")?;
        let err = store.list_packages().unwrap_err();
        expect_kind(err, |k| match k { ErrorKind::Query(_) => true, _ => false });
        Ok(())
    }
}
