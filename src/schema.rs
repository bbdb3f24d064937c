// Every column except packages.pkgKey is nullable in the on-disk DDL, so nullability
// is checked while decoding rather than by diesel.
// Tables without a primary key expose SQLite's implicit rowid instead.
// Integer columns of packages are read as text: diesel's BigInt reader turns a
// non-numeric cell into 0 and truncates reals.

table! {
    db_info (rowid) {
        rowid -> BigInt,
        dbversion -> Nullable<BigInt>,
        checksum -> Nullable<Text>,
    }
}

table! {
    packages (pkgKey) {
        pkgKey -> BigInt,
        pkgId -> Nullable<Text>,
        name -> Nullable<Text>,
        arch -> Nullable<Text>,
        version -> Nullable<Text>,
        epoch -> Nullable<Text>,
        release -> Nullable<Text>,
        summary -> Nullable<Text>,
        description -> Nullable<Text>,
        url -> Nullable<Text>,
        time_file -> Nullable<Text>,
        time_build -> Nullable<Text>,
        rpm_license -> Nullable<Text>,
        rpm_vendor -> Nullable<Text>,
        rpm_group -> Nullable<Text>,
        rpm_buildhost -> Nullable<Text>,
        rpm_sourcerpm -> Nullable<Text>,
        rpm_header_start -> Nullable<Text>,
        rpm_header_end -> Nullable<Text>,
        rpm_packager -> Nullable<Text>,
        size_package -> Nullable<Text>,
        size_installed -> Nullable<Text>,
        size_archive -> Nullable<Text>,
        location_href -> Nullable<Text>,
        location_base -> Nullable<Text>,
        checksum_type -> Nullable<Text>,
    }
}

table! {
    files (rowid) {
        rowid -> BigInt,
        name -> Nullable<Text>,
        #[sql_name = "type"]
        file_type -> Nullable<Text>,
        pkgKey -> Nullable<BigInt>,
    }
}

table! {
    requires (rowid) {
        rowid -> BigInt,
        name -> Nullable<Text>,
        flags -> Nullable<Text>,
        epoch -> Nullable<Text>,
        version -> Nullable<Text>,
        release -> Nullable<Text>,
        pkgKey -> Nullable<BigInt>,
        // BOOLEAN affinity: 0/1 from us, TRUE/FALSE text from older writers.
        pre -> Nullable<Text>,
    }
}

table! {
    provides (rowid) {
        rowid -> BigInt,
        name -> Nullable<Text>,
        flags -> Nullable<Text>,
        epoch -> Nullable<Text>,
        version -> Nullable<Text>,
        release -> Nullable<Text>,
        pkgKey -> Nullable<BigInt>,
    }
}

table! {
    conflicts (rowid) {
        rowid -> BigInt,
        name -> Nullable<Text>,
        flags -> Nullable<Text>,
        epoch -> Nullable<Text>,
        version -> Nullable<Text>,
        release -> Nullable<Text>,
        pkgKey -> Nullable<BigInt>,
    }
}

table! {
    obsoletes (rowid) {
        rowid -> BigInt,
        name -> Nullable<Text>,
        flags -> Nullable<Text>,
        epoch -> Nullable<Text>,
        version -> Nullable<Text>,
        release -> Nullable<Text>,
        pkgKey -> Nullable<BigInt>,
    }
}
