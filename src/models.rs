//! Raw rows as diesel loads them, and their decoding into `crate::package` types.

use failure::{bail, format_err, Error, ResultExt};

use crate::package::*;

#[derive(Queryable)]
pub struct PackageRow {
    pub pkg_key: i64,
    pub pkg_id: Option<String>,
    pub name: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
    pub epoch: Option<String>,
    pub release: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub time_file: Option<String>,
    pub time_build: Option<String>,
    pub rpm_license: Option<String>,
    pub rpm_vendor: Option<String>,
    pub rpm_group: Option<String>,
    pub rpm_buildhost: Option<String>,
    pub rpm_sourcerpm: Option<String>,
    pub rpm_header_start: Option<String>,
    pub rpm_header_end: Option<String>,
    pub rpm_packager: Option<String>,
    pub size_package: Option<String>,
    pub size_installed: Option<String>,
    pub size_archive: Option<String>,
    pub location_href: Option<String>,
    pub location_base: Option<String>,
    pub checksum_type: Option<String>,
}

#[derive(Queryable)]
pub struct DependencyRow {
    pub pkg_key: Option<i64>,
    pub name: Option<String>,
    pub flags: Option<String>,
    pub epoch: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
}

#[derive(Queryable)]
pub struct RequiresRow {
    pub pkg_key: Option<i64>,
    pub name: Option<String>,
    pub flags: Option<String>,
    pub epoch: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
    pub pre: Option<String>,
}

#[derive(Queryable)]
pub struct FileRow {
    pub pkg_key: Option<i64>,
    pub name: Option<String>,
    pub file_type: Option<String>,
}

fn required<T>(value: Option<T>, column: &str) -> Result<T, Error> {
    value.ok_or_else(|| format_err!("column `{}` is NULL", column))
}

fn integer(value: Option<String>, column: &str) -> Result<Option<i64>, Error> {
    match value {
        Some(s) => {
            let v = s
                .parse::<i64>()
                .with_context(|_| format!("column `{}` is not an integer ({:?})", column, s))?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

fn size(value: Option<String>, column: &str) -> Result<i64, Error> {
    let v = required(integer(value, column)?, column)?;
    if v < 0 {
        bail!("column `{}` is negative ({})", column, v);
    }
    Ok(v)
}

fn flags(value: Option<String>) -> Result<Option<Flags>, Error> {
    match value {
        // Some writers store an empty string rather than NULL.
        Some(ref s) if s.is_empty() => Ok(None),
        Some(s) => Ok(Some(s.parse::<Flags>().context("column `flags`")?)),
        None => Ok(None),
    }
}

fn pre(value: Option<String>) -> Result<bool, Error> {
    match value.as_ref().map(String::as_str) {
        None | Some("0") | Some("FALSE") | Some("false") => Ok(false),
        Some("1") | Some("TRUE") | Some("true") => Ok(true),
        Some(s) => bail!("column `pre` has unexpected value {:?}", s),
    }
}

impl PackageRow {
    pub fn decode(self) -> Result<PackageRecord, Error> {
        let checksum_type = required(self.checksum_type, "checksum_type")?
            .parse::<ChecksumType>()
            .context("column `checksum_type`")?;
        Ok(PackageRecord {
            pkg_id: required(self.pkg_id, "pkgId")?,
            checksum_type,
            name: required(self.name, "name")?,
            arch: required(self.arch, "arch")?,
            evr: Evr {
                epoch: required(self.epoch, "epoch")?,
                version: required(self.version, "version")?,
                release: required(self.release, "release")?,
            },
            summary: self.summary,
            description: self.description,
            url: self.url,
            time: Times {
                file: required(integer(self.time_file, "time_file")?, "time_file")?,
                build: required(integer(self.time_build, "time_build")?, "time_build")?,
            },
            rpm: RpmInfo {
                license: self.rpm_license,
                vendor: self.rpm_vendor,
                group: self.rpm_group,
                buildhost: self.rpm_buildhost,
                sourcerpm: self.rpm_sourcerpm,
                header_start: integer(self.rpm_header_start, "rpm_header_start")?,
                header_end: integer(self.rpm_header_end, "rpm_header_end")?,
                packager: self.rpm_packager,
            },
            size: Sizes {
                package: size(self.size_package, "size_package")?,
                installed: size(self.size_installed, "size_installed")?,
                archive: size(self.size_archive, "size_archive")?,
            },
            location: Location {
                href: required(self.location_href, "location_href")?,
                base: self.location_base,
            },
            requires: Vec::new(),
            provides: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            files: Vec::new(),
        })
    }
}

pub trait DecodeRow {
    type Decoded;

    fn pkg_key(&self) -> Option<i64>;
    fn decode(self) -> Result<Self::Decoded, Error>;
}

impl DecodeRow for DependencyRow {
    type Decoded = Dependency;

    fn pkg_key(&self) -> Option<i64> {
        self.pkg_key
    }

    fn decode(self) -> Result<Dependency, Error> {
        Ok(Dependency {
            name: required(self.name, "name")?,
            flags: flags(self.flags)?,
            epoch: self.epoch,
            version: self.version,
            release: self.release,
        })
    }
}

impl DecodeRow for RequiresRow {
    type Decoded = Requirement;

    fn pkg_key(&self) -> Option<i64> {
        self.pkg_key
    }

    fn decode(self) -> Result<Requirement, Error> {
        Ok(Requirement {
            pre: pre(self.pre)?,
            dependency: Dependency {
                name: required(self.name, "name")?,
                flags: flags(self.flags)?,
                epoch: self.epoch,
                version: self.version,
                release: self.release,
            },
        })
    }
}

impl DecodeRow for FileRow {
    type Decoded = FileEntry;

    fn pkg_key(&self) -> Option<i64> {
        self.pkg_key
    }

    fn decode(self) -> Result<FileEntry, Error> {
        let file_type = match self.file_type {
            Some(s) => s.parse::<FileType>().context("column `type`")?,
            None => FileType::File,
        };
        Ok(FileEntry {
            name: required(self.name, "name")?,
            file_type,
        })
    }
}
