//! Typed package records as stored in a primary database.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use failure::{format_err, Error};

/// Algorithm of the payload checksum whose value is the package's `pkgId`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChecksumType {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumType::Md5 => "md5",
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Sha224 => "sha224",
            ChecksumType::Sha256 => "sha256",
            ChecksumType::Sha384 => "sha384",
            ChecksumType::Sha512 => "sha512",
        }
    }
}

impl FromStr for ChecksumType {
    type Err = Error;

    fn from_str(s: &str) -> Result<ChecksumType, Error> {
        match s {
            "md5" => Ok(ChecksumType::Md5),
            // createrepo writes plain "sha" for sha1
            "sha" | "sha1" => Ok(ChecksumType::Sha1),
            "sha224" => Ok(ChecksumType::Sha224),
            "sha256" => Ok(ChecksumType::Sha256),
            "sha384" => Ok(ChecksumType::Sha384),
            "sha512" => Ok(ChecksumType::Sha512),
            _ => Err(format_err!("Unknown checksum type: {:?}", s)),
        }
    }
}

impl Display for ChecksumType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version comparison of a dependency relation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Flags {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Flags {
    /// Spelling used in the `flags` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Flags::Eq => "EQ",
            Flags::Lt => "LT",
            Flags::Le => "LE",
            Flags::Gt => "GT",
            Flags::Ge => "GE",
        }
    }

    pub fn operator(self) -> &'static str {
        match self {
            Flags::Eq => "=",
            Flags::Lt => "<",
            Flags::Le => "<=",
            Flags::Gt => ">",
            Flags::Ge => ">=",
        }
    }
}

impl FromStr for Flags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Flags, Error> {
        match s {
            "EQ" => Ok(Flags::Eq),
            "LT" => Ok(Flags::Lt),
            "LE" => Ok(Flags::Le),
            "GT" => Ok(Flags::Gt),
            "GE" => Ok(Flags::Ge),
            _ => Err(format_err!("Unknown dependency flags: {:?}", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FileType {
    File,
    Dir,
    Ghost,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Dir => "dir",
            FileType::Ghost => "ghost",
        }
    }
}

impl FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<FileType, Error> {
        match s {
            "file" => Ok(FileType::File),
            "dir" => Ok(FileType::Dir),
            "ghost" => Ok(FileType::Ghost),
            _ => Err(format_err!("Unknown file type: {:?}", s)),
        }
    }
}

/// Epoch, version and release of a package.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Evr {
    pub epoch: String,
    pub version: String,
    pub release: String,
}

impl Evr {
    pub fn new(epoch: &str, version: &str, release: &str) -> Evr {
        Evr {
            epoch: epoch.to_owned(),
            version: version.to_owned(),
            release: release.to_owned(),
        }
    }
}

/// Formats as rpm does, omitting a zero or empty epoch.
impl Display for Evr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if !self.epoch.is_empty() && self.epoch != "0" {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}-{}", self.version, self.release)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Location {
    pub href: String,
    pub base: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Sizes {
    pub package: i64,
    pub installed: i64,
    pub archive: i64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Times {
    pub file: i64,
    pub build: i64,
}

/// Fields copied from the rpm header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RpmInfo {
    pub license: Option<String>,
    pub vendor: Option<String>,
    pub group: Option<String>,
    pub buildhost: Option<String>,
    pub sourcerpm: Option<String>,
    pub header_start: Option<i64>,
    pub header_end: Option<i64>,
    pub packager: Option<String>,
}

/// One row of provides, conflicts or obsoletes.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub flags: Option<Flags>,
    pub epoch: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
}

impl Dependency {
    /// An unversioned dependency on `name`.
    pub fn new(name: &str) -> Dependency {
        Dependency {
            name: name.to_owned(),
            flags: None,
            epoch: None,
            version: None,
            release: None,
        }
    }

    pub fn versioned(name: &str, flags: Flags, epoch: &str, version: &str, release: Option<&str>)
                     -> Dependency {
        Dependency {
            name: name.to_owned(),
            flags: Some(flags),
            epoch: Some(epoch.to_owned()),
            version: Some(version.to_owned()),
            release: release.map(ToOwned::to_owned),
        }
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.name)?;
        let flags = match self.flags {
            Some(t) => t,
            None => return Ok(()),
        };
        write!(f, " {} ", flags.operator())?;
        if let Some(epoch) = self.epoch.as_ref().filter(|e| !e.is_empty() && e.as_str() != "0") {
            write!(f, "{}:", epoch)?;
        }
        if let Some(version) = &self.version {
            f.write_str(version)?;
        }
        if let Some(release) = &self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

/// One row of requires.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Requirement {
    pub dependency: Dependency,
    /// Needed before the package's %pre scriptlet runs.
    pub pre: bool,
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.dependency)?;
        if self.pre {
            f.write_str(" (pre)")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub file_type: FileType,
}

/// A package and everything the store knows about it.
///
/// Records are identified by `pkg_id` and `checksum_type`; the store's internal
/// `pkgKey` never leaves it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageRecord {
    pub pkg_id: String,
    pub checksum_type: ChecksumType,
    pub name: String,
    pub arch: String,
    pub evr: Evr,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub time: Times,
    pub rpm: RpmInfo,
    pub size: Sizes,
    pub location: Location,
    pub requires: Vec<Requirement>,
    pub provides: Vec<Dependency>,
    pub conflicts: Vec<Dependency>,
    pub obsoletes: Vec<Dependency>,
    pub files: Vec<FileEntry>,
}

impl PackageRecord {
    /// A record with the identifying fields set and everything else empty.
    pub fn new(pkg_id: &str, checksum_type: ChecksumType, name: &str, arch: &str, evr: Evr,
               location_href: &str) -> PackageRecord {
        PackageRecord {
            pkg_id: pkg_id.to_owned(),
            checksum_type,
            name: name.to_owned(),
            arch: arch.to_owned(),
            evr,
            summary: None,
            description: None,
            url: None,
            time: Times::default(),
            rpm: RpmInfo::default(),
            size: Sizes::default(),
            location: Location {
                href: location_href.to_owned(),
                base: None,
            },
            requires: Vec::new(),
            provides: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            files: Vec::new(),
        }
    }

    /// `name-[epoch:]version-release.arch`
    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.evr, self.arch)
    }
}
