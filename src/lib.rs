#[macro_use]
extern crate diesel;

pub mod clap;
pub mod create;
pub mod db;
pub mod errors;
pub mod fs;
pub mod hashes;
mod models;
pub mod package;
pub mod schema;

pub use crate::create::{create_store, SCHEMA_VERSION};
pub use crate::db::{DbInfo, PackageStore, Packages};
pub use crate::errors::{ErrorKind, StoreError};
pub use crate::package::*;
