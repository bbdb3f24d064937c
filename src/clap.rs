use std::env;

use clap::{Arg, ArgMatches};

pub const DEFAULT_DATABASE: &str = "primary.sqlite";

pub fn database_url_arg() -> Arg<'static, 'static> {
    Arg::with_name("DATABASE_URL")
        .long("database-url")
        .takes_value(true)
        .global(true)
        .help("Path of the primary database [env: DATABASE_URL]")
}

/// `--database-url`, then `DATABASE_URL` (possibly from `.env`), then the default.
pub fn database_url_value(matches: &ArgMatches) -> String {
    matches
        .value_of("DATABASE_URL")
        .map(std::borrow::ToOwned::to_owned)
        .or_else(|| { env::var("DATABASE_URL").ok() })
        .unwrap_or_else(|| DEFAULT_DATABASE.to_owned())
}
