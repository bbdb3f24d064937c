use std::path::Path;
use std::process;

use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version, AppSettings,
    Arg, ArgMatches, SubCommand,
};
use dotenv::dotenv;
use failure::{bail, Error, ResultExt};
use itertools::Itertools;
use prettytable::{cell, row, Table};

use primary_db::clap::{database_url_arg, database_url_value};
use primary_db::hashes::hexdigest_path;
use primary_db::{create_store, ChecksumType, PackageRecord, PackageStore};

fn create(path: &Path, matches: &ArgMatches) -> Result<(), Error> {
    let checksum = match (matches.value_of("CHECKSUM"), matches.value_of("SOURCE")) {
        (Some(checksum), _) => checksum.to_owned(),
        (None, Some(source)) => {
            let checksum_type = matches
                .value_of("CHECKSUM_TYPE")
                .unwrap_or("sha256")
                .parse::<ChecksumType>()?;
            hexdigest_path(Path::new(source), checksum_type)?
        }
        (None, None) => String::new(),
    };
    create_store(path, &checksum)?;
    println!("Created {}", path.display());
    Ok(())
}

fn info(store: &PackageStore) {
    let info = store.info();
    println!("dbversion: {}", info.version);
    println!("checksum: {}", info.checksum.as_ref().map(String::as_str).unwrap_or(""));
}

fn print_details(p: &PackageRecord) {
    println!("{} ({} {})", p.nevra(), p.checksum_type, p.pkg_id);
    if let Some(summary) = &p.summary {
        println!("  summary: {}", summary);
    }
    println!("  location: {}{}",
             p.location.base.as_ref().map(String::as_str).unwrap_or(""), p.location.href);
    for r in &p.requires {
        println!("  requires: {}", r);
    }
    for (what, dependencies) in &[
        ("provides", &p.provides),
        ("conflicts", &p.conflicts),
        ("obsoletes", &p.obsoletes),
    ] {
        for d in dependencies.iter() {
            println!("  {}: {}", what, d);
        }
    }
    for f in &p.files {
        println!("  {}: {}", f.file_type.as_str(), f.name);
    }
}

fn list(store: &PackageStore, verbose: bool) -> Result<(), Error> {
    let packages = store.list_packages()?;
    if verbose {
        for p in &packages {
            print_details(p);
        }
        return Ok(());
    }
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row!["Name", "Version", "Arch", "Size", "Requires", "Provides", "Files"]);
    for p in &packages {
        table.add_row(row![
            p.name,
            p.evr,
            p.arch,
            pretty_bytes::converter::convert(p.size.package as f64),
            p.requires.len(),
            p.provides.len(),
            p.files.len()
        ]);
    }
    table.printstd();
    println!("{} packages", packages.len());
    Ok(())
}

fn remove(store: &PackageStore, pkg_ids: Vec<String>) -> Result<(), Error> {
    for pkg_id in pkg_ids {
        match store.delete_package(&pkg_id)? {
            0 => bail!("No package with pkgId {}", pkg_id),
            n => println!("Removed {} package(s) with pkgId {}", n, pkg_id),
        }
    }
    Ok(())
}

fn check(store: &PackageStore) -> Result<bool, Error> {
    let counts = store.check_integrity()?;
    let orphans = counts.iter().filter(|(_, count)| *count > 0).collect::<Vec<_>>();
    if orphans.is_empty() {
        println!("OK");
        return Ok(true);
    }
    println!("Rows without a package: {}",
             orphans.iter().map(|(table, count)| format!("{} {}", count, table)).join(", "));
    Ok(false)
}

fn main() -> Result<(), Error> {
    dotenv().ok();
    env_logger::init();
    let matches = app_from_crate!()
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(database_url_arg())
        .subcommand(SubCommand::with_name("create")
            .about("Creates an empty database, replacing an existing one")
            .arg(Arg::with_name("CHECKSUM")
                .long("checksum")
                .takes_value(true)
                .conflicts_with("SOURCE"))
            .arg(Arg::with_name("SOURCE")
                .long("source")
                .takes_value(true)
                .help("Metadata file whose digest is stored in db_info"))
            .arg(Arg::with_name("CHECKSUM_TYPE")
                .long("checksum-type")
                .takes_value(true)
                .requires("SOURCE")))
        .subcommand(SubCommand::with_name("info")
            .about("Prints the db_info record"))
        .subcommand(SubCommand::with_name("list")
            .about("Lists packages")
            .arg(Arg::with_name("VERBOSE")
                .short("v")
                .long("verbose")))
        .subcommand(SubCommand::with_name("remove")
            .about("Removes packages together with their relations and files")
            .arg(Arg::with_name("PKGID")
                .required(true)
                .index(1)
                .multiple(true)))
        .subcommand(SubCommand::with_name("check")
            .about("Looks for rows that reference no package"))
        .get_matches();
    let (name, sub_matches) = matches.subcommand();
    let sub_matches = match sub_matches {
        Some(t) => t,
        None => bail!("No subcommand"),
    };
    let database_url = database_url_value(sub_matches);
    let path = Path::new(&database_url);
    if name == "create" {
        return create(path, sub_matches);
    }
    let store = PackageStore::open(path)
        .with_context(|_| format!("Failed to open {}", database_url))?;
    match name {
        "info" => info(&store),
        "list" => list(&store, sub_matches.is_present("VERBOSE"))?,
        "remove" => remove(&store, sub_matches.values_of_lossy("PKGID").unwrap_or_default())?,
        "check" => if !check(&store)? {
            process::exit(1);
        },
        _ => unreachable!(),
    }
    Ok(())
}
