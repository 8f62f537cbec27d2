//! fiz-dataset CLI
//!
//! Entry point for the `fiz-dataset` command-line tool.

use clap::{Parser, Subcommand};
use fiz_dataset::{
    build_token, validate_token, ConfigCache, Dataset, DatasetError, DatasetSorter, Lookup,
    ReminderKey, Value,
};
use std::fmt::Display;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::prelude::*;

/// Exit code for a token whose MAC does not verify
const EXIT_AUTHENTICATION: i32 = 2;

/// Exit code for malformed encoded input
const EXIT_SYNTAX: i32 = 3;

#[derive(Parser)]
#[command(name = "fiz-dataset")]
#[command(about = "Inspect, encode and sign multi-valued datasets", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical encoding of a TOML, JSON or .fiz file
    Encode {
        file: PathBuf,
    },

    /// Decode a canonical encoding and print it as JSON
    Decode {
        /// Encoded file, or "-" for stdin
        file: PathBuf,
    },

    /// Print the value(s) at a dotted path
    Get {
        file: PathBuf,

        path: String,

        /// Print every match instead of the first
        #[arg(long)]
        all: bool,
    },

    /// Write a signed reminder token for a dataset to stdout
    Sign {
        /// Reminder name
        #[arg(long)]
        name: String,

        /// Hex-encoded secret
        #[arg(long)]
        secret: String,

        file: PathBuf,
    },

    /// Validate a reminder token and print its name and body as JSON
    Verify {
        /// Hex-encoded secret
        #[arg(long)]
        secret: String,

        /// Token file, or "-" for stdin
        token: PathBuf,
    },

    /// Sort the records under a path and print them as JSON
    Sort {
        file: PathBuf,

        /// Path of the repeated record datasets
        #[arg(long)]
        records: String,

        /// Sort key as path[:string|float|integer[:asc|desc]], highest priority first
        #[arg(long = "key", required = true)]
        keys: Vec<String>,
    },

    /// Resolve a named configuration along a search path
    Config {
        /// Search directory, highest precedence first (repeatable)
        #[arg(long = "dir", short = 'd', required = true)]
        dirs: Vec<PathBuf>,

        name: String,

        /// Path to print; without it, the contributing files are listed
        path: Option<String>,

        #[arg(long)]
        all: bool,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { file } => run_encode(&file),
        Commands::Decode { file } => run_decode(&file),
        Commands::Get { file, path, all } => run_get(&file, &path, all),
        Commands::Sign { name, secret, file } => run_sign(&name, &secret, &file),
        Commands::Verify { secret, token } => run_verify(&secret, &token),
        Commands::Sort {
            file,
            records,
            keys,
        } => run_sort(&file, &records, &keys),
        Commands::Config {
            dirs,
            name,
            path,
            all,
        } => run_config(dirs, &name, path.as_deref(), all),
    }
}

fn fail(context: &str, err: impl Display, code: i32) -> ! {
    eprintln!("{}: {}", context, err);
    process::exit(code);
}

fn exit_code(err: &DatasetError) -> i32 {
    if err.is_authentication() {
        EXIT_AUTHENTICATION
    } else if err.is_syntax() {
        EXIT_SYNTAX
    } else {
        1
    }
}

fn read_input(path: &Path) -> Vec<u8> {
    let result = if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).map(|_| buf)
    } else {
        fs::read(path)
    };
    match result {
        Ok(bytes) => bytes,
        Err(e) => fail(&format!("Error reading {}", path.display()), e, 1),
    }
}

fn load(path: &Path) -> Dataset {
    match Dataset::from_file(path) {
        Ok(ds) => ds,
        Err(e) => fail("Error loading dataset", e, 1),
    }
}

fn write_stdout(bytes: &[u8]) {
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(bytes).and_then(|_| stdout.flush()) {
        fail("Error writing output", e, 1);
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail("Error serializing output", e, 1),
    }
}

fn to_json(ds: &Dataset) -> serde_json::Value {
    match ds.to_json_value() {
        Ok(json) => json,
        Err(e) => fail("Error reading dataset", &e, exit_code(&e)),
    }
}

fn print_value(value: &Value) {
    match value {
        Value::String(s) => println!("{}", s),
        Value::Dataset(ds) => print_json(&to_json(ds)),
    }
}

fn print_lookup(source: &dyn Lookup, path: &str, all: bool) {
    let result = if all {
        source.get_all(path)
    } else {
        source.get(path).map(|value| vec![value])
    };
    match result {
        Ok(values) => values.iter().for_each(print_value),
        Err(e) => fail("Lookup failed", &e, exit_code(&e)),
    }
}

fn parse_key(secret: &str) -> ReminderKey {
    match ReminderKey::from_hex(secret) {
        Ok(key) => key,
        Err(e) => fail("Invalid secret", e, 1),
    }
}

fn run_encode(file: &Path) {
    let ds = load(file);
    match ds.serialize() {
        Ok(bytes) => write_stdout(&bytes),
        Err(e) => fail("Error encoding dataset", &e, exit_code(&e)),
    }
}

fn run_decode(file: &Path) {
    let input = read_input(file);
    // Tolerate the newline an editor or shell appends
    let input = input
        .strip_suffix(b"\n")
        .map(|rest| rest.strip_suffix(b"\r").unwrap_or(rest))
        .unwrap_or(&input);
    match Dataset::deserialize(input) {
        Ok(ds) => print_json(&to_json(&ds)),
        Err(e) => fail("Error decoding dataset", &e, exit_code(&e)),
    }
}

fn run_get(file: &Path, path: &str, all: bool) {
    let ds = load(file);
    print_lookup(&ds, path, all);
}

fn run_sign(name: &str, secret: &str, file: &Path) {
    let key = parse_key(secret);
    let ds = load(file);
    match build_token(name, &ds, &key) {
        Ok(token) => write_stdout(&token),
        Err(e) => fail("Error building token", &e, exit_code(&e)),
    }
}

fn run_verify(secret: &str, token: &Path) {
    let key = parse_key(secret);
    let input = read_input(token);
    match validate_token(&input, &key) {
        Ok((name, body)) => print_json(&serde_json::json!({
            "name": name,
            "body": to_json(&body),
        })),
        Err(e) => fail("Token rejected", &e, exit_code(&e)),
    }
}

fn run_sort(file: &Path, records: &str, keys: &[String]) {
    let sorter = match DatasetSorter::parse(keys) {
        Ok(sorter) => sorter,
        Err(e) => fail("Invalid sort key", e, 1),
    };
    let ds = load(file);
    let mut rows = match ds.get_datasets(records) {
        Ok(rows) => rows,
        Err(e) => fail("Lookup failed", &e, exit_code(&e)),
    };
    sorter.sort(&mut rows);
    let json: Vec<serde_json::Value> = rows.iter().map(|row| to_json(row)).collect();
    print_json(&serde_json::Value::Array(json));
}

fn run_config(dirs: Vec<PathBuf>, name: &str, path: Option<&str>, all: bool) {
    let cache = ConfigCache::new(dirs);
    match path {
        Some(path) => match cache.get(name) {
            Ok(config) => print_lookup(config.as_ref(), path, all),
            Err(e) => fail("Error loading configuration", e, 1),
        },
        None => match cache
            .sources(name)
            .map_err(|e| e.to_string())
            .and_then(|sources| serde_json::to_value(sources).map_err(|e| e.to_string()))
        {
            Ok(json) => print_json(&json),
            Err(e) => fail("Error loading configuration", e, 1),
        },
    }
}
