// mkpkginfo/src/main.rs
use std::io::{self, Write};
use std::process;

use clap::Parser;
use colored::Colorize;
use mkpkginfo_common::config::Config;
use mkpkginfo_common::error::{MkPkgInfoError, Result as mkResult};
use mkpkginfo_core::{synthesize, Backend};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod cli;
use cli::CliArgs;

fn main() {
    let cli_args = CliArgs::parse();

    let level_filter = match cli_args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("MKPKGINFO_LOG")
        .from_env_lossy();

    // stdout carries the plist; every diagnostic goes to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .without_time()
        .try_init();

    if let Err(e) = run(cli_args) {
        error!("Command failed: {:#}", e);
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        process::exit(e.exit_code());
    }

    debug!("Catalog info written.");
}

fn run(cli_args: CliArgs) -> mkResult<()> {
    let config = Config::load()?;

    let request = cli_args.into_request();
    let backend = Backend::system(&config);
    let info = synthesize(&request, &backend, &config)?;

    let mut document = info.to_xml_plist()?;
    if !document.ends_with(b"\n") {
        document.push(b'\n');
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(&document)
        .and_then(|_| out.flush())
        .map_err(MkPkgInfoError::from)
}
