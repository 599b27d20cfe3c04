use clap::Parser;
use colored::*;
use kmertree_core::{ErrorKind, PhyloError};
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use crate::cli::{Cli, Commands};

fn init_logging(verbose: u8) {
    // -v flags win over KMERTREE_LOG, which wins over the default.
    let filter = match verbose {
        0 => EnvFilter::try_from_env("KMERTREE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PhyloError>().map(PhyloError::kind) {
        Some(ErrorKind::InvalidArgument) => 2,
        Some(ErrorKind::Io) => 3,
        Some(ErrorKind::Parse) | Some(ErrorKind::Dimension) => 4,
        _ => 1,
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        let code = exit_code(&e);
        if code == 2 || code == 4 {
            eprintln!("Run 'kmertree --help' for usage.");
        }
        process::exit(code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fasta(args) => commands::fasta(args),
        Commands::Paml(args) => commands::paml(args),
        Commands::Matrix(args) => commands::matrix(args),
        Commands::Random(args) => commands::random(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let err = anyhow::Error::new(PhyloError::UnknownAlgorithm { name: "ml".into() });
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::new(PhyloError::TooFewTaxa { n: 1, min: 2 });
        assert_eq!(exit_code(&err), 4);

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = anyhow::Error::new(PhyloError::from(io)).context("reading input");
        assert_eq!(exit_code(&err), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
