use std::error::Error;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    best::{self, BestArgs},
    dot::{self, DotArgs},
    expect::{self, ExpectArgs},
    inside::{self, InsideArgs},
    stats::{self, StatsArgs},
    transform::{self, TransformArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "hgx", about = "Weighted hypergraph toolkit")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the inside weight of every state.
    Inside(InsideArgs),
    /// Find the best derivation, tolerating a bounded number of back edges.
    Best(BestArgs),
    /// Compute posterior feature expectations.
    Expect(ExpectArgs),
    /// Apply the transforms described by a YAML file and print the result.
    Transform(TransformArgs),
    /// Summarize the structure of a hypergraph.
    Stats(StatsArgs),
    /// Render a hypergraph for Graphviz.
    Dot(DotArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("hgx: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Inside(args) => inside::run(&args),
        Command::Best(args) => best::run(&args),
        Command::Expect(args) => expect::run(&args),
        Command::Transform(args) => transform::run(&args),
        Command::Stats(args) => stats::run(&args),
        Command::Dot(args) => dot::run(&args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
