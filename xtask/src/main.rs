// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use registers_warl::Xlen;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

mod warl_gen;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Xtask {
    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum XlenArg {
    #[value(name = "32")]
    Rv32,
    #[value(name = "64")]
    Rv64,
}

impl From<XlenArg> for Xlen {
    fn from(arg: XlenArg) -> Self {
        match arg {
            XlenArg::Rv32 => Xlen::Rv32,
            XlenArg::Rv64 => Xlen::Rv64,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate WARL legalization procedures from a register definition file
    WarlGen {
        /// Register definition file (.toml or .json)
        #[arg(long, value_name = "FILE")]
        definition: PathBuf,

        /// Register width profile
        #[arg(long, value_enum, default_value = "64")]
        xlen: XlenArg,

        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Registers to define without legalization (can be repeated)
        #[arg(long = "skip", value_name = "REGISTER")]
        skip: Vec<String>,

        /// Don't skip the free-running counters by default
        #[arg(long)]
        no_default_skip: bool,

        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    let cli = Xtask::parse();
    let result = match &cli.xtask {
        Commands::WarlGen {
            definition,
            xlen,
            output,
            skip,
            no_default_skip,
            verbose,
        } => {
            let level = if *verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            };
            let _ = SimpleLogger::new().with_level(level).init();
            warl_gen::generate(
                definition,
                (*xlen).into(),
                output.as_deref(),
                skip,
                *no_default_skip,
            )
        }
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(-1);
    });
}
