use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use log::{debug, info, warn};
use num_bigint::BigInt;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use qubo_ops::constrain::{constrain, ConstrainParams};
use qubo_ops::duplicate::{duplicate, DuplicateParams, DuplicationGroup};
use qubo_ops::flip::{flip, FlipParams};
use qubo_ops::provenance::{Provenance, Transformed};
use qubo_ops::qubo::Qubo;
use qubo_ops::record;
use qubo_ops::reduce::{reduce, ReduceParams};
use qubo_ops::select::Amount;
use qubo_ops::shuffle::{shuffle, ShuffleParams};
use qubo_ops::solution::Solution;
use qubo_ops::Error;

#[derive(Debug, Parser)]
#[command(author, version, about = "Structure-preserving transforms for QUBO instances")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log transform details.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct IoArgs {
    /// Input instance (.json or .json.gz); standard input if omitted.
    #[arg(short = 'Q', long = "qubo", value_name = "FILE")]
    qubo: Option<PathBuf>,

    /// Known solution of the input instance (.json or .json.gz).
    #[arg(short = 'S', long, value_name = "FILE")]
    solution: Option<PathBuf>,

    /// Output instance; standard output if omitted.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write the carried solution as a separate solution record.
    #[arg(long, value_name = "FILE")]
    solution_output: Option<PathBuf>,

    /// Random seed.
    #[arg(short, long, value_name = "INT", default_value = "0")]
    seed: u64,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Flip a random set of bits (x -> 1 - x).
    Flip {
        #[command(flatten)]
        io: IoArgs,

        /// Bits to flip: a count, or a fraction of nbit.
        #[arg(short, long, value_name = "AMOUNT")]
        ratio: Amount,
    },

    /// Relabel all bits by a random permutation.
    Shuffle {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Replace random bits by penalized chains of replicas.
    Duplicate {
        #[command(flatten)]
        io: IoArgs,

        /// First group: bits to duplicate, a count or a fraction of nbit.
        #[arg(long = "r1", value_name = "AMOUNT", default_value = "0")]
        r1: Amount,

        /// First group: replicas per bit, the original included.
        #[arg(long = "n1", value_name = "INT", default_value = "2")]
        n1: usize,

        /// Second group: bits to duplicate, a count or a fraction of nbit.
        #[arg(long = "r2", value_name = "AMOUNT", default_value = "0")]
        r2: Amount,

        /// Second group: replicas per bit, the original included.
        #[arg(long = "n2", value_name = "INT", default_value = "2")]
        n2: usize,

        /// Chain penalty; derived per chain if omitted.
        #[arg(short = 'P', long, value_name = "INT")]
        penalty: Option<BigInt>,
    },

    /// Merge pairs of bits that agree on the known solution.
    Reduce {
        #[command(flatten)]
        io: IoArgs,

        /// Number of bits to remove.
        #[arg(short = 'n', long = "count", value_name = "INT")]
        count: usize,

        /// How many of the merged pairs are mixed (one 0-bit, one 1-bit).
        #[arg(short = 't', long = "mixed", value_name = "INT", default_value = "0")]
        mixed: usize,

        /// Bits that must not be merged (comma-separated).
        #[arg(long, value_name = "LIST", value_delimiter = ',')]
        reserve: Vec<usize>,
    },

    /// Inject one-hot constraints satisfied by the known solution.
    Constrain {
        #[command(flatten)]
        io: IoArgs,

        /// Number of constraints.
        #[arg(short = 'c', long = "count", value_name = "INT")]
        count: usize,

        /// Bits per constraint.
        #[arg(short = 'b', long = "bits", value_name = "INT")]
        bits: usize,

        /// Constraint penalty.
        #[arg(short = 'p', long, value_name = "INT")]
        penalty: BigInt,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Records go to stdout, so all logging goes to stderr.
    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;
    debug!("cli = {:?}", cli);

    let time_total = Instant::now();

    match cli.command {
        Command::Flip { io, ratio } => {
            let params = FlipParams {
                amount: ratio,
                seed: io.seed,
            };
            run(&io, |q, s| flip(q, s, &params))?;
        }

        Command::Shuffle { io } => {
            let params = ShuffleParams { seed: io.seed };
            run(&io, |q, s| shuffle(q, s, &params))?;
        }

        Command::Duplicate {
            io,
            r1,
            n1,
            r2,
            n2,
            penalty,
        } => {
            let params = DuplicateParams {
                groups: vec![
                    DuplicationGroup {
                        amount: r1,
                        replicas: n1,
                    },
                    DuplicationGroup {
                        amount: r2,
                        replicas: n2,
                    },
                ],
                penalty,
                seed: io.seed,
            };
            run(&io, |q, s| duplicate(q, s, &params))?;
        }

        Command::Reduce {
            io,
            count,
            mixed,
            reserve,
        } => {
            let params = ReduceParams {
                count,
                mixed,
                reserved: reserve,
                seed: io.seed,
            };
            run(&io, |q, s| reduce(q, s.ok_or(Error::MissingField("solution"))?, &params))?;
        }

        Command::Constrain {
            io,
            count,
            bits,
            penalty,
        } => {
            let params = ConstrainParams {
                count,
                size: bits,
                penalty,
                seed: io.seed,
            };
            run(&io, |q, s| constrain(q, s.ok_or(Error::MissingField("solution"))?, &params))?;
        }
    }

    info!("All done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}

/// Reads the inputs, applies one transform and writes its output.
///
/// Everything is serialized before any destination is opened, so a failed
/// transform leaves no partial output behind.
fn run<P, F>(io: &IoArgs, transform: F) -> Result<()>
where
    P: Provenance,
    F: FnOnce(&Qubo, Option<&Solution>) -> qubo_ops::Result<Transformed<P>>,
{
    let instance = record::parse_instance(&record::read_input(io.qubo.as_deref())?)?;
    let solution = match &io.solution {
        Some(path) => Some(record::parse_solution(&record::read_input(Some(path.as_path()))?)?),
        None => None,
    };
    info!("Input: {}", instance.qubo);

    let out = transform(&instance.qubo, solution.as_ref())?;
    info!("{}: {}", out.provenance.operation(), out.qubo);

    let text = record::to_string(&record::output_value(&out, instance.metadata))?;
    let solution_text = match (&io.solution_output, &out.solution) {
        (Some(_), Some(s)) => Some(record::to_string(&record::solution_value(s))?),
        (Some(path), None) => {
            warn!("No solution to write to {}", path.display());
            None
        }
        (None, _) => None,
    };

    record::write_output(io.output.as_deref(), &text)?;
    if let (Some(path), Some(text)) = (&io.solution_output, &solution_text) {
        record::write_output(Some(path.as_path()), text)?;
    }
    Ok(())
}
