use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
mod branding;
mod commands;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Stateful invariant fuzzing for token-wrapping ledgers", long_about = None)]
struct Cli {
    /// Log engine progress on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a fuzzing campaign against the wrapped-token ledger
    Run(commands::run::RunArgs),
    /// Replay a saved failure report against fresh state
    Replay(commands::replay::ReplayArgs),
    /// Initialize Warden in a new project
    Init(commands::init::InitArgs),
    /// List the fuzzable actions and built-in invariants
    List,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => {
            if args.format != "json" {
                branding::print_logo();
            }
            commands::run::exec(args)?;
        }
        Commands::Replay(args) => {
            commands::replay::exec(args)?;
        }
        Commands::Init(args) => {
            commands::init::exec(args)?;
        }
        Commands::List => {
            commands::list::exec();
        }
    }

    Ok(())
}
