use clap::Parser;

use termfeed::commands::{default_registry, Command, State};
use termfeed::config::Config;
use termfeed::db::establish_connection;
use termfeed::errors::AppError;

/// Command-line RSS feed aggregator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command to run (register, login, addfeed, follow, agg, browse, ...)
    command: String,
    /// Arguments for the command
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::read()?;
    let conn = establish_connection(&config.db_url)?;
    let registry = default_registry()?;

    let mut state = State { config, conn };
    let command = Command {
        name: cli.command,
        args: cli.args,
    };
    registry.run(&mut state, &command)
}
