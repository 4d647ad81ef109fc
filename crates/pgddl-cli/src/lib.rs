mod check;
mod cli;
mod config;
mod init;
mod render;
mod replay;
mod workflow;

use tracing_subscriber::EnvFilter;

/// Log to stderr. `RUST_LOG` wins; otherwise `warn`, or `debug` with `-v`.
fn init_logging(verbose: bool) {
    let default = if verbose { "pgddl=debug,pgddl_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Already installed when run more than once in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cli = cli::parse_args(&args)?;
    init_logging(cli.verbose);

    match cli.command {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Init(args) => init::run(args),
        cli::Command::Replay(args) => replay::run(args),
        cli::Command::Check(args) => check::run(args),
    }
}
