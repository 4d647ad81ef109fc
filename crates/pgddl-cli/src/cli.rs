use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Init,
    Replay,
    Check,
}

#[derive(Debug, Clone)]
pub struct Cli {
    /// `-v` / `--verbose`: log at debug level unless `RUST_LOG` says otherwise.
    pub verbose: bool,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Init(InitArgs),
    Replay(ReplayArgs),
    Check(CheckArgs),
}

#[derive(Debug, Clone)]
pub struct InitArgs {
    pub config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim() {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            other => anyhow::bail!("unsupported output format: {other} (expected json or table)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub config: PathBuf,
    pub dir: Option<PathBuf>,
    pub to: Option<i64>,
    pub seed: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub strict: bool,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub config: PathBuf,
    pub dir: Option<PathBuf>,
    pub seed: Option<PathBuf>,
    pub strict: bool,
    pub files: Vec<PathBuf>,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Cli> {
    let mut verbose = false;
    let mut it = args.iter().skip(1).map(|s| s.as_str());

    let first = loop {
        match it.next() {
            Some("-v" | "--verbose") => verbose = true,
            Some(token) => break token,
            None => {
                return Ok(Cli {
                    verbose,
                    command: Command::Help(HelpTopic::Root),
                });
            }
        }
    };

    let command = match first {
        "-h" | "--help" => Command::Help(HelpTopic::Root),
        "init" => parse_init(it)?,
        "replay" => parse_replay(it, &mut verbose)?,
        "check" => parse_check(it, &mut verbose)?,
        _ => anyhow::bail!("unknown command: {first}"),
    };

    Ok(Cli { verbose, command })
}

fn parse_init<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("pgddl.toml");

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Init)),
            "--config" => config = PathBuf::from(value(&mut it, "--config")?),
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Init(InitArgs { config }))
}

fn parse_replay<'a>(
    mut it: impl Iterator<Item = &'a str>,
    verbose: &mut bool,
) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("pgddl.toml");
    let mut dir: Option<PathBuf> = None;
    let mut to: Option<i64> = None;
    let mut seed: Option<PathBuf> = None;
    let mut format: Option<OutputFormat> = None;
    let mut output: Option<PathBuf> = None;
    let mut strict = false;
    let mut files: Vec<PathBuf> = Vec::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Replay)),
            "-v" | "--verbose" => *verbose = true,
            "--config" => config = PathBuf::from(value(&mut it, "--config")?),
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--dir" => dir = Some(PathBuf::from(value(&mut it, "--dir")?)),
            _ if token.starts_with("--dir=") => {
                dir = Some(PathBuf::from(token.trim_start_matches("--dir=")));
            }
            "--to" => to = Some(parse_version(value(&mut it, "--to")?)?),
            _ if token.starts_with("--to=") => {
                to = Some(parse_version(token.trim_start_matches("--to="))?);
            }
            "--seed" => seed = Some(PathBuf::from(value(&mut it, "--seed")?)),
            _ if token.starts_with("--seed=") => {
                seed = Some(PathBuf::from(token.trim_start_matches("--seed=")));
            }
            "--format" => format = Some(value(&mut it, "--format")?.parse()?),
            _ if token.starts_with("--format=") => {
                format = Some(token.trim_start_matches("--format=").parse()?);
            }
            "--output" => output = Some(PathBuf::from(value(&mut it, "--output")?)),
            _ if token.starts_with("--output=") => {
                output = Some(PathBuf::from(token.trim_start_matches("--output=")));
            }
            "--strict" => strict = true,
            "-" => files.push(PathBuf::from("-")),
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => files.push(PathBuf::from(other)),
        }
    }

    if to.is_some() && !files.is_empty() {
        anyhow::bail!("--to only applies to a migrations directory, not to files");
    }
    if dir.is_some() && !files.is_empty() {
        anyhow::bail!("pass either --dir or files, not both");
    }

    Ok(Command::Replay(ReplayArgs {
        config,
        dir,
        to,
        seed,
        format,
        output,
        strict,
        files,
    }))
}

fn parse_check<'a>(
    mut it: impl Iterator<Item = &'a str>,
    verbose: &mut bool,
) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("pgddl.toml");
    let mut dir: Option<PathBuf> = None;
    let mut seed: Option<PathBuf> = None;
    let mut strict = false;
    let mut files: Vec<PathBuf> = Vec::new();

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Check)),
            "-v" | "--verbose" => *verbose = true,
            "--config" => config = PathBuf::from(value(&mut it, "--config")?),
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--dir" => dir = Some(PathBuf::from(value(&mut it, "--dir")?)),
            _ if token.starts_with("--dir=") => {
                dir = Some(PathBuf::from(token.trim_start_matches("--dir=")));
            }
            "--seed" => seed = Some(PathBuf::from(value(&mut it, "--seed")?)),
            _ if token.starts_with("--seed=") => {
                seed = Some(PathBuf::from(token.trim_start_matches("--seed=")));
            }
            "--strict" => strict = true,
            "-" => files.push(PathBuf::from("-")),
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => files.push(PathBuf::from(other)),
        }
    }

    if dir.is_some() && !files.is_empty() {
        anyhow::bail!("pass either --dir or files, not both");
    }

    Ok(Command::Check(CheckArgs {
        config,
        dir,
        seed,
        strict,
        files,
    }))
}

fn value<'a>(it: &mut impl Iterator<Item = &'a str>, flag: &str) -> anyhow::Result<&'a str> {
    let Some(v) = it.next() else {
        anyhow::bail!("{flag} requires a value");
    };
    Ok(v)
}

fn parse_version(raw: &str) -> anyhow::Result<i64> {
    match raw.parse::<i64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => anyhow::bail!("invalid --to value: {raw}"),
    }
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
pgddl - offline PostgreSQL DDL simulator

USAGE:
  pgddl [-v] <COMMAND> [OPTIONS]

COMMANDS:
  init          Write a pgddl.toml template
  replay        Replay migrations and print the resulting schema
  check         Replay migrations and report the first failing statement

GLOBAL OPTIONS:
  -v, --verbose         Debug logging (RUST_LOG takes precedence)
  -h, --help            Print help

Run `pgddl <command> --help` for more."
            );
        }
        HelpTopic::Init => {
            println!(
                "\
USAGE:
  pgddl init [OPTIONS]

OPTIONS:
  --config <FILE>       Output config path (default: pgddl.toml)
  -h, --help            Print help"
            );
        }
        HelpTopic::Replay => {
            println!(
                "\
USAGE:
  pgddl replay [OPTIONS] [FILES...]

NOTES:
  - Without FILES, replays the migrations directory (V<n>__<name>.sql).
  - Pass `-` to read SQL from stdin.

OPTIONS:
  --config <FILE>       Config file path (default: pgddl.toml)
  --dir <DIR>           Migrations directory (overrides config)
  --to <VERSION>        Replay up to target version (inclusive)
  --seed <FILE>         Start from a snapshot JSON instead of an empty schema
  --format <FORMAT>     json | table (default: from config or json)
  --output <FILE>       Write the snapshot JSON to a file (default: stdout)
  --strict              Fail on statements the simulator does not support
  -h, --help            Print help"
            );
        }
        HelpTopic::Check => {
            println!(
                "\
USAGE:
  pgddl check [OPTIONS] [FILES...]

NOTES:
  - Each file (or each migration) is replayed in order; failures are reported as
    <file>:<line>.

OPTIONS:
  --config <FILE>       Config file path (default: pgddl.toml)
  --dir <DIR>           Migrations directory (overrides config)
  --seed <FILE>         Start from a snapshot JSON instead of an empty schema
  --strict              Fail on statements the simulator does not support
  -h, --help            Print help"
            );
        }
    }
}
