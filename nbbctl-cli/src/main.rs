//! nbbctl CLI - load NBB basketball records into PostgreSQL
//!
//! Entry point for the `nbbctl` command-line tool:
//! - `schema`: create the tables
//! - `ingest`: stream an NDJSON record file into the database
//! - `check`: validate a record file offline
//! - `team-id`: print the team id derived from a logo URL

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod tracing_setup;
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "nbbctl",
    author,
    version,
    about = "Transactional ingestion of NBB basketball records into PostgreSQL",
    long_about = "Ingest teams, players, games, box scores, shots and play-by-play events \
                  from newline-delimited JSON. Each record is one transaction: it is either \
                  stored completely or not at all."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress progress spinners (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the tables if they do not exist
    Schema,
    /// Ingest an NDJSON record file (or stdin) into the database
    Ingest(commands::ingest::IngestArgs),
    /// Validate an NDJSON record file without touching the database
    Check(commands::check::CheckArgs),
    /// Print the team id derived from a logo URL
    TeamId(TeamIdArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct TeamIdArgs {
    /// Team logo URL as scraped from the league site
    #[arg(value_name = "LOGO_URL")]
    logo: String,
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();
    ui::init_quiet_mode(cli.quiet);

    match cli.command {
        Commands::Schema => commands::run_schema().await?,
        Commands::Ingest(args) => commands::run_ingest(args).await?,
        Commands::Check(args) => commands::run_check(args)?,
        Commands::TeamId(args) => run_team_id(args)?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn run_team_id(args: TeamIdArgs) -> Result<()> {
    let id = nbbctl_core::team_id_from_logo(&args.logo).context("Logo URL is empty")?;
    println!("{id}");
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
