use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Tasks for the project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project
    Build,
    /// Run the workspace tests
    Test,
    /// Run dbibackend, forwarding any extra arguments
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn cargo(args: &[&str], extra: &[String], what: &str) -> Result<()> {
    let status = Command::new("cargo").args(args).args(extra).status()?;
    if !status.success() {
        anyhow::bail!("{} failed", what);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build => {
            println!("Building project...");
            cargo(&["build"], &[], "Build")?;
        }
        Commands::Test => {
            println!("Testing workspace...");
            cargo(&["test", "--workspace"], &[], "Test")?;
        }
        Commands::Run { args } => {
            println!("Running dbibackend...");
            cargo(&["run", "-p", "dbi-cli", "--"], args, "Run")?;
        }
    }

    Ok(())
}
