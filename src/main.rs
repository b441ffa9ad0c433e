use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{apply, check, restore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "relabel")]
#[command(version = VERSION)]
#[command(about = "Context-aware identifier renaming for TypeScript/JavaScript codebases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a rules file to one or more source trees
    Apply(apply::ApplyArgs),
    /// Validate a rules file and list its conflicts
    Check(check::CheckArgs),
    /// Restore the originals saved by a previous run
    Restore(restore::RestoreArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(exit_code_to_u8(output::EXIT_FAILURE));
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
