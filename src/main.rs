//! stacks - select, extend and synthesize stacks from a cloud assembly

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = stacks_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
