//! tilecache - Command-line tool for cutting tile sheets, rendering map thumbnails and inspecting templates

use std::process::ExitCode;
use tilecache::cli;

fn main() -> ExitCode {
    cli::run()
}
