//! Watch command implementation

use std::process::ExitCode;
use std::time::Duration;

use crate::config::TilecacheConfig;
use crate::session::Session;
use crate::watch::timestamp;

use super::{expand_patterns, EXIT_ERROR, EXIT_INVALID_ARGS};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Execute the watch command.
///
/// Blocks and runs until interrupted (Ctrl+C).
pub fn run_watch(config: &TilecacheConfig, patterns: &[String]) -> ExitCode {
    let files = expand_patterns(patterns);
    if files.is_empty() {
        eprintln!("Error: no template files given");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let mut session = Session::new(config);
    let templates = match session.template_manager() {
        Ok(templates) => templates,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    templates.subscribe(|_, template| {
        println!("[{}] Reloaded: {}", timestamp(), template.file_name().display());
    });

    for file in &files {
        let id = templates.load_object_template(file);
        let loaded = templates.get(id).is_some_and(|t| t.has_object());
        if loaded {
            println!("[{}] Loaded: {}", timestamp(), file.display());
        } else {
            eprintln!("[{}] Unable to load: {}", timestamp(), file.display());
        }
    }

    println!("[{}] Watching {} templates for changes...", timestamp(), templates.len());

    loop {
        session.process_file_events();
        std::thread::sleep(POLL_INTERVAL);
    }
}
