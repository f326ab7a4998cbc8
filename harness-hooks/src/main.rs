mod cli;
mod commands;
mod hooks;

use std::env;
use std::io::Write;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter directive.
const LOG_ENV: &str = "HARNESS_HOOKS_LOG";

/// Diagnostics go to stderr; stdout carries the status lines the harness logs.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let stdin = std::io::stdin();
    let mut handle = stdin.lock();

    match cli::router::run_cli(args, &cwd, &mut handle) {
        Ok((output, exit_code)) => {
            print!("{}", output);
            let _ = std::io::stdout().flush();
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
