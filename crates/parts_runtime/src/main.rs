//! Parts Sandbox
//!
//! Runs the headless arena for the configured duration and logs what
//! happened.
//!
//! Run with: cargo run -p parts_runtime
//!       or: cargo run --bin parts-sandbox -- sandbox.toml

use parts_runtime::{Sandbox, SandboxConfig};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match SandboxConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    config.log_summary();

    let mut sandbox = match Sandbox::new(config) {
        Ok(sandbox) => sandbox,
        Err(e) => {
            log::error!("Failed to build sandbox: {}", e);
            std::process::exit(1);
        }
    };

    let summary = sandbox.run();
    summary.log();
}
