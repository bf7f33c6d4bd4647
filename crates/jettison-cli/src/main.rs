//! Thin entrypoint delegating to the CLI runner.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = jettison_cli::run().await;
    process::exit(exit_code);
}
