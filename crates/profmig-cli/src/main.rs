//! Binary entrypoint for `profmig`.

use std::process;

#[tokio::main]
async fn main() {
    let code = profmig_cli::run().await;
    process::exit(code);
}
