/// Cadence CLI
///
/// Loads scripts, starts their entry function as a continuation and drives
/// the frame loop until every continuation is done.
use cadence_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
