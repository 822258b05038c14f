//! Pathways binary entry point.

use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match pathways::cli::run().await {
        Ok(code) => code,
        Err(err) => {
            pathways::ui::output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
