use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    wardboard::init_tracing();

    match wardboard::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
