//! dataphile CLI: stream, compress and decompress files to standard output.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use dataphile::{CliArgs, PipelineError, SourceSet, cancel_on_signal, init_tracing, run_pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &CliArgs) -> Result<(), PipelineError> {
    let config = args.load_config()?;
    let plan = args.plan(&config)?;

    let shutdown = CancellationToken::new();
    let signal_task = cancel_on_signal(shutdown.clone());

    let mut sources = SourceSet::open(plan.sources)
        .await?
        .with_shutdown(shutdown.clone());
    let mut stdout = tokio::io::stdout();
    let result = run_pipeline(&mut sources, plan.codec, plan.buffer_size, &mut stdout).await;

    if shutdown.is_cancelled() {
        info!("Interrupted, shut down cleanly");
    }
    shutdown.cancel();
    let _ = signal_task.await;

    result.map(|_| ())
}
