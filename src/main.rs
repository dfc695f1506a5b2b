use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use uvcc::{Args, DispatchOutcome, UvcTransport, fake_transport, real_transport, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    let run_result = async {
        let (runtime, maybe_fake_args) = args.into_runtime_and_fake_args()?;
        let transport: Arc<dyn UvcTransport> = match maybe_fake_args {
            Some(fake_args) => Arc::new(fake_transport(fake_args)),
            None => real_transport(),
        };

        run(&runtime, &mut stdout, &mut stderr, transport).await
    }
    .await;

    match run_result {
        Ok(DispatchOutcome::Completed) => ExitCode::SUCCESS,
        Ok(DispatchOutcome::UnknownCommand) => ExitCode::from(2),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
