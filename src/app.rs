use std::io;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::AsyncRead;
use tracing::instrument;

use crate::cli::FakeArgs;
use crate::devices::DeviceFactory;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::handlers::CommandRegistry;
use crate::hw::{ControlRegistry, FakeTransport, NusbTransport, UvcTransport};
use crate::runtime::RuntimeConfiguration;
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Creates a transport backed by the host USB stack.
#[must_use]
pub fn real_transport() -> Arc<dyn UvcTransport> {
    Arc::new(NusbTransport::new(ControlRegistry::standard()))
}

/// Creates a transport backed by fake fixtures.
///
/// Clones of the returned transport share state, so a clone can be kept to
/// inspect writes after a run.
#[must_use]
pub fn fake_transport(fake_args: FakeArgs) -> FakeTransport {
    FakeTransport::new(fake_args.into_backend_config())
}

/// Runs one command against `transport`, reading `import` input from stdin.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = uvcc::Args::try_parse_from([
///     "uvcc",
///     "--fake",
///     "--fake-devices",
///     "Webcam|0x046d|0x082d|3",
///     "controls",
/// ])?;
/// let (runtime, maybe_fake_args) = args.into_runtime_and_fake_args()?;
/// let transport: std::sync::Arc<dyn uvcc::UvcTransport> = match maybe_fake_args {
///     Some(fake_args) => std::sync::Arc::new(uvcc::fake_transport(fake_args)),
///     None => uvcc::real_transport(),
/// };
/// let mut out = Vec::new();
/// let mut err = Vec::new();
/// uvcc::run(&runtime, &mut out, &mut err, transport).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation, device access, the command, or
/// output writing fails.
pub async fn run<W, E>(
    runtime: &RuntimeConfiguration,
    out: &mut W,
    err: &mut E,
    transport: Arc<dyn UvcTransport>,
) -> Result<DispatchOutcome>
where
    W: io::Write,
    E: io::Write,
{
    run_with_clients(
        runtime,
        out,
        err,
        &SystemTerminalClient,
        transport,
        Box::new(tokio::io::stdin()),
    )
    .await
}

/// Runs one command with injected clients.
///
/// # Errors
///
/// Returns an error if tracing initialisation, device access, the command, or
/// output writing fails.
#[instrument(
    skip(runtime, out, err, terminal_client, transport, input),
    level = "info",
    fields(command = runtime.command(), verbose = runtime.verbose())
)]
pub async fn run_with_clients<W, E>(
    runtime: &RuntimeConfiguration,
    out: &mut W,
    err: &mut E,
    terminal_client: &dyn TerminalClient,
    transport: Arc<dyn UvcTransport>,
    input: Box<dyn AsyncRead + Send + Unpin>,
) -> Result<DispatchOutcome>
where
    W: io::Write,
    E: io::Write,
{
    telemetry::initialise_tracing(
        "uvcc",
        terminal_client.stderr_is_terminal(),
        telemetry::default_level(runtime.verbose()),
    )?;

    let dispatcher = Dispatcher::new(
        CommandRegistry::new(Arc::clone(&transport), input),
        DeviceFactory::new(transport, runtime.mismatch_policy()),
        ControlRegistry::standard(),
    );
    dispatcher.dispatch(runtime, out, err).await
}
