use crate::error::Result;
use crate::server::process::{stdio_relay, OutputMode, OutputRelay, ServerProcess};
use std::io::IsTerminal;

/// How much of the server's output the user asked to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Picks the output wiring for a foreground server.
///
/// Quiet discards output. Otherwise an explicit relay wins, then the
/// terminal is shared when stdout is one, and as a last resort output is
/// relayed through this process' stdout and stderr.
pub fn foreground_output(verbosity: Verbosity, relay: Option<OutputRelay>) -> OutputMode {
    if verbosity < Verbosity::Normal {
        return OutputMode::Disabled;
    }

    match relay {
        Some(relay) => OutputMode::Relay(relay),
        None if std::io::stdout().is_terminal() => OutputMode::Inherit,
        None => OutputMode::Relay(stdio_relay()),
    }
}

enum Outcome {
    Exited(Result<i32>),
    Interrupted,
}

/// Starts `process` and blocks until it exits, returning its exit code.
///
/// Ctrl-C does not end the wait. A server sharing the terminal gets the
/// interrupt directly; otherwise it is asked to terminate, and the wait goes
/// on until it has.
#[tracing::instrument(skip(process, output), fields(address = %process.address()))]
pub async fn run_attached(process: &mut ServerProcess, output: OutputMode) -> Result<i32> {
    let inherits_terminal = matches!(output, OutputMode::Inherit);
    process.start(output)?;

    let outcome = tokio::select! {
        result = process.wait() => Outcome::Exited(result),
        Ok(()) = tokio::signal::ctrl_c() => Outcome::Interrupted,
    };

    match outcome {
        Outcome::Exited(result) => result,
        Outcome::Interrupted => {
            tracing::info!("Interrupted, waiting for the server to exit");
            if !inherits_terminal && process.is_running()? {
                process.terminate()?;
            }
            process.wait().await
        }
    }
}
