use std::io::{self, IsTerminal};

/// Terminal capability probe, injectable for tests.
pub trait TerminalClient {
    /// Whether diagnostics go to an interactive terminal.
    fn stderr_is_terminal(&self) -> bool;
}

/// Probes the process's real standard streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTerminalClient;

impl TerminalClient for SystemTerminalClient {
    fn stderr_is_terminal(&self) -> bool {
        io::stderr().is_terminal()
    }
}
