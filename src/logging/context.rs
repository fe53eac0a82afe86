use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Interactive use from a developer terminal.
    LocalDev,
    /// Continuous integration; no file sink by default.
    Ci,
    /// Long-running service such as the runtime emulator.
    Service,
}

impl ExecutionContext {
    /// Returns `true` when the file sink should be off unless configured explicitly.
    pub fn disables_file_sink(self) -> bool {
        matches!(self, ExecutionContext::Ci)
    }
}

/// Derive the active execution context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> ExecutionContext {
    if let Command::Emulate(_) = command {
        return ExecutionContext::Service;
    }

    if ci_override_enabled() {
        return ExecutionContext::Ci;
    }

    match command {
        Command::Verify(_) | Command::Transform(_) => ExecutionContext::LocalDev,
        Command::Emulate(_) => ExecutionContext::Service,
    }
}

fn ci_override_enabled() -> bool {
    env::var("CI")
        .map(|value| {
            let value = value.trim().to_ascii_lowercase();
            value == "1" || value == "true"
        })
        .unwrap_or(false)
}
