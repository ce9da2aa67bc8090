use std::error::Error;

/// Destination for failures swallowed at a boundary.
///
/// Fire-and-forget: implementations must not panic or block for long.
pub trait DiagnosticsSink {
    fn track_exception(&self, error: &dyn Error);
}

/// Forwards tracked failures to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl DiagnosticsSink for LogDiagnostics {
    fn track_exception(&self, error: &dyn Error) {
        log::error!("{}", error);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn track_exception(&self, _error: &dyn Error) {}
}
