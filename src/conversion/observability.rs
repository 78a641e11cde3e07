use std::path::PathBuf;

use crate::error::ConvertError;

use super::unified::SourceFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// The conversion failed because of its input (bad locator, malformed document, ...).
    Error,
    /// Infrastructure failure (typically I/O).
    Critical,
}

/// Context about a conversion attempt.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    /// The converted input path.
    pub path: PathBuf,
    /// Format adapter used.
    pub format: SourceFormat,
    /// Items locator used.
    pub locator: String,
}

/// Stats reported on a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionStats {
    /// Number of exported records.
    pub records: usize,
    /// Number of exported columns.
    pub columns: usize,
}

/// Observer interface for conversion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ConversionObserver: Send + Sync {
    /// Called when a conversion succeeds.
    fn on_success(&self, _ctx: &ConversionContext, _stats: ConversionStats) {}

    /// Called when a conversion fails.
    fn on_failure(&self, _ctx: &ConversionContext, _severity: ConversionSeverity, _error: &ConvertError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConvertError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Forwards conversion outcomes to `tracing`.
///
/// Input problems ([`ConversionSeverity::Error`]) log at `warn`, infrastructure failures at
/// `error`. Alerts always log at `error` with `alert = true`. A conversion that found no records
/// logs at `warn` even though it succeeded.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ConversionObserver for TracingObserver {
    fn on_success(&self, ctx: &ConversionContext, stats: ConversionStats) {
        if stats.records == 0 {
            tracing::warn!(
                format = ?ctx.format,
                path = %ctx.path.display(),
                locator = %ctx.locator,
                columns = stats.columns,
                "conversion found no records"
            );
        } else {
            tracing::info!(
                format = ?ctx.format,
                path = %ctx.path.display(),
                locator = %ctx.locator,
                records = stats.records,
                columns = stats.columns,
                "conversion finished"
            );
        }
    }

    fn on_failure(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConvertError) {
        match severity {
            ConversionSeverity::Info => tracing::info!(
                format = ?ctx.format,
                path = %ctx.path.display(),
                locator = %ctx.locator,
                %error,
                "conversion failed"
            ),
            ConversionSeverity::Warning | ConversionSeverity::Error => tracing::warn!(
                ?severity,
                format = ?ctx.format,
                path = %ctx.path.display(),
                locator = %ctx.locator,
                %error,
                "conversion failed"
            ),
            ConversionSeverity::Critical => tracing::error!(
                ?severity,
                format = ?ctx.format,
                path = %ctx.path.display(),
                locator = %ctx.locator,
                %error,
                "conversion failed"
            ),
        }
    }

    fn on_alert(&self, ctx: &ConversionContext, severity: ConversionSeverity, error: &ConvertError) {
        tracing::error!(
            alert = true,
            ?severity,
            format = ?ctx.format,
            path = %ctx.path.display(),
            locator = %ctx.locator,
            %error,
            "conversion alert"
        );
    }
}
