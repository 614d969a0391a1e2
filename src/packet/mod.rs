//! Outbound signal interception
//!
//! Signals are classified once at ingestion into a tagged union with one
//! decision function per tag (see [`filter::PacketFilter`]). Interception
//! runs inline with outbound traffic, potentially on a different execution
//! context than the periodic tasks, and must fail open: a signal the filter
//! cannot parse is delivered unmodified.

pub mod filter;
pub mod signal;

pub use filter::PacketFilter;
pub use signal::{AudioCue, ObserverContext, OutboundSignal, TextNotification, Verdict, WorldEventSignal};

use std::sync::Arc;

use crate::error::IntegrationError;

/// Inline decision point for one outbound signal
pub trait SignalInterceptor: Send + Sync {
    /// Decide whether the signal is delivered or cancelled
    ///
    /// Must never panic across this boundary; implementations contain their
    /// own failures and fall back to [`Verdict::Pass`].
    fn intercept(&self, observer: &ObserverContext, signal: &OutboundSignal) -> Verdict;
}

/// Host-side hook for intercepting outbound signals before delivery
///
/// Absence of this collaborator is a supported degraded mode: suppression
/// and replacement notifications are skipped, everything else functions.
pub trait OutboundSignalChannel: Send + Sync {
    /// Install the interceptor for all signal categories
    fn install(&self, interceptor: Arc<dyn SignalInterceptor>) -> Result<(), IntegrationError>;

    /// Remove a previously installed interceptor; idempotent
    fn uninstall(&self);
}
