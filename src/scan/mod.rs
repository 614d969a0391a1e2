//! Periodic world scanning
//!
//! Two cadences with different jobs: discovery enumerates the world near
//! observers to grow the working set of known devices, and the state scan
//! reads ground truth for every known device to drive session start/stop.

pub mod discovery;
pub mod state;

pub use discovery::DiscoveryScanner;
pub use state::StateScanner;
