//! Error type for the buffer-fill path.

use thiserror::Error;

/// Failures that abort a buffer fill.
///
/// Everything else the synthesizer encounters (bad configuration values,
/// out-of-range controls, undersized destinations) is corrected or ignored
/// locally. These variants mean the sequencer broke its contract, and the
/// contents of the buffer being rendered are unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// An event is timestamped before a position that was already rendered.
    #[error("event at sample {delta} arrived after {processed} samples were already rendered")]
    EventOutOfOrder { delta: usize, processed: usize },

    /// An event is timestamped past the end of the buffer being rendered.
    #[error("event at sample {delta} lies outside a {samples_per_buffer}-sample buffer")]
    EventOutOfRange {
        delta: usize,
        samples_per_buffer: usize,
    },
}
