//! Humdrum - a polyphonic software synthesizer core for Rust
//!
//! This library turns note and controller events into interleaved audio
//! buffers. It handles voice allocation and stealing, sample-counted
//! envelopes, per-channel pan/volume/pitch bend, sample-accurate event
//! timing and conversion to float or 16-bit PCM output. Instruments plug in
//! through the [`InstrumentBank`] trait; a small waveform bank is included.
//!
//! ```
//! use humdrum::instrument::SynthBank;
//! use humdrum::sequencer::EventSequencer;
//! use humdrum::{SynthConfig, Synthesizer};
//!
//! let config = SynthConfig::new(44_100).with_samples_per_buffer(441);
//! let mut synth = Synthesizer::new(config, SynthBank::new(44_100));
//!
//! let mut seq = EventSequencer::new(44_100);
//! seq.add_note(0, 60, 100, 0.0, 0.25);
//! seq.add_note(0, 67, 100, 0.25, 0.25);
//! seq.play();
//! synth.attach_sequencer(seq);
//!
//! let mut pcm = vec![0i16; 441 * 2];
//! for _ in 0..50 {
//!     synth.next_buffer(&mut pcm[..])?;
//! }
//! # Ok::<(), humdrum::SynthError>(())
//! ```

pub mod buffer;
pub mod channel;
pub mod config;
pub mod effects;
pub mod error;
pub mod instrument;
pub mod midi;
pub mod output;
pub mod sequencer;
pub mod synth;
pub mod voice;

// Re-export commonly used types at the crate root
pub use buffer::AudioBuffer;
pub use channel::ChannelState;
pub use config::SynthConfig;
pub use effects::{Delay, Effect, EffectChain, Limiter};
pub use error::SynthError;
pub use instrument::{EnvelopeSamples, InstrumentBank, InstrumentId};
pub use midi::{MidiEvent, NoteKey};
pub use output::{Endianness, OutputSink, Pcm16Buffer};
pub use sequencer::{EventSequencer, Sequencer, TimedEvent};
pub use synth::Synthesizer;

#[cfg(feature = "macros")]
pub use humdrum_macros::note;
