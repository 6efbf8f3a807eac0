//! Renders a short chord progression with a drum pattern to a WAV file.
//!
//! Usage: `cargo run --example render_wav --features macros [output.wav]`
//!
//! Set `RUST_LOG=debug` to see voice steals and evictions.

use anyhow::Result;
use humdrum::instrument::SynthBank;
use humdrum::midi::{DRUM_CHANNEL, MidiEvent};
use humdrum::{Delay, EventSequencer, Limiter, Sequencer, SynthConfig, Synthesizer, note};

const SAMPLE_RATE: u32 = 44100;
const BEAT: f64 = 0.5; // seconds, 120 BPM

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "humdrum.wav".to_string());

    let config = SynthConfig::new(SAMPLE_RATE)
        .with_channels(2)
        .with_samples_per_buffer(512)
        .with_polyphony(24);
    let mut synth = Synthesizer::new(config, SynthBank::new(SAMPLE_RATE));
    synth.add_effect(Delay::echo(SAMPLE_RATE, 0.375, 0.35));
    synth.add_effect(Limiter::safety(SAMPLE_RATE));
    synth.set_master_volume(0.9);

    let mut seq = EventSequencer::new(SAMPLE_RATE);

    // Pad on channel 1, lead on channel 2
    for (channel, program, pan) in [(1, 24, 40), (2, 16, 90)] {
        seq.add_event(0, MidiEvent::ProgramChange { channel, program });
        seq.add_event(
            0,
            MidiEvent::ControlChange {
                channel,
                controller: 10,
                value: pan,
            },
        );
    }

    let chords = [
        [note!("C3"), note!("E3"), note!("G3")],
        [note!("A2"), note!("C3"), note!("E3")],
        [note!("F2"), note!("A2"), note!("C3")],
        [note!("G2"), note!("B2"), note!("D3")],
    ];
    for (bar, chord) in chords.iter().enumerate() {
        let start = bar as f64 * 4.0 * BEAT;
        for &root in chord {
            seq.add_note(1, root, 80, start, 4.0 * BEAT);
        }
    }

    let melody = [
        note!("E4"), note!("G4"), note!("C5"), note!("G4"),
        note!("E4"), note!("A4"), note!("C5"), note!("E5"),
        note!("F4"), note!("A4"), note!("C5"), note!("A4"),
        note!("D5"), note!("B4"), note!("G4"), note!("D4"),
    ];
    for (step, &pitch) in melody.iter().enumerate() {
        seq.add_note(2, pitch, 100, step as f64 * BEAT, BEAT * 0.8);
    }

    // Drums: kick on beats, snare on the off-beats
    for beat in 0..16 {
        let start = beat as f64 * BEAT;
        seq.add_note(DRUM_CHANNEL, 36, 110, start, 0.1);
        seq.add_note(DRUM_CHANNEL, 38, 70, start + BEAT / 2.0, 0.05);
    }

    // Bend the last lead note down a whole tone
    let bend_at = 15.0 * BEAT;
    let bend = |value| MidiEvent::PitchBend { channel: 2, value };
    seq.add_event_at(bend_at, bend(8192));
    seq.add_event_at(bend_at + 0.2, bend(0));
    seq.add_event_at(bend_at + 0.6, bend(8192));

    seq.play();
    synth.attach_sequencer(seq);

    let wav_spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, wav_spec)?;

    let mut pcm = vec![0i16; 512 * 2];
    let tail_buffers = SAMPLE_RATE as usize / 512 * 2;
    let mut remaining_tail = tail_buffers;
    loop {
        synth.next_buffer(&mut pcm[..])?;
        for &sample in &pcm {
            writer.write_sample(sample)?;
        }

        let playing = synth.sequencer_mut().is_some_and(|s| s.is_playing());
        if !playing {
            // Let releases and echoes ring out
            if remaining_tail == 0 {
                break;
            }
            remaining_tail -= 1;
        }
    }
    writer.finalize()?;

    println!("Wrote {}", path);
    Ok(())
}
