//! Plays an arpeggio through the default audio device.
//!
//! The synthesizer is shared with the audio callback through a mutex. The
//! callback asks for whatever number of frames the device wants, so rendered
//! buffers are staged and handed out piecemeal.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, StreamConfig};
use humdrum::instrument::SynthBank;
use humdrum::{EventSequencer, Limiter, Sequencer, SynthConfig, Synthesizer};

const SAMPLES_PER_BUFFER: usize = 256;

struct Player {
    synth: Synthesizer<SynthBank>,
    staged: Vec<f32>,
    read_pos: usize,
    channels: usize,
}

impl Player {
    fn new(sample_rate: u32) -> Self {
        let config = SynthConfig::new(sample_rate)
            .with_channels(2)
            .with_samples_per_buffer(SAMPLES_PER_BUFFER);
        let mut synth = Synthesizer::new(config, SynthBank::new(sample_rate));
        synth.add_effect(Limiter::safety(sample_rate));

        let mut seq = EventSequencer::new(sample_rate);
        let arpeggio = [48, 55, 60, 64, 67, 72, 67, 64];
        for repeat in 0..4 {
            for (step, &note) in arpeggio.iter().enumerate() {
                let start = (repeat * arpeggio.len() + step) as f64 * 0.15;
                seq.add_note(0, note, 96, start, 0.12);
            }
        }
        seq.play();
        synth.attach_sequencer(seq);

        let channels = synth.config().channels;
        Self {
            synth,
            staged: vec![0.0; SAMPLES_PER_BUFFER * channels],
            read_pos: SAMPLES_PER_BUFFER * channels,
            channels,
        }
    }

    /// Next stereo frame, rendering a new buffer when the staged one runs out.
    fn next_frame(&mut self) -> (f32, f32) {
        if self.read_pos >= self.staged.len() {
            if let Err(err) = self.synth.next_buffer(&mut self.staged[..]) {
                eprintln!("Render error: {}", err);
                self.staged.fill(0.0);
            }
            self.read_pos = 0;
        }
        let left = self.staged[self.read_pos];
        let right = self.staged[self.read_pos + self.channels - 1];
        self.read_pos += self.channels;
        (left, right)
    }

    fn is_finished(&mut self) -> bool {
        let playing = self.synth.sequencer_mut().is_some_and(|s| s.is_playing());
        !playing && self.synth.active_voice_count() == 0
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("No output device available"))?;
    let config = device.default_output_config()?;
    let player = Arc::new(Mutex::new(Player::new(config.sample_rate().0)));

    let _stream = match config.sample_format() {
        SampleFormat::F32 => create_audio_stream::<f32>(&device, &config.into(), player.clone())?,
        SampleFormat::I16 => create_audio_stream::<i16>(&device, &config.into(), player.clone())?,
        SampleFormat::U16 => create_audio_stream::<u16>(&device, &config.into(), player.clone())?,
        sample_format => {
            return Err(anyhow::anyhow!(
                "Unsupported sample format: {}",
                sample_format
            ));
        }
    };

    println!("Playing...");
    while !player.lock().unwrap().is_finished() {
        thread::sleep(Duration::from_millis(100));
    }

    Ok(())
}

fn create_audio_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    player: Arc<Mutex<Player>>,
) -> Result<cpal::Stream>
where
    T: Sample + FromSample<f32> + cpal::SizedSample,
{
    let channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut player = player.lock().unwrap();
            for frame in data.chunks_mut(channels) {
                let (left, right) = player.next_frame();
                for (i, s) in frame.iter_mut().enumerate() {
                    let value = if i % 2 == 0 { left } else { right };
                    *s = T::from_sample(value);
                }
            }
        },
        |err| eprintln!("Audio stream error: {}", err),
        None,
    )?;

    stream.play()?;
    Ok(stream)
}
