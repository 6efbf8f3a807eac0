//! Delay effect with feedback and dry/wet mix.

use super::Effect;
use crate::buffer::AudioBuffer;

/// Feedback delay with a separate ring buffer per output channel.
///
/// # Examples
///
/// ```
/// use humdrum::buffer::AudioBuffer;
/// use humdrum::effects::{Delay, Effect};
///
/// // 2 ms echo at 1 kHz, fully wet
/// let mut delay = Delay::new(1_000, 0.01, 0.002, 0.0, 1.0);
/// let mut buffer = AudioBuffer::new(1, 4);
/// buffer.add(0, 0, 1.0);
/// delay.apply(&mut buffer);
///
/// assert_eq!(buffer.channel(0), &[0.0, 0.0, 1.0, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Delay {
    sample_rate: u32,
    /// Per-channel ring buffers, sized on first use.
    lines: Vec<Vec<f32>>,
    line_len: usize,
    write_pos: Vec<usize>,

    delay_time: f32, // seconds
    feedback: f32,   // 0.0 to 0.99
    mix: f32,        // 0.0 = all dry, 1.0 = all wet
}

impl Delay {
    /// Creates a new delay.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Rate of the buffers the delay will process
    /// * `max_delay_time` - Longest delay in seconds (determines line length)
    /// * `delay_time` - Delay in seconds
    /// * `feedback` - Amount of the echo fed back (0.0 = single echo)
    /// * `mix` - Dry/wet mix (0.0 = all dry, 1.0 = all wet)
    pub fn new(
        sample_rate: u32,
        max_delay_time: f32,
        delay_time: f32,
        feedback: f32,
        mix: f32,
    ) -> Self {
        let line_len = (max_delay_time.max(0.0) * sample_rate as f32).ceil() as usize + 1;
        Self {
            sample_rate,
            lines: Vec::new(),
            line_len,
            write_pos: Vec::new(),
            delay_time: delay_time.max(0.0),
            feedback: feedback.clamp(0.0, 0.99),
            mix: mix.clamp(0.0, 1.0),
        }
    }

    /// Simple echo with a 50% mix.
    pub fn echo(sample_rate: u32, delay_time: f32, feedback: f32) -> Self {
        Self::new(sample_rate, delay_time, delay_time, feedback, 0.5)
    }

    /// Short single echo.
    pub fn slapback(sample_rate: u32) -> Self {
        Self::new(sample_rate, 0.2, 0.075, 0.3, 0.4)
    }

    pub fn set_delay_time(&mut self, seconds: f32) {
        self.delay_time = seconds.max(0.0);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    fn delay_samples(&self) -> usize {
        let samples = (self.delay_time * self.sample_rate as f32) as usize;
        samples.min(self.line_len - 1)
    }
}

impl Effect for Delay {
    fn apply(&mut self, buffer: &mut AudioBuffer) {
        if self.lines.len() != buffer.channels() {
            self.lines = vec![vec![0.0; self.line_len]; buffer.channels()];
            self.write_pos = vec![0; buffer.channels()];
        }

        let delay = self.delay_samples();
        let len = self.line_len;
        for ch in 0..buffer.channels() {
            let line = &mut self.lines[ch];
            let mut write_pos = self.write_pos[ch];

            for sample in buffer.channel_mut(ch) {
                let input = *sample;
                let read_pos = (write_pos + len - delay) % len;
                let delayed = line[read_pos];

                line[write_pos] = input + delayed * self.feedback;
                write_pos = (write_pos + 1) % len;

                *sample = input * (1.0 - self.mix) + delayed * self.mix;
            }
            self.write_pos[ch] = write_pos;
        }
    }
}
