//! The multi-channel float working buffer voices mix into.

/// Planar float buffer: `channels` runs of `frames` samples each.
///
/// Voices add into it, effects rewrite it in place, and the output stage
/// interleaves it into the caller's destination.
///
/// # Examples
///
/// ```
/// use humdrum::AudioBuffer;
///
/// let mut buffer = AudioBuffer::new(2, 4);
/// buffer.channel_mut(1)[3] = 0.5;
///
/// assert_eq!(buffer.channel(0), &[0.0; 4]);
/// assert_eq!(buffer.channel(1), &[0.0, 0.0, 0.0, 0.5]);
/// assert_eq!(buffer.len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: usize,
    frames: usize,
    data: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels,
            frames,
            data: vec![0.0; channels * frames],
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Total number of samples across all channels.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.frames;
        &self.data[start..start + self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// Sample of channel `ch` at `frame`.
    #[inline]
    pub fn get(&self, ch: usize, frame: usize) -> f32 {
        self.data[ch * self.frames + frame]
    }

    /// Adds `value` into channel `ch` at `frame`.
    #[inline]
    pub fn add(&mut self, ch: usize, frame: usize, value: f32) {
        self.data[ch * self.frames + frame] += value;
    }

    /// Every sample, channel by channel.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns true when every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.data.iter().all(|&s| s == 0.0)
    }
}
