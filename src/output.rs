//! Conversion of the planar working buffer into host sample formats.
//!
//! Every destination receives interleaved frames. Samples are scaled by the
//! master volume and clamped to `[-1, 1]` first; PCM formats then map that
//! range asymmetrically so both `1.0 → 32767` and `-1.0 → -32768` hold.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::warn;

use crate::buffer::AudioBuffer;

/// Byte order of a [`Pcm16Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

/// A destination for interleaved output samples.
///
/// `value` is already scaled and clamped; implementations only encode it.
pub trait OutputSink {
    /// Number of samples the sink holds.
    fn capacity(&self) -> usize;

    fn write_sample(&mut self, index: usize, value: f32);
}

impl OutputSink for [f32] {
    fn capacity(&self) -> usize {
        self.len()
    }

    #[inline]
    fn write_sample(&mut self, index: usize, value: f32) {
        self[index] = value;
    }
}

impl OutputSink for [i16] {
    fn capacity(&self) -> usize {
        self.len()
    }

    #[inline]
    fn write_sample(&mut self, index: usize, value: f32) {
        self[index] = to_pcm16(value);
    }
}

/// 16-bit PCM written into raw bytes with an explicit byte order.
///
/// # Examples
///
/// ```
/// use humdrum::output::{Endianness, OutputSink, Pcm16Buffer};
///
/// let mut bytes = [0u8; 4];
/// let mut sink = Pcm16Buffer::new(&mut bytes, Endianness::Big);
/// assert_eq!(sink.capacity(), 2);
/// sink.write_sample(0, 1.0);
/// sink.write_sample(1, -1.0);
/// assert_eq!(bytes, [0x7f, 0xff, 0x80, 0x00]);
/// ```
#[derive(Debug)]
pub struct Pcm16Buffer<'a> {
    bytes: &'a mut [u8],
    order: Endianness,
}

impl<'a> Pcm16Buffer<'a> {
    pub fn new(bytes: &'a mut [u8], order: Endianness) -> Self {
        Self { bytes, order }
    }

    /// Wraps `bytes` using the host byte order.
    pub fn native(bytes: &'a mut [u8]) -> Self {
        Self::new(bytes, Endianness::native())
    }

    pub fn order(&self) -> Endianness {
        self.order
    }
}

impl OutputSink for Pcm16Buffer<'_> {
    fn capacity(&self) -> usize {
        self.bytes.len() / 2
    }

    fn write_sample(&mut self, index: usize, value: f32) {
        let slot = &mut self.bytes[index * 2..index * 2 + 2];
        match self.order {
            Endianness::Little => LittleEndian::write_i16(slot, to_pcm16(value)),
            Endianness::Big => BigEndian::write_i16(slot, to_pcm16(value)),
        }
    }
}

/// Converts a sample in `[-1, 1]` to 16-bit PCM, truncating toward zero.
///
/// Values outside the range are clamped.
///
/// # Examples
///
/// ```
/// use humdrum::output::to_pcm16;
///
/// assert_eq!(to_pcm16(1.0), 32767);
/// assert_eq!(to_pcm16(-1.0), -32768);
/// assert_eq!(to_pcm16(0.0), 0);
/// assert_eq!(to_pcm16(2.5), 32767);
/// ```
pub fn to_pcm16(value: f32) -> i16 {
    let value = value.clamp(-1.0, 1.0);
    if value >= 0.0 {
        (value * 32767.0) as i16
    } else {
        (value * 32768.0) as i16
    }
}

/// Interleaves `buffer` into `out`, scaled by `master_volume` and clamped.
///
/// If `out` does not hold exactly one buffer's worth of samples a warning is
/// logged and only the samples that fit are written; the rest of `out` is
/// left as it was. Returns the number of samples written.
pub fn write_interleaved<O: OutputSink + ?Sized>(
    buffer: &AudioBuffer,
    master_volume: f32,
    out: &mut O,
) -> usize {
    let expected = buffer.len();
    let capacity = out.capacity();
    if capacity != expected {
        warn!(
            "output holds {} samples, buffer has {}; writing {}",
            capacity,
            expected,
            capacity.min(expected)
        );
    }

    let channels = buffer.channels();
    let count = capacity.min(expected);
    for index in 0..count {
        let frame = index / channels;
        let ch = index % channels;
        let value = (buffer.get(ch, frame) * master_volume).clamp(-1.0, 1.0);
        out.write_sample(index, value);
    }
    count
}
