//! Post-processing effects applied to each rendered buffer.
//!
//! Effects run after every voice has been mixed and before the buffer is
//! converted for output. They see the whole planar [`AudioBuffer`] and may
//! rewrite it in place.

mod delay;
mod limiter;

pub use delay::Delay;
pub use limiter::Limiter;

use crate::buffer::AudioBuffer;

/// An in-place buffer processor.
///
/// Any `FnMut(&mut AudioBuffer)` closure is an effect.
///
/// # Examples
///
/// ```
/// use humdrum::buffer::AudioBuffer;
/// use humdrum::effects::{Effect, EffectChain};
///
/// let mut chain = EffectChain::new();
/// chain.add(|buffer: &mut AudioBuffer| {
///     for sample in buffer.samples_mut() {
///         *sample *= 0.5;
///     }
/// });
///
/// let mut buffer = AudioBuffer::new(1, 2);
/// buffer.add(0, 0, 1.0);
/// chain.apply(&mut buffer);
/// assert_eq!(buffer.get(0, 0), 0.5);
/// ```
pub trait Effect {
    fn apply(&mut self, buffer: &mut AudioBuffer);
}

impl<F: FnMut(&mut AudioBuffer)> Effect for F {
    fn apply(&mut self, buffer: &mut AudioBuffer) {
        self(buffer)
    }
}

/// Ordered list of effects, applied in the order they were added.
#[derive(Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn Effect + Send>>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `effect` to the end of the chain.
    pub fn add<E: Effect + Send + 'static>(&mut self, effect: E) {
        self.effects.push(Box::new(effect));
    }

    pub fn add_boxed(&mut self, effect: Box<dyn Effect + Send>) {
        self.effects.push(effect);
    }

    /// Removes and returns the effect at `index`, shifting later ones down.
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Effect + Send>> {
        if index < self.effects.len() {
            Some(self.effects.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Runs every effect over `buffer` in order.
    pub fn apply(&mut self, buffer: &mut AudioBuffer) {
        for effect in &mut self.effects {
            effect.apply(buffer);
        }
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("len", &self.effects.len())
            .finish()
    }
}
