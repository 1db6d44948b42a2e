//! Audio-graph building blocks: sample buffers, playback, capture, metering and basic DSP.

pub mod dsp;

mod buffer;
pub use buffer::SampleBuffer;

mod input;
pub use input::{InputBus, SoundRecorder};

mod level;
pub use level::LevelMeter;

mod player;
pub use player::{PlaybackMode, SamplePlayer};

// -------------------------------------------------------------------------------------------------

/// Mix `source` into `target`, adding sample by sample.
#[inline]
pub fn add_buffers(target: &mut [f32], source: &[f32]) {
    for (t, s) in target.iter_mut().zip(source.iter()) {
        *t += *s;
    }
}

/// Crossfade a processed (wet) buffer with the unprocessed (dry) input in place.
/// `wet` of 0.0 keeps `dry` only, 1.0 keeps the processed signal only.
#[inline]
pub fn apply_dry_wet(processed: &mut [f32], dry: &[f32], wet: f32) {
    let wet = wet.clamp(0.0, 1.0);
    let dry_amount = 1.0 - wet;
    for (p, d) in processed.iter_mut().zip(dry.iter()) {
        *p = *d * dry_amount + *p * wet;
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_wet_mix() {
        let dry = [1.0, 1.0];
        let mut processed = [0.0, 0.5];
        apply_dry_wet(&mut processed, &dry, 0.0);
        assert_eq!(processed, [1.0, 1.0]);

        let mut processed = [0.0, 0.5];
        apply_dry_wet(&mut processed, &dry, 1.0);
        assert_eq!(processed, [0.0, 0.5]);

        let mut processed = [0.0, 0.5];
        apply_dry_wet(&mut processed, &dry, 0.5);
        assert_eq!(processed, [0.5, 0.75]);
    }

    #[test]
    fn add() {
        let mut target = [1.0, 2.0, 3.0];
        add_buffers(&mut target, &[0.5, 0.5]);
        assert_eq!(target, [1.5, 2.5, 3.0]);
    }
}
