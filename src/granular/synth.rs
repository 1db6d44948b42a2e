use assume::assume;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::engine::{
    GrainEngine, GrainEnvelope, GrainParameters, VoiceId, VoiceOptions, VoiceUpdate,
};
use crate::{audio::SampleBuffer, Error};

// -------------------------------------------------------------------------------------------------

const GRAIN_POOL_SIZE: usize = 256;

/// A grain voice: spawns grains around its read position at the engine's density rate.
#[derive(Debug, Clone, Copy)]
struct SynthVoice {
    id: VoiceId,
    position: f32,
    gain: f32,
    /// Phase of the grain trigger oscillator (0.0..1.0). A new grain spawns on each wrap.
    trigger_phase: f32,
}

// -------------------------------------------------------------------------------------------------

/// A single sounding grain with a linear attack/decay envelope.
#[derive(Debug, Clone, Copy)]
struct Grain {
    active: bool,
    /// Read position in frames.
    position: f64,
    /// Frames to advance per output frame (the grain's pitch).
    increment: f64,
    volume: f32,
    attack_frames: usize,
    decay_frames: usize,
    elapsed_frames: usize,
}

impl Grain {
    const fn new() -> Self {
        Self {
            active: false,
            position: 0.0,
            increment: 1.0,
            volume: 0.0,
            attack_frames: 0,
            decay_frames: 0,
            elapsed_frames: 0,
        }
    }

    fn activate(
        &mut self,
        position: f64,
        increment: f64,
        volume: f32,
        attack_frames: usize,
        decay_frames: usize,
    ) {
        self.active = true;
        self.position = position;
        self.increment = increment;
        self.volume = volume;
        self.attack_frames = attack_frames;
        self.decay_frames = decay_frames.max(1);
        self.elapsed_frames = 0;
    }

    /// Envelope value for the current frame, then advance. Returns (envelope, read position).
    #[inline]
    fn process(&mut self, frame_count: usize) -> (f32, f64) {
        let envelope = if self.elapsed_frames < self.attack_frames {
            self.elapsed_frames as f32 / self.attack_frames as f32
        } else {
            let decayed = self.elapsed_frames - self.attack_frames;
            1.0 - decayed as f32 / self.decay_frames as f32
        };
        let position = self.position;

        self.position = (self.position + self.increment).rem_euclid(frame_count as f64);
        self.elapsed_frames += 1;
        if self.elapsed_frames >= self.attack_frames + self.decay_frames {
            self.active = false;
        }

        (envelope * self.volume, position)
    }
}

// -------------------------------------------------------------------------------------------------

/// The built-in [`GrainEngine`]: a fixed-size pool of grains fed by any number of voices.
///
/// Each voice runs its own grain trigger oscillator, started at a random phase, so voices reading
/// the same position don't spawn their grains in sync. New grains start at the voice position,
/// randomly offset by up to `spread` seconds in both directions, and play at `pitch` speed.
pub struct GranularSynth {
    sample_rate: u32,
    buffer: Option<SampleBuffer>,
    parameters: GrainParameters,
    envelope: GrainEnvelope,
    voices: Vec<SynthVoice>,
    grains: Box<[Grain; GRAIN_POOL_SIZE]>,
    next_voice_id: usize,
    rng: SmallRng,
}

impl GranularSynth {
    /// Max number of concurrently sounding grains. Further grains are dropped.
    pub const POOL_SIZE: usize = GRAIN_POOL_SIZE;

    /// Grain trigger rate at engine density 0.0 and 2.0.
    const MIN_DENSITY_HZ: f32 = 1.0;
    const MAX_DENSITY_HZ: f32 = 100.0;

    const ENVELOPE_THRESHOLD: f32 = 0.001; // ~ -60dB

    pub fn new(sample_rate: u32) -> Self {
        Self::with_rng(sample_rate, SmallRng::from_os_rng())
    }

    /// Create an engine with a deterministic random seed.
    pub fn with_seed(sample_rate: u32, seed: u64) -> Self {
        Self::with_rng(sample_rate, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: u32, rng: SmallRng) -> Self {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        Self {
            sample_rate,
            buffer: None,
            parameters: GrainParameters::default(),
            envelope: GrainEnvelope::default(),
            voices: Vec::new(),
            grains: Box::new([Grain::new(); Self::POOL_SIZE]),
            next_voice_id: 1,
            rng,
        }
    }

    pub fn parameters(&self) -> GrainParameters {
        self.parameters
    }

    pub fn envelope(&self) -> GrainEnvelope {
        self.envelope
    }

    pub fn set_envelope(&mut self, envelope: GrainEnvelope) {
        self.envelope = GrainEnvelope {
            attack: envelope.attack.max(0.0),
            decay: envelope.decay.max(0.0),
        };
    }

    /// Number of live voices.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Number of currently sounding grains.
    pub fn active_grain_count(&self) -> usize {
        self.grains.iter().filter(|g| g.active).count()
    }

    fn trigger_rate(&self) -> f32 {
        let density = self.parameters.density.clamp(0.0, 2.0) / 2.0;
        Self::MIN_DENSITY_HZ + density * (Self::MAX_DENSITY_HZ - Self::MIN_DENSITY_HZ)
    }

    fn voice_mut(&mut self, voice_id: VoiceId) -> Result<&mut SynthVoice, Error> {
        self.voices
            .iter_mut()
            .find(|v| v.id == voice_id)
            .ok_or(Error::VoiceNotFound(voice_id))
    }

    /// Catmull-Rom interpolated read at a fractional frame position. Neighbors wrap around.
    #[inline]
    fn read_interpolated(samples: &[f32], position: f64) -> f32 {
        let len = samples.len();
        assume!(unsafe: len > 0, "Sample buffers are never empty");
        let index = (position as usize).min(len - 1);
        let t = (position - index as f64) as f32;
        let at = |offset: isize| {
            let i = (index as isize + offset).rem_euclid(len as isize) as usize;
            assume!(unsafe: i < len);
            samples[i]
        };
        let (y0, y1, y2, y3) = (at(-1), at(0), at(1), at(2));
        let c1 = 0.5 * (y2 - y0);
        let c2 = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
        let c3 = 0.5 * (y3 - y0) + 1.5 * (y1 - y2);
        ((c3 * t + c2) * t + c1) * t + y1
    }
}

impl GrainEngine for GranularSynth {
    fn set_buffer(&mut self, buffer: &SampleBuffer) {
        for grain in self.grains.iter_mut() {
            grain.active = false;
        }
        self.buffer = Some(buffer.clone());
    }

    fn start_voice(&mut self, options: VoiceOptions) -> Result<VoiceId, Error> {
        let id = VoiceId(self.next_voice_id);
        self.next_voice_id += 1;
        let trigger_phase = self.rng.random::<f32>();
        self.voices.push(SynthVoice {
            id,
            position: options.position.rem_euclid(1.0),
            gain: options.gain.max(0.0),
            trigger_phase,
        });
        log::trace!("Started grain voice #{id}");
        Ok(id)
    }

    fn update_voice(&mut self, voice_id: VoiceId, update: VoiceUpdate) -> Result<(), Error> {
        let voice = self.voice_mut(voice_id)?;
        if let Some(position) = update.position {
            voice.position = position.rem_euclid(1.0);
        }
        if let Some(gain) = update.gain {
            voice.gain = gain.max(0.0);
        }
        Ok(())
    }

    fn stop_voice(&mut self, voice_id: VoiceId) -> Result<(), Error> {
        // grains spawned by the voice ring out
        let index = self
            .voices
            .iter()
            .position(|v| v.id == voice_id)
            .ok_or(Error::VoiceNotFound(voice_id))?;
        self.voices.remove(index);
        log::trace!("Stopped grain voice #{voice_id}");
        Ok(())
    }

    fn set_parameters(&mut self, parameters: GrainParameters) {
        self.parameters = GrainParameters {
            density: parameters.density.clamp(0.0, 2.0),
            spread: parameters.spread.max(0.0),
            pitch: parameters.pitch.max(0.0),
        };
    }

    fn write(&mut self, output: &mut [f32]) -> usize {
        output.fill(0.0);
        let Some(buffer) = self.buffer.clone() else {
            return 0;
        };
        let samples = buffer.samples();
        let frame_count = samples.len();
        let sample_rate = self.sample_rate as f32;

        let trigger_increment = self.trigger_rate() / sample_rate;
        let spread_frames = self.parameters.spread as f64 * sample_rate as f64;
        let pitch = self.parameters.pitch as f64;
        let attack_frames = (self.envelope.attack * sample_rate) as usize;
        let decay_frames = (self.envelope.decay * sample_rate) as usize;

        let mut produced = false;
        let Self {
            voices,
            grains,
            rng,
            ..
        } = self;
        for frame in output.iter_mut() {
            for voice in voices.iter_mut() {
                voice.trigger_phase += trigger_increment;
                if voice.trigger_phase < 1.0 {
                    continue;
                }
                voice.trigger_phase -= 1.0;
                if let Some(grain) = grains.iter_mut().find(|g| !g.active) {
                    let offset = spread_frames * (rng.random::<f64>() * 2.0 - 1.0);
                    let position = (voice.position as f64 * frame_count as f64 + offset)
                        .rem_euclid(frame_count as f64);
                    grain.activate(position, pitch, voice.gain, attack_frames, decay_frames);
                }
            }
            for grain in grains.iter_mut().filter(|g| g.active) {
                let (envelope, position) = grain.process(frame_count);
                if envelope > Self::ENVELOPE_THRESHOLD {
                    *frame += Self::read_interpolated(samples, position) * envelope;
                    produced = true;
                }
            }
        }

        if produced {
            output.len()
        } else {
            0
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer() -> SampleBuffer {
        let samples = (0..44100)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 44100.0).sin())
            .collect();
        SampleBuffer::new(samples, 44100).unwrap()
    }

    #[test]
    fn silent_without_buffer_or_voices() {
        let mut synth = GranularSynth::with_seed(44100, 1);
        let mut output = vec![1.0; 256];
        assert_eq!(synth.write(&mut output), 0);
        assert!(output.iter().all(|s| *s == 0.0));

        synth.set_buffer(&sine_buffer());
        assert_eq!(synth.write(&mut output), 0);
        assert!(output.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn voices_spawn_grains() {
        let mut synth = GranularSynth::with_seed(44100, 1);
        synth.set_buffer(&sine_buffer());
        synth.set_parameters(GrainParameters {
            density: 2.0,
            spread: 0.0,
            pitch: 1.0,
        });
        let voice = synth
            .start_voice(VoiceOptions {
                position: 0.1,
                gain: 0.5,
            })
            .unwrap();
        // at max density a grain spawns at least every 441 frames
        let mut output = vec![0.0; 1024];
        assert_eq!(synth.write(&mut output), 1024);
        assert!(synth.active_grain_count() > 0);
        assert!(output.iter().any(|s| *s != 0.0));

        synth.stop_voice(voice).unwrap();
        assert_eq!(synth.voice_count(), 0);
        assert!(matches!(
            synth.update_voice(voice, VoiceUpdate::position(0.5)),
            Err(Error::VoiceNotFound(_))
        ));
    }

    #[test]
    fn parameters_are_clamped() {
        let mut synth = GranularSynth::with_seed(44100, 1);
        synth.set_parameters(GrainParameters {
            density: 12.0,
            spread: -1.0,
            pitch: -2.0,
        });
        assert_eq!(
            synth.parameters(),
            GrainParameters {
                density: 2.0,
                spread: 0.0,
                pitch: 0.0
            }
        );
    }

    #[test]
    fn grains_decay() {
        let mut grain = Grain::new();
        grain.activate(0.0, 1.0, 1.0, 0, 4);
        let envelopes = (0..4).map(|_| grain.process(100).0).collect::<Vec<_>>();
        assert_eq!(envelopes, vec![1.0, 0.75, 0.5, 0.25]);
        assert!(!grain.active);
    }
}
