use super::engine::{GrainEngine, GrainParameters, VoiceId, VoiceOptions, VoiceUpdate};
use crate::{audio::SampleBuffer, Error};

// -------------------------------------------------------------------------------------------------

/// Manages a set of live grain voices in a [`GrainEngine`] which all read a private copy of one
/// sample buffer at a shared, steadily advancing read cursor.
///
/// The cursor is kept as an integer step count, so after `n` ticks it is exactly
/// `(n / cursor_steps) mod 1.0` without accumulating float rounding errors.
pub struct GrainVoicePool {
    engine: Box<dyn GrainEngine>,
    buffer: Option<SampleBuffer>,
    cursor_step: u32,
    cursor_steps: u32,
    gain: f32,
    voices: Vec<VoiceId>,
    connected: bool,
}

impl GrainVoicePool {
    /// Read position of newly started voices.
    pub const INITIAL_POSITION: f32 = 0.1;
    /// Number of ticks it takes by default to move the cursor across the whole buffer.
    pub const DEFAULT_CURSOR_STEPS: u32 = 1000;
    /// Initial gain of new voices.
    pub const DEFAULT_GAIN: f32 = 0.5;

    pub fn new(engine: Box<dyn GrainEngine>, cursor_steps: u32) -> Self {
        debug_assert!(cursor_steps > 0, "Invalid cursor step count");
        Self {
            engine,
            buffer: None,
            cursor_step: 0,
            cursor_steps: cursor_steps.max(1),
            gain: Self::DEFAULT_GAIN,
            voices: Vec::new(),
            connected: false,
        }
    }

    /// The pool's private buffer copy, if any.
    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_ref()
    }

    /// Replace the buffer with an independent copy of the given one and reset the read cursor.
    /// Fails with `VoicesActive` while voices are live: stop them first.
    pub fn set_buffer(&mut self, buffer: &SampleBuffer) -> Result<(), Error> {
        if !self.voices.is_empty() {
            return Err(Error::VoicesActive);
        }
        self.buffer = Some(buffer.copy());
        self.cursor_step = 0;
        Ok(())
    }

    /// Drop the buffer. Fails with `VoicesActive` while voices are live.
    pub fn clear_buffer(&mut self) -> Result<(), Error> {
        if !self.voices.is_empty() {
            return Err(Error::VoicesActive);
        }
        self.buffer = None;
        self.cursor_step = 0;
        Ok(())
    }

    /// Current read cursor position in range `0.0..1.0`.
    pub fn position(&self) -> f64 {
        self.cursor_step as f64 / self.cursor_steps as f64
    }

    /// Cursor movement per tick.
    pub fn increment(&self) -> f64 {
        1.0 / self.cursor_steps as f64
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Handles of all live voices, in start order.
    pub fn voices(&self) -> &[VoiceId] {
        &self.voices
    }

    /// True while voices are live.
    pub fn is_active(&self) -> bool {
        !self.voices.is_empty()
    }

    /// Start `voice_count` new voices at [`INITIAL_POSITION`](Self::INITIAL_POSITION) with the
    /// current gain.
    ///
    /// When the engine refuses one of the voices, all voices started so far are stopped again, so
    /// the pool never ends up partially started.
    pub fn start(&mut self, voice_count: usize) -> Result<(), Error> {
        if voice_count == 0 {
            return Err(Error::InvalidVoiceCount(voice_count));
        }
        if !self.voices.is_empty() {
            return Err(Error::VoicesActive);
        }
        let buffer = self.buffer.as_ref().ok_or(Error::BufferNotSet)?;
        self.engine.set_buffer(buffer);
        let options = VoiceOptions {
            position: Self::INITIAL_POSITION,
            gain: self.gain,
        };
        for _ in 0..voice_count {
            match self.engine.start_voice(options) {
                Ok(voice_id) => self.voices.push(voice_id),
                Err(err) => {
                    if let Err(stop_err) = self.stop() {
                        log::warn!("Failed to release partially started voices: {stop_err}");
                    }
                    return Err(err);
                }
            }
        }
        log::debug!("Started {voice_count} grain voices");
        Ok(())
    }

    /// Stop all live voices and forget their handles. Stopping an inactive pool is a no-op.
    ///
    /// All voices get stopped even when the engine rejects some of them: the first such error
    /// is returned.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.voices.is_empty() {
            return Ok(());
        }
        let mut result = Ok(());
        for voice_id in self.voices.drain(..) {
            if let Err(err) = self.engine.stop_voice(voice_id) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        log::debug!("Stopped grain voices");
        result
    }

    /// Advance the read cursor by one step, wrapping at 1.0, and move all live voices to it.
    pub fn tick(&mut self) -> Result<(), Error> {
        self.cursor_step = (self.cursor_step + 1) % self.cursor_steps;
        let update = VoiceUpdate::position(self.position() as f32);
        for voice_id in &self.voices {
            self.engine.update_voice(*voice_id, update)?;
        }
        Ok(())
    }

    /// Forward engine-wide parameters as they are.
    pub fn set_parameters(&mut self, parameters: GrainParameters) {
        self.engine.set_parameters(parameters);
    }

    /// Set the gain for new voices and apply it to all live voices.
    pub fn set_gain(&mut self, gain: f32) -> Result<(), Error> {
        self.gain = gain;
        let update = VoiceUpdate::gain(gain);
        for voice_id in &self.voices {
            self.engine.update_voice(*voice_id, update)?;
        }
        Ok(())
    }

    /// Route the engine output to the chain bus.
    pub fn connect(&mut self) {
        self.connected = true;
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Render the engine's next block into `output`, overwriting it. Disconnected pools render
    /// silence. Returns the number of frames which carry audio.
    pub fn write(&mut self, output: &mut [f32]) -> usize {
        if self.connected {
            self.engine.write(output)
        } else {
            output.fill(0.0);
            0
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granular::{EngineCall, RecordingEngine};

    fn buffer() -> SampleBuffer {
        SampleBuffer::new(vec![0.25; 100], 44100).unwrap()
    }

    fn pool() -> (GrainVoicePool, std::rc::Rc<std::cell::RefCell<Vec<EngineCall>>>) {
        let (engine, calls) = RecordingEngine::new();
        (
            GrainVoicePool::new(Box::new(engine), GrainVoicePool::DEFAULT_CURSOR_STEPS),
            calls,
        )
    }

    fn circular_distance(a: f64, b: f64) -> f64 {
        let d = (a - b).abs();
        d.min(1.0 - d)
    }

    #[test]
    fn cursor_wraps() {
        let (mut pool, _) = pool();
        pool.set_buffer(&buffer()).unwrap();
        let increment = pool.increment();
        for n in 1..=2500_u32 {
            pool.tick().unwrap();
            let expected = (n as f64 * increment) % 1.0;
            assert!(
                circular_distance(pool.position(), expected) < 1e-9,
                "tick {n}: {} != {expected}",
                pool.position()
            );
            assert!((0.0..1.0).contains(&pool.position()));
        }
    }

    #[test]
    fn buffer_is_copied() {
        let (mut pool, _) = pool();
        let buffer = buffer();
        pool.tick().unwrap();
        pool.set_buffer(&buffer).unwrap();
        assert!(!pool.buffer().unwrap().ptr_eq(&buffer));
        assert_eq!(pool.buffer().unwrap().samples(), buffer.samples());
        assert_eq!(pool.position(), 0.0);
    }

    #[test]
    fn start_requires_buffer_and_voices() {
        let (mut pool, calls) = pool();
        assert!(matches!(pool.start(3), Err(Error::BufferNotSet)));
        pool.set_buffer(&buffer()).unwrap();
        assert!(matches!(pool.start(0), Err(Error::InvalidVoiceCount(0))));
        assert!(calls.borrow().is_empty());

        pool.start(2).unwrap();
        assert!(matches!(pool.start(2), Err(Error::VoicesActive)));
        assert!(matches!(pool.set_buffer(&buffer()), Err(Error::VoicesActive)));
        assert_eq!(pool.voices().len(), 2);
    }

    #[test]
    fn start_then_stop_releases_all_handles() {
        let (mut pool, calls) = pool();
        pool.set_buffer(&buffer()).unwrap();
        pool.start(5).unwrap();

        let started = calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                EngineCall::StartVoice(id, options) => {
                    assert_eq!(options.position, GrainVoicePool::INITIAL_POSITION);
                    assert_eq!(options.gain, GrainVoicePool::DEFAULT_GAIN);
                    Some(*id)
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(started.len(), 5);
        assert_eq!(calls.borrow()[0], EngineCall::SetBuffer(100));

        pool.stop().unwrap();
        assert!(pool.voices().is_empty());
        let stopped = calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                EngineCall::StopVoice(id) => Some(*id),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(stopped, started);

        // idempotent
        let call_count = calls.borrow().len();
        pool.stop().unwrap();
        assert_eq!(calls.borrow().len(), call_count);
    }

    #[test]
    fn refused_voice_rolls_back_started_ones() {
        let (engine, calls) = RecordingEngine::new();
        let mut pool = GrainVoicePool::new(
            Box::new(engine.with_voice_limit(3)),
            GrainVoicePool::DEFAULT_CURSOR_STEPS,
        );
        pool.set_buffer(&buffer()).unwrap();
        assert!(matches!(pool.start(5), Err(Error::ParameterError(_))));
        assert!(pool.voices().is_empty());
        assert!(!pool.is_active());

        let calls = calls.borrow();
        let started = calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::StartVoice(id, _) => Some(*id),
                _ => None,
            })
            .collect::<Vec<_>>();
        let stopped = calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::StopVoice(id) => Some(*id),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(started.len(), 3);
        assert_eq!(stopped, started);
    }

    #[test]
    fn tick_retargets_every_voice() {
        let (mut pool, calls) = pool();
        pool.set_buffer(&buffer()).unwrap();
        pool.start(3).unwrap();
        calls.borrow_mut().clear();

        pool.tick().unwrap();
        let calls = calls.borrow();
        assert_eq!(calls.len(), 3);
        for (call, voice_id) in calls.iter().zip(pool.voices()) {
            assert_eq!(
                *call,
                EngineCall::UpdateVoice(*voice_id, VoiceUpdate::position(0.001))
            );
        }
    }

    #[test]
    fn gain_applies_to_live_and_future_voices() {
        let (mut pool, calls) = pool();
        pool.set_buffer(&buffer()).unwrap();
        pool.start(2).unwrap();
        calls.borrow_mut().clear();

        pool.set_gain(0.8).unwrap();
        assert_eq!(
            calls
                .borrow()
                .iter()
                .filter(|c| matches!(c, EngineCall::UpdateVoice(_, u) if u.gain == Some(0.8)))
                .count(),
            2
        );
        pool.stop().unwrap();
        calls.borrow_mut().clear();
        pool.start(1).unwrap();
        assert!(calls
            .borrow()
            .iter()
            .any(|c| matches!(c, EngineCall::StartVoice(_, o) if o.gain == 0.8)));
    }

    #[test]
    fn parameters_are_forwarded_unvalidated() {
        let (mut pool, calls) = pool();
        let parameters = GrainParameters {
            density: -3.0,
            spread: 6.0,
            pitch: 9.0,
        };
        pool.set_parameters(parameters);
        assert_eq!(
            *calls.borrow(),
            vec![EngineCall::SetParameters(parameters)]
        );
    }

    #[test]
    fn disconnected_pool_is_silent() {
        let (mut pool, _) = pool();
        let mut output = vec![1.0; 16];
        assert_eq!(pool.write(&mut output), 0);
        assert!(output.iter().all(|s| *s == 0.0));
    }
}
