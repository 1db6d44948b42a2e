use super::SampleBuffer;

// -------------------------------------------------------------------------------------------------

/// Playback state of a [`SamplePlayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PlaybackMode {
    Stopped,
    Once,
    Looping,
}

// -------------------------------------------------------------------------------------------------

/// Plays back a [`SampleBuffer`] once or looped, with volume, into a connected bus.
#[derive(Debug)]
pub struct SamplePlayer {
    buffer: Option<SampleBuffer>,
    position: usize,
    mode: PlaybackMode,
    volume: f32,
    connected: bool,
}

impl Default for SamplePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplePlayer {
    pub fn new() -> Self {
        Self {
            buffer: None,
            position: 0,
            mode: PlaybackMode::Stopped,
            volume: 1.0,
            connected: false,
        }
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_ref()
    }

    /// Replace the played buffer. Stops playback.
    pub fn set_buffer(&mut self, buffer: SampleBuffer) {
        self.buffer = Some(buffer);
        self.stop();
    }

    /// Drop the played buffer. Stops playback.
    pub fn clear_buffer(&mut self) {
        self.buffer = None;
        self.stop();
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.mode != PlaybackMode::Stopped
    }

    /// Play the buffer once from the start.
    pub fn play(&mut self) {
        self.position = 0;
        self.mode = PlaybackMode::Once;
    }

    /// Play the buffer from the start, wrapping around at its end.
    pub fn loop_playback(&mut self) {
        self.position = 0;
        self.mode = PlaybackMode::Looping;
    }

    pub fn stop(&mut self) {
        self.position = 0;
        self.mode = PlaybackMode::Stopped;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.max(0.0);
    }

    pub fn connect(&mut self) {
        self.connected = true;
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Render the next block into `output`, overwriting it. Writes silence when stopped,
    /// disconnected or without buffer. Returns the number of frames which carry audio.
    pub fn write(&mut self, output: &mut [f32]) -> usize {
        output.fill(0.0);
        let Some(buffer) = self.buffer.as_ref() else {
            return 0;
        };
        if !self.connected || self.mode == PlaybackMode::Stopped {
            return 0;
        }
        let samples = buffer.samples();
        let mut written = 0;
        for sample in output.iter_mut() {
            if self.position >= samples.len() {
                if self.mode == PlaybackMode::Looping {
                    self.position = 0;
                } else {
                    self.mode = PlaybackMode::Stopped;
                    self.position = 0;
                    break;
                }
            }
            *sample = samples[self.position] * self.volume;
            self.position += 1;
            written += 1;
        }
        written
    }
}

// -------------------------------------------------------------------------------------------------
