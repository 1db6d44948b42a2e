//! Delay buffers to delay or recirculate signals.

// -------------------------------------------------------------------------------------------------

/// Multi channel delay line buffer with fractional delay time support.
#[derive(Debug, Default, Clone)]
pub struct DelayLine<const CHANNELS: usize> {
    buffer: Vec<f32>,
    buffer_mask: usize,
    write_pos: usize,
}

impl<const CHANNELS: usize> DelayLine<CHANNELS> {
    /// Create a new delay buffer with the given max delay time in sample frames.
    pub fn new(max_delay_frames: usize) -> Self {
        // one extra frame for the interpolation neighbor of the longest delay
        let buffer_frames = (max_delay_frames + 2).next_power_of_two();
        Self {
            buffer: vec![0.0; buffer_frames * CHANNELS],
            buffer_mask: buffer_frames - 1,
            write_pos: 0,
        }
    }

    /// Longest delay in frames this line can produce.
    pub fn max_delay_frames(&self) -> usize {
        self.buffer.len() / CHANNELS - 2
    }

    /// Reset the delay buffer and write position.
    pub fn flush(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Read the delayed frame at the given fractional delay, without advancing.
    #[inline]
    fn read(&self, delay_pos: f32) -> [f32; CHANNELS] {
        let delay_pos = delay_pos.clamp(1.0, self.max_delay_frames() as f32);
        let read_pos = self.write_pos as f32 - delay_pos;

        let read_pos_floor = read_pos.floor();
        let fraction = read_pos - read_pos_floor;

        let index1 = read_pos_floor as isize;
        let index2 = index1 + 1;

        let mut output = [0.0; CHANNELS];
        #[allow(clippy::needless_range_loop)]
        for ch in 0..CHANNELS {
            let sample_index1 = ((index1 as usize) & self.buffer_mask) * CHANNELS + ch;
            let sample_index2 = ((index2 as usize) & self.buffer_mask) * CHANNELS + ch;

            let val1 = self.buffer[sample_index1];
            let val2 = self.buffer[sample_index2];

            output[ch] = val1 + (val2 - val1) * fraction;
        }
        output
    }

    #[inline]
    fn write(&mut self, frame: [f32; CHANNELS]) {
        let write_sample_index = self.write_pos * CHANNELS;
        self.buffer[write_sample_index..write_sample_index + CHANNELS].copy_from_slice(&frame);
        self.write_pos = (self.write_pos + 1) & self.buffer_mask;
    }

    /// Process and add a single new sample frame and return the delayed frame. The delayed
    /// frame is fed back into the same channel with the given feedback amount.
    pub fn process_sample(
        &mut self,
        input: [f32; CHANNELS],
        feedback: f32,
        delay_pos: f32,
    ) -> [f32; CHANNELS] {
        let output = self.read(delay_pos);
        let mut frame = [0.0; CHANNELS];
        for ch in 0..CHANNELS {
            frame[ch] = input[ch] + output[ch] * feedback;
        }
        self.write(frame);
        output
    }

    /// Like [`process_sample`](Self::process_sample), but feeds each channel's delayed output
    /// back into the next channel, which makes the echoes bounce between channels.
    pub fn process_sample_crossed(
        &mut self,
        input: [f32; CHANNELS],
        feedback: f32,
        delay_pos: f32,
    ) -> [f32; CHANNELS] {
        let output = self.read(delay_pos);
        let mut frame = [0.0; CHANNELS];
        for ch in 0..CHANNELS {
            let source = (ch + CHANNELS - 1) % CHANNELS;
            frame[ch] = input[ch] + output[source] * feedback;
        }
        self.write(frame);
        output
    }
}

// -------------------------------------------------------------------------------------------------
