use std::{cell::RefCell, rc::Rc};

use super::SampleBuffer;
use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Shared mono input (microphone) bus.
///
/// The host writes one block of input samples per render cycle. All recorders capture from the
/// same bus. Clones share the same block.
#[derive(Debug, Clone)]
pub struct InputBus {
    block: Rc<RefCell<Vec<f32>>>,
}

impl InputBus {
    pub fn new(block_size: usize) -> Self {
        Self {
            block: Rc::new(RefCell::new(Vec::with_capacity(block_size))),
        }
    }

    /// Replace the current input block.
    pub fn write(&self, input: &[f32]) {
        let mut block = self.block.borrow_mut();
        block.clear();
        block.extend_from_slice(input);
    }

    /// Replace the current input block with `frames` samples from `input`, filling frames
    /// missing in `input` with silence.
    pub fn write_padded(&self, input: &[f32], frames: usize) {
        let mut block = self.block.borrow_mut();
        block.clear();
        block.extend_from_slice(&input[..input.len().min(frames)]);
        block.resize(frames, 0.0);
    }

    /// Clear the current input block (no input this cycle).
    pub fn clear(&self) {
        self.block.borrow_mut().clear();
    }

    /// Number of frames in the current input block.
    pub fn len(&self) -> usize {
        self.block.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.borrow().is_empty()
    }

    /// Access the current input block.
    pub fn read<R>(&self, f: impl FnOnce(&[f32]) -> R) -> R {
        f(&self.block.borrow())
    }
}

// -------------------------------------------------------------------------------------------------

/// Captures samples from an [`InputBus`] into a new take.
#[derive(Debug)]
pub struct SoundRecorder {
    input: InputBus,
    sample_rate: u32,
    take: Vec<f32>,
    recording: bool,
}

impl SoundRecorder {
    pub fn new(input: InputBus, sample_rate: u32) -> Self {
        Self {
            input,
            sample_rate,
            take: Vec::new(),
            recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of frames captured so far.
    pub fn captured_frames(&self) -> usize {
        self.take.len()
    }

    /// Start a new take, dropping any previously captured samples.
    pub fn record(&mut self) {
        self.take.clear();
        self.recording = true;
    }

    /// Append the input bus's current block to the take, when recording.
    pub fn capture(&mut self) {
        if self.recording {
            let take = &mut self.take;
            self.input.read(|block| take.extend_from_slice(block));
        }
    }

    /// Stop recording and finalize the take into a new sample buffer.
    pub fn stop(&mut self) -> Result<SampleBuffer, Error> {
        self.recording = false;
        let samples = std::mem::take(&mut self.take);
        SampleBuffer::new(samples, self.sample_rate)
    }

    /// Stop recording, dropping the take.
    pub fn cancel(&mut self) {
        self.recording = false;
        self.take.clear();
    }
}

// -------------------------------------------------------------------------------------------------
