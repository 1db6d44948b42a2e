use std::sync::Arc;

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// An immutable mono sample buffer (one recorded or loaded "take").
///
/// Cloning a `SampleBuffer` shares the underlying samples. Use [`copy`](Self::copy) to create an
/// independent copy, which never aliases the original buffer.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a new buffer from the given mono samples. The buffer must not be empty.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, Error> {
        if samples.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "sample buffer sample rate must be > 0".to_string(),
            ));
        }
        Ok(Self {
            samples: Arc::from(samples),
            sample_rate,
        })
    }

    /// Create a new buffer from the first channel of an interleaved buffer.
    pub fn from_interleaved(
        interleaved: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, Error> {
        if channel_count == 0 {
            return Err(Error::ParameterError(
                "channel count must be > 0".to_string(),
            ));
        }
        let samples = interleaved
            .chunks_exact(channel_count)
            .map(|frame| frame[0])
            .collect::<Vec<_>>();
        Self::new(samples, sample_rate)
    }

    /// Create an independent deep copy of this buffer.
    pub fn copy(&self) -> Self {
        Self {
            samples: Arc::from(self.samples.as_ref()),
            sample_rate: self.sample_rate,
        }
    }

    /// True when both buffers share the same sample memory.
    pub fn ptr_eq(&self, other: &SampleBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration of the buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

// -------------------------------------------------------------------------------------------------
