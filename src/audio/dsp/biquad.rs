use std::f64;

use strum::{Display, EnumIter, EnumString};

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Available filter types for the state variable biquad filter.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BiquadFilterType {
    #[default]
    Lowpass,
    Highpass,
}

// -------------------------------------------------------------------------------------------------

/// The coefficients that hold parameters and necessary data to process the filter.
///
/// See [BiquadFilter] for more info about the filter implementation.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct BiquadFilterCoefficients {
    filter_type: BiquadFilterType,
    sample_rate: u32,
    cutoff: f32,
    q: f32,
    a1: f64,
    a2: f64,
    a3: f64,
    m0: f64,
    m1: f64,
    m2: f64,
}

impl BiquadFilterCoefficients {
    pub fn new(
        filter_type: BiquadFilterType,
        sample_rate: u32,
        cutoff: f32,
        q: f32,
    ) -> Result<Self, Error> {
        let mut coefficients = BiquadFilterCoefficients::default();
        coefficients.set(filter_type, sample_rate, cutoff, q)?;
        Ok(coefficients)
    }

    /// Get currently applied filter type.
    pub fn filter_type(&self) -> BiquadFilterType {
        self.filter_type
    }

    /// Get currently applied sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The frequency in Hz where the cutoff of the filter should be.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// The steepness of the filter.
    pub fn q(&self) -> f32 {
        self.q
    }

    /// Sets and applies a batch of new filter parameters. Does nothing when nothing changed.
    pub fn set(
        &mut self,
        filter_type: BiquadFilterType,
        sample_rate: u32,
        cutoff: f32,
        q: f32,
    ) -> Result<(), Error> {
        if self.filter_type != filter_type
            || self.sample_rate != sample_rate
            || self.cutoff != cutoff
            || self.q != q
        {
            self.filter_type = filter_type;
            self.sample_rate = sample_rate;
            self.cutoff = cutoff;
            self.q = q;
            self.apply()
        } else {
            Ok(())
        }
    }

    /// Applies filter parameters.
    fn apply(&mut self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::ParameterError(format!(
                "Invalid filter sample-rate: must be > 0, but is {s}",
                s = self.sample_rate
            )));
        }
        if self.q <= 0.0 {
            return Err(Error::ParameterError(format!(
                "Invalid filter Q: must be > 0, but is {q}",
                q = self.q
            )));
        }
        if !(self.cutoff > 0.0 && self.cutoff <= self.sample_rate as f32 / 2.0) {
            return Err(Error::ParameterError(format!(
                "Invalid filter frequency: must be in (0, nyquist {n}], but is {f}",
                n = self.sample_rate as f32 / 2.0,
                f = self.cutoff
            )));
        }
        let g = f64::tan(f64::consts::PI * self.cutoff as f64 / self.sample_rate as f64);
        let k = 1.0 / self.q as f64;
        self.a1 = 1.0 / (1.0 + g * (g + k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
        match self.filter_type {
            BiquadFilterType::Lowpass => {
                self.m0 = 0.0;
                self.m1 = 0.0;
                self.m2 = 1.0;
            }
            BiquadFilterType::Highpass => {
                self.m0 = 1.0;
                self.m1 = -k;
                self.m2 = -1.0;
            }
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// State variable biquad filter, designed by Andrew Simper of Cytomic.
/// See <http://cytomic.com/files/dsp/SvfLinearTrapOptimised2.pdf>
///
/// This is a second-order filter with a cutoff slope of 12 dB/octave. It stays stable when its
/// cutoff gets modulated at high rates, e.g. when following the global density every frame.
#[derive(Default, Debug, Clone)]
pub struct BiquadFilter {
    ic1eq: f64,
    ic2eq: f64,
}

impl BiquadFilter {
    pub fn new() -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
        }
    }

    /// Process helper function that calls `process_sample` for each sample in a buffer
    #[inline]
    pub fn process(&mut self, coefficients: &BiquadFilterCoefficients, output: &mut [f32]) {
        for sample in output {
            *sample = self.process_sample(coefficients, *sample as f64) as f32;
        }
    }

    /// Apply the filter on a single sample.
    #[inline]
    pub fn process_sample(&mut self, coefficients: &BiquadFilterCoefficients, input: f64) -> f64 {
        let v0 = input;
        let v3 = v0 - self.ic2eq;
        let v1 = coefficients.a1 * self.ic1eq + coefficients.a2 * v3;
        let v2 = self.ic2eq + coefficients.a2 * self.ic1eq + coefficients.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        coefficients.m0 * v0 + coefficients.m1 * v1 + coefficients.m2 * v2
    }

    /// Reset state of filter.
    #[inline]
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(filter_type: BiquadFilterType, cutoff: f32, input: f32) -> f32 {
        let coefficients = BiquadFilterCoefficients::new(filter_type, 44100, cutoff, 0.707).unwrap();
        let mut filter = BiquadFilter::new();
        let mut buffer = vec![input; 4096];
        filter.process(&coefficients, &mut buffer);
        buffer[4095]
    }

    #[test]
    fn dc_response() {
        // lowpass passes DC, highpass blocks it
        assert!((settle(BiquadFilterType::Lowpass, 1000.0, 1.0) - 1.0).abs() < 1e-3);
        assert!(settle(BiquadFilterType::Highpass, 1000.0, 1.0).abs() < 1e-3);
    }

    #[test]
    fn invalid_parameters() {
        assert!(BiquadFilterCoefficients::new(BiquadFilterType::Lowpass, 44100, 30000.0, 1.0).is_err());
        assert!(BiquadFilterCoefficients::new(BiquadFilterType::Lowpass, 44100, 1000.0, 0.0).is_err());
        assert!(BiquadFilterCoefficients::new(BiquadFilterType::Lowpass, 0, 1000.0, 1.0).is_err());
    }
}
