use std::{io::Read, path::Path};

use hound::{SampleFormat, WavReader};

use crate::{audio::SampleBuffer, Error};

// -------------------------------------------------------------------------------------------------

/// Named, preloaded sample buffers which samplers can pick from. Keeps insertion order.
///
/// Samplers never play a preset buffer directly: they copy it on selection.
#[derive(Debug, Default, Clone)]
pub struct PresetLibrary {
    presets: Vec<(String, SampleBuffer)>,
}

impl PresetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a preset. An existing preset with the same name gets replaced in place.
    pub fn add<S: Into<String>>(&mut self, name: S, buffer: SampleBuffer) {
        let name = name.into();
        if let Some(entry) = self.presets.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = buffer;
        } else {
            self.presets.push((name, buffer));
        }
    }

    /// Builder style [`add`](Self::add).
    pub fn with<S: Into<String>>(mut self, name: S, buffer: SampleBuffer) -> Self {
        self.add(name, buffer);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SampleBuffer> {
        self.presets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, buffer)| buffer)
    }

    /// Preset names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.presets.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Load the first channel of a WAV file as preset.
    pub fn load_wav<S: Into<String>, P: AsRef<Path>>(
        &mut self,
        name: S,
        file_path: P,
    ) -> Result<(), Error> {
        let reader = WavReader::open(file_path)?;
        let buffer = Self::read_wav(reader)?;
        self.add(name, buffer);
        Ok(())
    }

    /// Load the first channel of WAV data from any reader as preset.
    pub fn load_wav_from<S: Into<String>, R: Read>(
        &mut self,
        name: S,
        reader: R,
    ) -> Result<(), Error> {
        let reader = WavReader::new(reader)?;
        let buffer = Self::read_wav(reader)?;
        self.add(name, buffer);
        Ok(())
    }

    fn read_wav<R: Read>(mut reader: WavReader<R>) -> Result<SampleBuffer, Error> {
        let spec = reader.spec();
        let samples = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|v| v.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        log::debug!(
            "Loaded WAV preset: {} channels, {} Hz, {} frames",
            spec.channels,
            spec.sample_rate,
            samples.len() / spec.channels.max(1) as usize
        );
        SampleBuffer::from_interleaved(&samples, spec.channels as usize, spec.sample_rate)
    }
}

// -------------------------------------------------------------------------------------------------
