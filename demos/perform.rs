//! Renders a short scripted performance into a WAV file: a granulated sampler chain and a
//! recorder chain which records a synthesized "microphone" signal and loops it.

use std::path::PathBuf;

use arg::{parse_args, Args};

use grainloop::{
    audio::SampleBuffer,
    control::RecordingSurface,
    source::{PresetLibrary, SourceKind},
    Error, Performance, PerformanceConfig,
};

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const SAMPLE_RATE: u32 = 44100;

// -------------------------------------------------------------------------------------------------

#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "o", long = "output")]
    /// Write the rendered performance into the given wav file. By default \"perform.wav\".
    output_path: Option<PathBuf>,
    #[arg(short = "d", long = "duration")]
    /// Length of the performance in seconds. By default 8.
    duration: Option<f64>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn sine(frequency: f32, seconds: f32) -> Result<SampleBuffer, Error> {
    let frames = (seconds * SAMPLE_RATE as f32) as usize;
    let samples = (0..frames)
        .map(|i| (i as f32 * frequency * std::f32::consts::TAU / SAMPLE_RATE as f32).sin() * 0.5)
        .collect();
    SampleBuffer::new(samples, SAMPLE_RATE)
}

fn pluck(frequency: f32, seconds: f32) -> Result<SampleBuffer, Error> {
    let frames = (seconds * SAMPLE_RATE as f32) as usize;
    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let phase = (t * frequency).fract();
            (2.0 * phase - 1.0) * (-4.0 * t).exp() * 0.5
        })
        .collect();
    SampleBuffer::new(samples, SAMPLE_RATE)
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()
        .expect("Failed to set logger");

    let output_path = args
        .output_path
        .unwrap_or_else(|| PathBuf::from("perform.wav"));
    let duration = args.duration.unwrap_or(8.0).max(1.0);

    let presets = PresetLibrary::new()
        .with("sine", sine(220.0, 2.0)?)
        .with("pluck", pluck(110.0, 2.0)?);
    let config = PerformanceConfig::default().sample_rate(SAMPLE_RATE);
    let mut performance = Performance::new(config, presets)?;

    // chain 0: granulated sampler
    let sampler = performance.add_chain(SourceKind::Sampler, true)?;
    {
        let chain = performance.chain_mut(sampler)?;
        chain.select_preset("pluck")?;
        chain.toggle_granulate()?;
        let effects = chain.effects_mut();
        effects.delay_controls_mut().wet.set_value(0.3);
        effects.delay_controls_mut().pingpong.set_checked(true);
        effects.reverb_controls_mut().wet.set_value(0.4);
        effects.reverb_controls_mut().time.set_value_committed(4.0);
    }

    // chain 1: recorder, which records one second of input and then loops it
    let recorder = performance.add_chain(SourceKind::Recorder, false)?;
    performance.chain_mut(recorder)?.toggle_record()?;

    let block_size = performance.config().block_size;
    let total_frames = (duration * SAMPLE_RATE as f64) as usize;
    let mic = sine(330.0, 1.0)?;

    let mut writer = hound::WavWriter::create(
        &output_path,
        hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
    )?;

    let mut input = vec![0.0; block_size];
    let mut output = vec![0.0; block_size];
    let mut frame = 0;
    while frame < total_frames {
        let frames = block_size.min(total_frames - frame);
        for (i, sample) in input[..frames].iter_mut().enumerate() {
            *sample = mic.samples().get(frame + i).copied().unwrap_or(0.0);
        }
        performance.process(&input[..frames], &mut output[..frames]);
        for sample in &output[..frames] {
            writer.write_sample(*sample)?;
        }
        frame += frames;

        // slowly sweep the global density, which the sampler chain's filter follows
        let progress = frame as f32 / total_frames as f32;
        performance
            .global_parameters_mut()
            .density_mut()
            .set_value(0.2 + 0.7 * progress);

        if frame >= SAMPLE_RATE as usize && frame - frames < SAMPLE_RATE as usize {
            let chain = performance.chain_mut(recorder)?;
            chain.toggle_record()?;
            chain.toggle_loop()?;
            performance
                .chain_mut(sampler)?
                .effects_mut()
                .filter_controls_mut()
                .follow_global
                .set_checked(true);
        }
    }
    writer.finalize()?;

    let mut surface = RecordingSurface::new();
    performance.draw(&mut surface);
    for panel in surface.panels() {
        log::info!(
            "{} at {}: {} controls",
            panel.title,
            panel.position,
            panel.controls.len()
        );
    }

    println!(
        "Rendered {:.1} seconds into '{}'",
        duration,
        output_path.display()
    );
    Ok(())
}
