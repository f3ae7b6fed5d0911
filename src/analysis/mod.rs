// Visualization pipeline: analyser snapshots in, bar and waveform geometry out.
// Drawing itself lives behind VisualRenderer so everything here runs headless.

pub mod analyser;
pub mod geometry;

pub use analyser::Analyser;
pub use geometry::{smooth_waveform, spectrum_bars, waveform_points, SpectrumBar, Viewport, SMOOTHING_ALPHA};

use crate::audio::PlaybackState;
use crate::config::Theme;

/// Frequency bins per snapshot.
pub const FREQUENCY_BINS: usize = 128;
/// Time-domain samples per snapshot.
pub const WAVEFORM_SAMPLES: usize = 1024;
/// Byte value of a zero crossing in the time-domain snapshot.
pub const ZERO_LEVEL: u8 = 128;

/// Read-only view of what the sink is currently playing.
pub trait AnalysisSource {
    /// Fills `bins` with magnitudes scaled to 0..=255.
    fn frequency_snapshot(&mut self, bins: &mut [u8]);

    /// Fills `samples` with the newest samples, 128 meaning silence.
    fn time_domain_snapshot(&mut self, samples: &mut [u8]);
}

/// Drawing back end for one frame of visuals.
pub trait VisualRenderer {
    fn spectrum_viewport(&self) -> Viewport;
    fn waveform_viewport(&self) -> Viewport;
    fn draw_spectrum(&mut self, bars: &[SpectrumBar], theme: Theme);
    fn draw_waveform(&mut self, outline: &[(f64, f64)], theme: Theme);
}

/// Reusable snapshot buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFrame {
    pub frequency: Vec<u8>,
    pub time_domain: Vec<u8>,
}

impl Default for AnalysisFrame {
    fn default() -> Self {
        Self {
            frequency: vec![0; FREQUENCY_BINS],
            time_domain: vec![ZERO_LEVEL; WAVEFORM_SAMPLES],
        }
    }
}

/// One tick per display frame. The loop keeps ticking while paused or idle
/// but only pulls snapshots and draws while playing, so resuming has nothing
/// to warm up.
#[derive(Debug, Default)]
pub struct AnalysisLoop {
    frame: AnalysisFrame,
    ticks: u64,
    drawn: u64,
}

impl AnalysisLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when this tick drew.
    pub fn tick<A, R>(&mut self, state: PlaybackState, theme: Theme, source: &mut A, renderer: &mut R) -> bool
    where
        A: AnalysisSource + ?Sized,
        R: VisualRenderer + ?Sized,
    {
        self.ticks += 1;
        if state != PlaybackState::Playing {
            return false;
        }

        source.frequency_snapshot(&mut self.frame.frequency);
        source.time_domain_snapshot(&mut self.frame.time_domain);

        let bars = spectrum_bars(&self.frame.frequency, renderer.spectrum_viewport());
        renderer.draw_spectrum(&bars, theme);

        let smoothed = smooth_waveform(&self.frame.time_domain, SMOOTHING_ALPHA);
        let outline = waveform_points(&smoothed, renderer.waveform_viewport());
        renderer.draw_waveform(&outline, theme);

        self.drawn += 1;
        true
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frames_drawn(&self) -> u64 {
        self.drawn
    }
}
