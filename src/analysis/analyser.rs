use super::AnalysisSource;
use ringbuf::{traits::*, HeapRb};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// FFT length; yields `FFT_SIZE / 2` frequency bins.
pub const FFT_SIZE: usize = 256;
/// Weight of the previous snapshot in the temporal smoothing of magnitudes.
pub const TIME_SMOOTHING: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// Analyser over the samples the sink has played, shaped like a browser
/// analyser node: Blackman-windowed FFT, magnitudes smoothed across calls and
/// mapped from [`MIN_DECIBELS`, `MAX_DECIBELS`] onto 0..=255.
pub struct Analyser {
    samples: Arc<Mutex<HeapRb<f32>>>,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Analyser {
    pub fn new(samples: Arc<Mutex<HeapRb<f32>>>) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(FFT_SIZE);
        Self {
            samples,
            fft,
            window: blackman(FFT_SIZE),
            smoothed: vec![0.0; FFT_SIZE / 2],
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    /// Newest `count` samples, oldest first. Missing history reads as silence.
    fn latest(&self, count: usize) -> Vec<f32> {
        let mut out = vec![0.0; count];
        match self.samples.lock() {
            Ok(buf) => {
                let available = buf.occupied_len();
                let take = available.min(count);
                let skip = available - take;
                for (slot, sample) in out[count - take..].iter_mut().zip(buf.iter().skip(skip)) {
                    *slot = *sample;
                }
            }
            Err(_) => warn!("Sample capture lock poisoned, analysing silence"),
        }
        out
    }
}

impl AnalysisSource for Analyser {
    fn frequency_snapshot(&mut self, bins: &mut [u8]) {
        let input = self.latest(FFT_SIZE);
        for ((slot, sample), w) in self.scratch.iter_mut().zip(&input).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / FFT_SIZE as f32;
        for (smoothed, value) in self.smoothed.iter_mut().zip(&self.scratch) {
            let magnitude = value.norm() * scale;
            *smoothed = TIME_SMOOTHING * *smoothed + (1.0 - TIME_SMOOTHING) * magnitude;
        }

        for (bin, magnitude) in bins.iter_mut().zip(&self.smoothed) {
            *bin = magnitude_to_byte(*magnitude);
        }
        if bins.len() > self.smoothed.len() {
            bins[self.smoothed.len()..].fill(0);
        }
    }

    fn time_domain_snapshot(&mut self, samples: &mut [u8]) {
        let latest = self.latest(samples.len());
        for (out, sample) in samples.iter_mut().zip(latest) {
            *out = (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8;
        }
    }
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    let db = 20.0 * magnitude.max(1e-20).log10();
    let scaled = 255.0 / (MAX_DECIBELS - MIN_DECIBELS) * (db - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}

fn blackman(len: usize) -> Vec<f32> {
    let n = len as f32;
    (0..len)
        .map(|i| {
            let x = i as f32;
            0.42 - 0.5 * (2.0 * PI * x / n).cos() + 0.08 * (4.0 * PI * x / n).cos()
        })
        .collect()
}
