//! Pure numeric transforms from analyser snapshots to drawable shapes.
//!
//! Coordinates follow screen convention: origin top-left, `y` grows
//! downwards, units are whatever the [`Viewport`] is measured in.

use crate::config::Theme;

/// Weight of the newest sample in the waveform EMA.
pub const SMOOTHING_ALPHA: f64 = 0.8;

/// Bars shorter than this are noise and are not drawn.
const MIN_BAR_HEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBar {
    pub index: usize,
    pub x: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, from the bin position only.
    pub hue: f64,
    /// Tall bar in the upper part of the spectrum.
    pub glow: bool,
}

impl SpectrumBar {
    /// Top edge in screen coordinates.
    pub fn top(&self, viewport: Viewport) -> f64 {
        viewport.height - self.height
    }
}

/// Lays out one bar per bin, left to right.
///
/// Bars are 2.5 times the even share of the width, so only the lower part of
/// the spectrum fits; the rest falls off the right edge. Skipped bars still
/// take their slot.
pub fn spectrum_bars(bins: &[u8], viewport: Viewport) -> Vec<SpectrumBar> {
    if bins.is_empty() || viewport.is_empty() {
        return Vec::new();
    }

    let count = bins.len() as f64;
    let bar_width = (viewport.width / count) * 2.5;
    let mut bars = Vec::with_capacity(bins.len());
    let mut x = 0.0;

    for (index, &value) in bins.iter().enumerate() {
        let height = f64::from(value) / 255.0 * viewport.height;
        if height >= MIN_BAR_HEIGHT {
            bars.push(SpectrumBar {
                index,
                x,
                width: bar_width,
                height,
                hue: (index as f64 / count * 360.0) % 360.0,
                glow: height > viewport.height * 0.4 && index as f64 > count * 0.6,
            });
        }
        x += bar_width + 1.0;
    }

    bars
}

/// Causal exponential moving average over byte samples.
///
/// The running average is carried at full precision and only the output is
/// rounded, so `[10, 20, 30, 40, 50]` at `alpha = 0.5` gives
/// `[10, 15, 23, 31, 41]`.
pub fn smooth_waveform(samples: &[u8], alpha: f64) -> Vec<u8> {
    let alpha = alpha.clamp(0.0, 1.0);
    let Some(&first) = samples.first() else {
        return Vec::new();
    };

    let mut running = f64::from(first);
    let mut smoothed = Vec::with_capacity(samples.len());
    smoothed.push(first);

    for &sample in &samples[1..] {
        running = alpha * f64::from(sample) + (1.0 - alpha) * running;
        smoothed.push(running.round().clamp(0.0, 255.0) as u8);
    }

    smoothed
}

/// Closed outline of the filled waveform: starts and ends on the vertical
/// centre, one point per sample in between. 128 maps to the centre line.
pub fn waveform_points(smoothed: &[u8], viewport: Viewport) -> Vec<(f64, f64)> {
    let centre = viewport.height / 2.0;
    let mut points = Vec::with_capacity(smoothed.len() + 2);
    points.push((0.0, centre));

    if !smoothed.is_empty() {
        let slice = viewport.width / smoothed.len() as f64;
        for (i, &value) in smoothed.iter().enumerate() {
            let v = f64::from(value) / 128.0;
            points.push((i as f64 * slice, v * viewport.height / 2.0));
        }
    }

    points.push((viewport.width, centre));
    points
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub h: f64,
    /// Percent.
    pub s: f64,
    /// Percent.
    pub l: f64,
    pub a: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Hsla {
    pub const fn new(h: f64, s: f64, l: f64, a: f64) -> Self {
        Self { h, s, l, a }
    }

    pub fn to_rgb(self) -> Rgb {
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);
        let h = self.h.rem_euclid(360.0) / 60.0;

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb(channel(r), channel(g), channel(b))
    }
}

impl Rgb {
    /// Straight alpha blend over `background`.
    pub fn over(self, background: Rgb, alpha: f64) -> Rgb {
        let alpha = alpha.clamp(0.0, 1.0);
        let mix = |fg: u8, bg: u8| (f64::from(fg) * alpha + f64::from(bg) * (1.0 - alpha)).round() as u8;
        Rgb(mix(self.0, background.0), mix(self.1, background.1), mix(self.2, background.2))
    }

    /// Linear interpolation through evenly spaced stops, `t` in 0..=1.
    pub fn gradient(stops: &[Rgb], t: f64) -> Rgb {
        match stops {
            [] => Rgb(0, 0, 0),
            [only] => *only,
            _ => {
                let scaled = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
                let i = (scaled.floor() as usize).min(stops.len() - 2);
                let local = scaled - i as f64;
                let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * local).round() as u8;
                let (a, b) = (stops[i], stops[i + 1]);
                Rgb(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
            }
        }
    }
}

/// Top and bottom colours of a spectrum bar.
pub fn bar_gradient(theme: Theme, hue: f64) -> (Hsla, Hsla) {
    match theme {
        Theme::Dark => (Hsla::new(hue, 100.0, 70.0, 0.9), Hsla::new(hue, 80.0, 40.0, 0.8)),
        Theme::Light => (Hsla::new(hue, 100.0, 60.0, 0.9), Hsla::new(hue, 80.0, 30.0, 0.8)),
    }
}

pub fn glow_color(hue: f64) -> Hsla {
    Hsla::new(hue, 100.0, 70.0, 0.8)
}

/// Vertical fill gradient of the waveform, top to bottom.
pub fn waveform_gradient(theme: Theme) -> [Rgb; 3] {
    match theme {
        Theme::Dark => [Rgb(0x8c, 0x1a, 0xff), Rgb(0x4d, 0xa6, 0xff), Rgb(0x00, 0xcc, 0xff)],
        Theme::Light => [Rgb(0xff, 0x33, 0x66), Rgb(0x00, 0x7b, 0xff), Rgb(0x00, 0xcc, 0xcc)],
    }
}

/// Outline colour and its opacity.
pub fn waveform_stroke(theme: Theme) -> (Rgb, f64) {
    match theme {
        Theme::Dark => (Rgb(0xff, 0xff, 0xff), 0.3),
        Theme::Light => (Rgb(0x00, 0x00, 0x00), 0.3),
    }
}
