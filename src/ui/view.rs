use super::format::{format_size, format_time};
use crate::analysis::geometry::{bar_gradient, glow_color, waveform_gradient, waveform_stroke, Rgb};
use crate::analysis::{SpectrumBar, Viewport, VisualRenderer};
use crate::audio::{Crumb, NowPlaying, PlaybackState, PlaybackStatus, TrackEntry};
use crate::config::Theme;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Rectangle},
        Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap,
    },
    Frame,
};
use std::path::PathBuf;

/// Braille cells are 2 dots wide and 4 high.
const DOTS_X: f64 = 2.0;
const DOTS_Y: f64 = 4.0;

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: Rgb,
    pub text: Color,
    pub dim: Color,
    pub accent: Color,
    pub highlight: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                background: Rgb(0x12, 0x12, 0x12),
                text: Color::White,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                highlight: Color::Yellow,
            },
            Theme::Light => Self {
                background: Rgb(0xf5, 0xf5, 0xf5),
                text: Color::Black,
                dim: Color::Gray,
                accent: Color::Blue,
                highlight: Color::Magenta,
            },
        }
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Latest visual geometry, kept between the analysis tick and the draw.
#[derive(Debug, Default)]
pub struct CanvasScene {
    spectrum_viewport: Option<Viewport>,
    waveform_viewport: Option<Viewport>,
    bars: Vec<SpectrumBar>,
    outline: Vec<(f64, f64)>,
    theme: Theme,
}

impl CanvasScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paused playback keeps the frozen frame; stopping clears it.
    pub fn clear(&mut self) {
        self.bars.clear();
        self.outline.clear();
    }

    fn set_spectrum_area(&mut self, area: Rect) {
        self.spectrum_viewport = Some(viewport_for(area));
    }

    fn set_waveform_area(&mut self, area: Rect) {
        self.waveform_viewport = Some(viewport_for(area));
    }
}

fn viewport_for(area: Rect) -> Viewport {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    Viewport::new(f64::from(inner.width) * DOTS_X, f64::from(inner.height) * DOTS_Y)
}

impl VisualRenderer for CanvasScene {
    fn spectrum_viewport(&self) -> Viewport {
        self.spectrum_viewport.unwrap_or(Viewport::new(0.0, 0.0))
    }

    fn waveform_viewport(&self) -> Viewport {
        self.waveform_viewport.unwrap_or(Viewport::new(0.0, 0.0))
    }

    fn draw_spectrum(&mut self, bars: &[SpectrumBar], theme: Theme) {
        self.bars.clear();
        self.bars.extend_from_slice(bars);
        self.theme = theme;
    }

    fn draw_waveform(&mut self, outline: &[(f64, f64)], theme: Theme) {
        self.outline.clear();
        self.outline.extend_from_slice(outline);
        self.theme = theme;
    }
}

/// Row of the folder browser.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserRow {
    Folder(PathBuf),
    Track(usize),
}

/// Borrowed snapshot of everything a frame shows.
pub struct ViewModel<'a> {
    pub theme: Theme,
    pub crumbs: &'a [Crumb],
    pub rows: &'a [BrowserRow],
    pub entries: &'a [TrackEntry],
    pub current_index: Option<usize>,
    pub status: &'a PlaybackStatus,
    pub now_playing: Option<&'a NowPlaying>,
    pub lyrics: Option<&'a str>,
    pub visualizations_hidden: bool,
    pub status_message: Option<&'a str>,
    pub loading_folder: bool,
}

pub fn render(f: &mut Frame, view: &ViewModel<'_>, list_state: &mut ListState, scene: &mut CanvasScene) {
    let palette = Palette::for_theme(view.theme);
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Breadcrumb
            Constraint::Min(6),    // Browser + side panels
            Constraint::Length(if view.visualizations_hidden { 0 } else { 10 }),
            Constraint::Length(4), // Player
        ])
        .split(f.area());

    render_breadcrumb(f, root[0], view, &palette);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if view.lyrics.is_some() {
            [Constraint::Percentage(50), Constraint::Percentage(20), Constraint::Percentage(30)]
        } else {
            [Constraint::Percentage(65), Constraint::Percentage(35), Constraint::Length(0)]
        })
        .split(root[1]);

    render_browser(f, main[0], view, list_state, &palette);
    render_now_playing(f, main[1], view, &palette);
    if let Some(lyrics) = view.lyrics {
        let pane = Paragraph::new(lyrics)
            .style(Style::default().fg(palette.text))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Lyrics"));
        f.render_widget(pane, main[2]);
    }

    if !view.visualizations_hidden {
        let visuals = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(root[2]);
        scene.set_spectrum_area(visuals[0]);
        scene.set_waveform_area(visuals[1]);
        render_spectrum(f, visuals[0], scene, &palette);
        render_waveform(f, visuals[1], scene, &palette);
    }

    render_player(f, root[3], view, &palette);
}

fn render_breadcrumb(f: &mut Frame, area: Rect, view: &ViewModel<'_>, palette: &Palette) {
    let mut spans = Vec::new();
    for (i, crumb) in view.crumbs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" › ", Style::default().fg(palette.dim)));
        }
        let style = if i + 1 == view.crumbs.len() {
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.text)
        };
        spans.push(Span::styled(crumb.label.clone(), style));
    }
    if view.loading_folder {
        spans.push(Span::styled("  (loading…)", Style::default().fg(palette.dim)));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title("tunedeck"));
    f.render_widget(header, area);
}

fn render_browser(f: &mut Frame, area: Rect, view: &ViewModel<'_>, list_state: &mut ListState, palette: &Palette) {
    let items: Vec<ListItem> = view
        .rows
        .iter()
        .map(|row| match row {
            BrowserRow::Folder(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                ListItem::new(format!("  {}/", name)).style(Style::default().fg(palette.accent))
            }
            BrowserRow::Track(index) => {
                let Some(entry) = view.entries.get(*index) else {
                    return ListItem::new("");
                };
                let is_current = view.current_index == Some(*index);
                let prefix = if is_current { "♪ " } else { "  " };
                let duration = entry
                    .metadata
                    .as_ref()
                    .map(|m| format_time(m.duration_seconds))
                    .unwrap_or_else(|| "-:--".to_string());
                let content = format!(
                    "{}{} - {}  [{} · {}]",
                    prefix,
                    entry.display_artist(),
                    entry.display_title(),
                    duration,
                    format_size(entry.size_bytes)
                );
                let style = if is_current {
                    Style::default().fg(palette.highlight).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(palette.text)
                };
                ListItem::new(content).style(style)
            }
        })
        .collect();

    let title = format!("Library ({} tracks)", view.entries.len());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(palette.dim))
        .highlight_symbol("► ");

    f.render_stateful_widget(list, area, list_state);
}

fn render_now_playing(f: &mut Frame, area: Rect, view: &ViewModel<'_>, palette: &Palette) {
    let lines = match view.now_playing {
        Some(np) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    np.title.clone(),
                    Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(np.artist.clone(), Style::default().fg(palette.accent))),
                Line::from(Span::styled(np.album.clone(), Style::default().fg(palette.dim))),
            ];
            if let Some(art) = &np.cover_art {
                // base64 is 4 chars per 3 bytes
                let bytes = (art.base64_data.len() / 4 * 3) as u64;
                lines.push(Line::from(format!("Cover: {} ({})", art.format, format_size(bytes))));
            }
            lines
        }
        None => vec![Line::from(Span::styled("No track selected", Style::default().fg(palette.dim)))],
    };

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Now Playing"));
    f.render_widget(panel, area);
}

fn render_spectrum(f: &mut Frame, area: Rect, scene: &CanvasScene, palette: &Palette) {
    let viewport = scene.spectrum_viewport();
    let background = palette.background;
    let theme = scene.theme;

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Spectrum"))
        .marker(Marker::Braille)
        .x_bounds([0.0, viewport.width.max(1.0)])
        .y_bounds([0.0, viewport.height.max(1.0)])
        .paint(move |ctx| {
            for bar in &scene.bars {
                let (top, bottom) = bar_gradient(theme, bar.hue);
                let top = color(top.to_rgb().over(background, top.a));
                let bottom = color(bottom.to_rgb().over(background, bottom.a));
                let split = bar.height / 2.0;

                let mut x = bar.x;
                while x < bar.x + bar.width && x <= viewport.width {
                    ctx.draw(&CanvasLine::new(x, 0.0, x, split, bottom));
                    ctx.draw(&CanvasLine::new(x, split, x, bar.height, top));
                    x += 1.0;
                }

                if bar.glow {
                    let glow = glow_color(bar.hue);
                    ctx.draw(&Rectangle {
                        x: bar.x,
                        y: 0.0,
                        width: bar.width,
                        height: bar.height,
                        color: color(glow.to_rgb().over(background, glow.a)),
                    });
                }
            }
        });
    f.render_widget(canvas, area);
}

fn render_waveform(f: &mut Frame, area: Rect, scene: &CanvasScene, palette: &Palette) {
    let viewport = scene.waveform_viewport();
    let background = palette.background;
    let theme = scene.theme;

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Waveform"))
        .marker(Marker::Braille)
        .x_bounds([0.0, viewport.width.max(1.0)])
        .y_bounds([0.0, viewport.height.max(1.0)])
        .paint(move |ctx| {
            let stops = waveform_gradient(theme);
            let (stroke, alpha) = waveform_stroke(theme);
            let stroke = color(stroke.over(background, alpha));
            let centre = viewport.height / 2.0;
            // canvas y grows upwards
            let flip = |y: f64| viewport.height - y;

            for &(x, y) in &scene.outline {
                let fill = color(Rgb::gradient(&stops, y / viewport.height.max(1.0)));
                ctx.draw(&CanvasLine::new(x, flip(centre), x, flip(y), fill));
            }
            for pair in scene.outline.windows(2) {
                let ((x1, y1), (x2, y2)) = (pair[0], pair[1]);
                ctx.draw(&CanvasLine::new(x1, flip(y1), x2, flip(y2), stroke));
            }
        });
    f.render_widget(canvas, area);
}

fn render_player(f: &mut Frame, area: Rect, view: &ViewModel<'_>, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Progress bar
            Constraint::Min(2),    // Controls
        ])
        .split(area);

    let status = view.status;
    let ratio = if status.duration_seconds > 0.0 {
        (status.position_seconds / status.duration_seconds).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let label = if status.duration_seconds > 0.0 {
        format!("{} / {}", format_time(status.position_seconds), format_time(status.duration_seconds))
    } else {
        format!("{} / --:--", format_time(status.position_seconds))
    };

    let progress_color = match status.state {
        PlaybackState::Playing => Color::Green,
        _ => Color::Yellow,
    };
    let progress = Gauge::default()
        .gauge_style(Style::default().fg(progress_color).add_modifier(Modifier::BOLD))
        .ratio(ratio)
        .label(label);
    f.render_widget(progress, chunks[0]);

    let (symbol, state_text) = match status.state {
        PlaybackState::Idle => ("⏹", "Stopped"),
        PlaybackState::Loading => ("…", "Loading"),
        PlaybackState::Playing => ("▶", "Playing"),
        PlaybackState::Paused => ("⏸", "Paused"),
    };

    let filled = usize::from(status.volume / 10);
    let mut line = vec![
        Span::styled(symbol, Style::default().fg(progress_color).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(state_text, Style::default().fg(progress_color)),
        Span::raw(" | "),
        Span::styled("Vol: ", Style::default().fg(palette.dim)),
        Span::styled("█".repeat(filled), Style::default().fg(palette.accent)),
        Span::styled("░".repeat(10 - filled), Style::default().fg(palette.dim)),
        Span::raw(format!(" {}%", status.volume)),
    ];
    if let Some(message) = view.status_message {
        line.push(Span::raw(" | "));
        line.push(Span::styled(message.to_string(), Style::default().fg(palette.highlight)));
    }

    let help = Line::from(vec![
        Span::styled("Space", Style::default().fg(palette.highlight)),
        Span::raw("=Play/Pause "),
        Span::styled("n/b", Style::default().fg(palette.highlight)),
        Span::raw("=Next/Prev "),
        Span::styled(",/.", Style::default().fg(palette.highlight)),
        Span::raw("=Seek "),
        Span::styled("⌫", Style::default().fg(palette.highlight)),
        Span::raw("=Up "),
        Span::styled("l/v/t", Style::default().fg(palette.highlight)),
        Span::raw("=Lyrics/Visuals/Theme "),
        Span::styled("q", Style::default().fg(palette.highlight)),
        Span::raw("=Quit"),
    ]);

    let controls = Paragraph::new(vec![Line::from(line), help]).block(Block::default().borders(Borders::TOP));
    f.render_widget(controls, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisLoop, AnalysisSource};

    struct Loud;

    impl AnalysisSource for Loud {
        fn frequency_snapshot(&mut self, bins: &mut [u8]) {
            bins.fill(255);
        }

        fn time_domain_snapshot(&mut self, samples: &mut [u8]) {
            samples.fill(200);
        }
    }

    #[test]
    fn scene_uses_braille_resolution() {
        let mut scene = CanvasScene::new();
        scene.set_spectrum_area(Rect::new(0, 0, 42, 10));
        // borders take one cell on each side
        assert_eq!(scene.spectrum_viewport(), Viewport::new(80.0, 32.0));
        assert_eq!(scene.waveform_viewport(), Viewport::new(0.0, 0.0));
    }

    #[test]
    fn scene_keeps_the_last_tick() {
        let mut scene = CanvasScene::new();
        scene.set_spectrum_area(Rect::new(0, 0, 42, 10));
        scene.set_waveform_area(Rect::new(42, 0, 42, 10));

        let mut lp = AnalysisLoop::new();
        assert!(lp.tick(PlaybackState::Playing, Theme::Light, &mut Loud, &mut scene));
        assert!(!scene.bars.is_empty());
        assert_eq!(scene.outline.len(), 1024 + 2);
        assert_eq!(scene.theme, Theme::Light);

        scene.clear();
        assert!(scene.bars.is_empty() && scene.outline.is_empty());
    }
}
