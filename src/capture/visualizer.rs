//! Real-time frequency-bar visualization.
//!
//! Renders a lossy visual summary of the recorder's live analysis handle:
//! a fixed number of bars, each sampling one evenly spaced bin from the
//! latest snapshot. While no session is active a static placeholder of
//! randomized bar heights, generated once, is shown instead. The
//! visualizer holds no audio state and performs no smoothing across
//! frames.

use ratatui::{
    prelude::*,
    widgets::BarChart,
};
use std::time::{SystemTime, UNIX_EPOCH};

use super::analysis::SpectrumHandle;

/// Number of bars painted per frame. Fewer than the snapshot's bin count;
/// each bar shows one sampled bin, not an average.
pub const BAR_COUNT: usize = 32;

/// Bar magnitudes span the snapshot's byte range.
const MAX_MAGNITUDE: u64 = 255;

/// Frequency-bar renderer for the capture TUI.
pub struct BarVisualizer {
    idle_bars: Vec<u64>,
    color: Color,
}

impl BarVisualizer {
    /// Creates a visualizer, generating the idle placeholder once.
    pub fn new(color: Color) -> Self {
        Self {
            idle_bars: idle_heights(BAR_COUNT),
            color,
        }
    }

    /// Paints all bars in one pass for the current frame.
    ///
    /// Active with a live handle: the latest snapshot, downsampled to
    /// [`BAR_COUNT`] bars. Inactive or handle absent: the static idle
    /// placeholder.
    pub fn render(&self, frame: &mut Frame, area: Rect, handle: Option<&SpectrumHandle>, active: bool) {
        let bars: Vec<u64> = match (active, handle) {
            (true, Some(handle)) => match handle.snapshot() {
                Some(snapshot) => downsample(&snapshot, BAR_COUNT),
                None => self.idle_bars.clone(),
            },
            _ => self.idle_bars.clone(),
        };

        let data: Vec<(&str, u64)> = bars.iter().map(|&v| ("", v)).collect();

        let bar_gap = 1u16;
        let gaps = (BAR_COUNT as u16).saturating_sub(1) * bar_gap;
        let bar_width = (area.width.saturating_sub(gaps) / BAR_COUNT as u16).max(1);

        let chart = BarChart::default()
            .data(data.as_slice())
            .max(MAX_MAGNITUDE)
            .bar_width(bar_width)
            .bar_gap(bar_gap)
            .bar_style(Style::default().fg(self.color))
            .value_style(Style::default().fg(self.color));

        frame.render_widget(chart, area);
    }
}

/// Samples `count` evenly spaced bins from a snapshot.
fn downsample(snapshot: &[u8], count: usize) -> Vec<u64> {
    if snapshot.is_empty() {
        return vec![0; count];
    }
    (0..count)
        .map(|i| snapshot[i * snapshot.len() / count] as u64)
        .collect()
}

/// Generates the idle placeholder heights: one randomized value per bar,
/// kept for the lifetime of the visualizer.
fn idle_heights(count: usize) -> Vec<u64> {
    let mut seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0x5eed)
        | 1;

    (0..count)
        .map(|_| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            30 + (seed >> 33) % 100
        })
        .collect()
}

/// Parses a "#rrggbb" hex color string.
pub fn parse_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsample_picks_evenly_spaced_indices() {
        let snapshot: Vec<u8> = (0..128).map(|i| i as u8).collect();
        let bars = downsample(&snapshot, 32);

        assert_eq!(bars.len(), 32);
        // Bar i samples bin i * 128 / 32 = i * 4 exactly; no averaging.
        for (i, &bar) in bars.iter().enumerate() {
            assert_eq!(bar, (i * 4) as u64);
        }
    }

    #[test]
    fn downsample_handles_empty_snapshot() {
        assert_eq!(downsample(&[], 32), vec![0u64; 32]);
    }

    #[test]
    fn idle_placeholder_is_fixed_after_creation() {
        let viz = BarVisualizer::new(Color::Rgb(245, 158, 11));
        assert_eq!(viz.idle_bars.len(), BAR_COUNT);
        assert!(viz.idle_bars.iter().all(|&h| (30..130).contains(&h)));

        let first = viz.idle_bars.clone();
        assert_eq!(first, viz.idle_bars);
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_color("#f59e0b"), Some(Color::Rgb(245, 158, 11)));
        assert_eq!(parse_color("#000000"), Some(Color::Rgb(0, 0, 0)));
        assert_eq!(parse_color("f59e0b"), None);
        assert_eq!(parse_color("#f59e"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
    }
}
