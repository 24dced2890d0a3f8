//! Waveform image rendering.
//!
//! The image mimics a minimal matplotlib figure: a dark background, the
//! amplitude trace in the channel's palette color, a thin line at y = 0, no
//! y axis and a bottom axis labelled in `MM:SS`.

use decibel_error::{AudioError, AudioErrorKind};
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{Point, Primitive, Size};
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};
use embedded_graphics::Drawable;
use tracing::{debug, instrument};

use crate::AudioResult;
use crate::canvas::Canvas;

const MARGIN_X: u32 = 16;
const MARGIN_TOP: u32 = 10;
const TICK_LENGTH: i32 = 4;
const AXIS_HEIGHT: u32 = 24;
const MAX_TICKS: f64 = 8.0;

/// Tick spacings in seconds, smallest first.
const TICK_STEPS: [f64; 12] = [
    1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1800.0,
];

/// Canvas size and colors of a waveform image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformStyle {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Background fill.
    pub background: [u8; 3],
    /// Tick marks and labels.
    pub axis: [u8; 3],
    /// The y = 0 line.
    pub baseline: [u8; 3],
}

impl Default for WaveformStyle {
    /// 8 × 3 inches at 100 dpi on the Discord dark theme background.
    fn default() -> Self {
        Self {
            width: 800,
            height: 300,
            background: [54, 57, 62],
            axis: [255, 255, 255],
            baseline: [79, 84, 92],
        }
    }
}

/// Format seconds as `MM:SS`; minutes wrap at one hour like `%M` does.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", (total / 60) % 60, total % 60)
}

/// Whole-second tick spacing giving at most eight intervals over `duration`.
pub fn tick_step(duration: f64) -> f64 {
    TICK_STEPS
        .iter()
        .copied()
        .find(|step| duration / step <= MAX_TICKS)
        .unwrap_or_else(|| (duration / MAX_TICKS / 3600.0).ceil() * 3600.0)
}

/// Render the amplitude envelope of `mono` as a PNG.
///
/// # Errors
///
/// `Render` for clips with fewer than two samples, a zero sample rate or a
/// canvas too small for the plot area; `Encode` if PNG encoding fails.
#[instrument(skip(mono, style), fields(frames = mono.len(), width = style.width, height = style.height))]
pub fn render_waveform(
    mono: &[f64],
    sample_rate: u32,
    color: [u8; 3],
    style: &WaveformStyle,
) -> AudioResult<Vec<u8>> {
    let render_error = |reason: &str| AudioError::new(AudioErrorKind::Render(reason.to_string()));

    if mono.len() < 2 {
        return Err(render_error("at least two samples are required"));
    }
    if sample_rate == 0 {
        return Err(render_error("sample rate is zero"));
    }
    if style.width <= 2 * MARGIN_X + 1 || style.height <= MARGIN_TOP + AXIS_HEIGHT + 2 {
        return Err(render_error("canvas is too small for the plot area"));
    }

    let mut canvas = Canvas::new(style.width, style.height, rgb(style.background));
    let plot = Rectangle::new(
        Point::new(MARGIN_X as i32, MARGIN_TOP as i32),
        Size::new(
            style.width - 2 * MARGIN_X,
            style.height - MARGIN_TOP - AXIS_HEIGHT,
        ),
    );
    let duration = mono.len() as f64 / sample_rate as f64;

    draw_baseline(&mut canvas, &plot, rgb(style.baseline))?;
    draw_trace(&mut canvas, &plot, mono, rgb(color))?;
    draw_time_axis(&mut canvas, &plot, duration, rgb(style.axis))?;

    let png = canvas.encode_png()?;
    debug!(bytes = png.len(), duration, "Rendered waveform");
    Ok(png)
}

fn rgb([r, g, b]: [u8; 3]) -> Rgb888 {
    Rgb888::new(r, g, b)
}

fn center_y(plot: &Rectangle) -> i32 {
    plot.top_left.y + plot.size.height as i32 / 2
}

fn right_x(plot: &Rectangle) -> i32 {
    plot.top_left.x + plot.size.width as i32 - 1
}

fn draw_baseline(canvas: &mut Canvas, plot: &Rectangle, color: Rgb888) -> AudioResult<()> {
    let y = center_y(plot);
    Line::new(Point::new(plot.top_left.x, y), Point::new(right_x(plot), y))
        .into_styled(PrimitiveStyle::with_stroke(color, 1))
        .draw(canvas)
}

/// Short clips are drawn as a polyline through every sample; longer ones as
/// a per-column min/max envelope.
fn draw_trace(
    canvas: &mut Canvas,
    plot: &Rectangle,
    mono: &[f64],
    color: Rgb888,
) -> AudioResult<()> {
    let style = PrimitiveStyle::with_stroke(color, 1);
    let width = plot.size.width as usize;
    let half_height = (plot.size.height as f64 / 2.0) - 1.0;
    let peak = mono.iter().fold(0.0_f64, |peak, s| peak.max(s.abs()));
    let scale = if peak > f64::EPSILON { peak } else { 1.0 };
    let mid = center_y(plot);
    let to_y = |v: f64| mid - (v / scale * half_height).round() as i32;

    if mono.len() <= width {
        let last = (mono.len() - 1) as f64;
        let to_x = |i: usize| plot.top_left.x + (i as f64 / last * (width - 1) as f64).round() as i32;
        for (i, pair) in mono.windows(2).enumerate() {
            Line::new(
                Point::new(to_x(i), to_y(pair[0])),
                Point::new(to_x(i + 1), to_y(pair[1])),
            )
            .into_styled(style)
            .draw(canvas)?;
        }
        return Ok(());
    }

    let mut previous: Option<(i32, i32)> = None;
    for column in 0..width {
        let start = column * mono.len() / width;
        let end = ((column + 1) * mono.len() / width).clamp(start + 1, mono.len());
        let (low, high) = mono[start..end]
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        let x = plot.top_left.x + column as i32;
        let (top, bottom) = (to_y(high), to_y(low));

        // Bridge the gap to the previous column so steep edges stay connected.
        let (top, bottom) = match previous {
            Some((prev_top, prev_bottom)) => (top.min(prev_bottom), bottom.max(prev_top)),
            None => (top, bottom),
        };
        Line::new(Point::new(x, top), Point::new(x, bottom))
            .into_styled(style)
            .draw(canvas)?;
        previous = Some((to_y(high), to_y(low)));
    }
    Ok(())
}

fn draw_time_axis(
    canvas: &mut Canvas,
    plot: &Rectangle,
    duration: f64,
    color: Rgb888,
) -> AudioResult<()> {
    let stroke = PrimitiveStyle::with_stroke(color, 1);
    let label_style = MonoTextStyle::new(&FONT_6X10, color);
    let axis_y = plot.top_left.y + plot.size.height as i32;
    let span = (plot.size.width - 1) as f64;
    let step = tick_step(duration);

    let mut tick = 0.0;
    while tick <= duration {
        let x = plot.top_left.x + (tick / duration * span).round() as i32;
        Line::new(Point::new(x, axis_y), Point::new(x, axis_y + TICK_LENGTH))
            .into_styled(stroke)
            .draw(canvas)?;
        Text::with_alignment(
            &format_timestamp(tick),
            Point::new(x, axis_y + TICK_LENGTH + 11),
            label_style,
            Alignment::Center,
        )
        .draw(canvas)?;
        tick += step;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_wrap_minutes_at_the_hour() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(59.9), "00:59");
        assert_eq!(format_timestamp(61.0), "01:01");
        assert_eq!(format_timestamp(3_725.0), "02:05");
    }

    #[test]
    fn tick_step_keeps_label_count_small() {
        assert_eq!(tick_step(0.5), 1.0);
        assert_eq!(tick_step(8.0), 1.0);
        assert_eq!(tick_step(9.0), 2.0);
        assert_eq!(tick_step(95.0), 15.0);
        assert_eq!(tick_step(4.0 * 3600.0), 1800.0);
        assert_eq!(tick_step(10.0 * 3600.0), 7200.0);
    }
}
