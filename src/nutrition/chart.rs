use std::io::Cursor;

use anyhow::Context;
use plotters::coord::Shift;
use plotters::prelude::*;

pub const CHART_SIZE: (u32, u32) = (1000, 700);
pub const BAR_COLOR: RGBColor = RGBColor(66, 133, 244);
/// Captions and axis labels need a font backend; without one only bars and
/// the baseline are drawn.
const TEXT_ENABLED: bool = cfg!(feature = "chart-fonts");

/// One bar series: panel title and `(label, value)` bars.
pub struct Panel {
    pub title: &'static str,
    pub bars: Vec<(String, f64)>,
}

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow::anyhow!("chart drawing failed: {e}")
}

/// Non-finite or negative sums would break the y range.
fn bar_height(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, f64::MAX)
    }
}

fn draw_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &Panel) -> anyhow::Result<()> {
    let bars: Vec<(&str, f64)> = panel
        .bars
        .iter()
        .map(|(label, v)| (label.as_str(), bar_height(*v)))
        .collect();
    let y_max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let y_top = if y_max > 0.0 { (y_max * 1.1).min(f64::MAX) } else { 1.0 };
    let slots = bars.len().max(1) as u32;
    // narrow bars keep no side gap so they never collapse to nothing
    let gap = if area.dim_in_pixel().0 / slots >= 16 { 4 } else { 0 };

    let mut builder = ChartBuilder::on(area);
    builder.margin(12);
    if TEXT_ENABLED {
        builder
            .caption(panel.title, ("sans-serif", 20))
            .x_label_area_size(36)
            .y_label_area_size(56);
    }
    let mut chart = builder
        .build_cartesian_2d((0u32..slots).into_segmented(), 0f64..y_top)
        .map_err(draw_err)?;

    if TEXT_ENABLED {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Date")
            .y_desc("Amount")
            .x_labels(bars.len().max(1))
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => bars
                    .get(*i as usize)
                    .map(|(label, _)| label.to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .draw()
            .map_err(draw_err)?;
    } else {
        // axis baseline only; plotters cannot lay out text without a font backend
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(SegmentValue::Exact(0), 0.0), (SegmentValue::Exact(slots), 0.0)],
                BLACK,
            )))
            .map_err(draw_err)?;
    }

    chart
        .draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *v)],
                BAR_COLOR.filled(),
            );
            bar.set_margin(0, 0, gap, gap);
            bar
        }))
        .map_err(draw_err)?;
    Ok(())
}

/// Lays the panels out on a 2x2 grid and returns PNG bytes. Panels with no
/// bars still render, so an empty report gives a valid image.
pub fn render_panels(panels: &[Panel]) -> anyhow::Result<Vec<u8>> {
    anyhow::ensure!(panels.len() <= 4, "at most four panels fit the grid");
    let (w, h) = CHART_SIZE;
    let mut rgb = vec![0u8; (w * h * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (w, h)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        for (area, panel) in root.split_evenly((2, 2)).iter().zip(panels) {
            draw_panel(area, panel)?;
        }
        root.present().map_err(draw_err)?;
    }

    let img = image::RgbImage::from_raw(w, h, rgb).context("chart buffer size mismatch")?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .context("encode chart png")?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar_pixels(png: &[u8]) -> usize {
        let img = image::load_from_memory(png).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), CHART_SIZE);
        img.pixels()
            .filter(|p| p.0 == [BAR_COLOR.0, BAR_COLOR.1, BAR_COLOR.2])
            .count()
    }

    fn panel(title: &'static str, bars: &[(&str, f64)]) -> Panel {
        Panel {
            title,
            bars: bars.iter().map(|(l, v)| (l.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn empty_panels_render_chart_with_zero_bars() {
        let png = render_panels(&[panel("Calories", &[]), panel("Proteins", &[])]).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(bar_pixels(&png), 0);
    }

    #[test]
    fn bars_are_drawn() {
        let png = render_panels(&[panel(
            "Calories",
            &[("2024-01-01", 400.0), ("2024-01-02", 200.0)],
        )])
        .unwrap();
        assert!(bar_pixels(&png) > 0);
    }

    #[test]
    fn zero_values_do_not_fail() {
        let png = render_panels(&[panel("Fats", &[("2024-01-01", 0.0)])]).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn extreme_sums_render_instead_of_failing() {
        let png = render_panels(&[
            panel("Calories", &[("2024-01-01", 1e308), ("2024-01-02", f64::INFINITY)]),
            panel("Proteins", &[("2024-01-01", f64::NAN), ("2024-01-02", 5.0)]),
        ])
        .unwrap();
        assert!(bar_pixels(&png) > 0);
    }

    #[test]
    fn full_grid_with_many_days_renders() {
        let days: Vec<(String, f64)> = (0..400).map(|d| (format!("day-{d}"), d as f64)).collect();
        let panels: Vec<Panel> = ["Calories", "Proteins", "Fats", "Carbohydrates"]
            .into_iter()
            .map(|title| Panel {
                title,
                bars: days.clone(),
            })
            .collect();
        let png = render_panels(&panels).unwrap();
        assert!(bar_pixels(&png) > 0);
    }

    #[test]
    fn more_than_four_panels_is_an_error() {
        let panels: Vec<Panel> = (0..5).map(|_| panel("x", &[])).collect();
        assert!(render_panels(&panels).is_err());
    }
}
