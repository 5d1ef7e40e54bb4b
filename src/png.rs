use std::io::Cursor;

use camino::Utf8Path;
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageFormat, Rgb, RgbImage};

use crate::chart::{ChartPlan, GRID_COLUMNS, Panel, grid_position, series_color};
use crate::error::CovidError;
use crate::snapshot::write_bytes_atomic;

const PANEL_WIDTH: u32 = 800;
const PANEL_HEIGHT: u32 = 300;
const HEADER_HEIGHT: u32 = 72;
const MARGIN_LEFT: u32 = 48;
const MARGIN_RIGHT: u32 = 16;
const MARGIN_TOP: u32 = 32;
const MARGIN_BOTTOM: u32 = 28;
const Y_GRID_LINES: u32 = 5;
const GLYPH_SIZE: i64 = 8;
const TITLE_SCALE: u32 = 3;
const SUBTITLE_SCALE: u32 = 2;
const PANEL_TITLE_SCALE: u32 = 2;
const LEGEND_ROW: i64 = 12;
const LEGEND_SWATCH: i64 = 16;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const FRAME: Rgb<u8> = Rgb([60, 60, 60]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const TEXT: Rgb<u8> = Rgb([30, 30, 30]);

/// Rasterizes a [`ChartPlan`] into a PNG figure.
pub struct PngChart;

impl PngChart {
    pub fn render(plan: &ChartPlan) -> RgbImage {
        let width = PANEL_WIDTH * GRID_COLUMNS as u32;
        let height = HEADER_HEIGHT + PANEL_HEIGHT * plan.grid_rows() as u32;
        let mut image = RgbImage::from_pixel(width, height, BACKGROUND);

        let center = (width / 2) as i64;
        draw_text_centered(&mut image, center, 12, &plan.title, TITLE_SCALE);
        draw_text_centered(&mut image, center, 44, &plan.subtitle, SUBTITLE_SCALE);

        for (index, panel) in plan.panels.iter().enumerate() {
            let (row, col) = grid_position(index);
            let panel_left = col as u32 * PANEL_WIDTH;
            let panel_top = HEADER_HEIGHT + row as u32 * PANEL_HEIGHT;
            let area = PlotArea {
                left: panel_left + MARGIN_LEFT,
                top: panel_top + MARGIN_TOP,
                width: PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
                height: PANEL_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM,
            };
            let title_center = (area.left + area.width / 2) as i64;
            draw_text_centered(
                &mut image,
                title_center,
                panel_top as i64 + 8,
                &panel.title,
                PANEL_TITLE_SCALE,
            );
            draw_panel(&mut image, &area, plan.dates.len(), panel);
            if panel.series.len() > 1 {
                draw_legend(&mut image, &area, panel);
            }
        }
        image
    }

    pub fn encode(plan: &ChartPlan) -> Result<Vec<u8>, CovidError> {
        let image = Self::render(plan);
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|err| CovidError::Render(err.to_string()))?;
        Ok(buffer.into_inner())
    }

    pub fn save(plan: &ChartPlan, path: &Utf8Path) -> Result<(), CovidError> {
        let bytes = Self::encode(plan)?;
        write_bytes_atomic(path, &bytes)?;
        tracing::info!(path = %path, title = %plan.title, "saved figure");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl PlotArea {
    fn right(&self) -> u32 {
        self.left + self.width
    }

    fn bottom(&self) -> u32 {
        self.top + self.height
    }

    fn x(&self, index: usize, points: usize) -> i64 {
        if points <= 1 {
            return (self.left + self.width / 2) as i64;
        }
        self.left as i64 + (index as i64 * self.width as i64) / (points as i64 - 1)
    }

    fn y(&self, value: u64, max: u64) -> i64 {
        if max == 0 {
            return self.bottom() as i64;
        }
        let offset = (value as f64 / max as f64) * self.height as f64;
        self.bottom() as i64 - offset.round() as i64
    }
}

fn draw_panel(image: &mut RgbImage, area: &PlotArea, points: usize, panel: &Panel) {
    for step in 1..Y_GRID_LINES {
        let y = area.bottom() - area.height * step / Y_GRID_LINES;
        for x in area.left..=area.right() {
            put(image, x as i64, y as i64, GRID);
        }
    }

    for x in area.left..=area.right() {
        put(image, x as i64, area.top as i64, FRAME);
        put(image, x as i64, area.bottom() as i64, FRAME);
    }
    for y in area.top..=area.bottom() {
        put(image, area.left as i64, y as i64, FRAME);
        put(image, area.right() as i64, y as i64, FRAME);
    }

    // Daily minor ticks, weekly major ticks.
    for day in 0..points {
        let x = area.x(day, points);
        let length = if day % 7 == 0 { 6 } else { 3 };
        for dy in 1..=length {
            put(image, x, area.bottom() as i64 + dy, FRAME);
        }
    }

    let max = ((panel.max_value() as f64) * 1.05).ceil() as u64;
    for series in &panel.series {
        let color = Rgb(series_color(series.color_index));
        let coords = series
            .values
            .iter()
            .enumerate()
            .map(|(day, value)| (area.x(day, points), area.y(*value, max)))
            .collect::<Vec<_>>();
        for pair in coords.windows(2) {
            draw_dotted_line(image, pair[0], pair[1], color);
        }
        for (x, y) in coords {
            for dx in -1..=1 {
                for dy in -1..=1 {
                    put(image, x + dx, y + dy, color);
                }
            }
        }
    }
}

/// Swatch and label per series in the top-left corner of the plot area.
fn draw_legend(image: &mut RgbImage, area: &PlotArea, panel: &Panel) {
    let left = area.left as i64 + 8;
    let top = area.top as i64 + 8;
    let label_width = panel
        .series
        .iter()
        .map(|series| text_width(&series.label, 1))
        .max()
        .unwrap_or(0);
    let box_right = left + LEGEND_SWATCH + 12 + label_width;
    let box_bottom = top + LEGEND_ROW * panel.series.len() as i64 + 4;
    for y in top - 4..=box_bottom {
        for x in left - 4..=box_right {
            let edge = y == top - 4 || y == box_bottom || x == left - 4 || x == box_right;
            put(image, x, y, if edge { GRID } else { BACKGROUND });
        }
    }

    for (row, series) in panel.series.iter().enumerate() {
        let color = Rgb(series_color(series.color_index));
        let y = top + row as i64 * LEGEND_ROW;
        for x in left..left + LEGEND_SWATCH {
            for dy in 3..=4 {
                put(image, x, y + dy, color);
            }
        }
        draw_text(image, left + LEGEND_SWATCH + 6, y, &series.label, 1, TEXT);
    }
}

fn text_width(text: &str, scale: u32) -> i64 {
    text.chars().count() as i64 * GLYPH_SIZE * scale as i64
}

fn draw_text_centered(image: &mut RgbImage, center: i64, top: i64, text: &str, scale: u32) {
    let left = center - text_width(text, scale) / 2;
    draw_text(image, left, top, text, scale, TEXT);
}

/// Draws `text` with the 8x8 bitmap font, each font pixel `scale` pixels wide.
/// Characters outside the basic set are drawn as `?`.
fn draw_text(image: &mut RgbImage, left: i64, top: i64, text: &str, scale: u32, color: Rgb<u8>) {
    let scale = scale as i64;
    for (idx, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin = left + idx as i64 * GLYPH_SIZE * scale;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        put(
                            image,
                            origin + col * scale + sx,
                            top + row as i64 * scale + sy,
                            color,
                        );
                    }
                }
            }
        }
    }
}

fn draw_dotted_line(image: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - from.0).abs();
    let dy = -(to.1 - from.1).abs();
    let sx = if from.0 < to.0 { 1 } else { -1 };
    let sy = if from.1 < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut step = 0usize;
    loop {
        if step % 4 < 2 {
            put(image, x, y, color);
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
        step += 1;
    }
}

fn put(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    image.put_pixel(x as u32, y as u32, color);
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::chart::Series;

    fn plan() -> ChartPlan {
        let series = Series {
            label: "Spain".to_string(),
            color_index: 0,
            values: vec![1, 5, 9],
        };
        ChartPlan {
            title: "Cases confirmed (World total: 9)".to_string(),
            subtitle: "Generated at: 04 Mar 2020, 06:30:15PM UTC".to_string(),
            dates: (1..=3)
                .map(|day| NaiveDate::from_ymd_opt(2020, 3, day).unwrap())
                .collect(),
            panels: vec![
                Panel {
                    title: "Spain".to_string(),
                    series: vec![series.clone()],
                },
                Panel {
                    title: "All Countries".to_string(),
                    series: vec![
                        series,
                        Series {
                            label: "Italy".to_string(),
                            color_index: 1,
                            values: vec![2, 3, 4],
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn image_size_follows_grid() {
        let image = PngChart::render(&plan());
        assert_eq!(image.width(), PANEL_WIDTH * 2);
        assert_eq!(image.height(), HEADER_HEIGHT + PANEL_HEIGHT);
    }

    #[test]
    fn series_color_is_drawn() {
        let image = PngChart::render(&plan());
        let color = Rgb(series_color(0));
        assert!(image.pixels().any(|pixel| *pixel == color));
    }

    fn has_text(image: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> bool {
        ys.into_iter()
            .any(|y| xs.clone().any(|x| *image.get_pixel(x, y) == TEXT))
    }

    #[test]
    fn header_band_carries_title() {
        let image = PngChart::render(&plan());
        assert!(has_text(&image, 0..image.width(), 0..HEADER_HEIGHT));

        let mut untitled = plan();
        untitled.title.clear();
        untitled.subtitle.clear();
        let image = PngChart::render(&untitled);
        assert!(!has_text(&image, 0..image.width(), 0..HEADER_HEIGHT));
    }

    #[test]
    fn panel_titles_sit_above_plot_areas() {
        let image = PngChart::render(&plan());
        let band = HEADER_HEIGHT..HEADER_HEIGHT + MARGIN_TOP;
        assert!(has_text(&image, 0..PANEL_WIDTH, band.clone()));
        assert!(has_text(&image, PANEL_WIDTH..PANEL_WIDTH * 2, band));
    }

    #[test]
    fn aggregate_panel_has_legend() {
        let image = PngChart::render(&plan());
        let left = PANEL_WIDTH + MARGIN_LEFT;
        let top = HEADER_HEIGHT + MARGIN_TOP;
        let corner = |x: u32, y: u32| *image.get_pixel(left + x, top + y);
        let swatch = Rgb(series_color(1));
        assert!((0..60).any(|y| (0..40).any(|x| corner(x, y) == swatch)));
        assert!((0..60).any(|y| (0..120).any(|x| corner(x, y) == TEXT)));
        // single-series panels get no legend
        let spain = MARGIN_LEFT + 30;
        assert!(!(0..30).any(|y| (0..60).any(|x| *image.get_pixel(spain + x, top + 8 + y) == TEXT)));
    }

    #[test]
    fn encodes_png_signature() {
        let bytes = PngChart::encode(&plan()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
