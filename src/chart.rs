use super::layout::{days_since_epoch, Layout};
use super::stats::{ip_ranking, Summary, TOP_IPS};
use super::SessionLog;
use chrono::prelude::*;
use log::{debug, warn};
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::iter::once;
use std::path::Path;

/// 20-color categorical palette, light and dark pairs
const TAB20: [(u8, u8, u8); 20] = [
    (31, 119, 180),
    (174, 199, 232),
    (255, 127, 14),
    (255, 187, 120),
    (44, 160, 44),
    (152, 223, 138),
    (214, 39, 40),
    (255, 152, 150),
    (148, 103, 189),
    (197, 176, 213),
    (140, 86, 75),
    (196, 156, 148),
    (227, 119, 194),
    (247, 182, 210),
    (127, 127, 127),
    (199, 199, 199),
    (188, 189, 34),
    (219, 219, 141),
    (23, 190, 207),
    (158, 218, 229),
];

const WHEAT: RGBColor = RGBColor(245, 222, 179);

pub const DEFAULT_FONT: &str = "Noto Sans CJK SC";
/// families tried, in order, when the configured one is not installed
const CJK_FONTS: [&str; 5] = [
    "Noto Sans CJK SC",
    "Source Han Sans SC",
    "Microsoft YaHei",
    "SimHei",
    "WenQuanYi Micro Hei",
];
pub const FALLBACK_FONT: &str = "sans-serif";
const FONT_CHECK_TEXT: &str = "流量累积图";

/// Samples the palette at n evenly spaced positions in [0, 1],
/// so more than 20 ips share colors.
pub fn palette(n: usize) -> Vec<RGBColor> {
    (0..n)
        .map(|i| {
            let x = if n > 1 {
                i as f64 / (n - 1) as f64
            } else {
                0.
            };
            let (r, g, b) = TAB20[((x * 20.) as usize).min(19)];
            RGBColor(r, g, b)
        })
        .collect()
}

/// Days between x ticks: sparser for long spans
pub fn tick_interval(span_days: i64) -> i64 {
    if span_days > 40 {
        5
    } else {
        2
    }
}

/// Number of x labels for a tick every `interval` days over [xmin, xmax]
pub fn x_label_count(xmin: f64, xmax: f64, interval: i64) -> usize {
    ((xmax - xmin) / interval as f64).ceil() as usize + 1
}

fn date_label(x: f64) -> String {
    match NaiveDateTime::from_timestamp_opt((x * 86_400.).round() as i64, 0) {
        Some(dt) => dt.format("%m-%d").to_string(),
        None => String::new(),
    }
}

/// Sizes of the rendered figure
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub font: String,
    pub top_ips: usize,
}

impl Default for ChartConfig {
    fn default() -> ChartConfig {
        ChartConfig {
            width_in: 20.,
            height_in: 10.,
            dpi: 300,
            font: String::from(DEFAULT_FONT),
            top_ips: TOP_IPS,
        }
    }
}

impl ChartConfig {
    pub fn pixels(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi as f64).round() as u32,
            (self.height_in * self.dpi as f64).round() as u32,
        )
    }

    /// points to pixels
    pub fn pt(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.
    }

    fn font(&self, points: f64, style: FontStyle) -> FontDesc {
        FontDesc::new(FontFamily::from(self.font.as_str()), self.pt(points), style)
    }

    /// The configured family when it can lay out CJK text,
    /// else the first installed CJK family, else the generic sans-serif.
    pub fn resolved_font(&self) -> String {
        let usable = |family: &str| {
            FontDesc::new(FontFamily::from(family), 12., FontStyle::Normal)
                .box_size(FONT_CHECK_TEXT)
                .is_ok()
        };
        if usable(self.font.as_str()) {
            return self.font.clone();
        }
        warn!("font '{}' cannot be resolved", self.font);
        for family in CJK_FONTS.iter() {
            if *family != self.font && usable(*family) {
                warn!("using font '{}' instead", family);
                return family.to_string();
            }
        }
        warn!(
            "no CJK font found, falling back to '{}', chinese text may not render",
            FALLBACK_FONT
        );
        String::from(FALLBACK_FONT)
    }
}

/// Fill and white edge of every session rectangle, in drawing order:
/// each edge directly follows its own fill so later sessions cover earlier edges.
pub fn session_patches(
    layout: &Layout,
    colors: &[RGBColor],
    edge: u32,
) -> Vec<([(f64, f64); 2], ShapeStyle)> {
    let mut patches = Vec::with_capacity(layout.rects.len() * 2);
    for r in layout.rects.iter() {
        let corners = [(r.x, r.bottom), (r.x + r.width, r.top())];
        let color = colors.get(r.ip_index).cloned().unwrap_or(BLACK);
        patches.push((corners, color.mix(0.7).filled()));
        patches.push((corners, WHITE.stroke_width(edge)));
    }
    patches
}

/// plots the stacked session rectangles and the daily totals to png
pub fn render(
    log: &SessionLog,
    layout: &Layout,
    summary: &Summary,
    cfg: &ChartConfig,
    fout: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (first, last) = log.time_span().ok_or("no session to plot")?;
    let xmin = days_since_epoch(first) - 1.;
    let xmax = days_since_epoch(last) + 1.;
    let interval = tick_interval((last - first).num_days());
    let max_daily = layout.max_daily();
    let ymax = if layout.daily.is_empty() {
        10.
    } else {
        max_daily * 1.05
    };

    let cfg = &ChartConfig {
        font: cfg.resolved_font(),
        ..cfg.clone()
    };
    let (width, height) = cfg.pixels();
    debug!("drawing {}x{} px to {}", width, height, fout.display());
    let root = BitMapBackend::new(fout, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let title = format!(
        "校园网流量累积图 - 每条记录可视化（从 {} 到 {}）",
        first.format("%Y-%m-%d"),
        last.format("%Y-%m-%d")
    );
    let mut chart = ChartBuilder::on(&root)
        .caption(title, cfg.font(18., FontStyle::Bold))
        .margin(cfg.pt(20.) as u32)
        .x_label_area_size(cfg.pt(45.) as u32)
        .y_label_area_size(cfg.pt(55.) as u32)
        .build_cartesian_2d(xmin..xmax, 0f64..ymax)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(BLACK.mix(0.3).stroke_width(1))
        .set_all_tick_mark_size(cfg.pt(3.) as u32)
        .x_labels(x_label_count(xmin, xmax, interval))
        .label_style(cfg.font(11., FontStyle::Normal))
        .axis_desc_style(cfg.font(14., FontStyle::Bold))
        .x_desc("日期")
        .y_desc("流量 (GB)")
        .x_label_formatter(&|x: &f64| date_label(*x))
        .y_label_formatter(&|y: &f64| format!("{:.1}", y))
        .draw()?;

    let colors = palette(log.unique_ips().len());
    let edge = cfg.pt(0.5).max(1.) as u32;
    chart.draw_series(
        session_patches(layout, &colors, edge)
            .into_iter()
            .map(|(corners, style)| Rectangle::new(corners, style)),
    )?;

    let outline = layout
        .daily_totals()
        .into_iter()
        .filter_map(|(d, total)| d.and_hms_opt(0, 0, 0).map(|dt| (days_since_epoch(dt), total)));
    chart.draw_series(LineSeries::new(
        outline,
        BLACK.mix(0.8).stroke_width(cfg.pt(2.) as u32),
    ))?;

    // statistics box, anchored at the top left corner of the plotting area
    let box_font = cfg.font(11., FontStyle::Normal);
    let lines = summary.chart_lines();
    let pad = cfg.pt(6.) as i32;
    let line_height = (cfg.pt(11.) * 1.4) as i32;
    let mut text_width = 0;
    for l in lines.iter() {
        let (w, _) = box_font.box_size(l)?;
        text_width = text_width.max(w as i32);
    }
    let box_size = (
        text_width + 2 * pad,
        line_height * lines.len() as i32 + 2 * pad,
    );
    let anchor = (xmin + 0.02 * (xmax - xmin), ymax * 0.98);
    chart.draw_series(once(
        EmptyElement::at(anchor) + Rectangle::new([(0, 0), box_size], WHEAT.mix(0.9).filled()),
    ))?;
    chart.draw_series(lines.iter().enumerate().map(|(i, l)| {
        EmptyElement::at(anchor)
            + Text::new(
                l.clone(),
                (pad, pad + i as i32 * line_height),
                box_font.clone(),
            )
    }))?;

    // legend of the most used ips, the first entry acts as title
    let indices = log.ip_indices();
    let marker = cfg.pt(5.) as i32;
    chart
        .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
        .label("主要IP地址（使用次数）")
        .legend(|(x, y)| Rectangle::new([(x, y), (x, y)], TRANSPARENT.filled()));
    for (ip, count) in ip_ranking(log, cfg.top_ips) {
        let color = match indices.get(ip.as_str()) {
            Some(&idx) => colors[idx],
            None => continue,
        };
        chart
            .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
            .label(format!("{} ({}次)", ip, count))
            .legend(move |(x, y)| {
                Rectangle::new(
                    [(x, y - marker), (x + 2 * marker, y + marker)],
                    color.mix(0.7).filled(),
                )
            });
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.9))
        .border_style(&BLACK.mix(0.3))
        .label_font(cfg.font(9., FontStyle::Normal))
        .draw()?;

    root.present()?;
    Ok(())
}
