//! Minimal SVG plot rendering for the `visualize` command.
//!
//! Two chart shapes cover everything the suite plots: line charts (with
//! optional logarithmic x) and histograms. The output is plain SVG
//! markup built by hand; no raster backend, no font dependencies.

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 44.0;
const MARGIN_BOTTOM: f64 = 60.0;

const SERIES_COLORS: [&str; 4] = ["#1f77b4", "#d62728", "#2ca02c", "#9467bd"];

/// One labelled line of a line chart.
#[derive(Debug, Clone)]
pub struct Series {
    /// Legend label
    pub label: String,
    /// (x, y) points in data coordinates
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    min: f64,
    max: f64,
    log: bool,
}

impl Axis {
    fn new(min: f64, max: f64, log: bool) -> Self {
        let (mut min, mut max) = if log {
            (min.max(f64::MIN_POSITIVE).log10(), max.max(f64::MIN_POSITIVE).log10())
        } else {
            (min, max)
        };
        if !(max > min) {
            // degenerate range; open it up so the transform stays finite
            min -= 0.5;
            max += 0.5;
        }
        Self { min, max, log }
    }

    fn transform(&self, value: f64) -> f64 {
        let v = if self.log {
            value.max(f64::MIN_POSITIVE).log10()
        } else {
            value
        };
        (v - self.min) / (self.max - self.min)
    }

    /// Tick positions in data coordinates.
    fn ticks(&self) -> Vec<f64> {
        if self.log {
            let lo = self.min.floor() as i64;
            let hi = self.max.ceil() as i64;
            (lo..=hi).map(|d| 10f64.powi(d as i32)).collect()
        } else {
            let n = 5;
            (0..=n)
                .map(|i| self.min + (self.max - self.min) * f64::from(i) / f64::from(n))
                .collect()
        }
    }
}

fn fmt_tick(value: f64) -> String {
    let abs = value.abs();
    if value == 0.0 {
        "0".to_string()
    } else if abs >= 1e4 || abs < 1e-2 {
        format!("{value:.0e}")
    } else if abs >= 10.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Pixel x for a data x.
fn px(x_axis: &Axis, x: f64) -> f64 {
    MARGIN_LEFT + x_axis.transform(x) * (WIDTH - MARGIN_LEFT - MARGIN_RIGHT)
}

/// Pixel y for a data y (SVG y grows downward).
fn py(y_axis: &Axis, y: f64) -> f64 {
    HEIGHT - MARGIN_BOTTOM - y_axis.transform(y) * (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM)
}

fn frame(title: &str, x_label: &str, y_label: &str, x_axis: &Axis, y_axis: &Axis) -> String {
    let mut svg = String::with_capacity(4096);
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" \
         viewBox=\"0 0 {WIDTH} {HEIGHT}\">\n"
    ));
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"26\" font-family=\"sans-serif\" font-size=\"18\" \
         text-anchor=\"middle\">{}</text>\n",
        WIDTH / 2.0,
        escape(title)
    ));

    // axes
    let x0 = MARGIN_LEFT;
    let x1 = WIDTH - MARGIN_RIGHT;
    let y0 = HEIGHT - MARGIN_BOTTOM;
    let y1 = MARGIN_TOP;
    svg.push_str(&format!(
        "<line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x1}\" y2=\"{y0}\" stroke=\"black\"/>\n"
    ));
    svg.push_str(&format!(
        "<line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x0}\" y2=\"{y1}\" stroke=\"black\"/>\n"
    ));

    for tick in x_axis.ticks() {
        let x = px(x_axis, tick);
        if !(x0 - 0.5..=x1 + 0.5).contains(&x) {
            continue;
        }
        svg.push_str(&format!(
            "<line x1=\"{x}\" y1=\"{y0}\" x2=\"{x}\" y2=\"{}\" stroke=\"black\"/>\n",
            y0 + 6.0
        ));
        svg.push_str(&format!(
            "<text x=\"{x}\" y=\"{}\" font-family=\"sans-serif\" font-size=\"12\" \
             text-anchor=\"middle\">{}</text>\n",
            y0 + 22.0,
            fmt_tick(tick)
        ));
    }
    for tick in y_axis.ticks() {
        let y = py(y_axis, tick);
        svg.push_str(&format!(
            "<line x1=\"{}\" y1=\"{y}\" x2=\"{x0}\" y2=\"{y}\" stroke=\"black\"/>\n",
            x0 - 6.0
        ));
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" font-family=\"sans-serif\" font-size=\"12\" \
             text-anchor=\"end\">{}</text>\n",
            x0 - 10.0,
            y + 4.0,
            fmt_tick(tick)
        ));
    }

    svg.push_str(&format!(
        "<text x=\"{}\" y=\"{}\" font-family=\"sans-serif\" font-size=\"14\" \
         text-anchor=\"middle\">{}</text>\n",
        (x0 + x1) / 2.0,
        HEIGHT - 14.0,
        escape(x_label)
    ));
    svg.push_str(&format!(
        "<text x=\"20\" y=\"{}\" font-family=\"sans-serif\" font-size=\"14\" \
         text-anchor=\"middle\" transform=\"rotate(-90 20 {})\">{}</text>\n",
        (y0 + y1) / 2.0,
        (y0 + y1) / 2.0,
        escape(y_label)
    ));
    svg
}

/// Renders a line chart.
#[must_use]
pub fn line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    log_x: bool,
    series: &[Series],
) -> String {
    let all_points: Vec<(f64, f64)> = series.iter().flat_map(|s| s.points.clone()).collect();
    let (x_min, x_max) = all_points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| {
            (lo.min(x), hi.max(x))
        });
    let (y_min, y_max) = all_points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
            (lo.min(y), hi.max(y))
        });
    let y_pad = 0.05 * (y_max - y_min).max(1e-12);

    let x_axis = Axis::new(x_min, x_max, log_x);
    let y_axis = Axis::new(y_min - y_pad, y_max + y_pad, false);

    let mut svg = frame(title, x_label, y_label, &x_axis, &y_axis);
    for (i, s) in series.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        let path: Vec<String> = s
            .points
            .iter()
            .map(|&(x, y)| format!("{:.2},{:.2}", px(&x_axis, x), py(&y_axis, y)))
            .collect();
        svg.push_str(&format!(
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\"/>\n",
            path.join(" ")
        ));
        if series.len() > 1 {
            let ly = MARGIN_TOP + 16.0 * i as f64;
            svg.push_str(&format!(
                "<rect x=\"{}\" y=\"{}\" width=\"12\" height=\"3\" fill=\"{color}\"/>\n",
                WIDTH - MARGIN_RIGHT - 150.0,
                ly
            ));
            svg.push_str(&format!(
                "<text x=\"{}\" y=\"{}\" font-family=\"sans-serif\" font-size=\"12\">{}</text>\n",
                WIDTH - MARGIN_RIGHT - 132.0,
                ly + 5.0,
                escape(&s.label)
            ));
        }
    }
    svg.push_str("</svg>\n");
    svg
}

/// Renders a histogram over explicit bin edges.
#[must_use]
pub fn histogram(
    title: &str,
    x_label: &str,
    y_label: &str,
    log_x: bool,
    edges: &[f64],
    counts: &[u64],
) -> String {
    let max_count = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let x_axis = Axis::new(
        edges.first().copied().unwrap_or(0.0),
        edges.last().copied().unwrap_or(1.0),
        log_x,
    );
    let y_axis = Axis::new(0.0, max_count * 1.05, false);

    let mut svg = frame(title, x_label, y_label, &x_axis, &y_axis);
    let base = py(&y_axis, 0.0);
    for (bin, &count) in counts.iter().enumerate() {
        let x_left = px(&x_axis, edges[bin]);
        let x_right = px(&x_axis, edges[bin + 1]);
        let top = py(&y_axis, count as f64);
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" \
             fill=\"#1f77b4\" fill-opacity=\"0.7\" stroke=\"#10405f\"/>\n",
            x_left,
            top,
            (x_right - x_left).max(0.5),
            (base - top).max(0.0)
        ));
    }
    svg.push_str("</svg>\n");
    svg
}
