//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted curve: `-` line

use crate::domain::{Dataset, FitFile};
use crate::models::Model;
use crate::text::RankedWord;

/// Scatter of a single-predictor dataset with the fitted curve overlaid.
pub fn render_fit_plot(data: &Dataset, model: &dyn Model, theta: &[f64], width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = data
        .samples()
        .iter()
        .filter_map(|s| s.x().first().map(|&x| (x, s.y())))
        .collect();
    let (x_min, x_max) = x_range(&points).unwrap_or((0.0, 1.0));
    let curve = sample_curve(model, theta, x_min, x_max, width.max(2));
    render_plot(&points, Some(&curve), x_min, x_max, width, height, "x", "y")
}

/// Scatter only (e.g. a multivariate response against one predictor).
pub fn render_scatter(points: &[(f64, f64)], width: usize, height: usize) -> String {
    let (x_min, x_max) = x_range(points).unwrap_or((0.0, 1.0));
    render_plot(points, None, x_min, x_max, width, height, "x", "y")
}

/// Curve stored in an exported fit file (no overlay points).
pub fn render_fit_file_plot(file: &FitFile, width: usize, height: usize) -> Option<String> {
    let grid = file.grid.as_ref()?;
    let curve: Vec<(f64, f64)> = grid.x.iter().zip(&grid.y).map(|(&x, &y)| (x, y)).collect();
    let (x_min, x_max) = x_range(&curve)?;
    Some(render_plot(&[], Some(&curve), x_min, x_max, width, height, "x", "y"))
}

/// Rank/frequency on log–log axes.
pub fn render_zipf_plot(ranked: &[RankedWord], width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = ranked
        .iter()
        .filter(|w| w.count > 0)
        .map(|w| ((w.rank as f64).ln(), (w.count as f64).ln()))
        .collect();
    let (x_min, x_max) = x_range(&points).unwrap_or((0.0, 1.0));
    render_plot(&points, None, x_min, x_max, width, height, "ln(rank)", "ln(freq)")
}

#[allow(clippy::too_many_arguments)]
fn render_plot(
    points: &[(f64, f64)],
    curve_points: Option<&[(f64, f64)]>,
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
    x_label: &str,
    y_label: &str,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);
    }

    for &(px, py) in points {
        let x = map_x(px, x_min, x_max, width);
        let y = map_y(py, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {x_label}=[{x_min:.3}, {x_max:.3}] | {y_label}=[{y_min:.2}, {y_max:.2}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn sample_curve(model: &dyn Model, theta: &[f64], x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            (x, model.predict(&[x], theta))
        })
        .filter(|(_, y)| y.is_finite())
        .collect()
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points.iter().chain(curve.unwrap_or(&[])) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y_max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let xx = map_x(x, x_min, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, xx, yy, '-');
        } else {
            grid[yy][xx] = '-';
        }
        prev = Some((xx, yy));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinearModel;

    #[test]
    fn plot_golden_snapshot_small() {
        let data = Dataset::univariate(&[1.0, 10.0], &[100.0, 110.0]).unwrap();
        let txt = render_fit_plot(&data, &LinearModel { predictors: 1 }, &[100.0, 0.0], 10, 5);
        let expected = concat!(
            "Plot: x=[1.000, 10.000] | y=[99.50, 110.50]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn zipf_plot_uses_log_axes() {
        let ranked: Vec<RankedWord> = [(1, 100), (2, 50), (4, 25)]
            .into_iter()
            .map(|(rank, count)| RankedWord {
                rank,
                word: format!("w{rank}"),
                count,
            })
            .collect();
        let txt = render_zipf_plot(&ranked, 12, 6);
        let header = txt.lines().next().unwrap();
        assert!(header.starts_with("Plot: ln(rank)=[0.000, 1.386]"), "{header}");
        assert_eq!(txt.lines().skip(1).map(|l| l.matches('o').count()).sum::<usize>(), 3);
        assert_eq!(txt.lines().count(), 7);
    }

    #[test]
    fn fit_file_without_grid_has_no_plot() {
        use crate::domain::{FitKind, FitQuality, FitStatus};
        let file = FitFile {
            tool: "libstats".to_string(),
            generated_at: chrono::Utc::now(),
            model: "linear".to_string(),
            kind: FitKind::Linear,
            param_names: vec![],
            parameters: vec![],
            std_errors: vec![],
            covariance: vec![],
            quality: FitQuality { sse: 0.0, r_squared: 1.0, rmse: 0.0, n: 3 },
            iterations: 0,
            status: FitStatus::Converged,
            grid: None,
        };
        assert!(render_fit_file_plot(&file, 20, 5).is_none());
    }
}
