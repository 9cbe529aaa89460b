//! Output artifacts: numeric tables and charts.
//!
//! Charts use the SVG backend to avoid system font dependencies; a `.png`
//! artifact name is rewritten to `.svg` on disk.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use plotters::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::fit::FitResult;
use crate::histogram::DailyHistogram;
use crate::nations::EmergenceCurve;
use crate::weekly::{WeeklyBucket, apply_reporting_lag_correction};

pub const SOURCE_ATTRIBUTION: &str = "https://ourworldindata.org/monkeypox";

/// Fixed-name dump of the dense daily histogram, refreshed every run.
pub const DAILY_DEBUG_FILE: &str = "daily_debug.csv";

const CHART_SIZE: (u32, u32) = (800, 600);

fn chart_err(e: impl std::fmt::Display) -> Error {
    Error::Chart(e.to_string())
}

#[derive(Serialize)]
struct WeeklyRow {
    day: i64,
    count: u64,
}

#[derive(Serialize)]
struct FitRow {
    day: i64,
    count: u64,
    fitted: f64,
}

#[derive(Serialize)]
struct DailyRow {
    day: i64,
    count: u64,
}

/// Everything the emitters need to name and caption artifacts.
pub struct Report<'a> {
    pub out_dir: &'a Path,
    pub run_date: NaiveDate,
    pub nation: &'a str,
    pub epoch: NaiveDate,
    /// Adds the `_uc` tag when the run included unconfirmed records.
    pub include_unconfirmed: bool,
}

impl Report<'_> {
    fn file_tag(&self) -> String {
        let mut tag = self.nation.to_lowercase().replace(' ', "_");
        if self.include_unconfirmed {
            tag.push_str("_uc");
        }
        tag
    }

    fn artifact_path(&self, kind: &str, suffix: &str, ext: &str) -> PathBuf {
        self.out_dir.join(format!(
            "{}_{kind}_{}{suffix}.{ext}",
            self.run_date,
            self.file_tag()
        ))
    }

    fn create(&self, path: &Path) -> Result<File> {
        fs::create_dir_all(self.out_dir)?;
        Ok(File::create(path)?)
    }

    /// `<date>_owid_<nation>[_uc].csv`: the raw weekly series.
    pub fn write_weekly_table(&self, series: &[WeeklyBucket]) -> Result<PathBuf> {
        let path = self.artifact_path("owid", "", "csv");
        let file = self.create(&path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for bucket in series {
            wtr.serialize(WeeklyRow {
                day: bucket.week_end_day,
                count: bucket.count,
            })?;
        }
        wtr.flush()?;
        Ok(path)
    }

    /// `<date>_fit_<nation>[_uc].csv`: fitted suffix with per-week model
    /// values, headed by two comment lines carrying the fit parameters.
    pub fn write_fit_table(&self, series: &[WeeklyBucket], fit: &FitResult) -> Result<PathBuf> {
        let path = self.artifact_path("fit", "", "csv");
        let mut file = self.create(&path)?;
        writeln!(file, "# Doubling: {}", fit.doubling_time)?;
        writeln!(file, "# {}*exp(day/{})", fit.base, fit.efolding_time)?;
        let mut wtr = csv::Writer::from_writer(file);
        for bucket in &series[fit.fit_start_index..] {
            wtr.serialize(FitRow {
                day: bucket.week_end_day,
                count: bucket.count,
                fitted: fit.predict(bucket.week_end_day),
            })?;
        }
        wtr.flush()?;
        Ok(path)
    }

    /// Fixed-name `daily_debug.csv` over the full dense histogram.
    pub fn write_daily_debug(&self, hist: &DailyHistogram) -> Result<PathBuf> {
        let path = self.out_dir.join(DAILY_DEBUG_FILE);
        let file = self.create(&path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for (day, count) in hist.counts().iter().enumerate() {
            wtr.serialize(DailyRow {
                day: day as i64,
                count: *count,
            })?;
        }
        wtr.flush()?;
        Ok(path)
    }

    /// Weekly chart, `<date>_owid_<nation>[_uc][_linear].png` (written as
    /// SVG). The log-scale variant shows the fitted suffix when a fit
    /// exists; the linear variant always shows the whole series. The
    /// reporting-lag factor scales only the charted final bucket.
    pub fn render_weekly_chart(
        &self,
        series: &[WeeklyBucket],
        fit: Option<&FitResult>,
        lag_factor: f64,
        log_scale: bool,
    ) -> Result<PathBuf> {
        let suffix = if log_scale { "" } else { "_linear" };
        let path = self.artifact_path("owid", suffix, "svg");
        fs::create_dir_all(self.out_dir)?;

        let corrected = apply_reporting_lag_correction(series, lag_factor);
        let start = match (log_scale, fit) {
            (true, Some(fit)) => fit.fit_start_index,
            _ => 0,
        };
        let points: Vec<(f64, f64)> = corrected[start..]
            .iter()
            .map(|&(day, count)| (day as f64, count))
            .collect();
        if points.is_empty() {
            return Err(Error::Chart("no weekly buckets to chart".to_owned()));
        }

        let x_min = points.first().map(|p| p.0).unwrap_or(0.0) - 3.0;
        let x_max = points.last().map(|p| p.0).unwrap_or(0.0) + 3.0;
        let mut y_max = points.iter().map(|p| p.1).fold(0.0f64, f64::max);
        if let Some(fit) = fit {
            y_max = y_max.max(fit.predict(x_max as i64));
        }
        let y_max = y_max * 1.2;
        let y_min = if log_scale {
            (points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min) * 0.5).max(1.0)
        } else {
            0.0
        };

        let fit_curve: Option<Vec<(f64, f64)>> = fit.map(|fit| {
            points
                .iter()
                .map(|&(day, _)| (day, fit.predict(day as i64)))
                .collect()
        });

        // The backend borrows its path for as long as the drawing area
        // lives, so it gets its own binding and `path` stays movable.
        let backend_path = path.clone();
        let root = SVGBackend::new(&backend_path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let title = format!(
            "Monkeypox {} Weekly New {} Cases",
            self.nation,
            if self.include_unconfirmed { "Reported" } else { "Confirmed" }
        );

        if log_scale {
            let mut chart = ChartBuilder::on(&root)
                .caption(&title, ("sans-serif", 20))
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, (y_min..y_max).log_scale())
                .map_err(chart_err)?;
            chart
                .configure_mesh()
                .x_desc(format!("Days since {}", self.epoch))
                .y_desc("Count")
                .draw()
                .map_err(chart_err)?;
            chart
                .draw_series(points.iter().map(|&p| Cross::new(p, 5, BLUE.stroke_width(2))))
                .map_err(chart_err)?;
            if let Some(curve) = &fit_curve {
                chart
                    .draw_series(LineSeries::new(curve.iter().copied(), &RED))
                    .map_err(chart_err)?;
            }
        } else {
            let mut chart = ChartBuilder::on(&root)
                .caption(&title, ("sans-serif", 20))
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)
                .map_err(chart_err)?;
            chart
                .configure_mesh()
                .x_desc(format!("Days since {}", self.epoch))
                .y_desc("Count")
                .draw()
                .map_err(chart_err)?;
            chart
                .draw_series(points.iter().map(|&p| Cross::new(p, 5, BLUE.stroke_width(2))))
                .map_err(chart_err)?;
            if let Some(curve) = &fit_curve {
                chart
                    .draw_series(LineSeries::new(curve.iter().copied(), &RED))
                    .map_err(chart_err)?;
            }
        }

        if let Some(fit) = fit {
            self.annotate(
                &root,
                &[
                    (
                        format!("Doubling Time: {:.1} days", fit.doubling_time),
                        15,
                        60,
                    ),
                    (
                        "(Comparison: Dec/Jan Omicron Doubling Time was 10.3 days)".to_owned(),
                        10,
                        76,
                    ),
                    (
                        format!("Fit: {:.1}*exp(day/{:.1})", fit.base, fit.efolding_time),
                        12,
                        92,
                    ),
                    (format!("Start day: {}", self.epoch), 12, 108),
                ],
            )?;
        }
        self.annotate(
            &root,
            &[(
                format!("Generated: {} from {}", self.run_date, SOURCE_ATTRIBUTION),
                12,
                (CHART_SIZE.1 - 30) as i32,
            )],
        )?;

        root.present().map_err(chart_err)?;
        Ok(path)
    }

    /// Fixed-name chart of the cumulative count of nations with confirmed
    /// cases, starting at the last all-zero day.
    pub fn render_emergence_chart(&self, curve: &EmergenceCurve) -> Result<PathBuf> {
        let path = self.out_dir.join("monkeypox_nation_count.svg");
        fs::create_dir_all(self.out_dir)?;

        let points: Vec<(f64, f64)> = curve.points[curve.plot_start..]
            .iter()
            .map(|&(day, count)| (day as f64, count as f64))
            .collect();
        if points.is_empty() {
            return Err(Error::Chart("no emergence data to chart".to_owned()));
        }
        let x_min = points.first().map(|p| p.0).unwrap_or(0.0);
        let x_max = points.last().map(|p| p.0).unwrap_or(0.0) + 1.0;
        let y_max = points.iter().map(|p| p.1).fold(0.0f64, f64::max) * 1.1 + 1.0;

        let backend_path = path.clone();
        let root = SVGBackend::new(&backend_path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(
                "Number of Nations with Confirmed Monkeypox Cases",
                ("sans-serif", 20),
            )
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)
            .map_err(chart_err)?;
        chart
            .configure_mesh()
            .x_desc(format!("Days since {}", self.epoch))
            .y_desc("Nations")
            .draw()
            .map_err(chart_err)?;
        chart
            .draw_series(points.iter().map(|&p| Cross::new(p, 4, BLUE.stroke_width(2))))
            .map_err(chart_err)?;

        self.annotate(
            &root,
            &[(
                format!("Generated: {} from {}", self.run_date, SOURCE_ATTRIBUTION),
                12,
                60,
            )],
        )?;
        root.present().map_err(chart_err)?;
        Ok(path)
    }

    fn annotate(
        &self,
        root: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
        lines: &[(String, i32, i32)],
    ) -> Result<()> {
        for (text, size, y) in lines {
            root.draw(&Text::new(
                text.as_str(),
                (110, *y),
                ("sans-serif", *size).into_font().color(&BLACK),
            ))
            .map_err(chart_err)?;
        }
        Ok(())
    }
}
