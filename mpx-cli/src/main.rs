use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use mpx::fetch::{DATASET_URL, FRESHNESS_WINDOW, ensure_dataset};
use mpx::nations::{Iso3Table, nation_emergence, tally_nations};
use mpx::pipeline::collect_events;
use mpx::report::Report;
use mpx::{
    DEFAULT_REPORTING_LAG_FACTOR, DailyHistogram, FitOutcome, NationFilter, StatusFilter,
    aggregate_weekly, default_epoch, fit_trend,
};

/// Weekly monkeypox case trends with an exponential growth fit.
///
/// Downloads the public line list (cached for 12 hours), aggregates weekly
/// totals for one nation or the world, and fits a doubling time once at
/// least three weekly buckets exceed the case threshold.
#[derive(Debug, Parser)]
#[command(name = "mpx-trend", version)]
struct Cli {
    /// Nation name (capitalized, with spaces: "United States") or ISO3 code.
    /// UK nations report separately; Taiwan is not part of China.
    #[arg(default_value = "World")]
    nation: String,

    /// List all nations with their total case counts instead of fitting.
    #[arg(short = 'n', long = "nations")]
    nations: bool,

    /// Include unconfirmed records (everything not discarded) and date them
    /// by entry date. Output files gain a `_uc` tag.
    #[arg(short = 'c', long = "include-unconfirmed")]
    include_unconfirmed: bool,

    /// Weekly case count a bucket must exceed to anchor the fit.
    #[arg(long, default_value_t = 100)]
    threshold: u64,

    /// Most recent days to drop before bucketing (under-reporting guard).
    #[arg(long, default_value_t = 0)]
    skip_trailing_days: usize,

    /// Multiplier applied to the charted final bucket to offset reporting
    /// lag. Never affects the fit.
    #[arg(long, default_value_t = DEFAULT_REPORTING_LAG_FACTOR)]
    lag_factor: f64,

    /// Local cache of the source CSV.
    #[arg(long, default_value = "owid_monkeypox.csv")]
    data_file: PathBuf,

    /// Colon-delimited `name:ISO3` lookup table.
    #[arg(long)]
    iso3_table: Option<PathBuf>,

    /// Also chart the cumulative number of nations with confirmed cases.
    #[arg(long)]
    emergence: bool,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn nation_filter(nation: &str, table: &Iso3Table) -> NationFilter {
    if nation == "World" {
        return NationFilter::World;
    }
    // Accept whichever identifier the dataset variant carries: the display
    // name in the line list, the ISO3 code in the aggregated series.
    let mut keys = vec![nation.to_owned()];
    if let Some(iso3) = table.iso3_for(nation) {
        keys.push(iso3.to_owned());
    }
    if let Some(name) = table.name_for(nation) {
        keys.push(name.to_owned());
    }
    NationFilter::Only(keys)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    ensure_dataset(&cli.data_file, DATASET_URL, FRESHNESS_WINDOW)?;

    let table = match &cli.iso3_table {
        Some(path) => Iso3Table::load(path)
            .with_context(|| format!("loading ISO3 table {}", path.display()))?,
        None => Iso3Table::default(),
    };

    let status_filter = if cli.include_unconfirmed {
        StatusFilter::IncludeUnconfirmed
    } else {
        StatusFilter::ConfirmedOnly
    };

    if cli.nations {
        let reader = open_dataset(&cli)?;
        let events = collect_events(reader, StatusFilter::ConfirmedOnly, &NationFilter::World)?;
        for (nation, count) in tally_nations(&events) {
            match table.iso3_for(&nation) {
                Some(iso3) => println!("{nation} ({iso3}) {count}"),
                None => println!("{nation} {count}"),
            }
        }
        return Ok(());
    }

    let filter = nation_filter(&cli.nation, &table);
    let reader = open_dataset(&cli)?;
    let events = collect_events(reader, status_filter, &filter)?;

    let epoch = default_epoch();
    let hist = DailyHistogram::from_events(epoch, events.clone())?;
    if let Some(date) = hist.last_seen_date() {
        log::info!("{} events through {date}", hist.total());
    }

    let report = Report {
        out_dir: &cli.out_dir,
        run_date: chrono::Local::now().date_naive(),
        nation: &cli.nation,
        epoch,
        include_unconfirmed: cli.include_unconfirmed,
    };

    let weekly = aggregate_weekly(&hist, cli.skip_trailing_days);
    report.write_daily_debug(&hist)?;
    report.write_weekly_table(&weekly)?;
    for bucket in &weekly {
        println!("{} {}", bucket.week_end_day, bucket.count);
    }

    if cli.emergence {
        let curve = nation_emergence(&events, epoch)?;
        report.render_emergence_chart(&curve)?;
    }

    let fit = match fit_trend(&weekly, cli.threshold) {
        FitOutcome::Fitted(fit) => fit,
        FitOutcome::InsufficientData => {
            println!(
                "Insufficient data for fitting. Must have three weeks > {} new cases per week",
                cli.threshold
            );
            return Ok(());
        }
    };

    println!("Doubling time (days): {}", fit.doubling_time);
    for bucket in &weekly[fit.fit_start_index..] {
        println!(
            "{} {} {}",
            bucket.week_end_day,
            bucket.count,
            fit.predict(bucket.week_end_day)
        );
    }
    println!();
    println!("Log RMS: {:.3}", fit.log_rms);

    report.write_fit_table(&weekly, &fit)?;
    report.render_weekly_chart(&weekly, Some(&fit), cli.lag_factor, true)?;
    report.render_weekly_chart(&weekly, Some(&fit), cli.lag_factor, false)?;

    Ok(())
}

fn open_dataset(cli: &Cli) -> Result<BufReader<File>> {
    let file = File::open(&cli.data_file)
        .with_context(|| format!("opening dataset {}", cli.data_file.display()))?;
    Ok(BufReader::new(file))
}
