/// Clean the raw match table, then summarize and chart the cleaned one.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

mod error;
mod io;
mod logging;
mod model;
mod plot;
mod preprocess;
mod report;
mod scale;

use error::ReportError;
use io::{load_matches, write_cleaned};
use model::fit_trend;
use preprocess::{preprocess, RunStats};
use report::{load_cleaned, summarize, Filters, Summary};

#[derive(Debug, Parser)]
#[command(name = "ufc_clean", version, about = "Normalize and summarize UFC match results")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize the raw table and write the cleaned one
    Clean {
        #[arg(long, default_value = "ufc-master.csv")]
        input: PathBuf,
        #[arg(long, default_value = "ufc_cleaned.csv")]
        output: PathBuf,
        /// Field separator of the raw table
        #[arg(long, default_value_t = ';')]
        delimiter: char,
        /// Field separator of the cleaned table
        #[arg(long, default_value_t = ',')]
        output_delimiter: char,
    },
    /// Print aggregates over the cleaned table
    Report {
        #[arg(long, default_value = "ufc_cleaned.csv")]
        cleaned: PathBuf,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        #[arg(long)]
        from_year: Option<i32>,
        #[arg(long)]
        to_year: Option<i32>,
        /// Repeat to allow several genders
        #[arg(long)]
        gender: Vec<String>,
        /// Repeat to allow several weight classes
        #[arg(long)]
        weight_class: Vec<String>,
        /// Write PNG charts into this directory
        #[arg(long)]
        charts: Option<PathBuf>,
    },
}

fn delimiter_byte(c: char) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter {c:?} must be a single ASCII character"))
}

/// load raw table, clean it, write it out
/// input: raw and cleaned paths with their separators
/// output: row counts of the run
/// logic: any load error aborts before the output file is touched; rows are
/// cleaned in one pass and written through a temporary file
fn run_clean(input: &Path, output: &Path, delimiter: u8, output_delimiter: u8) -> Result<RunStats> {
    info!(input = %input.display(), "loading raw matches");
    let table = load_matches(input, delimiter)?;

    let (cleaned, stats) = preprocess(&table.rows);
    info!(
        read = stats.read,
        admitted = stats.admitted,
        not_decisive = stats.not_decisive(),
        incomplete = stats.incomplete(),
        "cleaned matches"
    );

    write_cleaned(output, &table.columns, &cleaned, output_delimiter)?;
    info!(output = %output.display(), rows = stats.written, "saved cleaned table");
    Ok(stats)
}

/// load cleaned table, filter, summarize, optionally chart
/// input: cleaned path, filters, chart directory
/// output: the summary, or `None` when the filters leave nothing
fn run_report(
    cleaned: &Path,
    delimiter: u8,
    filters: &Filters,
    charts: Option<&Path>,
) -> Result<Option<Summary>, ReportError> {
    let rows = load_cleaned(cleaned, delimiter)?;
    let selected = filters.apply(&rows);
    info!(total = rows.len(), selected = selected.len(), "filtered fights");

    let Some(summary) = summarize(&selected) else {
        return Ok(None);
    };

    let trend = match fit_trend(&summary.favorite_share_by_year) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("{e}");
            None
        }
    };

    print_summary(&summary, trend.as_ref());

    if let Some(dir) = charts {
        std::fs::create_dir_all(dir).map_err(|e| ReportError::Chart {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let trend_png = dir.join("favorite_trend.png");
        plot::plot_favorite_trend(&trend_png, &summary.favorite_share_by_year, trend.as_ref())?;
        let diff_bins = report::histogram(selected.iter().filter_map(|r| r.winner_age_diff));
        plot::plot_age_difference(&dir.join("age_diff.png"), &diff_bins)?;
        plot::plot_winner_age(&dir.join("winner_age.png"), &summary.winner_age_bins)?;
        let style_points: Vec<(f64, f64, &str)> = selected
            .iter()
            .filter_map(|r| Some((r.winner_avg_strikes?, r.winner_avg_td?, r.finish.as_deref()?)))
            .collect();
        plot::plot_style(&dir.join("style.png"), &style_points)?;
        info!(dir = %dir.display(), "wrote charts");
    }

    Ok(Some(summary))
}

fn print_summary(s: &Summary, trend: Option<&model::Trend>) {
    println!("Fights                 {:>8}", s.fights);
    println!("KO/TKO                 {:>7.1}%", s.ko_share);
    println!("Submissions            {:>7.1}%", s.submission_share);
    match s.favorite_win_rate {
        Some(rate) => println!("Favorite wins          {:>7.1}%", rate),
        None => println!("Favorite wins               n/a"),
    }

    println!("\nMarket");
    for (kind, share) in &s.market_share {
        println!("  {:<20} {:>7.1}%", kind.as_str(), share);
    }

    println!("\nFavorite share by year");
    for (year, share) in &s.favorite_share_by_year {
        println!("  {:<20} {:>7.1}%", year, share);
    }
    if let Some(t) = trend {
        println!("  trend {:+.2} pts/year", t.slope);
    }

    println!("\nWinner size by weight class");
    for p in &s.physical {
        println!(
            "  {:<24} {:>5} fights  height {:>6.1}  reach {:>6.1}",
            p.weight_class, p.fights, p.mean_height, p.mean_reach
        );
    }

    println!("\nWinner style by finish");
    for p in &s.styles {
        let strikes = p.mean_strikes.map_or("n/a".to_string(), |v| format!("{v:.2}"));
        let takedowns = p.mean_takedowns.map_or("n/a".to_string(), |v| format!("{v:.2}"));
        println!(
            "  {:<12} {:>5} fights  strikes {:>6}  takedowns {:>6}",
            p.finish, p.fights, strikes, takedowns
        );
    }

    println!("\nAge");
    if let Some(age) = s.mean_winner_age {
        println!("  mean winner age      {:>8.1}", age);
    }
    if let Some(share) = s.younger_winner_share {
        println!("  younger winner       {:>7.1}%", share);
    }
    for (age, count) in &s.winner_age_bins {
        println!("  age {:<16} {:>6}", age, count);
    }

    println!("\nFinishes by round");
    for ((finish, round), count) in &s.finish_rounds {
        println!("  {:<12} round {:<3} {:>6}", finish, round, count);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Command::Clean {
            input,
            output,
            delimiter,
            output_delimiter,
        } => {
            run_clean(
                &input,
                &output,
                delimiter_byte(delimiter)?,
                delimiter_byte(output_delimiter)?,
            )
            .context("cleaning failed, no output written")?;
        }
        Command::Report {
            cleaned,
            delimiter,
            from_year,
            to_year,
            gender,
            weight_class,
            charts,
        } => {
            let filters = Filters {
                from_year,
                to_year,
                genders: gender,
                weight_classes: weight_class,
            };
            match run_report(&cleaned, delimiter_byte(delimiter)?, &filters, charts.as_deref()) {
                Ok(Some(_)) => {}
                Ok(None) => println!("No fights match the selected filters."),
                // The consumer's one expected failure: say what to do and stop.
                Err(e @ ReportError::MissingCleaned { .. }) => error!("{e}"),
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

// end tests
