// Loading the raw match table and writing the cleaned one back out.
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Deserialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::preprocess::CleanMatch;

/// Lenient cell parsers. A cell that does not parse is missing, never an error.
pub(crate) mod lenient {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

    pub fn number<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(d)?;
        Ok(s.as_deref().and_then(parse_number))
    }

    pub fn date<'de, D>(d: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(d)?;
        Ok(s.as_deref().and_then(parse_date))
    }

    pub fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(d)?;
        Ok(s.filter(|v| !v.trim().is_empty()))
    }

    /// Accepts `.` or `,` as decimal separator. Non-finite values are missing.
    pub fn parse_number(raw: &str) -> Option<f64> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        let value = s
            .parse::<f64>()
            .ok()
            .or_else(|| s.replace(',', ".").parse::<f64>().ok())?;
        value.is_finite().then_some(value)
    }

    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        // Timestamps like "2024-03-16 00:00:00" keep only the date part.
        let s = s.split_whitespace().next()?;
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    }
}

/// The raw columns the pipeline keeps, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Date,
    Winner,
    WeightClass,
    Gender,
    Finish,
    RedFighter,
    BlueFighter,
    RedHeightCms,
    BlueHeightCms,
    RedReachCms,
    BlueReachCms,
    RedAge,
    BlueAge,
    FinishRound,
    TotalFightTimeSecs,
    RedAvgSigStrLanded,
    BlueAvgSigStrLanded,
    RedAvgTDLanded,
    BlueAvgTDLanded,
    RedOdds,
    BlueOdds,
}

impl Column {
    pub const KEPT: [Column; 21] = [
        Column::Date,
        Column::Winner,
        Column::WeightClass,
        Column::Gender,
        Column::Finish,
        Column::RedFighter,
        Column::BlueFighter,
        Column::RedHeightCms,
        Column::BlueHeightCms,
        Column::RedReachCms,
        Column::BlueReachCms,
        Column::RedAge,
        Column::BlueAge,
        Column::FinishRound,
        Column::TotalFightTimeSecs,
        Column::RedAvgSigStrLanded,
        Column::BlueAvgSigStrLanded,
        Column::RedAvgTDLanded,
        Column::BlueAvgTDLanded,
        Column::RedOdds,
        Column::BlueOdds,
    ];

    /// Columns the load refuses to go without.
    pub const REQUIRED: [Column; 2] = [Column::Date, Column::Winner];

    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Winner => "Winner",
            Column::WeightClass => "WeightClass",
            Column::Gender => "Gender",
            Column::Finish => "Finish",
            Column::RedFighter => "RedFighter",
            Column::BlueFighter => "BlueFighter",
            Column::RedHeightCms => "RedHeightCms",
            Column::BlueHeightCms => "BlueHeightCms",
            Column::RedReachCms => "RedReachCms",
            Column::BlueReachCms => "BlueReachCms",
            Column::RedAge => "RedAge",
            Column::BlueAge => "BlueAge",
            Column::FinishRound => "FinishRound",
            Column::TotalFightTimeSecs => "TotalFightTimeSecs",
            Column::RedAvgSigStrLanded => "RedAvgSigStrLanded",
            Column::BlueAvgSigStrLanded => "BlueAvgSigStrLanded",
            Column::RedAvgTDLanded => "RedAvgTDLanded",
            Column::BlueAvgTDLanded => "BlueAvgTDLanded",
            Column::RedOdds => "RedOdds",
            Column::BlueOdds => "BlueOdds",
        }
    }
}

/// Columns the pipeline adds after the kept ones.
pub const DERIVED_COLUMNS: [&str; 8] = [
    "Year",
    "WinnerHeight",
    "WinnerReach",
    "WinnerAvgStrikes",
    "WinnerAvgTD",
    "WinnerAge",
    "WinnerAgeDiff",
    "BettingResult",
];

/// One row of the raw table. Absent columns and unparseable cells are `None`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawMatch {
    #[serde(rename = "Date", deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "Winner", deserialize_with = "lenient::text")]
    pub winner: Option<String>,
    #[serde(rename = "WeightClass", deserialize_with = "lenient::text")]
    pub weight_class: Option<String>,
    #[serde(rename = "Gender", deserialize_with = "lenient::text")]
    pub gender: Option<String>,
    #[serde(rename = "Finish", deserialize_with = "lenient::text")]
    pub finish: Option<String>,
    #[serde(rename = "RedFighter", deserialize_with = "lenient::text")]
    pub red_fighter: Option<String>,
    #[serde(rename = "BlueFighter", deserialize_with = "lenient::text")]
    pub blue_fighter: Option<String>,
    #[serde(rename = "RedHeightCms", deserialize_with = "lenient::number")]
    pub red_height_cms: Option<f64>,
    #[serde(rename = "BlueHeightCms", deserialize_with = "lenient::number")]
    pub blue_height_cms: Option<f64>,
    #[serde(rename = "RedReachCms", deserialize_with = "lenient::number")]
    pub red_reach_cms: Option<f64>,
    #[serde(rename = "BlueReachCms", deserialize_with = "lenient::number")]
    pub blue_reach_cms: Option<f64>,
    #[serde(rename = "RedAge", deserialize_with = "lenient::number")]
    pub red_age: Option<f64>,
    #[serde(rename = "BlueAge", deserialize_with = "lenient::number")]
    pub blue_age: Option<f64>,
    #[serde(rename = "FinishRound", deserialize_with = "lenient::number")]
    pub finish_round: Option<f64>,
    #[serde(rename = "TotalFightTimeSecs", deserialize_with = "lenient::number")]
    pub total_fight_time_secs: Option<f64>,
    #[serde(rename = "RedAvgSigStrLanded", deserialize_with = "lenient::number")]
    pub red_avg_sig_str_landed: Option<f64>,
    #[serde(rename = "BlueAvgSigStrLanded", deserialize_with = "lenient::number")]
    pub blue_avg_sig_str_landed: Option<f64>,
    #[serde(rename = "RedAvgTDLanded", deserialize_with = "lenient::number")]
    pub red_avg_td_landed: Option<f64>,
    #[serde(rename = "BlueAvgTDLanded", deserialize_with = "lenient::number")]
    pub blue_avg_td_landed: Option<f64>,
    #[serde(rename = "RedOdds", deserialize_with = "lenient::number")]
    pub red_odds: Option<f64>,
    #[serde(rename = "BlueOdds", deserialize_with = "lenient::number")]
    pub blue_odds: Option<f64>,
}

/// The raw rows plus which kept columns the file actually had.
#[derive(Debug)]
pub struct RawTable {
    pub columns: Vec<Column>,
    pub rows: Vec<RawMatch>,
}

/// Reads the raw table. Any CSV-level failure aborts the whole load.
pub fn load_matches(path: &Path, delimiter: u8) -> Result<RawTable, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(file);

    let read_err = |source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    };

    let headers = tidy_headers(rdr.headers().map_err(read_err)?);
    let columns = present_columns(&headers);
    for required in Column::REQUIRED {
        if !columns.contains(&required) {
            return Err(PipelineError::MissingColumn {
                path: path.to_path_buf(),
                column: required.name(),
            });
        }
    }

    let mut rows = Vec::new();
    let mut blank = 0usize;
    for result in rdr.records() {
        let raw: StringRecord = result.map_err(read_err)?;

        if raw.iter().all(|f| f.trim().is_empty()) {
            blank += 1;
            continue;
        }

        let row = raw
            .deserialize::<RawMatch>(Some(&headers))
            .map_err(read_err)?;
        rows.push(row);
    }
    if blank > 0 {
        debug!(blank, "skipped empty lines");
    }

    Ok(RawTable { columns, rows })
}

/// Trims header names and renames repeats to `Name.1`, `Name.2`, ... so the
/// first occurrence is the one deserialized and later ones are ignored.
fn tidy_headers(raw: &StringRecord) -> StringRecord {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    raw.iter()
        .map(|h| {
            let name = h.trim();
            let count = seen.entry(name).or_insert(0);
            let tidy = if *count == 0 {
                name.to_string()
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            tidy
        })
        .collect()
}

/// Kept columns present in `headers`, in kept order.
fn present_columns(headers: &StringRecord) -> Vec<Column> {
    Column::KEPT
        .iter()
        .copied()
        .filter(|c| headers.iter().any(|h| h == c.name()))
        .collect()
}

/// Writes the cleaned table to `path`.
///
/// Rows go to a sibling temporary file first, which is renamed over `path`
/// only once every row is flushed. A failed run leaves no output behind.
pub fn write_cleaned(
    path: &Path,
    columns: &[Column],
    rows: &[CleanMatch],
    delimiter: u8,
) -> Result<(), PipelineError> {
    let tmp = staging_path(path);
    match write_rows(&tmp, columns, rows, delimiter) {
        Ok(()) => fs::rename(&tmp, path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            PipelineError::Finalize {
                path: path.to_path_buf(),
                source,
            }
        }),
        Err(source) => {
            let _ = fs::remove_file(&tmp);
            Err(PipelineError::Write {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

fn write_rows(
    tmp: &Path,
    columns: &[Column],
    rows: &[CleanMatch],
    delimiter: u8,
) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_path(tmp)?;

    let header = columns
        .iter()
        .map(|c| c.name())
        .chain(DERIVED_COLUMNS.iter().copied());
    wtr.write_record(header)?;

    for row in rows {
        let kept = columns.iter().map(|&c| row.cell(c));
        wtr.write_record(kept.chain(row.derived_cells()))?;
    }
    wtr.flush()?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Date;Winner;WeightClass;Gender;Finish;RedHeightCms;BlueHeightCms;RedOdds;BlueOdds;Extra";

    #[test]
    fn loads_rows_and_present_columns() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("raw.csv");
        let mut f = File::create(&path)?;
        writeln!(f, "{HEADER}")?;
        writeln!(f, "2024-03-16;Red;Lightweight;MALE;KO/TKO;17780;1810;-150;130;x")?;
        writeln!(f, ";;;;;;;;;")?;
        writeln!(f, "03/09/2024;Blue;Flyweight;FEMALE;U-DEC;abc;16510;;;y")?;

        let table = load_matches(&path, b';')?;
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.columns,
            vec![
                Column::Date,
                Column::Winner,
                Column::WeightClass,
                Column::Gender,
                Column::Finish,
                Column::RedHeightCms,
                Column::BlueHeightCms,
                Column::RedOdds,
                Column::BlueOdds,
            ]
        );

        let first = &table.rows[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 3, 16));
        assert_eq!(first.winner.as_deref(), Some("Red"));
        assert_eq!(first.red_height_cms, Some(17780.0));
        assert_eq!(first.red_odds, Some(-150.0));
        assert_eq!(first.red_age, None);

        let second = &table.rows[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(second.red_height_cms, None);
        assert_eq!(second.red_odds, None);
        Ok(())
    }

    #[test]
    fn padded_header_names_still_match() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("raw.csv");
        fs::write(&path, " Date ; Winner;RedOdds ;BlueOdds\n2024-01-01;Red;-150;130\n")?;

        let table = load_matches(&path, b';')?;
        assert_eq!(
            table.columns,
            vec![Column::Date, Column::Winner, Column::RedOdds, Column::BlueOdds]
        );
        let row = &table.rows[0];
        assert_eq!(row.winner.as_deref(), Some("Red"));
        assert_eq!(row.red_odds, Some(-150.0));
        assert_eq!(row.blue_odds, Some(130.0));
        Ok(())
    }

    #[test]
    fn repeated_header_keeps_first_column() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("raw.csv");
        fs::write(&path, "Date;Winner;RedAge;RedAge;RedAge\n2024-01-01;Red;31;99;98\n")?;

        let table = load_matches(&path, b';')?;
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].red_age, Some(31.0));
        assert_eq!(
            table.columns,
            vec![Column::Date, Column::Winner, Column::RedAge]
        );
        Ok(())
    }

    #[test]
    fn tidy_headers_renames_repeats() {
        let raw = StringRecord::from(vec!["A", " A", "B", "A "]);
        let tidy = tidy_headers(&raw);
        assert_eq!(tidy.iter().collect::<Vec<_>>(), vec!["A", "A.1", "B", "A.2"]);
    }

    #[test]
    fn missing_winner_column_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("raw.csv");
        fs::write(&path, "Date;RedAge\n2024-01-01;30\n")?;

        let err = load_matches(&path, b';').unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { column: "Winner", .. }));
        assert!(err.to_string().contains("raw.csv"));
        Ok(())
    }

    #[test]
    fn missing_file_names_the_file() {
        let err = load_matches(Path::new("does-not-exist.csv"), b';').unwrap_err();
        assert!(matches!(err, PipelineError::Open { .. }));
        assert!(err.to_string().contains("does-not-exist.csv"));
    }

    #[test]
    fn numbers_accept_comma_decimals() {
        assert_eq!(lenient::parse_number("6,7"), Some(6.7));
        assert_eq!(lenient::parse_number(" 172 "), Some(172.0));
        assert_eq!(lenient::parse_number("inf"), None);
        assert_eq!(lenient::parse_number("NaN"), None);
        assert_eq!(lenient::parse_number(""), None);
    }

    #[test]
    fn dates_accept_timestamps() {
        assert_eq!(
            lenient::parse_date("2019-07-06 00:00:00"),
            NaiveDate::from_ymd_opt(2019, 7, 6)
        );
        assert_eq!(lenient::parse_date("not a date"), None);
    }
}
