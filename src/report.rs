// Descriptive aggregates over the cleaned table. Reads only; never re-derives.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Deserializer};

use crate::error::ReportError;
use crate::io::lenient;
use crate::preprocess::BettingResult;

/// Weight classes from lightest to heaviest, catch weight last.
pub const WEIGHT_ORDER: [&str; 13] = [
    "Women's Strawweight",
    "Women's Flyweight",
    "Women's Bantamweight",
    "Women's Featherweight",
    "Flyweight",
    "Bantamweight",
    "Featherweight",
    "Lightweight",
    "Welterweight",
    "Middleweight",
    "Light Heavyweight",
    "Heavyweight",
    "Catch Weight",
];

/// The subset of a cleaned row the report looks at.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FightRow {
    #[serde(rename = "Year", deserialize_with = "year")]
    pub year: Option<i32>,
    #[serde(rename = "Gender", deserialize_with = "lenient::text")]
    pub gender: Option<String>,
    #[serde(rename = "WeightClass", deserialize_with = "lenient::text")]
    pub weight_class: Option<String>,
    #[serde(rename = "Finish", deserialize_with = "lenient::text")]
    pub finish: Option<String>,
    #[serde(rename = "FinishRound", deserialize_with = "lenient::number")]
    pub finish_round: Option<f64>,
    #[serde(rename = "WinnerHeight", deserialize_with = "lenient::number")]
    pub winner_height: Option<f64>,
    #[serde(rename = "WinnerReach", deserialize_with = "lenient::number")]
    pub winner_reach: Option<f64>,
    #[serde(rename = "WinnerAvgStrikes", deserialize_with = "lenient::number")]
    pub winner_avg_strikes: Option<f64>,
    #[serde(rename = "WinnerAvgTD", deserialize_with = "lenient::number")]
    pub winner_avg_td: Option<f64>,
    #[serde(rename = "WinnerAge", deserialize_with = "lenient::number")]
    pub winner_age: Option<f64>,
    #[serde(rename = "WinnerAgeDiff", deserialize_with = "lenient::number")]
    pub winner_age_diff: Option<f64>,
    #[serde(rename = "BettingResult", deserialize_with = "betting")]
    pub betting_result: Option<BettingResult>,
}

fn year<'de, D>(d: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(d)?;
    Ok(s.as_deref()
        .and_then(lenient::parse_number)
        .map(|y| y as i32))
}

fn betting<'de, D>(d: D) -> Result<Option<BettingResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(d)?;
    Ok(s.and_then(|v| v.trim().parse().ok()))
}

/// Loads the cleaned table. A missing file gets its own error so callers can
/// tell the user to run the pipeline first.
pub fn load_cleaned(path: &Path, delimiter: u8) -> Result<Vec<FightRow>, ReportError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ReportError::MissingCleaned {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ReportError::Read {
                path: path.to_path_buf(),
                source: e.into(),
            })
        }
    };
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(file);

    rdr.deserialize()
        .collect::<Result<Vec<FightRow>, csv::Error>>()
        .map_err(|source| ReportError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Row filters. Empty lists and open year bounds let everything through.
#[derive(Debug, Default, Clone)]
pub struct Filters {
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub genders: Vec<String>,
    pub weight_classes: Vec<String>,
}

impl Filters {
    pub fn matches(&self, row: &FightRow) -> bool {
        if self.from_year.is_some() || self.to_year.is_some() {
            let Some(year) = row.year else {
                return false;
            };
            if self.from_year.is_some_and(|from| year < from)
                || self.to_year.is_some_and(|to| year > to)
            {
                return false;
            }
        }
        one_of(&self.genders, row.gender.as_deref())
            && one_of(&self.weight_classes, row.weight_class.as_deref())
    }

    pub fn apply<'a>(&self, rows: &'a [FightRow]) -> Vec<&'a FightRow> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}

fn one_of(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
}

/// Mean winner height and reach for one weight class.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalProfile {
    pub weight_class: String,
    pub fights: usize,
    pub mean_height: f64,
    pub mean_reach: f64,
}

/// Winner's career strike and takedown rates for one finish method.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleProfile {
    pub finish: String,
    pub fights: usize,
    pub mean_strikes: Option<f64>,
    pub mean_takedowns: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub fights: usize,
    /// Shares are percentages in `0..=100`.
    pub ko_share: f64,
    pub submission_share: f64,
    pub favorite_win_rate: Option<f64>,
    pub market_share: Vec<(BettingResult, f64)>,
    pub favorite_share_by_year: Vec<(i32, f64)>,
    pub physical: Vec<PhysicalProfile>,
    pub styles: Vec<StyleProfile>,
    pub mean_winner_age: Option<f64>,
    pub winner_age_bins: BTreeMap<i32, usize>,
    pub younger_winner_share: Option<f64>,
    pub finish_rounds: BTreeMap<(String, i64), usize>,
}

fn pct(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64 * 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Counts values into one-unit bins keyed by their floor, in one pass.
/// Values beyond the `i32` range land in the outermost bins.
pub fn histogram(values: impl Iterator<Item = f64>) -> BTreeMap<i32, usize> {
    let mut bins = BTreeMap::new();
    for v in values {
        *bins.entry(v.floor() as i32).or_insert(0) += 1;
    }
    bins
}

fn finish_contains(row: &FightRow, needle: &str) -> bool {
    row.finish.as_deref().is_some_and(|f| f.contains(needle))
}

/// Aggregates the filtered rows. Returns `None` when nothing is left to show.
pub fn summarize(rows: &[&FightRow]) -> Option<Summary> {
    let fights = rows.len();
    if fights == 0 {
        return None;
    }

    let count_result =
        |kind: BettingResult| rows.iter().filter(|r| r.betting_result == Some(kind)).count();
    let favorites = count_result(BettingResult::Favorite);
    let underdogs = count_result(BettingResult::Underdog);
    let favorite_win_rate =
        (favorites + underdogs > 0).then(|| pct(favorites, favorites + underdogs));

    let market_share = [
        BettingResult::Favorite,
        BettingResult::Underdog,
        BettingResult::PickEm,
    ]
    .into_iter()
    .map(|kind| (kind, pct(count_result(kind), fights)))
    .collect();

    let mut by_year: BTreeMap<i32, (usize, usize)> = BTreeMap::new();
    for row in rows {
        if let Some(year) = row.year {
            let entry = by_year.entry(year).or_default();
            entry.1 += 1;
            if row.betting_result == Some(BettingResult::Favorite) {
                entry.0 += 1;
            }
        }
    }
    let favorite_share_by_year = by_year
        .into_iter()
        .map(|(year, (fav, total))| (year, pct(fav, total)))
        .collect();

    let ages_known = rows.iter().filter(|r| r.winner_age_diff.is_some()).count();
    let younger = rows
        .iter()
        .filter(|r| r.winner_age_diff.is_some_and(|d| d < 0.0))
        .count();

    let mut finish_rounds = BTreeMap::new();
    for row in rows.iter().filter(|r| !finish_contains(r, "DEC")) {
        if let (Some(finish), Some(round)) = (&row.finish, row.finish_round) {
            *finish_rounds
                .entry((finish.clone(), round as i64))
                .or_insert(0) += 1;
        }
    }

    Some(Summary {
        fights,
        ko_share: pct(rows.iter().filter(|r| finish_contains(r, "KO")).count(), fights),
        submission_share: pct(rows.iter().filter(|r| finish_contains(r, "SUB")).count(), fights),
        favorite_win_rate,
        market_share,
        favorite_share_by_year,
        physical: physical_profiles(rows),
        styles: style_profiles(rows),
        mean_winner_age: mean(rows.iter().filter_map(|r| r.winner_age)),
        winner_age_bins: histogram(rows.iter().filter_map(|r| r.winner_age)),
        younger_winner_share: (ages_known > 0).then(|| pct(younger, ages_known)),
        finish_rounds,
    })
}

fn physical_profiles(rows: &[&FightRow]) -> Vec<PhysicalProfile> {
    let mut groups: BTreeMap<&str, Vec<&FightRow>> = BTreeMap::new();
    for row in rows {
        if let Some(class) = row.weight_class.as_deref() {
            groups.entry(class).or_default().push(*row);
        }
    }

    let mut profiles: Vec<PhysicalProfile> = groups
        .into_iter()
        .filter_map(|(class, members)| {
            Some(PhysicalProfile {
                weight_class: class.to_string(),
                fights: members.len(),
                mean_height: mean(members.iter().filter_map(|r| r.winner_height))?,
                mean_reach: mean(members.iter().filter_map(|r| r.winner_reach))?,
            })
        })
        .collect();
    // Known classes by weight; anything else after them, alphabetically.
    profiles.sort_by_key(|p| {
        let rank = WEIGHT_ORDER
            .iter()
            .position(|w| *w == p.weight_class)
            .unwrap_or(WEIGHT_ORDER.len());
        (rank, p.weight_class.clone())
    });
    profiles
}

fn style_profiles(rows: &[&FightRow]) -> Vec<StyleProfile> {
    let mut groups: BTreeMap<&str, Vec<&FightRow>> = BTreeMap::new();
    for row in rows {
        if let Some(finish) = row.finish.as_deref() {
            groups.entry(finish).or_default().push(*row);
        }
    }

    let mut styles: Vec<StyleProfile> = groups
        .into_iter()
        .map(|(finish, members)| StyleProfile {
            finish: finish.to_string(),
            fights: members.len(),
            mean_strikes: mean(members.iter().filter_map(|r| r.winner_avg_strikes)),
            mean_takedowns: mean(members.iter().filter_map(|r| r.winner_avg_td)),
        })
        .collect();
    // Most common finishes first; the map already ordered ties by name.
    styles.sort_by(|a, b| b.fights.cmp(&a.fights));
    styles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn row(year: i32, gender: &str, class: &str, finish: &str, result: BettingResult) -> FightRow {
        FightRow {
            year: Some(year),
            gender: Some(gender.to_string()),
            weight_class: Some(class.to_string()),
            finish: Some(finish.to_string()),
            finish_round: Some(1.0),
            winner_height: Some(180.0),
            winner_reach: Some(185.0),
            winner_avg_strikes: Some(4.0),
            winner_avg_td: Some(1.0),
            winner_age: Some(30.0),
            winner_age_diff: Some(-2.0),
            betting_result: Some(result),
        }
    }

    fn sample() -> Vec<FightRow> {
        vec![
            row(2015, "MALE", "Lightweight", "KO/TKO", BettingResult::Favorite),
            row(2015, "MALE", "Heavyweight", "U-DEC", BettingResult::Underdog),
            row(2016, "FEMALE", "Women's Strawweight", "SUB", BettingResult::Favorite),
            row(2016, "MALE", "Lightweight", "S-DEC", BettingResult::Unknown),
        ]
    }

    #[test]
    fn filters_by_year_gender_and_class() {
        let rows = sample();
        let only_2016 = Filters {
            from_year: Some(2016),
            ..Filters::default()
        };
        assert_eq!(only_2016.apply(&rows).len(), 2);

        let males = Filters {
            genders: vec!["MALE".to_string()],
            to_year: Some(2015),
            ..Filters::default()
        };
        assert_eq!(males.apply(&rows).len(), 2);

        let light = Filters {
            weight_classes: vec!["Lightweight".to_string()],
            ..Filters::default()
        };
        assert_eq!(light.apply(&rows).len(), 2);
        assert_eq!(Filters::default().apply(&rows).len(), 4);
    }

    #[test]
    fn summary_kpis() {
        let rows = sample();
        let all = Filters::default().apply(&rows);
        let s = summarize(&all).unwrap();

        assert_eq!(s.fights, 4);
        assert_eq!(s.ko_share, 25.0);
        assert_eq!(s.submission_share, 25.0);
        // two favorites out of three fights with a market read
        assert!((s.favorite_win_rate.unwrap() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.market_share[0], (BettingResult::Favorite, 50.0));
        assert_eq!(s.market_share[2], (BettingResult::PickEm, 0.0));
        assert_eq!(s.favorite_share_by_year, vec![(2015, 50.0), (2016, 50.0)]);
        assert_eq!(s.younger_winner_share, Some(100.0));
        assert_eq!(s.mean_winner_age, Some(30.0));
    }

    #[test]
    fn finish_rounds_skip_decisions() {
        let rows = sample();
        let all = Filters::default().apply(&rows);
        let s = summarize(&all).unwrap();
        assert_eq!(s.finish_rounds.len(), 2);
        assert_eq!(s.finish_rounds[&("KO/TKO".to_string(), 1)], 1);
        assert_eq!(s.finish_rounds[&("SUB".to_string(), 1)], 1);
    }

    #[test]
    fn physical_profiles_follow_weight_ladder() {
        let mut rows = sample();
        rows.push(row(2016, "MALE", "Open Weight", "KO/TKO", BettingResult::Favorite));
        let all = Filters::default().apply(&rows);
        let s = summarize(&all).unwrap();
        let order: Vec<&str> = s.physical.iter().map(|p| p.weight_class.as_str()).collect();
        assert_eq!(
            order,
            vec!["Women's Strawweight", "Lightweight", "Heavyweight", "Open Weight"]
        );
        assert_eq!(s.physical[1].fights, 2);
    }

    #[test]
    fn style_profiles_by_finish() {
        let mut rows = sample();
        rows.push(FightRow {
            winner_avg_strikes: Some(6.0),
            winner_avg_td: None,
            ..row(2016, "MALE", "Lightweight", "KO/TKO", BettingResult::Favorite)
        });
        let all = Filters::default().apply(&rows);
        let s = summarize(&all).unwrap();

        assert_eq!(s.styles.len(), 4);
        let ko = &s.styles[0];
        assert_eq!(ko.finish, "KO/TKO");
        assert_eq!(ko.fights, 2);
        assert_eq!(ko.mean_strikes, Some(5.0));
        assert_eq!(ko.mean_takedowns, Some(1.0));
        let rest: Vec<&str> = s.styles[1..].iter().map(|p| p.finish.as_str()).collect();
        assert_eq!(rest, vec!["S-DEC", "SUB", "U-DEC"]);
    }

    #[test]
    fn winner_age_histogram() {
        let mut rows = sample();
        rows[0].winner_age = Some(24.0);
        rows[1].winner_age = Some(24.9);
        rows[2].winner_age = None;
        let all = Filters::default().apply(&rows);
        let s = summarize(&all).unwrap();
        assert_eq!(s.winner_age_bins.len(), 2);
        assert_eq!(s.winner_age_bins[&24], 2);
        assert_eq!(s.winner_age_bins[&30], 1);
    }

    #[test]
    fn histogram_tolerates_implausible_values() {
        let bins = histogram([-1.5, 0.2, 0.7, 1e12, -1e12].into_iter());
        assert_eq!(bins[&-2], 1);
        assert_eq!(bins[&0], 2);
        assert_eq!(bins[&i32::MAX], 1);
        assert_eq!(bins[&i32::MIN], 1);
        assert_eq!(bins.values().sum::<usize>(), 5);
    }

    #[test]
    fn empty_selection_has_no_summary() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn missing_cleaned_table_is_reported() {
        let err = load_cleaned(Path::new("no-such-cleaned.csv"), b',').unwrap_err();
        assert!(matches!(err, ReportError::MissingCleaned { .. }));
        assert!(err.to_string().contains("run `ufc_clean clean` first"));
    }

    #[test]
    fn loads_cleaned_rows() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cleaned.csv");
        fs::write(
            &path,
            "Date,Winner,Gender,Year,WinnerHeight,WinnerReach,WinnerAvgStrikes,WinnerAvgTD,WinnerAge,WinnerAgeDiff,BettingResult\n\
             2020-01-18,Red,MALE,2020,180,190,4.25,1.5,33,5,Favorite\n\
             2020-02-08,Blue,FEMALE,2020,165,170,0,,28,,PickEm\n",
        )?;
        let rows = load_cleaned(&path, b',')?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, Some(2020));
        assert_eq!(rows[0].betting_result, Some(BettingResult::Favorite));
        assert_eq!(rows[0].winner_avg_strikes, Some(4.25));
        assert_eq!(rows[0].winner_avg_td, Some(1.5));
        assert_eq!(rows[1].winner_avg_strikes, Some(0.0));
        assert_eq!(rows[1].winner_avg_td, None);
        assert_eq!(rows[1].winner_age_diff, None);
        assert_eq!(rows[1].weight_class, None);
        Ok(())
    }
}
