// Turning raw match rows into winner-centric cleaned rows.
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::io::{Column, RawMatch};
use crate::scale;

/// Corner of the cage. Red is the "A" side, Blue the "B" side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    Red,
    Blue,
}

impl Corner {
    /// Parses a decisive outcome label. Anything else is not decisive.
    pub fn from_outcome(label: &str) -> Option<Corner> {
        match label {
            "Red" => Some(Corner::Red),
            "Blue" => Some(Corner::Blue),
            _ => None,
        }
    }

    pub fn opponent(self) -> Corner {
        match self {
            Corner::Red => Corner::Blue,
            Corner::Blue => Corner::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Corner::Red => "Red",
            Corner::Blue => "Blue",
        }
    }
}

/// A red/blue pair of the same attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pair<T> {
    pub red: T,
    pub blue: T,
}

impl<T> Pair<T> {
    pub fn new(red: T, blue: T) -> Self {
        Pair { red, blue }
    }
}

impl<T: Copy> Pair<T> {
    /// The value belonging to `corner`.
    pub fn pick(&self, corner: Corner) -> T {
        match corner {
            Corner::Red => self.red,
            Corner::Blue => self.blue,
        }
    }

    pub fn map<U>(self, f: impl Fn(T) -> U) -> Pair<U> {
        Pair {
            red: f(self.red),
            blue: f(self.blue),
        }
    }
}

/// Winner's age minus loser's age; negative when the winner was younger.
pub fn age_difference(winner: Corner, ages: Pair<Option<f64>>) -> Option<f64> {
    Some(ages.pick(winner)? - ages.pick(winner.opponent())?)
}

/// How the betting market read the fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BettingResult {
    Favorite,
    Underdog,
    PickEm,
    Unknown,
}

impl BettingResult {
    pub fn as_str(self) -> &'static str {
        match self {
            BettingResult::Favorite => "Favorite",
            BettingResult::Underdog => "Underdog",
            BettingResult::PickEm => "PickEm",
            BettingResult::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BettingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BettingResult {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Favorite" => Ok(BettingResult::Favorite),
            "Underdog" => Ok(BettingResult::Underdog),
            "PickEm" => Ok(BettingResult::PickEm),
            "Unknown" => Ok(BettingResult::Unknown),
            _ => Err(format!("Unknown betting result: {}", s)),
        }
    }
}

/// Classifies the result against the odds. The lower odds mark the favorite.
pub fn classify_betting(winner: Corner, odds: Pair<Option<f64>>) -> BettingResult {
    let (Some(red), Some(blue)) = (odds.red, odds.blue) else {
        return BettingResult::Unknown;
    };
    let favorite = if red < blue {
        Corner::Red
    } else if blue < red {
        Corner::Blue
    } else {
        return BettingResult::PickEm;
    };
    if winner == favorite {
        BettingResult::Favorite
    } else {
        BettingResult::Underdog
    }
}

/// A decisive match after scale correction, seen from the winner's side.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanMatch {
    pub date: Option<NaiveDate>,
    pub winner: Corner,
    pub weight_class: Option<String>,
    pub gender: Option<String>,
    pub finish: Option<String>,
    pub fighters: Pair<Option<String>>,
    pub height_cms: Pair<Option<f64>>,
    pub reach_cms: Pair<Option<f64>>,
    pub age: Pair<Option<f64>>,
    pub finish_round: Option<f64>,
    pub total_fight_time_secs: Option<f64>,
    pub avg_sig_str_landed: Pair<Option<f64>>,
    pub avg_td_landed: Pair<Option<f64>>,
    pub odds: Pair<Option<f64>>,

    pub year: Option<i32>,
    pub winner_height: Option<f64>,
    pub winner_reach: Option<f64>,
    pub winner_avg_strikes: Option<f64>,
    pub winner_avg_td: Option<f64>,
    pub winner_age: Option<f64>,
    pub winner_age_diff: Option<f64>,
    pub betting_result: BettingResult,
}

impl CleanMatch {
    /// True when every field the consumers rely on is resolved.
    ///
    /// The betting result is always resolved; at worst it is `Unknown`.
    pub fn is_complete(&self) -> bool {
        self.winner_height.is_some() && self.winner_reach.is_some() && self.winner_age.is_some()
    }

    /// Output text of a kept column. Missing values are empty cells.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Date => self
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            Column::Winner => self.winner.as_str().to_string(),
            Column::WeightClass => self.weight_class.clone().unwrap_or_default(),
            Column::Gender => self.gender.clone().unwrap_or_default(),
            Column::Finish => self.finish.clone().unwrap_or_default(),
            Column::RedFighter => self.fighters.red.clone().unwrap_or_default(),
            Column::BlueFighter => self.fighters.blue.clone().unwrap_or_default(),
            Column::RedHeightCms => number_cell(self.height_cms.red),
            Column::BlueHeightCms => number_cell(self.height_cms.blue),
            Column::RedReachCms => number_cell(self.reach_cms.red),
            Column::BlueReachCms => number_cell(self.reach_cms.blue),
            Column::RedAge => number_cell(self.age.red),
            Column::BlueAge => number_cell(self.age.blue),
            Column::FinishRound => number_cell(self.finish_round),
            Column::TotalFightTimeSecs => number_cell(self.total_fight_time_secs),
            Column::RedAvgSigStrLanded => number_cell(self.avg_sig_str_landed.red),
            Column::BlueAvgSigStrLanded => number_cell(self.avg_sig_str_landed.blue),
            Column::RedAvgTDLanded => number_cell(self.avg_td_landed.red),
            Column::BlueAvgTDLanded => number_cell(self.avg_td_landed.blue),
            Column::RedOdds => number_cell(self.odds.red),
            Column::BlueOdds => number_cell(self.odds.blue),
        }
    }

    /// Output text of the derived columns, in header order.
    pub fn derived_cells(&self) -> Vec<String> {
        vec![
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            number_cell(self.winner_height),
            number_cell(self.winner_reach),
            number_cell(self.winner_avg_strikes),
            number_cell(self.winner_avg_td),
            number_cell(self.winner_age),
            number_cell(self.winner_age_diff),
            self.betting_result.to_string(),
        ]
    }
}

fn number_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Builds the cleaned row for a decisive match, or `None` for draws,
/// no-contests and rows without an outcome.
///
/// Each side is scale-corrected once and the winner's value is then picked
/// from the corrected pair. The rate heuristics are not idempotent, so the
/// winner columns must never be corrected a second time.
pub fn clean_match(raw: &RawMatch) -> Option<CleanMatch> {
    let winner = raw.winner.as_deref().and_then(Corner::from_outcome)?;

    let odds = Pair::new(raw.red_odds, raw.blue_odds);
    let age = Pair::new(raw.red_age, raw.blue_age);
    let height_cms =
        Pair::new(raw.red_height_cms, raw.blue_height_cms).map(|v| v.map(scale::correct_length));
    let reach_cms =
        Pair::new(raw.red_reach_cms, raw.blue_reach_cms).map(|v| v.map(scale::correct_length));
    let avg_sig_str_landed = Pair::new(raw.red_avg_sig_str_landed, raw.blue_avg_sig_str_landed)
        .map(|v| v.map(scale::correct_strike_rate));
    let avg_td_landed = Pair::new(raw.red_avg_td_landed, raw.blue_avg_td_landed)
        .map(|v| v.map(scale::correct_takedown_rate));

    Some(CleanMatch {
        date: raw.date,
        winner,
        weight_class: raw.weight_class.clone(),
        gender: raw.gender.clone(),
        finish: raw.finish.clone(),
        fighters: Pair::new(raw.red_fighter.clone(), raw.blue_fighter.clone()),
        height_cms,
        reach_cms,
        age,
        finish_round: raw.finish_round.map(scale::correct_round),
        total_fight_time_secs: raw.total_fight_time_secs.map(scale::correct_duration),
        avg_sig_str_landed,
        avg_td_landed,
        odds,

        year: raw.date.map(|d| d.year()),
        winner_height: height_cms.pick(winner),
        winner_reach: reach_cms.pick(winner),
        winner_avg_strikes: avg_sig_str_landed.pick(winner),
        winner_avg_td: avg_td_landed.pick(winner),
        winner_age: age.pick(winner),
        winner_age_diff: age_difference(winner, age),
        betting_result: classify_betting(winner, odds),
    })
}

/// Row counts for one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub read: usize,
    pub admitted: usize,
    pub written: usize,
}

impl RunStats {
    pub fn not_decisive(&self) -> usize {
        self.read - self.admitted
    }

    pub fn incomplete(&self) -> usize {
        self.admitted - self.written
    }
}

/// Cleans every row, keeping input order and dropping incomplete rows.
pub fn preprocess(records: &[RawMatch]) -> (Vec<CleanMatch>, RunStats) {
    let mut stats = RunStats {
        read: records.len(),
        ..RunStats::default()
    };

    let admitted: Vec<CleanMatch> = records.iter().filter_map(clean_match).collect();
    stats.admitted = admitted.len();

    let cleaned: Vec<CleanMatch> = admitted.into_iter().filter(CleanMatch::is_complete).collect();
    stats.written = cleaned.len();

    (cleaned, stats)
}
