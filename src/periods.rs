use std::{fmt, str::FromStr};

use miette::Diagnostic;
use thiserror::Error;
use time::{Date, Duration, Weekday};

use crate::units::{Direction, SourceUnits, UnitSystem};

/// The three periods a mountain-forecast day is split into, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeOfDay {
    Am,
    Pm,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [Self::Am, Self::Pm, Self::Night];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Pm => "PM",
            Self::Night => "night",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Am => 0,
            Self::Pm => 1,
            Self::Night => 2,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AM" => Ok(Self::Am),
            "PM" => Ok(Self::Pm),
            "night" | "Night" => Ok(Self::Night),
            s => Err(PeriodError::UnknownTimeOfDay(s.to_string())),
        }
    }
}

#[derive(Debug, Error, Diagnostic, PartialEq)]
pub enum PeriodError {
    #[error("Unknown time of day: {0}")]
    #[diagnostic(code(wxdays::periods::time_of_day), help("expected `AM`, `PM` or `night`"))]
    UnknownTimeOfDay(String),
    #[error("Couldn't find today ({0}) among the header days")]
    #[diagnostic(code(wxdays::periods::today_not_found))]
    TodayNotFound(Date),
    #[error("Today ({0}) appears more than once among the header days")]
    #[diagnostic(code(wxdays::periods::today_ambiguous))]
    TodayAmbiguous(Date),
    #[error("Header day {offset} days away from {today} is out of range")]
    #[diagnostic(code(wxdays::periods::date_out_of_range))]
    DateOutOfRange { today: Date, offset: i64 },
    #[error("Column {column} has no matching day")]
    #[diagnostic(code(wxdays::periods::out_of_dates))]
    OutOfDates { column: usize },
    #[error("Expected {} periods per day, got {0}", TimeOfDay::ALL.len())]
    #[diagnostic(code(wxdays::periods::bad_period_count))]
    BadPeriodCount(usize),
}

/// Forecast for one period of one day.
///
/// Every value is optional: a period nobody reported is kept as a placeholder
/// so days always come in complete AM/PM/night triples.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodForecast {
    pub date: Date,
    pub time_of_day: TimeOfDay,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub rain: Option<f64>,
    pub snow: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<Direction>,
}

impl PeriodForecast {
    pub fn empty(date: Date, time_of_day: TimeOfDay) -> Self {
        Self {
            date,
            time_of_day,
            high: None,
            low: None,
            rain: None,
            snow: None,
            wind_speed: None,
            wind_direction: None,
        }
    }

    pub fn key(&self) -> (Date, TimeOfDay) {
        (self.date, self.time_of_day)
    }

    // the high is always the first thing reported
    pub fn is_missing(&self) -> bool {
        self.high.is_none()
    }

    pub fn normalized(self, units: UnitSystem, source: SourceUnits) -> Self {
        Self {
            high: self.high.map(|v| units.temperature(v, source.temperature)),
            low: self.low.map(|v| units.temperature(v, source.temperature)),
            rain: self.rain.map(|v| units.rain(v, source.rain)),
            snow: self.snow.map(|v| units.snow(v, source.snow)),
            wind_speed: self.wind_speed.map(|v| units.wind_speed(v, source.wind_speed)),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: Date,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub rain: Option<f64>,
    pub snow: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<Direction>,
}

/// Dates of each header column, given the weekday printed above it.
///
/// Today's weekday must appear exactly once; the other columns are counted
/// backwards and forwards from it.
pub fn header_dates(weekdays: &[Weekday], today: Date) -> Result<Vec<Date>, PeriodError> {
    let mut columns = weekdays
        .iter()
        .enumerate()
        .filter(|(_, weekday)| **weekday == today.weekday())
        .map(|(column, _)| column);
    let itoday = columns.next().ok_or(PeriodError::TodayNotFound(today))?;
    if columns.next().is_some() {
        return Err(PeriodError::TodayAmbiguous(today));
    }

    (0..weekdays.len())
        .map(|column| {
            let offset = column as i64 - itoday as i64;
            today
                .checked_add(Duration::days(offset))
                .ok_or(PeriodError::DateOutOfRange { today, offset })
        })
        .collect()
}

/// Lays the time-of-day header row onto `dates`.
///
/// The first column and every `AM` column start a new day, since the first
/// day is usually only partly covered.
pub fn assign_dates(
    columns: &[TimeOfDay],
    dates: &[Date],
) -> Result<Vec<PeriodForecast>, PeriodError> {
    let mut periods = Vec::with_capacity(columns.len());
    let mut day: Option<usize> = None;
    for (column, &time_of_day) in columns.iter().enumerate() {
        let index = match day {
            Some(index) if time_of_day != TimeOfDay::Am => index,
            Some(index) => index + 1,
            None => 0,
        };
        day = Some(index);
        let date = dates
            .get(index)
            .copied()
            .ok_or(PeriodError::OutOfDates { column })?;
        periods.push(PeriodForecast::empty(date, time_of_day));
    }
    Ok(periods)
}

/// Folds one day's AM, PM and night forecasts.
///
/// High and low are the extremes, rain and snow are summed and the wind is
/// the strongest period's speed and direction. A value absent from any
/// period is absent from the day.
pub fn combine_times_of_day(periods: &[PeriodForecast]) -> Result<DailyForecast, PeriodError> {
    let [first, ..] = periods else {
        return Err(PeriodError::BadPeriodCount(0));
    };
    if periods.len() != TimeOfDay::ALL.len() {
        return Err(PeriodError::BadPeriodCount(periods.len()));
    }

    let mut high = Some(f64::NEG_INFINITY);
    let mut low = Some(f64::INFINITY);
    let mut rain = Some(0.0);
    let mut snow = Some(0.0);
    let mut wind_speed = Some(f64::NEG_INFINITY);
    let mut wind_direction = None;
    let mut direction_known = true;

    for period in periods {
        high = high.zip(period.high).map(|(a, b)| a.max(b));
        low = low.zip(period.low).map(|(a, b)| a.min(b));
        rain = rain.zip(period.rain).map(|(a, b)| a + b);
        snow = snow.zip(period.snow).map(|(a, b)| a + b);

        match (wind_speed, period.wind_speed) {
            (Some(max), Some(speed)) if speed > max => {
                wind_speed = Some(speed);
                wind_direction = period.wind_direction;
            }
            (Some(_), None) => wind_speed = None,
            _ => (),
        }
        // one unknown direction makes the day's direction unknown, even when a
        // windier period has one
        direction_known &= period.wind_direction.is_some();
    }

    Ok(DailyForecast {
        date: first.date,
        high,
        low,
        rain,
        snow,
        wind_speed,
        wind_direction: wind_direction.filter(|_| direction_known),
    })
}

/// Folds consecutive AM/PM/night triples into days.
pub fn combine_all(periods: &[PeriodForecast]) -> Result<Vec<DailyForecast>, PeriodError> {
    let days = periods.chunks_exact(TimeOfDay::ALL.len());
    if !days.remainder().is_empty() {
        log::warn!(
            "dropping {} trailing periods that don't make up a full day",
            days.remainder().len()
        );
    }
    days.map(combine_times_of_day).collect()
}
