use std::{collections::BTreeMap, fmt, str::FromStr};

use miette::Diagnostic;
use thiserror::Error;
use time::{Date, Duration, PrimitiveDateTime, Time};

/// Width given to the last reading of a series when it has no end time.
pub const DEFAULT_LAST_INTERVAL: Duration = Duration::hours(6);

/// How the readings falling on one day are folded into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Totals, e.g. precipitation. Midnight-crossing readings are apportioned.
    Sum,
    /// Duration-weighted average, e.g. wind speed or cloud cover.
    Mean,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" | "SUM" => Ok(Self::Sum),
            "mean" | "MEAN" => Ok(Self::Mean),
            s => Err(AggregateError::UnsupportedMode(s.to_string())),
        }
    }
}

#[derive(Debug, Error, Diagnostic, PartialEq)]
pub enum AggregateError {
    #[error("Unsupported aggregation mode: {0}")]
    #[diagnostic(
        code(wxdays::aggregate::unsupported_mode),
        help("expected `sum` or `mean`")
    )]
    UnsupportedMode(String),
    #[error("Unsupported multi-day interval: {start} to {end}")]
    #[diagnostic(
        code(wxdays::aggregate::multi_day_interval),
        help("a reading may cross at most one midnight")
    )]
    MultiDayInterval {
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    },
}

/// One forecast tick for a single variable.
///
/// `end` is optional because some feeds only publish start times, see
/// [`aggregate`] for how the missing end is derived. An absent `value` is
/// skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub start: PrimitiveDateTime,
    pub end: Option<PrimitiveDateTime>,
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(start: PrimitiveDateTime, value: Option<f64>) -> Self {
        Self {
            start,
            end: None,
            value,
        }
    }

    pub fn absent(start: PrimitiveDateTime) -> Self {
        Self::new(start, None)
    }

    pub fn with_end(mut self, end: PrimitiveDateTime) -> Self {
        self.end = Some(end);
        self
    }
}

/// One value per calendar day, ordered by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyAggregate {
    days: BTreeMap<Date, f64>,
}

impl DailyAggregate {
    pub fn get(&self, date: Date) -> Option<f64> {
        self.days.get(&date).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Date, f64)> + '_ {
        self.days.iter().map(|(date, value)| (*date, *value))
    }

    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.days.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<Date, f64> {
        self.days
    }
}

#[derive(Debug)]
struct Accumulator {
    day: Date,
    sum: f64,
    weighted_sum: f64,
    weight: f64,
    count: usize,
}

impl Accumulator {
    fn open(day: Date) -> Self {
        Self {
            day,
            sum: 0.0,
            weighted_sum: 0.0,
            weight: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, value: f64, hours: f64) {
        self.sum += value;
        self.weighted_sum += value * hours;
        self.weight += hours;
        self.count += 1;
    }

    fn finish(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Sum => self.sum,
            Mode::Mean if self.weight > 0.0 => self.weighted_sum / self.weight,
            // only zero-length readings touched this day
            Mode::Mean => self.sum / self.count as f64,
        }
    }
}

/// Accumulators in the order their runs were opened.
#[derive(Debug, Default)]
struct Runs(Vec<Accumulator>);

impl Runs {
    fn contribute(&mut self, day: Date, value: f64, hours: f64) {
        match self.0.last_mut() {
            Some(open) if open.day == day => {
                open.add(value, hours);
                log::trace!("    increment {day} by {value} over {hours:.3}h");
            }
            _ => {
                log::debug!("    new day {day}: {value} over {hours:.3}h");
                let mut acc = Accumulator::open(day);
                acc.add(value, hours);
                self.0.push(acc);
            }
        }
    }

    fn finish(self, mode: Mode) -> DailyAggregate {
        let mut days = BTreeMap::new();
        for acc in self.0 {
            if let Some(previous) = days.insert(acc.day, acc.finish(mode)) {
                log::debug!(
                    "{} appears in two separate runs, dropping earlier value {previous}",
                    acc.day
                );
            }
        }
        DailyAggregate { days }
    }
}

fn hours_between(start: PrimitiveDateTime, end: PrimitiveDateTime) -> f64 {
    (end - start).as_seconds_f64() / 3600.0
}

fn effective_end(readings: &[Reading], index: usize) -> PrimitiveDateTime {
    let reading = &readings[index];
    match (reading.end, readings.get(index + 1)) {
        (Some(end), _) => end,
        // a tie on start leaves a zero-length reading
        (None, Some(next)) => (next.start - Duration::milliseconds(1)).max(reading.start),
        (None, None) => reading.start + DEFAULT_LAST_INTERVAL,
    }
}

/// Day of the last instant covered by `[start, end)`.
fn last_day(start: PrimitiveDateTime, end: PrimitiveDateTime) -> Date {
    if end > start && end.time() == Time::MIDNIGHT {
        end.date().previous_day().unwrap_or(end.date())
    } else {
        end.date()
    }
}

/// Folds an ordered sequence of readings into one value per calendar day.
///
/// A reading without an end lasts until one millisecond before the next
/// reading starts, or [`DEFAULT_LAST_INTERVAL`] if it is the last one.
/// Readings crossing midnight are split at the boundary: in [`Mode::Sum`] the
/// value is apportioned by the hours on each side, in [`Mode::Mean`] the full
/// value is weighted by each side's duration.
///
/// Readings must be sorted by start and every end must not precede its start.
/// A reading only extends the accumulator of the previous reading's day, so a
/// day that shows up in two separate runs keeps the value of the later run.
///
/// # Errors
///
/// Returns [`AggregateError::MultiDayInterval`] when a reading touches more
/// than two calendar days.
pub fn aggregate(mode: Mode, readings: &[Reading]) -> Result<DailyAggregate, AggregateError> {
    let mut runs = Runs::default();

    for (index, reading) in readings.iter().enumerate() {
        let start = reading.start;
        let end = effective_end(readings, index);
        log::trace!(
            " day {:>3}-{:<3} hour {:>3}-{:<3} {:?}",
            start.day(),
            end.day(),
            start.hour(),
            end.hour(),
            reading.value
        );

        let Some(value) = reading.value else {
            log::trace!("    skipping absent value");
            continue;
        };
        debug_assert!(end >= start, "reading ends before it starts: {start} > {end}");

        let first = start.date();
        let last = last_day(start, end);
        if last == first {
            runs.contribute(first, value, hours_between(start, end));
        } else if first.next_day() == Some(last) {
            let midnight = last.midnight();
            let before = hours_between(start, midnight);
            let after = hours_between(midnight, end);
            let (value_before, value_after) = match mode {
                Mode::Sum => {
                    let total = before + after;
                    (value * before / total, value * after / total)
                }
                Mode::Mean => (value, value),
            };
            log::trace!(
                "    splitting at {midnight}: {value_before} over {before:.3}h, {value_after} over {after:.3}h"
            );
            runs.contribute(first, value_before, before);
            runs.contribute(last, value_after, after);
        } else {
            return Err(AggregateError::MultiDayInterval { start, end });
        }
    }

    Ok(runs.finish(mode))
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    fn span(start: PrimitiveDateTime, end: PrimitiveDateTime, value: f64) -> Reading {
        Reading::new(start, Some(value)).with_end(end)
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("day should be present");
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn sums_readings_within_a_day() {
        let readings = [
            span(datetime!(2024-05-01 00:00), datetime!(2024-05-01 06:00), 0.1),
            span(datetime!(2024-05-01 06:00), datetime!(2024-05-01 12:00), 0.25),
            span(datetime!(2024-05-02 00:00), datetime!(2024-05-02 06:00), 0.5),
        ];
        let daily = aggregate(Mode::Sum, &readings).unwrap();
        assert_eq!(daily.len(), 2);
        assert_close(daily.get(date!(2024 - 05 - 01)), 0.35);
        assert_close(daily.get(date!(2024 - 05 - 02)), 0.5);
    }

    #[test]
    fn weights_mean_by_duration() {
        let readings = [
            span(datetime!(2024-05-01 00:00), datetime!(2024-05-01 06:00), 10.0),
            span(datetime!(2024-05-01 06:00), datetime!(2024-05-01 18:00), 40.0),
        ];
        let daily = aggregate(Mode::Mean, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 30.0);
    }

    #[test]
    fn apportions_sum_across_midnight() {
        let readings = [span(datetime!(2024-05-01 22:00), datetime!(2024-05-02 02:00), 8.0)];
        let daily = aggregate(Mode::Sum, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 4.0);
        assert_close(daily.get(date!(2024 - 05 - 02)), 4.0);
    }

    #[test]
    fn mean_keeps_full_value_on_both_sides_of_midnight() {
        let readings = [
            span(datetime!(2024-05-01 22:00), datetime!(2024-05-02 02:00), 10.0),
            span(datetime!(2024-05-02 02:00), datetime!(2024-05-02 06:00), 20.0),
        ];
        let daily = aggregate(Mode::Mean, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 10.0);
        // 10 over 2h then 20 over 4h
        assert_close(daily.get(date!(2024 - 05 - 02)), 100.0 / 6.0);
    }

    #[test]
    fn folds_the_mixed_scenario() {
        let readings = [
            span(datetime!(2024-05-01 00:00), datetime!(2024-05-01 06:00), 1.0),
            span(datetime!(2024-05-01 06:00), datetime!(2024-05-01 12:00), 2.0),
            span(datetime!(2024-05-01 20:00), datetime!(2024-05-02 02:00), 4.0),
        ];
        let daily = aggregate(Mode::Sum, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 3.0 + 4.0 * 4.0 / 6.0);
        assert_close(daily.get(date!(2024 - 05 - 02)), 4.0 * 2.0 / 6.0);
    }

    #[test]
    fn absent_values_leave_no_trace() {
        let readings = [
            span(datetime!(2024-05-01 00:00), datetime!(2024-05-01 12:00), 3.0),
            Reading::absent(datetime!(2024-05-01 12:00)).with_end(datetime!(2024-05-01 18:00)),
            Reading::absent(datetime!(2024-05-02 00:00)).with_end(datetime!(2024-05-02 12:00)),
        ];
        let daily = aggregate(Mode::Mean, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 3.0);
        assert_eq!(daily.get(date!(2024 - 05 - 02)), None);
        assert_eq!(daily.len(), 1);
    }

    #[test]
    fn derives_missing_ends_from_the_next_start() {
        let readings = [
            Reading::new(datetime!(2024-05-01 00:00), Some(1.0)),
            Reading::new(datetime!(2024-05-01 06:00), Some(2.0)),
            Reading::new(datetime!(2024-05-01 12:00), Some(3.0)),
        ];
        let daily = aggregate(Mode::Mean, &readings).unwrap();
        // the last reading gets six hours, the others six hours minus a millisecond
        assert_close(daily.get(date!(2024 - 05 - 01)), 2.0);
        assert_eq!(daily.len(), 1);
    }

    #[test]
    fn last_reading_without_end_spills_into_next_day() {
        let readings = [Reading::new(datetime!(2024-05-01 21:00), Some(6.0))];
        let daily = aggregate(Mode::Sum, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 3.0);
        assert_close(daily.get(date!(2024 - 05 - 02)), 3.0);
    }

    #[test]
    fn interval_ending_at_midnight_stays_on_its_day() {
        let readings = [span(datetime!(2024-05-01 18:00), datetime!(2024-05-02 00:00), 5.0)];
        let daily = aggregate(Mode::Mean, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 5.0);
        assert_eq!(daily.len(), 1);
    }

    #[test]
    fn crosses_month_and_year_boundaries() {
        let readings = [span(datetime!(2023-12-31 23:00), datetime!(2024-01-01 02:00), 3.0)];
        let daily = aggregate(Mode::Sum, &readings).unwrap();
        assert_close(daily.get(date!(2023 - 12 - 31)), 1.0);
        assert_close(daily.get(date!(2024 - 01 - 01)), 2.0);
    }

    #[test]
    fn rejects_multi_day_interval() {
        let start = datetime!(2024-05-01 12:00);
        let end = datetime!(2024-05-03 01:00);
        let err = aggregate(Mode::Sum, &[span(start, end, 1.0)]).unwrap_err();
        assert_eq!(err, AggregateError::MultiDayInterval { start, end });
    }

    #[test]
    fn later_run_overwrites_earlier_run_of_same_day() {
        let readings = [
            span(datetime!(2024-05-01 00:00), datetime!(2024-05-01 06:00), 1.0),
            span(datetime!(2024-05-02 00:00), datetime!(2024-05-02 06:00), 2.0),
            span(datetime!(2024-05-01 12:00), datetime!(2024-05-01 18:00), 5.0),
        ];
        let daily = aggregate(Mode::Sum, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 5.0);
        assert_close(daily.get(date!(2024 - 05 - 02)), 2.0);
    }

    #[test]
    fn zero_length_readings_average_plainly() {
        let at = datetime!(2024-05-01 12:00);
        let readings = [span(at, at, 2.0), span(at, at, 4.0)];
        let daily = aggregate(Mode::Mean, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 3.0);
    }

    #[test]
    fn tied_starts_without_ends_become_zero_length() {
        let at = datetime!(2024-05-01 06:00);
        let readings = [Reading::new(at, Some(1.0)), Reading::new(at, Some(3.0))];
        let daily = aggregate(Mode::Mean, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 3.0);
        assert_eq!(daily.len(), 1);
    }

    #[test]
    fn tied_midnight_starts_stay_on_their_day() {
        let midnight = datetime!(2024-05-01 00:00);
        let readings = [Reading::new(midnight, Some(1.0)), Reading::new(midnight, Some(3.0))];
        let daily = aggregate(Mode::Sum, &readings).unwrap();
        assert_close(daily.get(date!(2024 - 05 - 01)), 4.0);
        assert_eq!(daily.get(date!(2024 - 04 - 30)), None);
    }

    #[test]
    fn parses_modes() {
        assert_eq!("sum".parse::<Mode>(), Ok(Mode::Sum));
        assert_eq!("MEAN".parse::<Mode>(), Ok(Mode::Mean));
        assert_eq!(
            "median".parse::<Mode>(),
            Err(AggregateError::UnsupportedMode(String::from("median")))
        );
        assert_eq!(Mode::Mean.to_string(), "mean");
    }
}
