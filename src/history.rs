use std::collections::BTreeSet;

use miette::Diagnostic;
use thiserror::Error;
use time::{Date, Duration};

use crate::periods::{combine_all, DailyForecast, PeriodError, PeriodForecast, TimeOfDay};

#[derive(Debug, Error, Diagnostic, PartialEq)]
pub enum HistoryError {
    #[error("Got duplicate history for {date} {time_of_day}")]
    #[diagnostic(code(wxdays::history::duplicate))]
    DuplicateRecord { date: Date, time_of_day: TimeOfDay },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Period(#[from] PeriodError),
}

/// Previously recorded period forecasts for one location, relative to today.
#[derive(Debug, Clone)]
pub struct History {
    today: Date,
    // the `max_history` days before today, oldest first
    window: Vec<Date>,
    old: Vec<PeriodForecast>,
    recent: Vec<PeriodForecast>,
    todays: Vec<PeriodForecast>,
    seen: BTreeSet<(Date, TimeOfDay)>,
}

fn empty_day(date: Date) -> impl Iterator<Item = PeriodForecast> {
    TimeOfDay::ALL
        .into_iter()
        .map(move |time_of_day| PeriodForecast::empty(date, time_of_day))
}

impl History {
    pub fn new(today: Date, max_history: usize) -> Self {
        let window: Vec<Date> = (1..=max_history as i64)
            .rev()
            .filter_map(|days| today.checked_sub(Duration::days(days)))
            .collect();
        let recent = window.iter().flat_map(|date| empty_day(*date)).collect();
        Self {
            today,
            window,
            old: Vec::new(),
            recent,
            todays: empty_day(today).collect(),
            seen: BTreeSet::new(),
        }
    }

    pub fn today(&self) -> Date {
        self.today
    }

    /// Files a recorded period into today's slots, the recent window or the
    /// old history that is only kept to be written back.
    pub fn record(&mut self, period: PeriodForecast) -> Result<(), HistoryError> {
        if !self.seen.insert(period.key()) {
            return Err(HistoryError::DuplicateRecord {
                date: period.date,
                time_of_day: period.time_of_day,
            });
        }

        let slot = period.time_of_day.index();
        if period.date == self.today {
            self.todays[slot] = period;
        } else if let Some(day) = self.window.iter().position(|date| *date == period.date) {
            self.recent[day * TimeOfDay::ALL.len() + slot] = period;
        } else {
            self.old.push(period);
        }
        Ok(())
    }

    /// Merges freshly scraped period forecasts with what was recorded.
    ///
    /// Each of today's periods is taken from `forecasts` when it is there and
    /// from the recorded history otherwise. The remaining forecasts are padded
    /// so that every one of the `num_days - 1` days after today is complete.
    pub fn merge(self, mut forecasts: Vec<PeriodForecast>, num_days: usize) -> Merged {
        let stale = forecasts
            .iter()
            .take_while(|period| period.date < self.today)
            .count();
        if stale > 0 {
            log::debug!("dropping {stale} forecast periods from before {}", self.today);
            forecasts.drain(..stale);
        }

        let mut todays = Vec::with_capacity(TimeOfDay::ALL.len());
        for (time_of_day, recorded) in TimeOfDay::ALL.into_iter().zip(self.todays) {
            let fresh = forecasts
                .iter()
                .position(|period| period.key() == (self.today, time_of_day))
                .map(|index| forecasts.remove(index));
            let period = match fresh {
                Some(period) if !period.is_missing() => period,
                _ => {
                    if recorded.is_missing() {
                        log::debug!("no {time_of_day} forecast for today, in forecasts or history");
                    } else {
                        log::debug!("using recorded {time_of_day} forecast for today");
                    }
                    recorded
                }
            };
            todays.push(period);
        }

        let expected = (1..num_days as i64).filter_map(|days| self.today.checked_add(Duration::days(days)));
        for date in expected {
            for time_of_day in TimeOfDay::ALL {
                if !forecasts.iter().any(|period| period.key() == (date, time_of_day)) {
                    log::debug!("missing {time_of_day} for {date}, adding a placeholder");
                    forecasts.push(PeriodForecast::empty(date, time_of_day));
                }
            }
        }
        sort_chronologically(&mut forecasts);

        Merged {
            today: self.today,
            old: self.old,
            recent: self.recent,
            todays,
            upcoming: forecasts,
        }
    }
}

/// Result of [`History::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub today: Date,
    pub old: Vec<PeriodForecast>,
    pub recent: Vec<PeriodForecast>,
    pub todays: Vec<PeriodForecast>,
    pub upcoming: Vec<PeriodForecast>,
}

impl Merged {
    /// Records to write back: old history, recent history, then today's
    /// periods. Missing periods are skipped.
    pub fn to_persist(&self) -> Vec<&PeriodForecast> {
        self.old
            .iter()
            .chain(&self.recent)
            .chain(&self.todays)
            .filter(|period| !period.is_missing())
            .collect()
    }

    pub fn daily_history(&self) -> Result<Vec<DailyForecast>, HistoryError> {
        Ok(combine_all(&self.recent)?)
    }

    pub fn daily_upcoming(&self) -> Result<Vec<DailyForecast>, HistoryError> {
        Ok(combine_all(&self.upcoming)?)
    }
}

/// Stable sort by date then time of day.
pub fn sort_chronologically(records: &mut [PeriodForecast]) {
    records.sort_by_key(PeriodForecast::key);
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn reported(date: Date, time_of_day: TimeOfDay, high: f64) -> PeriodForecast {
        PeriodForecast {
            high: Some(high),
            low: Some(high - 10.0),
            rain: Some(0.0),
            snow: Some(0.0),
            wind_speed: Some(5.0),
            ..PeriodForecast::empty(date, time_of_day)
        }
    }

    const TODAY: Date = date!(2024 - 05 - 10);

    #[test]
    fn files_records_by_age() {
        let mut history = History::new(TODAY, 2);
        history.record(reported(date!(2024 - 05 - 08), TimeOfDay::Pm, 50.0)).unwrap();
        history.record(reported(date!(2024 - 05 - 01), TimeOfDay::Am, 40.0)).unwrap();
        history.record(reported(TODAY, TimeOfDay::Night, 45.0)).unwrap();

        let merged = history.merge(Vec::new(), 1);
        assert_eq!(merged.recent.len(), 6);
        assert_eq!(merged.recent[1].high, Some(50.0));
        assert_eq!(merged.old.len(), 1);
        assert_eq!(merged.todays[2].high, Some(45.0));
        assert!(merged.upcoming.is_empty());
    }

    #[test]
    fn rejects_duplicate_records() {
        let mut history = History::new(TODAY, 6);
        history.record(reported(date!(2024 - 05 - 09), TimeOfDay::Am, 50.0)).unwrap();
        assert_eq!(
            history.record(reported(date!(2024 - 05 - 09), TimeOfDay::Am, 51.0)),
            Err(HistoryError::DuplicateRecord {
                date: date!(2024 - 05 - 09),
                time_of_day: TimeOfDay::Am,
            })
        );
    }

    #[test]
    fn today_prefers_fresh_forecast_then_history() {
        let mut history = History::new(TODAY, 1);
        history.record(reported(TODAY, TimeOfDay::Am, 40.0)).unwrap();
        history.record(reported(TODAY, TimeOfDay::Pm, 41.0)).unwrap();

        let forecasts = vec![
            reported(date!(2024 - 05 - 09), TimeOfDay::Night, 30.0),
            reported(TODAY, TimeOfDay::Pm, 55.0),
            reported(TODAY, TimeOfDay::Night, 35.0),
            reported(date!(2024 - 05 - 11), TimeOfDay::Am, 42.0),
            reported(date!(2024 - 05 - 11), TimeOfDay::Pm, 52.0),
            reported(date!(2024 - 05 - 11), TimeOfDay::Night, 32.0),
        ];
        let merged = history.merge(forecasts, 2);

        let highs: Vec<_> = merged.todays.iter().map(|period| period.high).collect();
        assert_eq!(highs, vec![Some(40.0), Some(55.0), Some(35.0)]);
        assert_eq!(merged.upcoming.len(), 3);
        assert!(merged.upcoming.iter().all(|period| period.date == date!(2024 - 05 - 11)));
    }

    #[test]
    fn pads_missing_upcoming_periods() {
        let history = History::new(TODAY, 0);
        let forecasts = vec![
            reported(TODAY, TimeOfDay::Night, 35.0),
            reported(date!(2024 - 05 - 11), TimeOfDay::Am, 42.0),
            reported(date!(2024 - 05 - 12), TimeOfDay::Pm, 52.0),
        ];
        let merged = history.merge(forecasts, 3);

        assert_eq!(merged.upcoming.len(), 6);
        let keys: Vec<_> = merged.upcoming.iter().map(PeriodForecast::key).collect();
        assert_eq!(keys[0], (date!(2024 - 05 - 11), TimeOfDay::Am));
        assert_eq!(keys[4], (date!(2024 - 05 - 12), TimeOfDay::Pm));
        assert_eq!(keys[5], (date!(2024 - 05 - 12), TimeOfDay::Night));
        assert!(merged.upcoming[5].is_missing());

        let days = merged.daily_upcoming().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].high, None);
    }

    #[test]
    fn persists_only_reported_periods_in_order() {
        let mut history = History::new(TODAY, 1);
        history.record(reported(date!(2024 - 04 - 01), TimeOfDay::Am, 20.0)).unwrap();
        history.record(reported(date!(2024 - 05 - 09), TimeOfDay::Night, 30.0)).unwrap();
        let merged = history.merge(vec![reported(TODAY, TimeOfDay::Am, 40.0)], 1);

        let highs: Vec<_> = merged.to_persist().iter().map(|period| period.high).collect();
        assert_eq!(highs, vec![Some(20.0), Some(30.0), Some(40.0)]);
        assert_eq!(merged.daily_history().unwrap().len(), 1);
    }

    #[test]
    fn sorts_records_by_date_then_period() {
        let mut records = vec![
            reported(date!(2024 - 05 - 02), TimeOfDay::Am, 1.0),
            reported(date!(2024 - 05 - 01), TimeOfDay::Night, 2.0),
            reported(date!(2024 - 05 - 01), TimeOfDay::Am, 3.0),
        ];
        sort_chronologically(&mut records);
        let highs: Vec<_> = records.iter().map(|period| period.high).collect();
        assert_eq!(highs, vec![Some(3.0), Some(2.0), Some(1.0)]);
    }
}
