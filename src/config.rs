use time::{macros::offset, Date, UtcOffset};

use crate::{
    history::History,
    ndfd::{DailySummary, NdfdError, NdfdForecast},
    units::UnitSystem,
};

/// Offset UTC (`Z`) time strings are moved into.
pub const PACIFIC_STANDARD: UtcOffset = offset!(-8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastOptions {
    /// Days of forecast to keep, today included.
    pub num_days: usize,
    /// Days before today worth plotting.
    pub max_history: usize,
    pub units: UnitSystem,
    pub zulu_offset: UtcOffset,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            num_days: 6,
            max_history: 6,
            units: UnitSystem::Imperial,
            zulu_offset: PACIFIC_STANDARD,
        }
    }
}

impl ForecastOptions {
    pub fn history(&self, today: Date) -> History {
        History::new(today, self.max_history)
    }

    pub fn summarize(
        &self,
        forecast: &NdfdForecast,
        first_day: Date,
    ) -> Result<Vec<DailySummary>, NdfdError> {
        forecast.daily(first_day, self.num_days)
    }
}
