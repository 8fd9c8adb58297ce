pub mod aggregate;
pub mod config;
pub mod history;
pub mod ndfd;
pub mod periods;
pub mod units;

use miette::Diagnostic;
use thiserror::Error;

pub use aggregate::{aggregate, AggregateError, DailyAggregate, Mode, Reading};
pub use config::ForecastOptions;
pub use history::{History, HistoryError, Merged};
pub use ndfd::{DailySummary, NdfdError, NdfdForecast, Parameter, Series, TimeLayout};
pub use periods::{DailyForecast, PeriodError, PeriodForecast, TimeOfDay};
pub use units::{Direction, UnitError, UnitSystem};

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ndfd(#[from] NdfdError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Period(#[from] PeriodError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Unit(#[from] UnitError),
}
