use std::{collections::BTreeMap, fmt, str::FromStr};

use logos::{Lexer, Logos};
use miette::Diagnostic;
use thiserror::Error;
use time::{Date, Month, PrimitiveDateTime, Time, UtcOffset};

use crate::{
    aggregate::{aggregate, AggregateError, DailyAggregate, Mode, Reading},
    units::weekday_abbrev,
};

/// Hour whose conditions icon represents the whole day.
pub const ICON_HOUR: u8 = 12;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Token {
    #[regex("[0-9]+")]
    Number,
    #[token("-")]
    Dash,
    #[token("+")]
    Plus,
    #[token(":")]
    Colon,
    #[token("T")]
    T,
    #[token("Z")]
    Zulu,
}

#[derive(Debug, Error, Diagnostic)]
pub enum NdfdError {
    #[error("Bad NDFD time string `{text}`: {reason}")]
    #[diagnostic(
        code(wxdays::ndfd::bad_time),
        help("expected something like `2024-05-01T18:00:00-07:00`")
    )]
    BadTimeString { text: String, reason: &'static str },
    #[error("Invalid date or time: {0}")]
    #[diagnostic(code(wxdays::ndfd::invalid_date))]
    InvalidDate(#[from] time::error::ComponentRange),
    #[error("Bad value `{0}`")]
    #[diagnostic(code(wxdays::ndfd::bad_value))]
    BadValue(String),
    #[error("Unknown NDFD parameter: {0}")]
    #[diagnostic(code(wxdays::ndfd::unknown_parameter))]
    UnknownParameter(String),
    #[error("Parameter `{0}` was given twice")]
    #[diagnostic(code(wxdays::ndfd::duplicate_parameter))]
    DuplicateParameter(Parameter),
    #[error("Parameter `{0}` is not numeric")]
    #[diagnostic(code(wxdays::ndfd::not_numeric), help("use `insert_icons` for icon links"))]
    NotNumeric(Parameter),
    #[error("Missing parameter `{0}`")]
    #[diagnostic(code(wxdays::ndfd::missing_parameter))]
    MissingParameter(Parameter),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Aggregate(#[from] AggregateError),
}

struct Cursor<'a> {
    text: &'a str,
    lexer: Lexer<'a, Token>,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            lexer: Token::lexer(text.trim()),
        }
    }

    fn bad(&self, reason: &'static str) -> NdfdError {
        NdfdError::BadTimeString {
            text: self.text.to_string(),
            reason,
        }
    }

    fn number<T: FromStr>(&mut self, what: &'static str) -> Result<T, NdfdError> {
        match self.lexer.next() {
            Some(Ok(Token::Number)) => self.lexer.slice().parse().map_err(|_| self.bad(what)),
            _ => Err(self.bad(what)),
        }
    }

    fn expect(&mut self, token: Token, what: &'static str) -> Result<(), NdfdError> {
        match self.lexer.next() {
            Some(Ok(next)) if next == token => Ok(()),
            _ => Err(self.bad(what)),
        }
    }

    fn finish(&mut self) -> Result<(), NdfdError> {
        match self.lexer.next() {
            None => Ok(()),
            Some(_) => Err(self.bad("trailing characters")),
        }
    }
}

/// Parses an NDFD valid-time such as `2024-05-01T18:00:00-07:00`.
///
/// A numeric offset is dropped and the wall-clock time kept. A `Z` suffix
/// marks a UTC instant, which is moved into `zulu_offset`.
pub fn parse_noaa_time(text: &str, zulu_offset: UtcOffset) -> Result<PrimitiveDateTime, NdfdError> {
    let mut cursor = Cursor::new(text);

    let year: i32 = cursor.number("missing year")?;
    cursor.expect(Token::Dash, "missing dash after year")?;
    let month: u8 = cursor.number("missing month")?;
    cursor.expect(Token::Dash, "missing dash after month")?;
    let day: u8 = cursor.number("missing day")?;
    cursor.expect(Token::T, "missing `T` between date and time")?;
    let hour: u8 = cursor.number("missing hour")?;
    cursor.expect(Token::Colon, "missing colon after hour")?;
    let minute: u8 = cursor.number("missing minute")?;
    cursor.expect(Token::Colon, "missing colon after minute")?;
    let second: u8 = cursor.number("missing second")?;

    let date = Date::from_calendar_date(year, Month::try_from(month)?, day)?;
    let moment = PrimitiveDateTime::new(date, Time::from_hms(hour, minute, second)?);

    match cursor.lexer.next() {
        None => Ok(moment),
        Some(Ok(Token::Dash | Token::Plus)) => {
            let _: u8 = cursor.number("missing offset hours")?;
            cursor.expect(Token::Colon, "missing colon in offset")?;
            let _: u8 = cursor.number("missing offset minutes")?;
            cursor.finish()?;
            Ok(moment)
        }
        Some(Ok(Token::Zulu)) => {
            cursor.finish()?;
            let local = moment.assume_utc().to_offset(zulu_offset);
            Ok(PrimitiveDateTime::new(local.date(), local.time()))
        }
        Some(_) => Err(cursor.bad("unexpected offset")),
    }
}

/// The valid-time intervals shared by one or more NDFD parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeLayout {
    pub key: String,
    pub starts: Vec<PrimitiveDateTime>,
    // empty when the layout only publishes start times
    pub ends: Vec<PrimitiveDateTime>,
}

impl TimeLayout {
    pub fn parse<'a>(
        key: impl Into<String>,
        starts: impl IntoIterator<Item = &'a str>,
        ends: impl IntoIterator<Item = &'a str>,
        zulu_offset: UtcOffset,
    ) -> Result<Self, NdfdError> {
        let starts = starts
            .into_iter()
            .map(|s| parse_noaa_time(s, zulu_offset))
            .collect::<Result<_, _>>()?;
        let ends = ends
            .into_iter()
            .map(|s| parse_noaa_time(s, zulu_offset))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            key: key.into(),
            starts,
            ends,
        })
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn end(&self, index: usize) -> Option<PrimitiveDateTime> {
        self.ends.get(index).copied()
    }
}

/// One NDFD parameter laid out on a [`TimeLayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T> {
    pub layout: TimeLayout,
    pub values: Vec<Option<T>>,
}

impl<T> Series<T> {
    pub fn new(layout: TimeLayout, values: Vec<Option<T>>) -> Self {
        if layout.len() != values.len() {
            log::warn!(
                "time layout {} has {} starts but {} values",
                layout.key,
                layout.len(),
                values.len()
            );
        }
        Self { layout, values }
    }

    fn entries(
        &self,
    ) -> impl Iterator<Item = (PrimitiveDateTime, Option<PrimitiveDateTime>, Option<&T>)> + '_ {
        self.layout
            .starts
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(index, (start, value))| (*start, self.layout.end(index), value.as_ref()))
    }
}

impl Series<f64> {
    /// Builds a numeric series from the text of each value element.
    /// Missing or blank text is an absent value.
    pub fn parse_values<'a>(
        layout: TimeLayout,
        texts: impl IntoIterator<Item = Option<&'a str>>,
    ) -> Result<Self, NdfdError> {
        let values = texts
            .into_iter()
            .map(|text| match text.map(str::trim) {
                None | Some("") => Ok(None),
                Some(text) => text
                    .parse()
                    .map(Some)
                    .map_err(|_| NdfdError::BadValue(text.to_string())),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self::new(layout, values))
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.entries()
            .map(|(start, end, value)| Reading {
                start,
                end,
                value: value.copied(),
            })
            .collect()
    }

    pub fn aggregate(&self, mode: Mode) -> Result<DailyAggregate, AggregateError> {
        aggregate(mode, &self.readings())
    }

    /// Value of the first interval starting and ending on `day`.
    pub fn daytime_value(&self, day: Date) -> Option<f64> {
        self.entries()
            .find(|(start, end, _)| start.date() == day && end.map(|end| end.date()) == Some(day))
            .and_then(|(_, _, value)| value.copied())
    }

    /// Value of the first interval running from `day` into the next day.
    pub fn overnight_value(&self, day: Date) -> Option<f64> {
        let next = day.next_day()?;
        self.entries()
            .find(|(start, end, _)| start.date() == day && end.map(|end| end.date()) == Some(next))
            .and_then(|(_, _, value)| value.copied())
    }
}

impl Series<String> {
    /// Value starting on `day` whose hour is closest to `hour`, earliest on ties.
    pub fn nearest_to(&self, day: Date, hour: u8) -> Option<&str> {
        let mut closest: Option<(u8, Option<&String>)> = None;
        for (start, _, value) in self.entries() {
            if start.date() != day {
                continue;
            }
            let distance = start.hour().abs_diff(hour);
            if closest.map_or(true, |(best, _)| distance < best) {
                closest = Some((distance, value));
            }
        }
        closest.and_then(|(_, value)| value).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Parameter {
    MaximumTemperature,
    MinimumTemperature,
    LiquidPrecipitation,
    SnowAmount,
    WindSpeed,
    CloudCover,
    PrecipitationProbability,
    ConditionsIcons,
}

impl Parameter {
    pub const ALL: [Parameter; 8] = [
        Self::MaximumTemperature,
        Self::MinimumTemperature,
        Self::LiquidPrecipitation,
        Self::SnowAmount,
        Self::WindSpeed,
        Self::CloudCover,
        Self::PrecipitationProbability,
        Self::ConditionsIcons,
    ];

    /// Name of the parameter as it appears in the feed.
    pub fn name(self) -> &'static str {
        match self {
            Self::MaximumTemperature => "Daily Maximum Temperature",
            Self::MinimumTemperature => "Daily Minimum Temperature",
            Self::LiquidPrecipitation => "Liquid Precipitation Amount",
            Self::SnowAmount => "Snow Amount",
            Self::WindSpeed => "Wind Speed",
            Self::CloudCover => "Cloud Cover Amount",
            Self::PrecipitationProbability => "12 Hourly Probability of Precipitation",
            Self::ConditionsIcons => "Conditions Icons",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = NdfdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|parameter| parameter.name() == s.trim())
            .ok_or_else(|| NdfdError::UnknownParameter(s.to_string()))
    }
}

/// One day of an NDFD point forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: Date,
    pub weekday: &'static str,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub icon: Option<String>,
    pub liquid: Option<f64>,
    pub snow: Option<f64>,
    pub wind_speed: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub precipitation_chance: Option<f64>,
}

impl DailySummary {
    /// Rough rain amount: liquid precipitation minus snow, never negative.
    ///
    /// The feed gives snow in feet and liquid in inches, and a foot of snow is
    /// about an inch of water, so the subtraction is only an approximation.
    pub fn rain(&self) -> Option<f64> {
        match (self.liquid, self.snow) {
            (Some(liquid), Some(snow)) => Some((liquid - snow).max(0.0)),
            (liquid, _) => liquid,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NdfdForecast {
    series: BTreeMap<Parameter, Series<f64>>,
    icons: Option<Series<String>>,
}

impl NdfdForecast {
    pub fn insert(&mut self, parameter: Parameter, series: Series<f64>) -> Result<(), NdfdError> {
        if parameter == Parameter::ConditionsIcons {
            return Err(NdfdError::NotNumeric(parameter));
        }
        if self.series.contains_key(&parameter) {
            return Err(NdfdError::DuplicateParameter(parameter));
        }
        self.series.insert(parameter, series);
        Ok(())
    }

    pub fn insert_icons(&mut self, icons: Series<String>) -> Result<(), NdfdError> {
        if self.icons.is_some() {
            return Err(NdfdError::DuplicateParameter(Parameter::ConditionsIcons));
        }
        self.icons = Some(icons);
        Ok(())
    }

    pub fn series(&self, parameter: Parameter) -> Option<&Series<f64>> {
        self.series.get(&parameter)
    }

    fn required(&self, parameter: Parameter) -> Result<&Series<f64>, NdfdError> {
        self.series(parameter)
            .ok_or(NdfdError::MissingParameter(parameter))
    }

    /// Summarises `num_days` consecutive days starting at `first_day`.
    pub fn daily(&self, first_day: Date, num_days: usize) -> Result<Vec<DailySummary>, NdfdError> {
        let highs = self.required(Parameter::MaximumTemperature)?;
        let lows = self.required(Parameter::MinimumTemperature)?;
        let liquid = self.required(Parameter::LiquidPrecipitation)?.aggregate(Mode::Sum)?;
        let snow = self.required(Parameter::SnowAmount)?.aggregate(Mode::Sum)?;
        let wind = self.required(Parameter::WindSpeed)?.aggregate(Mode::Mean)?;
        let cloud = self.required(Parameter::CloudCover)?.aggregate(Mode::Mean)?;
        let chance = self
            .required(Parameter::PrecipitationProbability)?
            .aggregate(Mode::Mean)?;

        let mut summaries = Vec::with_capacity(num_days);
        let mut day = Some(first_day);
        while let Some(date) = day.filter(|_| summaries.len() < num_days) {
            let icon = self
                .icons
                .as_ref()
                .and_then(|icons| icons.nearest_to(date, ICON_HOUR))
                .map(str::to_string);
            summaries.push(DailySummary {
                date,
                weekday: weekday_abbrev(date.weekday()),
                high: highs.daytime_value(date),
                low: lows.overnight_value(date),
                icon,
                liquid: liquid.get(date),
                snow: snow.get(date),
                wind_speed: wind.get(date),
                cloud_cover: cloud.get(date),
                precipitation_chance: chance.get(date),
            });
            day = date.next_day();
        }
        Ok(summaries)
    }
}
