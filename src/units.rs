use std::{f64::consts::TAU, fmt, str::FromStr};

use miette::Diagnostic;
use thiserror::Error;
use time::Weekday;

pub const FREEZING_POINT_F: f64 = 32.0;

const KPH_TO_MPH: f64 = 0.62137119;
const CM_TO_IN: f64 = 0.39370079;
const MM_TO_IN: f64 = 0.039370079;
const M_TO_IN: f64 = 39.370079;

pub fn kph_to_mph(speed: f64) -> f64 {
    KPH_TO_MPH * speed
}

pub fn mph_to_kph(speed: f64) -> f64 {
    speed / KPH_TO_MPH
}

pub fn celsius_to_fahrenheit(temp: f64) -> f64 {
    1.8 * temp + FREEZING_POINT_F
}

pub fn fahrenheit_to_celsius(temp: f64) -> f64 {
    (temp - FREEZING_POINT_F) / 1.8
}

pub fn cm_to_in(distance: f64) -> f64 {
    CM_TO_IN * distance
}

pub fn cm_to_feet(distance: f64) -> f64 {
    CM_TO_IN * distance / 12.0
}

pub fn mm_to_in(distance: f64) -> f64 {
    MM_TO_IN * distance
}

pub fn meters_to_feet(distance: f64) -> f64 {
    M_TO_IN * distance / 12.0
}

#[derive(Debug, Error, Diagnostic, PartialEq)]
pub enum UnitError {
    #[error("Unknown wind direction: {0}")]
    #[diagnostic(code(wxdays::units::direction))]
    UnknownDirection(String),
    #[error("Unknown temperature unit {0}. Expecting `C` or `F`")]
    #[diagnostic(code(wxdays::units::temperature))]
    UnknownTemperatureUnit(String),
    #[error("Unknown depth unit {0}. Expecting `mm` or `cm`")]
    #[diagnostic(code(wxdays::units::depth))]
    UnknownDepthUnit(String),
    #[error("Unknown wind speed unit {0}. Expecting `km/h` or `mph`")]
    #[diagnostic(code(wxdays::units::wind_speed))]
    UnknownWindSpeedUnit(String),
    #[error("Unknown unit system {0}")]
    #[diagnostic(code(wxdays::units::system), help("use `metric` or `imperial`"))]
    UnknownSystem(String),
    #[error("Unknown weekday {0}")]
    #[diagnostic(code(wxdays::units::weekday))]
    UnknownWeekday(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

/// Counter-clockwise from east, one step every 2π/16.
pub const WIND_DIRECTIONS: [Direction; 16] = [
    Direction::E,
    Direction::ENE,
    Direction::NE,
    Direction::NNE,
    Direction::N,
    Direction::NNW,
    Direction::NW,
    Direction::WNW,
    Direction::W,
    Direction::WSW,
    Direction::SW,
    Direction::SSW,
    Direction::S,
    Direction::SSE,
    Direction::SE,
    Direction::ESE,
];

const DIRECTION_STEP: f64 = TAU / WIND_DIRECTIONS.len() as f64;

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NNE => "NNE",
            Self::NE => "NE",
            Self::ENE => "ENE",
            Self::E => "E",
            Self::ESE => "ESE",
            Self::SE => "SE",
            Self::SSE => "SSE",
            Self::S => "S",
            Self::SSW => "SSW",
            Self::SW => "SW",
            Self::WSW => "WSW",
            Self::W => "W",
            Self::WNW => "WNW",
            Self::NW => "NW",
            Self::NNW => "NNW",
        }
    }

    // position in WIND_DIRECTIONS
    fn step(self) -> usize {
        match self {
            Self::E => 0,
            Self::ENE => 1,
            Self::NE => 2,
            Self::NNE => 3,
            Self::N => 4,
            Self::NNW => 5,
            Self::NW => 6,
            Self::WNW => 7,
            Self::W => 8,
            Self::WSW => 9,
            Self::SW => 10,
            Self::SSW => 11,
            Self::S => 12,
            Self::SSE => 13,
            Self::SE => 14,
            Self::ESE => 15,
        }
    }

    /// Angle in radians, counter-clockwise from east.
    pub fn angle(self) -> f64 {
        self.step() as f64 * DIRECTION_STEP
    }

    /// Nearest compass point to `angle` (radians, counter-clockwise from east).
    pub fn from_angle(angle: f64) -> Self {
        let step = (angle.rem_euclid(TAU) / DIRECTION_STEP).round() as usize;
        WIND_DIRECTIONS[step % WIND_DIRECTIONS.len()]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WIND_DIRECTIONS
            .into_iter()
            .find(|direction| direction.as_str() == s)
            .ok_or_else(|| UnitError::UnknownDirection(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl FromStr for TemperatureUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" | "ºC" | "°C" => Ok(Self::Celsius),
            "F" | "ºF" | "°F" => Ok(Self::Fahrenheit),
            s => Err(UnitError::UnknownTemperatureUnit(s.to_string())),
        }
    }
}

/// Depth of rain or snow as published by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthUnit {
    Mm,
    Cm,
}

impl FromStr for DepthUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mm" => Ok(Self::Mm),
            "cm" => Ok(Self::Cm),
            s => Err(UnitError::UnknownDepthUnit(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindSpeedUnit {
    KmHr,
    Mph,
}

impl FromStr for WindSpeedUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "km/h" | "km/hr" => Ok(Self::KmHr),
            "mph" => Ok(Self::Mph),
            s => Err(UnitError::UnknownWindSpeedUnit(s.to_string())),
        }
    }
}

/// Units a source publishes each variable in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceUnits {
    pub temperature: TemperatureUnit,
    pub rain: DepthUnit,
    pub snow: DepthUnit,
    pub wind_speed: WindSpeedUnit,
}

impl SourceUnits {
    pub const MOUNTAIN_FORECAST: Self = Self {
        temperature: TemperatureUnit::Celsius,
        rain: DepthUnit::Mm,
        snow: DepthUnit::Cm,
        wind_speed: WindSpeedUnit::KmHr,
    };
}

/// Output unit system.
///
/// Imperial reports °F, inches of rain, feet of snow and mph. Metric reports
/// °C, millimetres of rain, centimetres of snow and km/h.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnitSystem {
    Metric,
    #[default]
    Imperial,
}

impl UnitSystem {
    pub fn temperature(self, value: f64, unit: TemperatureUnit) -> f64 {
        match (self, unit) {
            (Self::Imperial, TemperatureUnit::Celsius) => celsius_to_fahrenheit(value),
            (Self::Metric, TemperatureUnit::Fahrenheit) => fahrenheit_to_celsius(value),
            _ => value,
        }
    }

    pub fn rain(self, value: f64, unit: DepthUnit) -> f64 {
        let mm = match unit {
            DepthUnit::Mm => value,
            DepthUnit::Cm => value * 10.0,
        };
        match self {
            Self::Imperial => mm_to_in(mm),
            Self::Metric => mm,
        }
    }

    pub fn snow(self, value: f64, unit: DepthUnit) -> f64 {
        let cm = match unit {
            DepthUnit::Mm => value / 10.0,
            DepthUnit::Cm => value,
        };
        match self {
            Self::Imperial => cm_to_feet(cm),
            Self::Metric => cm,
        }
    }

    pub fn wind_speed(self, value: f64, unit: WindSpeedUnit) -> f64 {
        match (self, unit) {
            (Self::Imperial, WindSpeedUnit::KmHr) => kph_to_mph(value),
            (Self::Metric, WindSpeedUnit::Mph) => mph_to_kph(value),
            _ => value,
        }
    }
}

impl FromStr for UnitSystem {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            s => Err(UnitError::UnknownSystem(s.to_string())),
        }
    }
}

pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn weekday_abbrev(weekday: Weekday) -> &'static str {
    WEEKDAYS[weekday.number_days_from_monday() as usize]
}

/// Parses a weekday from its first three letters, so `Tuesday` and `Tue` both work.
pub fn parse_weekday(s: &str) -> Result<Weekday, UnitError> {
    let prefix = s.trim().get(..3).unwrap_or_default();
    WEEKDAYS
        .iter()
        .position(|abbrev| abbrev.eq_ignore_ascii_case(prefix))
        .map(|index| Weekday::Monday.nth_next(index as u8))
        .ok_or_else(|| UnitError::UnknownWeekday(s.to_string()))
}
