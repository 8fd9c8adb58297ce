use miette::{miette, IntoDiagnostic, Result, WrapErr};
use wxdays::{config::PACIFIC_STANDARD, ndfd::parse_noaa_time, Reading};

/// Reads `start end value` lines, with `-` for a missing end or value.
/// Blank lines and lines starting with `#` are ignored.
pub fn read_readings(path: &str) -> Result<Vec<Reading>> {
    let input = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not read {path}"))?;

    let mut readings = Vec::new();
    for (number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [start, end, value] = fields[..] else {
            return Err(miette!("line {}: expected `start end value`", number + 1));
        };

        let start = parse_noaa_time(start, PACIFIC_STANDARD)?;
        let end = match end {
            "-" => None,
            end => Some(parse_noaa_time(end, PACIFIC_STANDARD)?),
        };
        let value = match value {
            "-" => None,
            value => Some(
                value
                    .parse()
                    .into_diagnostic()
                    .wrap_err_with(|| format!("line {}: bad value", number + 1))?,
            ),
        };
        readings.push(Reading { start, end, value });
    }
    Ok(readings)
}
