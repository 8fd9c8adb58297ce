mod common;

use miette::{miette, Result};
use wxdays::{aggregate, units::weekday_abbrev, Mode};

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut args = std::env::args().skip(1);
    let file = args.next().ok_or_else(|| miette!("Missing filename"))?;
    let mode: Mode = match args.next() {
        Some(mode) => mode.parse()?,
        None => Mode::Sum,
    };
    log::info!("opening {file}");

    let readings = common::read_readings(&file)?;
    let daily = aggregate(mode, &readings)?;
    log::info!("{} readings folded into {} days", readings.len(), daily.len());

    for (date, value) in daily.iter() {
        println!("{} {date}  {mode} {value:.2}", weekday_abbrev(date.weekday()));
    }
    Ok(())
}
