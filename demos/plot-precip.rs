mod common;

use miette::{miette, Report, Result};
use plotters::prelude::*;
use wxdays::{aggregate, Mode};

fn to_chrono(date: time::Date) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::from_ymd_opt(date.year(), date.month() as u32, date.day() as u32)
        .ok_or_else(|| miette!("chrono can't represent {date}"))
}

fn plot_error(e: impl std::fmt::Display) -> Report {
    miette!("Could not draw the chart: {e}")
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let input = std::env::args().nth(1).ok_or_else(|| miette!("Missing filename"))?;
    let output = format!("{input}.png");
    let readings = common::read_readings(&input)?;
    let daily = aggregate(Mode::Sum, &readings)?;

    let (Some(first_date), Some(last_date)) = (daily.dates().next(), daily.dates().last()) else {
        return Err(miette!("{input} has no precipitation to plot"));
    };
    let last_date = last_date.next_day().unwrap_or(last_date);
    let max = daily.iter().map(|(_, value)| value).fold(0.0, f64::max);

    let points = daily
        .iter()
        .map(|(date, value)| Ok((to_chrono(date)?, value)))
        .collect::<Result<Vec<_>>>()?;

    let root = BitMapBackend::new(&output, (1920, 1080)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Precipitation from {first_date} to {last_date}"),
            ("sans-serif", 100).into_font(),
        )
        .margin(5)
        .x_label_area_size(80)
        .y_label_area_size(80)
        .build_cartesian_2d(to_chrono(first_date)?..to_chrono(last_date)?, 0.0..max * 1.1)
        .map_err(plot_error)?;

    chart.configure_mesh().draw().map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(points, BLUE))
        .map_err(plot_error)?
        .label("Daily total")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    log::info!("wrote {output}");
    Ok(())
}
