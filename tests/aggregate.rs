use proptest::prelude::*;
use time::{
    macros::{date, datetime},
    Duration, PrimitiveDateTime,
};
use wxdays::{aggregate, Mode, Reading};

fn span(start: PrimitiveDateTime, end: PrimitiveDateTime, value: f64) -> Reading {
    Reading::new(start, Some(value)).with_end(end)
}

#[test]
fn scenario_with_midnight_crossing() {
    let readings = [
        span(datetime!(2024-03-01 00:00), datetime!(2024-03-01 06:00), 1.0),
        span(datetime!(2024-03-01 06:00), datetime!(2024-03-01 12:00), 2.0),
        span(datetime!(2024-03-01 20:00), datetime!(2024-03-02 02:00), 4.0),
    ];
    let daily = aggregate(Mode::Sum, &readings).unwrap();

    let day1 = daily.get(date!(2024 - 03 - 01)).unwrap();
    let day2 = daily.get(date!(2024 - 03 - 02)).unwrap();
    assert!((day1 - 5.667).abs() < 1e-3, "{day1}");
    assert!((day2 - 1.333).abs() < 1e-3, "{day2}");
    assert_eq!(daily.dates().collect::<Vec<_>>(), vec![date!(2024 - 03 - 01), date!(2024 - 03 - 02)]);
}

#[test]
fn midnight_split_mean_weighs_each_side_by_its_hours() {
    let readings = [
        span(datetime!(2024-03-01 18:00), datetime!(2024-03-01 22:00), 2.0),
        span(datetime!(2024-03-01 22:00), datetime!(2024-03-02 02:00), 8.0),
    ];
    let daily = aggregate(Mode::Mean, &readings).unwrap();
    // 2 over 4h and 8 over 2h
    assert!((daily.get(date!(2024 - 03 - 01)).unwrap() - 4.0).abs() < 1e-9);
    assert!((daily.get(date!(2024 - 03 - 02)).unwrap() - 8.0).abs() < 1e-9);
}

#[test]
fn only_absent_values_give_an_empty_aggregate() {
    let readings = [
        Reading::absent(datetime!(2024-03-01 00:00)),
        Reading::absent(datetime!(2024-03-01 12:00)),
    ];
    for mode in [Mode::Sum, Mode::Mean] {
        assert!(aggregate(mode, &readings).unwrap().is_empty());
    }
}

/// Contiguous readings from a fixed origin, each 1 to 12 hours long.
fn contiguous_readings() -> impl Strategy<Value = Vec<Reading>> {
    prop::collection::vec((1i64..=12, prop::option::weighted(0.8, 0.0f64..50.0)), 0..40).prop_map(
        |ticks| {
            let mut start = datetime!(2024-02-27 03:00);
            ticks
                .into_iter()
                .map(|(hours, value)| {
                    let end = start + Duration::hours(hours);
                    let reading = Reading {
                        start,
                        end: Some(end),
                        value,
                    };
                    start = end;
                    reading
                })
                .collect()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn aggregation_is_idempotent(readings in contiguous_readings()) {
        for mode in [Mode::Sum, Mode::Mean] {
            prop_assert_eq!(aggregate(mode, &readings), aggregate(mode, &readings));
        }
    }

    #[test]
    fn sum_is_conserved_over_contiguous_input(readings in contiguous_readings()) {
        let expected: f64 = readings.iter().filter_map(|reading| reading.value).sum();
        let daily = aggregate(Mode::Sum, &readings).unwrap();
        let total: f64 = daily.iter().map(|(_, value)| value).sum();
        prop_assert!((total - expected).abs() < 1e-6, "{} != {}", total, expected);
    }

    #[test]
    fn mean_stays_within_input_range(readings in contiguous_readings()) {
        let values: Vec<f64> = readings.iter().filter_map(|reading| reading.value).collect();
        let daily = aggregate(Mode::Mean, &readings).unwrap();
        prop_assert_eq!(daily.is_empty(), values.is_empty());

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for (_, mean) in daily.iter() {
            prop_assert!(mean >= min - 1e-9 && mean <= max + 1e-9);
        }
    }
}
