// tests/time_properties.rs

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use windag::time::PARSE_PRECEDENCE;
use windag::{Granularity, TimeRange};

use Granularity::*;

/// (task, master) pairs small enough to enumerate quickly.
const PAIRS: [(Granularity, Granularity); 15] = [
    (Second, Second),
    (Second, Minute),
    (Second, Hour),
    (Minute, Minute),
    (Minute, Hour),
    (Minute, Day),
    (Hour, Hour),
    (Hour, Day),
    (Hour, Week),
    (Hour, Month),
    (Day, Day),
    (Day, Week),
    (Day, Month),
    (Week, Week),
    (Month, Month),
];

fn instant_strategy() -> impl Strategy<Value = NaiveDateTime> {
    (2000i32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, mo, d, h, mi, s)| {
            NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap()
        },
    )
}

/// Unit range of `granularity` containing `instant`.
fn aligned(granularity: Granularity, instant: NaiveDateTime) -> TimeRange {
    TimeRange::parse(&granularity.format(instant)).unwrap()
}

proptest! {
    #[test]
    fn ranges_tile_the_master(
        (task, master_granularity) in proptest::sample::select(PAIRS.to_vec()),
        instant in instant_strategy(),
        intervals in 1u32..=3,
    ) {
        let start = aligned(master_granularity, instant).from();
        let master = TimeRange::new(start, master_granularity, intervals);
        let ranges = task.ranges(&master);

        prop_assert!(!ranges.is_empty());
        prop_assert_eq!(ranges.first().unwrap().from(), master.from());
        prop_assert_eq!(ranges.last().unwrap().to(), master.to());
        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[0].to(), pair[1].from());
        }
        for range in &ranges {
            prop_assert_eq!(range.granularity(), task);
            prop_assert_eq!(range.intervals(), 1);
            prop_assert!(range.from() < range.to());
        }
    }

    #[test]
    fn coarser_task_never_fits(
        (finer, coarser) in proptest::sample::select(PAIRS.to_vec()),
        instant in instant_strategy(),
    ) {
        prop_assume!(finer != coarser);
        let master = aligned(finer, instant);
        prop_assert!(coarser.ranges(&master).is_empty());
    }

    #[test]
    fn single_token_round_trips(
        granularity in proptest::sample::select(Granularity::ALL.to_vec()),
        instant in instant_strategy(),
    ) {
        let range = aligned(granularity, instant);
        prop_assert_eq!(range.granularity(), granularity);
        prop_assert!(range.from() <= instant && instant < range.to());

        let reparsed = TimeRange::parse(&range.to_string()).unwrap();
        prop_assert_eq!(reparsed, range);
    }

    #[test]
    fn interval_token_round_trips(
        granularity in proptest::sample::select(Granularity::ALL.to_vec()),
        instant in instant_strategy(),
        intervals in 2u32..=20,
    ) {
        let start = aligned(granularity, instant).from();
        let range = TimeRange::new(start, granularity, intervals);
        let token = range.to_string();
        prop_assert!(token.contains('/'));

        let reparsed = TimeRange::parse(&token).unwrap();
        prop_assert_eq!(reparsed, range);
        prop_assert_eq!(reparsed.next().prev(), range);
    }
}

#[test]
fn precedence_is_explicit() {
    assert_eq!(PARSE_PRECEDENCE, [Second, Minute, Hour, Day, Month, Week]);

    let cases = [
        ("2015-10-11T11:12:13", Second),
        ("2015-10-11T11:12", Minute),
        ("2015-10-11T11", Hour),
        ("2015-10-11", Day),
        ("2015-10", Month),
        ("2015-W10", Week),
        ("2015-w1", Week),
    ];
    for (token, expected) in cases {
        assert_eq!(TimeRange::parse(token).unwrap().granularity(), expected, "{token}");
    }
}

#[test]
fn garbage_tokens_are_rejected() {
    for token in ["", "2015", "tomorrow", "2015-10-11T", "2015-13", "2015-W54", "2015-02-30"] {
        assert!(TimeRange::parse(token).is_err(), "{token:?} parsed");
    }
}
