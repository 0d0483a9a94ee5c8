//! Coverage properties of the interval untangler and the overlap
//! month roll-up, verified day by day against brute force.

use chrono::{Duration, NaiveDate};
use panel_core::{
    episode::{Episode, EpisodeAttributes},
    overlap::overlap_months,
    types::MonthKey,
    untangle::{untangle, WeightedInterval},
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::collections::BTreeMap;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 11, 1).unwrap()
}

fn random_intervals(rng: &mut Pcg64Mcg) -> Vec<WeightedInterval> {
    let n: usize = rng.gen_range(1..10);
    (0..n)
        .map(|_| {
            let start = base() + Duration::days(rng.gen_range(0..400));
            let end = start + Duration::days(rng.gen_range(0..120));
            // Quarter steps keep sums exact enough to compare tightly.
            let daily = f64::from(rng.gen_range(0..40u32)) * 0.25;
            WeightedInterval::new(start, end, daily).unwrap()
        })
        .collect()
}

#[test]
fn partition_matches_brute_force_coverage() {
    let mut rng = Pcg64Mcg::seed_from_u64(0xC0FFEE);
    for round in 0..300 {
        let input = random_intervals(&mut rng);
        let output = untangle(&input).unwrap();

        // Disjoint and ordered.
        assert!(
            output.windows(2).all(|w| w[0].end < w[1].start),
            "round {round}: overlapping output {output:?}"
        );

        for offset in 0..560 {
            let day = base() + Duration::days(offset);
            let covering: Vec<&WeightedInterval> =
                input.iter().filter(|iv| iv.covers(day)).collect();
            let expected: f64 = covering.iter().map(|iv| iv.daily).sum();
            let hits: Vec<&WeightedInterval> =
                output.iter().filter(|seg| seg.covers(day)).collect();

            if covering.is_empty() {
                assert!(hits.is_empty(), "round {round}: {day} covered by output only");
            } else {
                assert_eq!(hits.len(), 1, "round {round}: {day} covered {} times", hits.len());
                assert!(
                    (hits[0].daily - expected).abs() < 1e-9,
                    "round {round}: {day} magnitude {} vs {expected}",
                    hits[0].daily
                );
            }
        }
    }
}

#[test]
fn three_way_overlap_sums_every_layer() {
    let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
    let out = untangle(&[
        WeightedInterval::new(d(1, 1), d(1, 31), 1.0).unwrap(),
        WeightedInterval::new(d(1, 10), d(1, 20), 2.0).unwrap(),
        WeightedInterval::new(d(1, 15), d(2, 5), 4.0).unwrap(),
    ])
    .unwrap();
    let weights: Vec<(NaiveDate, NaiveDate, f64)> =
        out.iter().map(|s| (s.start, s.end, s.daily)).collect();
    assert_eq!(
        weights,
        vec![
            (d(1, 1), d(1, 9), 1.0),
            (d(1, 10), d(1, 14), 3.0),
            (d(1, 15), d(1, 20), 7.0),
            (d(1, 21), d(1, 31), 5.0),
            (d(2, 1), d(2, 5), 4.0),
        ]
    );
}

fn overlap_episode(start: NaiveDate, end: NaiveDate, points: f64) -> Episode {
    Episode {
        subject_id:     "s".into(),
        start_date:     start,
        end_date:       end,
        attributes:     EpisodeAttributes { activity_type: 6, ..Default::default() },
        register_value: 0.0,
        point_value:    points,
    }
}

#[test]
fn month_rollup_counts_union_days_and_summed_points() {
    let mut rng = Pcg64Mcg::seed_from_u64(0xBADA55);
    for _ in 0..100 {
        let episodes: Vec<Episode> = random_intervals(&mut rng)
            .into_iter()
            .map(|iv| overlap_episode(iv.start, iv.end, rng.gen_range(0.0..5.0)))
            .collect();
        let refs: Vec<&Episode> = episodes.iter().collect();
        let months = overlap_months(&refs, true).unwrap();

        let mut expected: BTreeMap<MonthKey, (u32, f64)> = BTreeMap::new();
        for offset in 0..560 {
            let day = base() + Duration::days(offset);
            let covering: Vec<&Episode> = episodes
                .iter()
                .filter(|e| e.start_date <= day && day <= e.end_date)
                .collect();
            if covering.is_empty() {
                continue;
            }
            let entry = expected.entry(MonthKey::of(day)).or_default();
            entry.0 += 1;
            entry.1 += covering.iter().map(|e| e.daily_points().unwrap()).sum::<f64>();
        }

        assert_eq!(months.len(), expected.len());
        for (key, (days, points)) in expected {
            let got = months[&key];
            assert_eq!(got.days, days, "days in {key}");
            assert!((got.points - points).abs() < 1e-9, "points in {key}");
        }
    }
}

#[test]
fn days_only_rollup_ignores_points() {
    let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
    let a = overlap_episode(d(1, 1), d(3, 31), 9.0);
    let b = overlap_episode(d(3, 1), d(4, 30), 9.0);
    let months = overlap_months(&[&a, &b], false).unwrap();
    let days: Vec<u32> = months.values().map(|m| m.days).collect();
    assert_eq!(days, vec![31, 28, 31, 30]);
    assert!(months.values().all(|m| m.points == 0.0));
}
