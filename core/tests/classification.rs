//! Classification against the bundled rule table.

use chrono::NaiveDate;
use panel_core::{
    classify::Classifier,
    config::PanelConfig,
    episode::{Episode, EpisodeAttributes},
    error::PanelError,
    rules::{CategoryRule, OverlapRules, Predicate, RuleFamily, RuleTable},
};

fn episode(attributes: EpisodeAttributes) -> Episode {
    Episode {
        subject_id:     "c-1".into(),
        start_date:     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        end_date:       NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        attributes,
        register_value: 36_500.0,
        point_value:    1.0,
    }
}

fn attrs(activity: u16, subtype: Option<char>) -> EpisodeAttributes {
    EpisodeAttributes {
        activity_type: activity,
        activity_subtype: subtype,
        ..Default::default()
    }
}

fn employment(branch: u8, pension: u8) -> EpisodeAttributes {
    EpisodeAttributes {
        activity_type:    10,
        activity_subtype: Some('0'),
        insurance_branch: Some(branch),
        pension_receipt:  Some(pension),
        special_leave:    None,
    }
}

fn labels(config: &PanelConfig, a: EpisodeAttributes, family: RuleFamily) -> Vec<String> {
    Classifier::new(&config.rules)
        .classify(&episode(a), family)
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect()
}

#[test]
fn employment_splits_by_branch_and_pension() {
    let config = PanelConfig::default_test();
    assert_eq!(labels(&config, employment(1, 0), RuleFamily::Primary), ["WSB"]);
    assert_eq!(labels(&config, employment(4, 6), RuleFamily::Primary), ["OSB"]);
    assert_eq!(labels(&config, employment(5, 1), RuleFamily::Primary), ["WKN"]);
    assert_eq!(labels(&config, employment(6, 5), RuleFamily::Primary), ["OKN"]);
}

#[test]
fn special_leave_moves_employment_to_secondary() {
    let config = PanelConfig::default_test();
    let mut a = employment(1, 0);
    a.special_leave = Some(1);
    assert!(labels(&config, a.clone(), RuleFamily::Primary).is_empty());
    assert_eq!(labels(&config, a, RuleFamily::Secondary), ["FRG"]);
}

#[test]
fn secondary_rules_are_not_exclusive() {
    let config = PanelConfig::default_test();
    let mut a = attrs(13, None);
    a.special_leave = Some(1);
    assert_eq!(labels(&config, a, RuleFamily::Secondary), ["ALG", "FRG"]);
}

#[test]
fn subtype_codes_select_secondary_labels() {
    let config = PanelConfig::default_test();
    assert_eq!(labels(&config, attrs(10, Some('1')), RuleFamily::Secondary), ["BRF"]);
    assert_eq!(labels(&config, attrs(20, Some('8')), RuleFamily::Secondary), ["PFL"]);
    assert_eq!(labels(&config, attrs(20, Some('4')), RuleFamily::Secondary), ["HRT"]);
    assert_eq!(labels(&config, attrs(42, Some('C')), RuleFamily::Secondary), ["SCH"]);
    assert_eq!(labels(&config, attrs(48, Some('D')), RuleFamily::Secondary), ["ALH"]);

    let mut az = attrs(41, Some('5'));
    az.pension_receipt = Some(1);
    assert_eq!(labels(&config, az, RuleFamily::Secondary), ["AZ1"]);

    // Partial-retirement episodes with a null subtype match nothing.
    assert!(labels(&config, attrs(40, None), RuleFamily::Secondary).is_empty());
}

#[test]
fn overlap_labels_follow_activity_type() {
    let config = PanelConfig::default_test();
    assert_eq!(labels(&config, attrs(5, None), RuleFamily::Overlap), ["OVL_A"]);
    assert_eq!(labels(&config, attrs(6, None), RuleFamily::Overlap), ["OVL_B"]);
    assert!(labels(&config, attrs(13, None), RuleFamily::Overlap).is_empty());
}

#[test]
fn subject_streams_are_bucketed() {
    let config = PanelConfig::default_test();
    let episodes = vec![
        episode(employment(1, 0)),
        episode(attrs(13, None)),
        episode(attrs(5, None)),
        episode(attrs(6, None)),
        episode(attrs(99, None)),
    ];
    let classified = Classifier::new(&config.rules)
        .classify_subject(&episodes)
        .unwrap();
    assert_eq!(classified.primary.len(), 1);
    assert_eq!(classified.secondary.len(), 1);
    assert_eq!(classified.overlap_days.len(), 1);
    assert_eq!(classified.overlap_points.len(), 1);
}

#[test]
fn colliding_primary_rules_are_rejected() {
    let any_ten = Predicate::ActivityIn { codes: vec![10] };
    let rules = RuleTable {
        primary: vec![
            CategoryRule { label: "X".into(), predicate: any_ten.clone() },
            CategoryRule { label: "Y".into(), predicate: any_ten },
        ],
        secondary: vec![],
        overlap: OverlapRules {
            days_only: CategoryRule {
                label:     "A".into(),
                predicate: Predicate::ActivityIn { codes: vec![5] },
            },
            with_points: CategoryRule {
                label:     "B".into(),
                predicate: Predicate::ActivityIn { codes: vec![6] },
            },
        },
    };
    let err = Classifier::new(&rules)
        .classify(&episode(employment(1, 0)), RuleFamily::Primary)
        .unwrap_err();
    match err {
        PanelError::AmbiguousPrimaryClassification { labels, .. } => {
            assert_eq!(labels, vec!["X".to_string(), "Y".to_string()]);
        }
        other => panic!("expected ambiguity error, got {other}"),
    }
}

#[test]
fn episode_matching_both_overlap_rules_feeds_only_the_first() {
    let rules = RuleTable {
        primary:   vec![],
        secondary: vec![],
        overlap:   OverlapRules {
            days_only: CategoryRule {
                label:     "A".into(),
                predicate: Predicate::ActivityIn { codes: vec![5, 6] },
            },
            with_points: CategoryRule {
                label:     "B".into(),
                predicate: Predicate::ActivityIn { codes: vec![6] },
            },
        },
    };
    let classifier = Classifier::new(&rules);
    let both = episode(attrs(6, None));
    assert_eq!(classifier.classify(&both, RuleFamily::Overlap).unwrap(), ["A"]);

    let episodes = vec![both, episode(attrs(5, None))];
    let classified = classifier.classify_subject(&episodes).unwrap();
    assert_eq!(classified.overlap_days.len(), 2);
    assert!(classified.overlap_points.is_empty());
}
