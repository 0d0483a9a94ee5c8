//! Declarative category rules.
//!
//! A rule is a label plus a predicate tree over the fixed attribute schema.
//! Rule tables are loaded as data (see `config.rs`); nothing in the engine
//! hardcodes a category.

use crate::{
    episode::EpisodeAttributes,
    error::{PanelError, PanelResult},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    All { of: Vec<Predicate> },
    Any { of: Vec<Predicate> },
    Not { of: Box<Predicate> },
    ActivityIn { codes: Vec<u16> },
    SubtypeIn { codes: Vec<char> },
    BranchIn { codes: Vec<u8> },
    PensionIn { codes: Vec<u8> },
    SpecialLeave { present: bool },
}

impl Predicate {
    /// Null attribute codes never satisfy a membership test.
    pub fn matches(&self, attrs: &EpisodeAttributes) -> bool {
        match self {
            Predicate::All { of } => of.iter().all(|p| p.matches(attrs)),
            Predicate::Any { of } => of.iter().any(|p| p.matches(attrs)),
            Predicate::Not { of } => !of.matches(attrs),
            Predicate::ActivityIn { codes } => codes.contains(&attrs.activity_type),
            Predicate::SubtypeIn { codes } => {
                attrs.activity_subtype.is_some_and(|c| codes.contains(&c))
            }
            Predicate::BranchIn { codes } => {
                attrs.insurance_branch.is_some_and(|c| codes.contains(&c))
            }
            Predicate::PensionIn { codes } => {
                attrs.pension_receipt.is_some_and(|c| codes.contains(&c))
            }
            Predicate::SpecialLeave { present } => attrs.special_leave.is_some() == *present,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub label:     String,
    pub predicate: Predicate,
}

impl CategoryRule {
    pub fn matches(&self, attrs: &EpisodeAttributes) -> bool {
        self.predicate.matches(attrs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    Primary,
    Secondary,
    Overlap,
}

/// The two overlap categories. `days_only` counts days; `with_points` also
/// carries point-value shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapRules {
    pub days_only:   CategoryRule,
    pub with_points: CategoryRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    pub primary:   Vec<CategoryRule>,
    pub secondary: Vec<CategoryRule>,
    pub overlap:   OverlapRules,
}

/// Ordered secondary labels; position 0 ranks highest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryPriority {
    labels: Vec<String>,
}

impl CategoryPriority {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn rank_of(&self, label: &str) -> PanelResult<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| PanelError::UnknownCategoryLabel { label: label.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(activity: u16, subtype: Option<char>) -> EpisodeAttributes {
        EpisodeAttributes {
            activity_type: activity,
            activity_subtype: subtype,
            ..Default::default()
        }
    }

    #[test]
    fn predicates_deserialize_from_tagged_json() {
        let json = r#"{"op": "all", "of": [
            {"op": "activity_in", "codes": [10]},
            {"op": "subtype_in", "codes": ["0", "3"]},
            {"op": "special_leave", "present": false}
        ]}"#;
        let p: Predicate = serde_json::from_str(json).unwrap();
        assert!(p.matches(&attrs(10, Some('3'))));
        assert!(!p.matches(&attrs(10, Some('1'))));
        assert!(!p.matches(&attrs(10, None)));
    }

    #[test]
    fn null_codes_fail_membership() {
        let p = Predicate::BranchIn { codes: vec![1, 2] };
        assert!(!p.matches(&attrs(10, None)));
        let q = Predicate::Not { of: Box::new(p) };
        assert!(q.matches(&attrs(10, None)));
    }

    #[test]
    fn unknown_label_has_no_rank() {
        let prio = CategoryPriority::new(vec!["A".into(), "B".into()]);
        assert_eq!(prio.rank_of("B").unwrap(), 1);
        assert!(matches!(
            prio.rank_of("Z"),
            Err(PanelError::UnknownCategoryLabel { .. })
        ));
    }
}
