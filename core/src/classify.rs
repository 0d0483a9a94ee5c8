//! Classifier: evaluates episodes against the rule table.

use crate::{
    episode::Episode,
    error::{PanelError, PanelResult},
    rules::{RuleFamily, RuleTable},
};

/// A subject's episodes bucketed by the stream they feed.
#[derive(Debug, Default)]
pub struct Classified<'a> {
    pub primary:        Vec<(&'a str, &'a Episode)>,
    pub secondary:      Vec<(&'a str, &'a Episode)>,
    pub overlap_days:   Vec<&'a Episode>,
    pub overlap_points: Vec<&'a Episode>,
}

pub struct Classifier<'r> {
    rules: &'r RuleTable,
}

impl<'r> Classifier<'r> {
    pub fn new(rules: &'r RuleTable) -> Self {
        Self { rules }
    }

    /// Labels of `family` that `episode` falls into.
    ///
    /// Primary yields at most one label and fails on a collision.
    /// Secondary yields every matching label in table order.
    /// Overlap yields the first matching overlap label, if any.
    pub fn classify(&self, episode: &Episode, family: RuleFamily) -> PanelResult<Vec<&'r str>> {
        let attrs = &episode.attributes;
        match family {
            RuleFamily::Primary => {
                let hits: Vec<&'r str> = self
                    .rules
                    .primary
                    .iter()
                    .filter(|r| r.matches(attrs))
                    .map(|r| r.label.as_str())
                    .collect();
                if hits.len() > 1 {
                    return Err(PanelError::AmbiguousPrimaryClassification {
                        start:  episode.start_date,
                        labels: hits.iter().map(|l| l.to_string()).collect(),
                    });
                }
                Ok(hits)
            }
            RuleFamily::Secondary => Ok(self
                .rules
                .secondary
                .iter()
                .filter(|r| r.matches(attrs))
                .map(|r| r.label.as_str())
                .collect()),
            RuleFamily::Overlap => {
                let overlap = &self.rules.overlap;
                Ok([&overlap.days_only, &overlap.with_points]
                    .into_iter()
                    .find(|r| r.matches(attrs))
                    .map(|r| r.label.as_str())
                    .into_iter()
                    .collect())
            }
        }
    }

    /// Run all three families over a subject's episodes.
    pub fn classify_subject<'a>(&self, episodes: &'a [Episode]) -> PanelResult<Classified<'a>>
    where
        'r: 'a,
    {
        let mut out = Classified::default();
        for ep in episodes {
            for label in self.classify(ep, RuleFamily::Primary)? {
                out.primary.push((label, ep));
            }
            for label in self.classify(ep, RuleFamily::Secondary)? {
                out.secondary.push((label, ep));
            }
            let overlap = &self.rules.overlap;
            for label in self.classify(ep, RuleFamily::Overlap)? {
                if label == overlap.days_only.label {
                    out.overlap_days.push(ep);
                } else if label == overlap.with_points.label {
                    out.overlap_points.push(ep);
                }
            }
        }
        Ok(out)
    }
}
