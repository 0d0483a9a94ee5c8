use crate::{
    error::PanelResult,
    rules::{CategoryPriority, RuleTable},
    types::MonthKey,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Subjects per persisted batch when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;
/// Worker threads per batch when nothing else is configured.
pub const DEFAULT_WORKERS: usize = 8;

// ── Adjustment factors ─────────────────────────────────────────────

/// Regional normalisation divisor per month, applied to the register
/// values of the adjusted primary labels.
pub trait AdjustmentFactors: Sync {
    fn factor(&self, key: MonthKey) -> Option<f64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentEntry {
    pub year:   i32,
    pub month:  u32,
    pub factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct AdjustmentFile {
    factors: Vec<AdjustmentEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjustmentTable {
    factors: BTreeMap<MonthKey, f64>,
}

impl AdjustmentTable {
    pub fn from_entries(entries: impl IntoIterator<Item = AdjustmentEntry>) -> Self {
        Self {
            factors: entries
                .into_iter()
                .map(|e| (MonthKey::new(e.year, e.month), e.factor))
                .collect(),
        }
    }

    /// Same factor for every month of `years`.
    pub fn uniform(years: std::ops::RangeInclusive<i32>, factor: f64) -> Self {
        Self::from_entries(years.flat_map(|year| {
            (1..=12).map(move |month| AdjustmentEntry { year, month, factor })
        }))
    }

    pub fn insert(&mut self, key: MonthKey, factor: f64) {
        self.factors.insert(key, factor);
    }
}

impl AdjustmentFactors for AdjustmentTable {
    fn factor(&self, key: MonthKey) -> Option<f64> {
        self.factors.get(&key).copied()
    }
}

// ── Rule configuration ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct CategoryRulesFile {
    #[serde(flatten)]
    rules: RuleTable,
    priority: CategoryPriority,
    secondary_job_label: String,
    adjusted_labels: BTreeSet<String>,
}

const STANDARD_RULES: &str = include_str!("../../data/rules/category_rules.json");

#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Last year of every observation window (windows end in its December).
    pub reporting_year: i32,
    pub batch_size: usize,
    pub workers: usize,
    pub rules: RuleTable,
    pub priority: CategoryPriority,
    /// Label under which outranked primary contributions enter ranking.
    pub secondary_job_label: String,
    /// Primary labels whose register values are divided by the
    /// adjustment factor of their month.
    pub adjusted_labels: BTreeSet<String>,
    pub adjustment: AdjustmentTable,
}

impl PanelConfig {
    /// Load from the data/ directory.
    /// In tests, use PanelConfig::default_test().
    pub fn load(data_dir: &str, reporting_year: i32) -> anyhow::Result<Self> {
        let rules_path = format!("{data_dir}/rules/category_rules.json");
        let rules_content = std::fs::read_to_string(&rules_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {rules_path}: {e}"))?;
        let rules_file: CategoryRulesFile = serde_json::from_str(&rules_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {rules_path}: {e}"))?;

        let factor_path = format!("{data_dir}/adjustment/adjustment_factors.json");
        let factor_content = std::fs::read_to_string(&factor_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {factor_path}: {e}"))?;
        let factor_file: AdjustmentFile = serde_json::from_str(&factor_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {factor_path}: {e}"))?;

        let config = Self::from_parts(
            rules_file,
            AdjustmentTable::from_entries(factor_file.factors),
            reporting_year,
        );
        config.validate()?;
        Ok(config)
    }

    /// Standard rule table with a flat adjustment factor of 1.0 for
    /// 2000–2030. For use in tests.
    pub fn default_test() -> Self {
        let rules_file: CategoryRulesFile =
            serde_json::from_str(STANDARD_RULES).expect("bundled rule table parses");
        Self::from_parts(rules_file, AdjustmentTable::uniform(2000..=2030, 1.0), 2023)
    }

    fn from_parts(file: CategoryRulesFile, adjustment: AdjustmentTable, reporting_year: i32) -> Self {
        Self {
            reporting_year,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            rules: file.rules,
            priority: file.priority,
            secondary_job_label: file.secondary_job_label,
            adjusted_labels: file.adjusted_labels,
            adjustment,
        }
    }

    pub fn with_reporting_year(mut self, year: i32) -> Self {
        self.reporting_year = year;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_adjustment(mut self, adjustment: AdjustmentTable) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Every label that can reach the secondary ranker must be ranked.
    pub fn validate(&self) -> PanelResult<()> {
        self.priority.rank_of(&self.secondary_job_label)?;
        for rule in &self.rules.secondary {
            self.priority.rank_of(&rule.label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_rules_are_consistent() {
        let config = PanelConfig::default_test();
        assert_eq!(config.rules.primary.len(), 10);
        assert_eq!(config.rules.secondary.len(), 19);
        assert_eq!(config.priority.rank_of("BRF").unwrap(), 0);
        assert_eq!(config.priority.rank_of("NJB").unwrap(), 16);
        assert_eq!(config.priority.rank_of("ALH").unwrap(), 19);
        assert!(config.validate().is_ok());
        assert!(config.adjusted_labels.contains("OSB"));
    }

    #[test]
    fn loads_from_data_dir() {
        let data_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
        let config = PanelConfig::load(data_dir, 2022).unwrap();
        assert_eq!(config.reporting_year, 2022);
        assert_eq!(config.adjustment.factor(MonthKey::new(2022, 6)), Some(1.0));
    }

    #[test]
    fn missing_data_dir_names_the_path() {
        let err = PanelConfig::load("/nonexistent", 2022).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rules/category_rules.json"));
    }
}
