//! Keyword risk classifier
//!
//! Pure and stateless: no I/O, no clock. Tiers are scanned from most to least
//! severe and the first tier with any hit decides the salience, so a HIGH hit
//! always wins over MEDIUM hits in the same text. Cost is bounded by
//! input length times the (small, fixed) keyword count.

use crate::config::{ClassifierConfig, TierConfig};
use daimon_core::{Classification, Mode, RiskLevel};

/// Reasons list at most this many keywords.
const REASON_KEYWORDS: usize = 3;

#[derive(Debug, Clone)]
struct Tier {
    risk: RiskLevel,
    score: f64,
    /// Lower-cased at construction.
    keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RiskClassifier {
    floor: f64,
    subtle_threshold: f64,
    emerge_threshold: f64,
    /// Ordered by descending severity.
    tiers: Vec<Tier>,
}

impl RiskClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let build = |risk, cfg: &TierConfig| Tier {
            risk,
            score: cfg.score,
            keywords: cfg.keywords.iter().map(|k| k.to_lowercase()).collect(),
        };
        Self {
            floor: config.floor,
            subtle_threshold: config.subtle_threshold,
            emerge_threshold: config.emerge_threshold,
            tiers: vec![
                build(RiskLevel::High, &config.high),
                build(RiskLevel::Medium, &config.medium),
            ],
        }
    }

    pub fn classify(&self, text: &str) -> Classification {
        let lowered = text.to_lowercase();

        for tier in &self.tiers {
            let detected: Vec<String> = tier
                .keywords
                .iter()
                .filter(|k| lowered.contains(k.as_str()))
                .cloned()
                .collect();
            if detected.is_empty() {
                continue;
            }
            let shown: Vec<&str> = detected.iter().take(REASON_KEYWORDS).map(String::as_str).collect();
            return Classification {
                salience: tier.score,
                mode: self.mode_for(tier.score),
                risk: tier.risk,
                reason: Some(format!("Detected: {}", shown.join(", "))),
                detected_keywords: detected,
            };
        }

        Classification {
            salience: self.floor,
            mode: self.mode_for(self.floor),
            risk: RiskLevel::Low,
            reason: None,
            detected_keywords: Vec::new(),
        }
    }

    pub fn risk_level(&self, text: &str) -> RiskLevel {
        self.classify(text).risk
    }

    pub fn mode_for(&self, salience: f64) -> Mode {
        Mode::from_salience(salience, self.subtle_threshold, self.emerge_threshold)
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}
