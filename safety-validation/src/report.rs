//! Validation results and the safety report built from them

use crate::guards::CircuitBreakerStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Contribution to the report risk score
    pub fn risk_weight(self) -> u32 {
        match self {
            Severity::Info => 1,
            Severity::Warning => 5,
            Severity::Error => 15,
            Severity::Critical => 25,
        }
    }

    /// Error and critical findings make a report unsafe
    pub fn is_blocking(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCategory {
    DataIntegrity,
    MarketData,
    Calculation,
    SignalLogic,
    RiskBoundary,
}

impl ValidationCategory {
    /// General advice attached to a report with findings in this category
    pub fn recommendation(self) -> &'static str {
        match self {
            ValidationCategory::DataIntegrity => {
                "Refresh market data and confirm every required symbol is present"
            }
            ValidationCategory::MarketData => {
                "Cross-check flagged prices against a second data source"
            }
            ValidationCategory::Calculation => "Review calculator inputs and parameters",
            ValidationCategory::SignalLogic => {
                "Treat the consensus as provisional until the signal set is reconciled"
            }
            ValidationCategory::RiskBoundary => {
                "Reduce exposure until market conditions return inside risk boundaries"
            }
        }
    }
}

/// One finding from a validation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub severity: Severity,
    pub category: ValidationCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Sample offending values, e.g. `2024-03-01: 1000000`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl ValidationResult {
    pub fn new(severity: Severity, category: ValidationCategory, message: impl Into<String>) -> Self {
        Self {
            is_valid: !severity.is_blocking(),
            severity,
            category,
            message: message.into(),
            correction_suggestion: None,
            symbol: None,
            examples: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.correction_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafetyStatus {
    Safe,
    Warning,
    Unsafe,
}

impl SafetyStatus {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        match results.iter().map(|r| r.severity).max() {
            Some(s) if s.is_blocking() => SafetyStatus::Unsafe,
            Some(Severity::Warning) => SafetyStatus::Warning,
            _ => SafetyStatus::Safe,
        }
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SafetyStatus::Safe => "safe",
            SafetyStatus::Warning => "warning",
            SafetyStatus::Unsafe => "unsafe",
        };
        f.write_str(s)
    }
}

pub const MAX_RISK_SCORE: u32 = 100;

pub fn risk_score(results: &[ValidationResult]) -> u32 {
    results
        .iter()
        .map(|r| r.severity.risk_weight())
        .sum::<u32>()
        .min(MAX_RISK_SCORE)
}

/// Deduplicated correction suggestions, then one general line per category
/// with warning-or-worse findings
pub fn recommendations(results: &[ValidationResult], status: SafetyStatus) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for suggestion in results.iter().filter_map(|r| r.correction_suggestion.as_ref()) {
        if !out.contains(suggestion) {
            out.push(suggestion.clone());
        }
    }

    let mut categories: Vec<ValidationCategory> = Vec::new();
    for result in results.iter().filter(|r| r.severity >= Severity::Warning) {
        if !categories.contains(&result.category) {
            categories.push(result.category);
        }
    }
    out.extend(categories.iter().map(|c| c.recommendation().to_string()));

    if status == SafetyStatus::Unsafe {
        out.push("Do not act on these signals until the blocking issues are resolved".to_string());
    } else if out.is_empty() {
        out.push("All safety checks passed".to_string());
    }
    out
}

/// Outcome of one comprehensive validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub overall_status: SafetyStatus,
    /// 0 to 100
    pub risk_score: u32,
    pub validation_results: Vec<ValidationResult>,
    pub circuit_breaker_status: CircuitBreakerStatus,
    pub recommendations: Vec<String>,
    /// Step log for this pass
    pub audit_trail: Vec<String>,
}

impl SafetyReport {
    pub fn is_safe(&self) -> bool {
        self.overall_status != SafetyStatus::Unsafe
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.validation_results
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    /// Findings that need attention (warning or worse)
    pub fn issue_count(&self) -> usize {
        self.validation_results
            .iter()
            .filter(|r| r.severity >= Severity::Warning)
            .count()
    }
}

/// Retained record of one validation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: SafetyStatus,
    pub risk_score: u32,
    pub issue_count: usize,
    pub signal_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(severity: Severity) -> ValidationResult {
        ValidationResult::new(severity, ValidationCategory::MarketData, "finding")
    }

    #[test]
    fn test_validity_follows_severity() {
        assert!(result(Severity::Info).is_valid);
        assert!(result(Severity::Warning).is_valid);
        assert!(!result(Severity::Error).is_valid);
        assert!(!result(Severity::Critical).is_valid);
    }

    #[test]
    fn test_status_from_results() {
        assert_eq!(SafetyStatus::from_results(&[]), SafetyStatus::Safe);
        assert_eq!(SafetyStatus::from_results(&[result(Severity::Info)]), SafetyStatus::Safe);
        assert_eq!(
            SafetyStatus::from_results(&[result(Severity::Info), result(Severity::Warning)]),
            SafetyStatus::Warning
        );
        assert_eq!(
            SafetyStatus::from_results(&[result(Severity::Warning), result(Severity::Critical)]),
            SafetyStatus::Unsafe
        );
    }

    #[test]
    fn test_risk_score_weights_and_cap() {
        let results = vec![
            result(Severity::Critical),
            result(Severity::Error),
            result(Severity::Warning),
            result(Severity::Info),
        ];
        assert_eq!(risk_score(&results), 46);

        let many = vec![result(Severity::Critical); 5];
        assert_eq!(risk_score(&many), MAX_RISK_SCORE);
    }

    #[test]
    fn test_recommendations_are_deduplicated() {
        let results = vec![
            result(Severity::Error).with_suggestion("Check the SPY feed"),
            result(Severity::Error).with_suggestion("Check the SPY feed"),
            ValidationResult::new(Severity::Info, ValidationCategory::SignalLogic, "conflict"),
        ];
        let recs = recommendations(&results, SafetyStatus::Unsafe);

        assert_eq!(recs.iter().filter(|r| *r == "Check the SPY feed").count(), 1);
        assert!(recs.contains(&ValidationCategory::MarketData.recommendation().to_string()));
        // info-only categories add no general advice
        assert!(!recs.contains(&ValidationCategory::SignalLogic.recommendation().to_string()));

        assert_eq!(recommendations(&[], SafetyStatus::Safe), vec!["All safety checks passed"]);
    }
}
