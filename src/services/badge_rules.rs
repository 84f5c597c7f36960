use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

use crate::models::UserStats;

/// `statName operator integer`; the first occurrence in the rule wins.
static RULE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_]+)\s*(>=|<=|>|<|==)\s*([0-9]+)").expect("badge rule pattern compiles")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule does not match `statName operator integer`: {0:?}")]
    Malformed(String),
    #[error("Unknown statistic `{0}`")]
    UnknownStatistic(String),
    #[error("Threshold `{0}` is out of range")]
    ThresholdOutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    CompletedChallenges,
    TotalCaloriesBurned,
    ActiveChallenges,
    AverageProgress,
}

impl StatField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "completedChallenges" => Some(StatField::CompletedChallenges),
            "totalCaloriesBurned" => Some(StatField::TotalCaloriesBurned),
            "activeChallenges" => Some(StatField::ActiveChallenges),
            "averageProgress" => Some(StatField::AverageProgress),
            _ => None,
        }
    }

    fn value(&self, stats: &UserStats) -> f64 {
        match self {
            StatField::CompletedChallenges => stats.completed_challenges as f64,
            StatField::TotalCaloriesBurned => stats.total_calories_burned,
            StatField::ActiveChallenges => stats.active_challenges as f64,
            StatField::AverageProgress => stats.average_progress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    Less,
    Equal,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        match op {
            ">=" => Some(Comparison::GreaterOrEqual),
            "<=" => Some(Comparison::LessOrEqual),
            ">" => Some(Comparison::Greater),
            "<" => Some(Comparison::Less),
            "==" => Some(Comparison::Equal),
            _ => None,
        }
    }

    fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::GreaterOrEqual => left >= right,
            Comparison::LessOrEqual => left <= right,
            Comparison::Greater => left > right,
            Comparison::Less => left < right,
            Comparison::Equal => left == right,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::Equal => "==",
        }
    }
}

/// A single threshold comparison over a user's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeRule {
    pub field: StatField,
    pub comparison: Comparison,
    pub threshold: i64,
}

impl BadgeRule {
    pub fn parse(rule: &str) -> Result<Self, RuleError> {
        let captures = RULE_PATTERN
            .captures(rule)
            .ok_or_else(|| RuleError::Malformed(rule.to_string()))?;

        let name = &captures[1];
        let field = StatField::parse(name).ok_or_else(|| RuleError::UnknownStatistic(name.to_string()))?;
        let comparison =
            Comparison::parse(&captures[2]).ok_or_else(|| RuleError::Malformed(rule.to_string()))?;
        let threshold = captures[3]
            .parse::<i64>()
            .map_err(|_| RuleError::ThresholdOutOfRange(captures[3].to_string()))?;

        Ok(Self {
            field,
            comparison,
            threshold,
        })
    }

    pub fn matches(&self, stats: &UserStats) -> bool {
        self.comparison
            .holds(self.field.value(stats), self.threshold as f64)
    }
}

impl fmt::Display for BadgeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.field {
            StatField::CompletedChallenges => "completedChallenges",
            StatField::TotalCaloriesBurned => "totalCaloriesBurned",
            StatField::ActiveChallenges => "activeChallenges",
            StatField::AverageProgress => "averageProgress",
        };
        write!(f, "{} {} {}", name, self.comparison.symbol(), self.threshold)
    }
}

/// Evaluate a stored rule. Anything that cannot be evaluated counts as not earned.
pub fn evaluate_rule(rule: &str, stats: &UserStats) -> bool {
    match BadgeRule::parse(rule) {
        Ok(parsed) => parsed.matches(stats),
        Err(err) => {
            tracing::warn!(rule, error = %err, "Skipping badge rule that cannot be evaluated");
            false
        }
    }
}
