//! Line-oriented parameter recognition.
//!
//! Each non-trivial line is scanned against the registry in order. The first
//! rule that yields a parameter wins the line; only rules sharing the
//! winner's line group are tried after it. Results are deduplicated by
//! display name, first occurrence wins.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Captures;
use uuid::Uuid;

use super::ranges::classify;
use super::registry::ParameterPattern;
use super::tables::ExtractionTables;
use crate::config::DEFAULT_MIN_LINE_CHARS;
use crate::models::{HealthParameter, ParameterValue};

/// Stateless apart from the shared tables; cheap to clone, safe to share.
#[derive(Debug, Clone)]
pub struct ParameterExtractor {
    tables: Arc<ExtractionTables>,
    min_line_chars: usize,
}

impl ParameterExtractor {
    pub fn new(tables: Arc<ExtractionTables>) -> Self {
        Self {
            tables,
            min_line_chars: DEFAULT_MIN_LINE_CHARS,
        }
    }

    /// Extractor over the built-in tables.
    pub fn standard() -> Self {
        Self::new(Arc::new(ExtractionTables::standard()))
    }

    pub fn with_min_line_chars(mut self, min_line_chars: usize) -> Self {
        self.min_line_chars = min_line_chars;
        self
    }

    pub fn tables(&self) -> &ExtractionTables {
        &self.tables
    }

    /// Recognize parameters in `text`. Never fails: unrecognized or
    /// malformed lines are skipped, and zero results is a valid outcome.
    pub fn extract_parameters(&self, text: &str) -> Vec<HealthParameter> {
        let patterns = self.tables.registry.patterns();
        let mut found = Vec::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.chars().count() < self.min_line_chars {
                continue;
            }

            let mut winner: Option<&ParameterPattern> = None;
            for pattern in patterns {
                if let Some(first) = winner {
                    if !first.shares_line_with(pattern) {
                        continue;
                    }
                }
                let Some(caps) = pattern.regex.captures(line) else {
                    continue;
                };
                match self.build_parameter(pattern, &caps, line) {
                    Some(param) => {
                        found.push(param);
                        if winner.is_none() {
                            winner = Some(pattern);
                        }
                    }
                    None => {
                        tracing::trace!(pattern = %pattern.id, "Match without usable value, skipped");
                    }
                }
            }
        }

        let before = found.len();
        let params = deduplicate_by_name(found);
        tracing::debug!(
            recognized = before,
            kept = params.len(),
            "Parameter extraction complete"
        );
        params
    }

    fn build_parameter(
        &self,
        pattern: &ParameterPattern,
        caps: &Captures<'_>,
        line: &str,
    ) -> Option<HealthParameter> {
        let token = caps.get(1)?.as_str();
        if token.is_empty() {
            return None;
        }
        let value = ParameterValue::from_token(token);

        let unit = caps
            .get(2)
            .map(|m| self.tables.units.normalize(m.as_str()))
            .filter(|u| !u.is_empty());

        let range = self.tables.ranges.get(&pattern.id);

        Some(HealthParameter {
            id: Uuid::new_v4(),
            name: self.tables.names.display_name(&pattern.id),
            status: classify(range, &value),
            value,
            unit,
            reference_range: range.map(ToString::to_string),
            category: pattern.category,
            source_line: line.to_string(),
        })
    }
}

impl Default for ParameterExtractor {
    fn default() -> Self {
        Self::standard()
    }
}

/// Keep the first parameter per display name, preserving order.
pub fn deduplicate_by_name(params: Vec<HealthParameter>) -> Vec<HealthParameter> {
    let mut seen: HashSet<String> = HashSet::with_capacity(params.len());
    params
        .into_iter()
        .filter(|p| seen.insert(p.name.clone()))
        .collect()
}
