mod config;
pub mod builder;
pub mod encoding;
pub mod manual;
pub mod normalize;

use log::{debug, info, warn};
use snafu::ensure;

use std::collections::HashMap;

pub use crate::config::*;
pub use crate::encoding::resolve;
pub use crate::normalize::{normalize, HeaderCache, HeaderMap, SemanticField, HEADER_RULES};

/// The normalized rows of one input, with the counts needed by the final dataset.
#[derive(PartialEq, Debug, Clone)]
pub struct ParsedRows {
    pub rows: Vec<NormalizedRow>,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

// Rows sharing the same outcome key, in file order.
struct OutcomeGroup {
    outcome_text: String,
    focus_label: String,
    importances: Vec<f64>,
    satisfactions: Vec<f64>,
    sample_size: usize,
}

impl OutcomeGroup {
    fn new(row: &NormalizedRow) -> OutcomeGroup {
        OutcomeGroup {
            outcome_text: row.outcome_text.clone(),
            focus_label: String::new(),
            importances: Vec::new(),
            satisfactions: Vec::new(),
            sample_size: 0,
        }
    }

    fn push(&mut self, row: &NormalizedRow) {
        if self.focus_label.is_empty() && !row.focus_label.is_empty() {
            self.focus_label = row.focus_label.clone();
        }
        if let Some(x) = row.importance {
            self.importances.push(x);
        }
        if let Some(x) = row.satisfaction {
            self.satisfactions.push(x);
        }
        self.sample_size += 1;
    }

    fn reduce(&self, method: AggregationMethod) -> AggregatedOutcome {
        let importance = reduce_values(&self.importances, method);
        let satisfaction = reduce_values(&self.satisfactions, method);
        let missing_scores = importance.is_none() || satisfaction.is_none();
        if missing_scores {
            warn!(
                "reduce: outcome {:?} has no importance or no satisfaction value in {} rows, using 0.0",
                self.outcome_text, self.sample_size
            );
        }
        AggregatedOutcome {
            outcome_text: self.outcome_text.clone(),
            focus_label: self.focus_label.clone(),
            importance: importance.unwrap_or(0.0),
            satisfaction: satisfaction.unwrap_or(0.0),
            sample_size: self.sample_size,
            missing_scores,
        }
    }
}

/// The grouping key of an outcome: trimmed, inner whitespace collapsed, case folded.
pub fn outcome_key(outcome_text: &str) -> String {
    outcome_text
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// Applies the statistic to the values present in a group. None if there is no value.
pub fn reduce_values(values: &[f64], method: AggregationMethod) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let res = match method {
        AggregationMethod::Average => values.iter().sum::<f64>() / values.len() as f64,
        AggregationMethod::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
        AggregationMethod::First => values[0],
        AggregationMethod::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        AggregationMethod::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
    };
    Some(res)
}

/// Normalizes all the records of an input.
///
/// Records without outcome text are dropped and counted. The header layout is
/// resolved once and again only when a record comes with different headers.
pub fn normalize_records(
    records: &[RawRecord],
    rules: &ParseRules,
) -> Result<ParsedRows, OutcomeMapError> {
    ensure!(!records.is_empty(), EmptyInputSnafu {});
    info!("normalize_records: Processing {:?} records", records.len());

    let mut headers = HeaderCache::default();
    let mut rows: Vec<NormalizedRow> = Vec::new();
    let mut rows_dropped: usize = 0;
    for (idx, record) in records.iter().enumerate() {
        let header_map = headers.header_map(record);
        match normalize::normalize_record(record, header_map, rules.decimal_separator) {
            Some(row) => rows.push(row),
            None => {
                debug!("normalize_records: record {}: no outcome text, dropped", idx);
                rows_dropped += 1;
            }
        }
    }
    if rows_dropped > 0 {
        info!("normalize_records: {} rows dropped", rows_dropped);
    }
    Ok(ParsedRows {
        rows,
        rows_read: records.len(),
        rows_dropped,
    })
}

/// Collapses rows with the same outcome into one entry per outcome.
///
/// Entries come out in the order in which each outcome first appears.
pub fn aggregate_rows(rows: &[NormalizedRow], method: AggregationMethod) -> Vec<AggregatedOutcome> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<OutcomeGroup> = Vec::new();
    for row in rows.iter() {
        let key = outcome_key(&row.outcome_text);
        let gidx = *index.entry(key).or_insert_with(|| {
            groups.push(OutcomeGroup::new(row));
            groups.len() - 1
        });
        groups[gidx].push(row);
    }
    debug!(
        "aggregate_rows: {} rows -> {} outcomes using {:?}",
        rows.len(),
        groups.len(),
        method
    );
    groups.iter().map(|g| g.reduce(method)).collect()
}

/// One outcome per row, without grouping.
pub fn pass_through(rows: &[NormalizedRow]) -> Vec<AggregatedOutcome> {
    rows.iter()
        .map(|row| {
            let mut g = OutcomeGroup::new(row);
            g.push(row);
            // Any method gives the value itself for a single row.
            g.reduce(AggregationMethod::First)
        })
        .collect()
}

pub fn aggregate(rows: &[NormalizedRow], rules: &ParseRules) -> Vec<AggregatedOutcome> {
    if rules.aggregate {
        aggregate_rows(rows, rules.aggregation_method)
    } else {
        pass_through(rows)
    }
}

/// Opportunity score: the importance, plus the part of it that satisfaction does not cover.
///
/// Over-satisfied outcomes get no bonus and no penalty.
pub fn opportunity_score(importance: f64, satisfaction: f64) -> f64 {
    importance + (importance - satisfaction).max(0.0)
}

pub fn score(outcome: &AggregatedOutcome) -> f64 {
    opportunity_score(outcome.importance, outcome.satisfaction)
}

/// Assembles the final dataset. Fails when there is no outcome at all.
pub fn build_map(
    outcomes: Vec<ScoredOutcome>,
    parsed: &ParsedRows,
    source: SourceMeta,
) -> Result<MapDataset, OutcomeMapError> {
    ensure!(
        !outcomes.is_empty(),
        EmptyDatasetSnafu {
            rows_read: parsed.rows_read,
            rows_dropped: parsed.rows_dropped,
        }
    );
    let stats = MapStats {
        rows_read: parsed.rows_read,
        rows_dropped: parsed.rows_dropped,
        outcomes_after_aggregation: outcomes.len(),
        outcomes_missing_scores: outcomes.iter().filter(|o| o.missing_scores()).count(),
    };
    info!("build_map: {:?}", stats);
    Ok(MapDataset {
        outcomes,
        source,
        stats,
    })
}

/// Runs the complete pipeline on the records of one input.
///
/// Arguments:
/// * `records` the rows of the input, in file order
/// * `rules` how to read the numbers and how to collapse duplicates
/// * `source` the description of the input, copied into the dataset
pub fn run_outcome_map(
    records: &[RawRecord],
    rules: &ParseRules,
    source: SourceMeta,
) -> Result<MapDataset, OutcomeMapError> {
    info!("run_outcome_map: source: {:?} rules: {:?}", source, rules);
    let parsed = normalize_records(records, rules)?;
    build_from_rows(&parsed, rules, source)
}

pub(crate) fn build_from_rows(
    parsed: &ParsedRows,
    rules: &ParseRules,
    source: SourceMeta,
) -> Result<MapDataset, OutcomeMapError> {
    let aggregated = aggregate(&parsed.rows, rules);
    let scored: Vec<ScoredOutcome> = aggregated.into_iter().map(ScoredOutcome::new).collect();
    for s in scored.iter() {
        debug!(
            "build_from_rows: {:>8.3} {:?} (n={})",
            s.opportunity_score(),
            s.outcome_text(),
            s.sample_size()
        );
    }
    build_map(scored, parsed, source)
}
