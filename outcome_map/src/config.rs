// ********* Input data structures ***********

use snafu::Snafu;
use std::cmp::Ordering;

/// One row of the source file, as read: header and value pairs in column order.
///
/// The header spelling is not constrained. Readers fill one record per data row.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawRecord {
    pub fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(fields: Vec<(String, String)>) -> RawRecord {
        RawRecord { fields }
    }

    /// Builds a record from a header row and a data row. Missing trailing cells are empty.
    pub fn from_row(headers: &[String], values: &[String]) -> RawRecord {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.clone(), values.get(idx).cloned().unwrap_or_default()))
            .collect();
        RawRecord { fields }
    }

    pub fn headers(&self) -> Vec<String> {
        self.fields.iter().map(|(h, _)| h.clone()).collect()
    }

    pub fn value_at(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(|(_, v)| v.as_str())
    }
}

/// The canonical record for one survey response.
#[derive(PartialEq, Debug, Clone)]
pub struct NormalizedRow {
    /// Trimmed, never empty.
    pub outcome_text: String,
    pub focus_label: String,
    /// None when the cell was empty or not a number. This is not the same as zero.
    pub importance: Option<f64>,
    pub satisfaction: Option<f64>,
}

// ******** Output data structures *********

/// One entry per distinct outcome after grouping.
#[derive(PartialEq, Debug, Clone)]
pub struct AggregatedOutcome {
    pub outcome_text: String,
    pub focus_label: String,
    pub importance: f64,
    pub satisfaction: f64,
    pub sample_size: usize,
    /// Set when importance or satisfaction had no value at all in the group
    /// and was replaced by 0.0.
    pub missing_scores: bool,
}

/// An aggregated outcome with its opportunity score.
///
/// The score is computed once at construction and cannot be changed afterwards.
#[derive(PartialEq, Debug, Clone)]
pub struct ScoredOutcome {
    outcome: AggregatedOutcome,
    opportunity_score: f64,
}

impl ScoredOutcome {
    pub fn new(outcome: AggregatedOutcome) -> ScoredOutcome {
        let opportunity_score = crate::score(&outcome);
        ScoredOutcome {
            outcome,
            opportunity_score,
        }
    }

    pub fn outcome(&self) -> &AggregatedOutcome {
        &self.outcome
    }

    pub fn outcome_text(&self) -> &str {
        &self.outcome.outcome_text
    }

    pub fn focus_label(&self) -> &str {
        &self.outcome.focus_label
    }

    pub fn importance(&self) -> f64 {
        self.outcome.importance
    }

    pub fn satisfaction(&self) -> f64 {
        self.outcome.satisfaction
    }

    pub fn sample_size(&self) -> usize {
        self.outcome.sample_size
    }

    pub fn missing_scores(&self) -> bool {
        self.outcome.missing_scores
    }

    pub fn opportunity_score(&self) -> f64 {
        self.opportunity_score
    }
}

/// Where the data came from, provided by the caller.
///
/// The generation time is passed in rather than read from the clock, so that
/// the same input always produces the same dataset.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceMeta {
    pub source_name: String,
    pub generated_at: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct MapStats {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub outcomes_after_aggregation: usize,
    pub outcomes_missing_scores: usize,
}

/// Ordering requested by the consumer of a dataset.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SortOrder {
    /// First appearance in the source file.
    Input,
    /// Highest opportunity score first. Equal scores keep the input order.
    OpportunityDesc,
}

/// The final, immutable result of one build.
#[derive(PartialEq, Debug, Clone)]
pub struct MapDataset {
    pub(crate) outcomes: Vec<ScoredOutcome>,
    pub(crate) source: SourceMeta,
    pub(crate) stats: MapStats,
}

impl MapDataset {
    pub fn outcomes(&self) -> &[ScoredOutcome] {
        &self.outcomes
    }

    pub fn source(&self) -> &SourceMeta {
        &self.source
    }

    pub fn stats(&self) -> MapStats {
        self.stats
    }

    pub fn ordered(&self, order: SortOrder) -> Vec<&ScoredOutcome> {
        let mut res: Vec<&ScoredOutcome> = self.outcomes.iter().collect();
        if order == SortOrder::OpportunityDesc {
            res.sort_by(|a, b| compare_scores_desc(a.opportunity_score, b.opportunity_score));
        }
        res
    }
}

fn compare_scores_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Errors that abort a build. Problems limited to a single row are never reported here.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum OutcomeMapError {
    #[snafu(display("Input is not valid {encoding}: {source}"))]
    Encoding {
        source: std::str::Utf8Error,
        encoding: String,
    },
    #[snafu(display("Input does not contain any data row"))]
    EmptyInput {},
    #[snafu(display(
        "No outcome left after reading {rows_read} rows ({rows_dropped} dropped without outcome text)"
    ))]
    EmptyDataset {
        rows_read: usize,
        rows_dropped: usize,
    },
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Encoding {
    /// Strict UTF-8 first, Latin-1 if the bytes are not valid UTF-8.
    Auto,
    Utf8,
    /// ISO-8859-1. Every byte sequence is valid.
    Latin1,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DecimalSeparator {
    Comma,
    Dot,
}

impl DecimalSeparator {
    pub fn as_char(&self) -> char {
        match self {
            DecimalSeparator::Comma => ',',
            DecimalSeparator::Dot => '.',
        }
    }

    pub fn alternate(&self) -> DecimalSeparator {
        match self {
            DecimalSeparator::Comma => DecimalSeparator::Dot,
            DecimalSeparator::Dot => DecimalSeparator::Comma,
        }
    }
}

/// The statistic used to collapse the scores of duplicated outcomes.
///
/// Only the values present in a group are considered. Empty cells do not count as zero.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AggregationMethod {
    Average,
    /// For an even number of values, the mean of the two central values.
    Median,
    /// The first value in file order.
    First,
    Max,
    Min,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParseRules {
    pub encoding: Encoding,
    pub decimal_separator: DecimalSeparator,
    /// When false, every row becomes its own outcome.
    pub aggregate: bool,
    pub aggregation_method: AggregationMethod,
}

impl ParseRules {
    pub const DEFAULT_RULES: ParseRules = ParseRules {
        encoding: Encoding::Auto,
        decimal_separator: DecimalSeparator::Comma,
        aggregate: true,
        aggregation_method: AggregationMethod::Average,
    };
}

impl Default for ParseRules {
    fn default() -> Self {
        ParseRules::DEFAULT_RULES
    }
}
