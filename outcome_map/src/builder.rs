pub use crate::config::*;

use crate::normalize::{normalize_record, parse_decimal, HeaderCache};
use crate::{build_from_rows, ParsedRows};

/// A builder for adding survey rows one at a time.
///
/// It is convenient when the rows do not come from a file, or when they come
/// from several files that should end up in the same map.
///
/// ```
/// use outcome_map::builder::Builder;
/// use outcome_map::{ParseRules, SourceMeta};
/// # use outcome_map::OutcomeMapError;
///
/// let mut builder = Builder::new(&ParseRules::DEFAULT_RULES)?;
///
/// builder.add_row_simple("Find nearby options", "7,5", "3")?;
/// builder.add_row_simple("find nearby options ", "8", "4,5")?;
///
/// let dataset = builder.build(SourceMeta {
///     source_name: "manual".to_string(),
///     generated_at: "2024-01-01T00:00:00Z".to_string(),
/// })?;
/// assert_eq!(dataset.outcomes()[0].opportunity_score(), 11.75);
///
/// # Ok::<(), OutcomeMapError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: ParseRules,
    pub(crate) _rows: Vec<NormalizedRow>,
    pub(crate) _rows_read: usize,
    pub(crate) _rows_dropped: usize,
    pub(crate) _headers: HeaderCache,
}

impl Builder {
    pub fn new(rules: &ParseRules) -> Result<Builder, OutcomeMapError> {
        Ok(Builder {
            _rules: rules.clone(),
            _rows: Vec::new(),
            _rows_read: 0,
            _rows_dropped: 0,
            _headers: HeaderCache::default(),
        })
    }

    /// Adds a row without a focus label.
    ///
    /// The scores are read with the decimal separator of the rules.
    pub fn add_row_simple(
        &mut self,
        outcome: &str,
        importance: &str,
        satisfaction: &str,
    ) -> Result<(), OutcomeMapError> {
        self.add_row(outcome, "", importance, satisfaction)
    }

    /// Adds a row. Rows with an empty outcome are counted as dropped.
    pub fn add_row(
        &mut self,
        outcome: &str,
        focus: &str,
        importance: &str,
        satisfaction: &str,
    ) -> Result<(), OutcomeMapError> {
        let sep = self._rules.decimal_separator;
        self.add_normalized(&NormalizedRow {
            outcome_text: outcome.to_string(),
            focus_label: focus.trim().to_string(),
            importance: parse_decimal(importance, sep),
            satisfaction: parse_decimal(satisfaction, sep),
        })
    }

    /// Adds a record as read from a file, matching its headers.
    ///
    /// The header mapping is reused as long as the records share their headers.
    pub fn add_record(&mut self, record: &RawRecord) -> Result<(), OutcomeMapError> {
        let sep = self._rules.decimal_separator;
        let row = normalize_record(record, self._headers.header_map(record), sep);
        match row {
            Some(row) => self.add_normalized(&row),
            None => {
                self._rows_read += 1;
                self._rows_dropped += 1;
                Ok(())
            }
        }
    }

    /// Adds an already extracted row. The outcome text is trimmed, and a row
    /// with an empty outcome is counted as dropped.
    pub fn add_normalized(&mut self, row: &NormalizedRow) -> Result<(), OutcomeMapError> {
        self._rows_read += 1;
        let outcome_text = row.outcome_text.trim();
        if outcome_text.is_empty() {
            self._rows_dropped += 1;
            return Ok(());
        }
        self._rows.push(NormalizedRow {
            outcome_text: outcome_text.to_string(),
            focus_label: row.focus_label.trim().to_string(),
            importance: row.importance,
            satisfaction: row.satisfaction,
        });
        Ok(())
    }

    /// Aggregates, scores and assembles all the rows added so far.
    pub fn build(self, source: SourceMeta) -> Result<MapDataset, OutcomeMapError> {
        snafu::ensure!(self._rows_read > 0, EmptyInputSnafu {});
        let parsed = ParsedRows {
            rows: self._rows,
            rows_read: self._rows_read,
            rows_dropped: self._rows_dropped,
        };
        build_from_rows(&parsed, &self._rules, source)
    }
}
