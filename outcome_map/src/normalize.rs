//! Extraction of the semantic fields from a raw record.

use log::{debug, info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::*;

/// The four fields the pipeline cares about.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SemanticField {
    Focus,
    Outcome,
    Importance,
    Satisfaction,
}

/// Stems matched against normalized headers, in priority order.
///
/// A header is bound to the first field (in this order) that has one of its
/// stems in the header and is not yet bound.
pub const HEADER_RULES: &[(&str, SemanticField)] = &[
    ("satisf", SemanticField::Satisfaction),
    ("import", SemanticField::Importance),
    ("outcom", SemanticField::Outcome),
    ("focus", SemanticField::Focus),
    ("foco", SemanticField::Focus),
    ("job", SemanticField::Focus),
];

/// Column positions of the semantic fields for one header layout.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct HeaderMap {
    pub outcome: Option<usize>,
    pub focus: Option<usize>,
    pub importance: Option<usize>,
    pub satisfaction: Option<usize>,
}

impl HeaderMap {
    /// Matches the given headers against `HEADER_RULES`.
    ///
    /// When several headers contain the same stem, the first one in header
    /// order is used.
    pub fn resolve(headers: &[String]) -> HeaderMap {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut res = HeaderMap::default();
        let mut claimed: Vec<usize> = Vec::new();
        for (stem, field) in HEADER_RULES.iter() {
            if res.get(*field).is_some() {
                continue;
            }
            let found = normalized
                .iter()
                .enumerate()
                .find(|(idx, h)| !claimed.contains(idx) && h.contains(stem))
                .map(|(idx, _)| idx);
            if let Some(idx) = found {
                debug!(
                    "HeaderMap::resolve: {:?} -> {:?} (stem {:?})",
                    headers[idx], field, stem
                );
                res.set(*field, idx);
                claimed.push(idx);
            }
        }
        res
    }

    pub fn get(&self, field: SemanticField) -> Option<usize> {
        match field {
            SemanticField::Focus => self.focus,
            SemanticField::Outcome => self.outcome,
            SemanticField::Importance => self.importance,
            SemanticField::Satisfaction => self.satisfaction,
        }
    }

    fn set(&mut self, field: SemanticField, idx: usize) {
        let slot = match field {
            SemanticField::Focus => &mut self.focus,
            SemanticField::Outcome => &mut self.outcome,
            SemanticField::Importance => &mut self.importance,
            SemanticField::Satisfaction => &mut self.satisfaction,
        };
        *slot = Some(idx);
    }
}

/// The header mapping of the last header layout seen.
///
/// Records of one file share their headers, so the mapping is only computed
/// (and a missing outcome column only reported) when the layout changes.
#[derive(Debug, Clone, Default)]
pub struct HeaderCache {
    layout: Option<Vec<String>>,
    header_map: HeaderMap,
    resolutions: usize,
}

impl HeaderCache {
    pub fn header_map(&mut self, record: &RawRecord) -> &HeaderMap {
        let headers = record.headers();
        if self.layout.as_ref() != Some(&headers) {
            self.header_map = HeaderMap::resolve(&headers);
            info!("HeaderCache: header mapping: {:?}", self.header_map);
            if self.header_map.outcome.is_none() {
                warn!(
                    "HeaderCache: no outcome column found in headers {:?}, all rows will be dropped",
                    headers
                );
            }
            self.layout = Some(headers);
            self.resolutions += 1;
        }
        &self.header_map
    }

    /// How many distinct layouts were resolved.
    pub fn resolutions(&self) -> usize {
        self.resolutions
    }
}

/// Lowercase, without accents, punctuation replaced by single spaces.
pub fn normalize_header(header: &str) -> String {
    let folded: String = header
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| c.to_lowercase())
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Parses a score written with the given decimal separator.
///
/// The other separator is accepted too when it appears exactly once, the
/// configured one does not appear at all and it is not followed by a group of
/// exactly three digits. Anything ambiguous or unreadable is None.
pub fn parse_decimal(raw: &str, separator: DecimalSeparator) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let sep = separator.as_char();
    let alt = separator.alternate().as_char();
    let num_sep = s.matches(sep).count();
    let num_alt = s.matches(alt).count();
    let canonical = match (num_sep, num_alt) {
        (0, 0) => s.to_string(),
        (1, 0) => s.replace(sep, "."),
        (0, 1) if !is_thousands_grouping(s, alt) => s.replace(alt, "."),
        _ => {
            debug!("parse_decimal: ambiguous number {:?}", raw);
            return None;
        }
    };
    canonical.parse::<f64>().ok().filter(|x| x.is_finite())
}

// `1.234` under a decimal comma reads as one thousand two hundred thirty-four.
fn is_thousands_grouping(s: &str, alt: char) -> bool {
    match s.split_once(alt) {
        Some((_, frac)) => frac.len() == 3 && frac.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Extracts the semantic fields of one record. None when the row has no outcome text.
pub fn normalize_record(
    record: &RawRecord,
    header_map: &HeaderMap,
    separator: DecimalSeparator,
) -> Option<NormalizedRow> {
    let outcome_text = cell(record, header_map.outcome).trim().to_string();
    if outcome_text.is_empty() {
        return None;
    }
    Some(NormalizedRow {
        outcome_text,
        focus_label: cell(record, header_map.focus).trim().to_string(),
        importance: parse_decimal(cell(record, header_map.importance), separator),
        satisfaction: parse_decimal(cell(record, header_map.satisfaction), separator),
    })
}

fn cell(record: &RawRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| record.value_at(i)).unwrap_or("")
}

/// Normalizes a single record, resolving its own headers.
///
/// Use a `HeaderCache` with `normalize_record` when normalizing many records.
pub fn normalize(record: &RawRecord, rules: &ParseRules) -> Option<NormalizedRow> {
    let header_map = HeaderMap::resolve(&record.headers());
    normalize_record(record, &header_map, rules.decimal_separator)
}
