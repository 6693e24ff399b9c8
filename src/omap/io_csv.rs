// Primitives for reading CSV files.

use crate::omap::*;

// Candidates in order of preference on ties.
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

pub fn read_csv_records(
    path: &str,
    encoding: Encoding,
    delimiter: Option<u8>,
) -> MapResult<Vec<RawRecord>> {
    let raw = fs::read(path).context(ReadingInputSnafu { path })?;
    let text = resolve(&raw, encoding).context(PipelineSnafu {})?;
    parse_csv_text(&text, delimiter, path)
}

/// Splits decoded text into records. The first row is the header.
pub fn parse_csv_text(text: &str, delimiter: Option<u8>, path: &str) -> MapResult<Vec<RawRecord>> {
    let delim = delimiter.unwrap_or_else(|| sniff_delimiter(text));
    debug!("parse_csv_text: delimiter: {:?}", delim as char);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .context(CsvParseSnafu { path })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("parse_csv_text: headers: {:?}", headers);

    let mut res: Vec<RawRecord> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let values: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        res.push(RawRecord::from_row(&headers, &values));
    }
    Ok(res)
}

/// Picks the most frequent delimiter of the header line, outside of quotes.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;
    for b in header.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = DELIMITERS.iter().position(|d| *d == b) {
            counts[pos] += 1;
        }
    }
    let mut best = 0;
    for (pos, count) in counts.iter().enumerate() {
        if *count > counts[best] {
            best = pos;
        }
    }
    DELIMITERS[best]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff() {
        assert_eq!(sniff_delimiter("Outcome;Importância;Satisfação\n"), b';');
        assert_eq!(sniff_delimiter("Outcome,Importance,Satisfaction"), b',');
        assert_eq!(sniff_delimiter("Outcome\tImportance\tSatisfaction"), b'\t');
        assert_eq!(sniff_delimiter("\"Outcome, text\";Importance"), b';');
        // Ties and single columns default to the comma.
        assert_eq!(sniff_delimiter("Outcome"), b',');
        assert_eq!(sniff_delimiter("a;b,c"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn semicolon_with_decimal_commas() {
        let text = "Outcome;Importância;Satisfação\nFind nearby options;7,5;3\n";
        let records = parse_csv_text(text, None, "inline").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value_at(1), Some("7,5"));
        assert_eq!(records[0].headers()[2], "Satisfação");
    }

    #[test]
    fn quoted_decimal_commas() {
        let text = "Outcome,Importance,Satisfaction\n\"Save time\",\"8,5\",3\n";
        let records = parse_csv_text(text, None, "inline").unwrap();
        assert_eq!(records[0].value_at(1), Some("8,5"));
    }

    #[test]
    fn ragged_rows() {
        let text = "Outcome;Importance;Satisfaction\nSave time;8\nReduce cost;4;5;extra\n";
        let records = parse_csv_text(text, None, "inline").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value_at(2), Some(""));
        assert_eq!(records[1].fields.len(), 3);
    }

    #[test]
    fn header_only() {
        let records = parse_csv_text("Outcome;Importance\n", None, "inline").unwrap();
        assert!(records.is_empty());
        let records = parse_csv_text("", None, "inline").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn explicit_delimiter() {
        let text = "Outcome|Importance\nSave time|9\n";
        let records = parse_csv_text(text, Some(b'|'), "inline").unwrap();
        assert_eq!(records[0].value_at(1), Some("9"));
    }
}
