use log::{debug, info, warn};

use outcome_map::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::omap::config_reader::*;
use crate::omap::io_common::simplify_file_name;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MapError {
    #[snafu(display("Error reading file {path}"))]
    ReadingInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing CSV file {path}"))]
    CsvParse { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV file {path} at line {lineno}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Workbook {path} does not contain any worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Workbook {path} does not contain the worksheet {name}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Error reading JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Pipeline { source: OutcomeMapError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type MapResult<T> = Result<T, MapError>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputProvider {
    Csv,
    Xlsx,
}

/// All the settings of one run, after merging the command line and the configuration file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MapSettings {
    pub input_path: String,
    pub provider: InputProvider,
    pub delimiter: Option<u8>,
    pub worksheet_name: Option<String>,
    pub rules: ParseRules,
    pub out: Option<String>,
    pub sort: SortOrder,
    pub title: Option<String>,
}

fn validate_encoding(s: &str) -> MapResult<Encoding> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(Encoding::Auto),
        "utf-8" | "utf8" => Ok(Encoding::Utf8),
        "iso-8859-1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
        x => whatever!(
            "Unknown encoding {:?}: expected auto, utf-8 or iso-8859-1",
            x
        ),
    }
}

fn validate_decimal_separator(s: &str) -> MapResult<DecimalSeparator> {
    match s {
        "," | "comma" => Ok(DecimalSeparator::Comma),
        "." | "dot" => Ok(DecimalSeparator::Dot),
        x => whatever!("Unknown decimal separator {:?}: expected ',' or '.'", x),
    }
}

fn validate_aggregation_method(s: &str) -> MapResult<AggregationMethod> {
    match s {
        "average" | "mean" => Ok(AggregationMethod::Average),
        "median" => Ok(AggregationMethod::Median),
        "first" => Ok(AggregationMethod::First),
        "max" => Ok(AggregationMethod::Max),
        "min" => Ok(AggregationMethod::Min),
        x => whatever!(
            "Cannot use aggregation method {:?}: expected average, median, first, max or min",
            x
        ),
    }
}

fn validate_sort(s: &str) -> MapResult<SortOrder> {
    match s {
        "input" => Ok(SortOrder::Input),
        "opportunity" | "score" => Ok(SortOrder::OpportunityDesc),
        x => whatever!("Cannot sort by {:?}: expected input or opportunity", x),
    }
}

fn validate_provider(s: Option<&str>, path: &str) -> MapResult<InputProvider> {
    match s {
        Some("csv") => Ok(InputProvider::Csv),
        Some("xlsx") | Some("excel") => Ok(InputProvider::Xlsx),
        Some(x) => whatever!("Provider not implemented {:?}", x),
        None if path.to_lowercase().ends_with(".xlsx") => Ok(InputProvider::Xlsx),
        None => Ok(InputProvider::Csv),
    }
}

fn validate_delimiter(s: &str) -> MapResult<u8> {
    match s {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        x if x.len() == 1 && x.is_ascii() => Ok(x.as_bytes()[0]),
        x => whatever!("Cannot use {:?} as a column delimiter", x),
    }
}

/// Merges the command line arguments and the optional configuration file.
///
/// `root` is the directory of the configuration file, used to locate the input.
pub fn resolve_settings(
    args: &Args,
    config: Option<&MapConfig>,
    root: Option<&Path>,
) -> MapResult<MapSettings> {
    let default_config = MapConfig::default();
    let cfg = config.unwrap_or(&default_config);
    let input_settings = &cfg.input_settings;

    let input_path: String = match (&args.input, &input_settings.file_path) {
        (Some(p), _) => p.clone(),
        (None, Some(p)) => {
            let full: PathBuf = match root {
                Some(r) => r.join(p),
                None => PathBuf::from(p),
            };
            full.display().to_string()
        }
        (None, None) => {
            whatever!("No input file: use --input or set filePath in the configuration file")
        }
    };

    let provider = validate_provider(
        args.input_type
            .as_deref()
            .or(input_settings.provider.as_deref()),
        &input_path,
    )?;

    let mut rules = ParseRules::DEFAULT_RULES;
    if let Some(e) = args.encoding.as_ref().or(input_settings.encoding.as_ref()) {
        rules.encoding = validate_encoding(e)?;
    }
    if let Some(d) = args
        .decimal_sep
        .as_ref()
        .or(input_settings.decimal_separator.as_ref())
    {
        rules.decimal_separator = validate_decimal_separator(d)?;
    }
    if args.no_aggregate {
        rules.aggregate = false;
    } else if let Some(a) = cfg.rules.aggregate {
        rules.aggregate = a;
    }
    if let Some(m) = args
        .agg_method
        .as_ref()
        .or(cfg.rules.aggregation_method.as_ref())
    {
        rules.aggregation_method = validate_aggregation_method(m)?;
    }

    let delimiter = match args.delimiter.as_ref().or(input_settings.delimiter.as_ref()) {
        Some(d) => Some(validate_delimiter(d)?),
        None => None,
    };

    let sort = match args.sort.as_ref().or(cfg.output_settings.sort.as_ref()) {
        Some(s) => validate_sort(s)?,
        None => SortOrder::Input,
    };

    let out = match (&args.out, &cfg.output_settings.output_path) {
        (Some(o), _) => Some(o.clone()),
        (None, Some(o)) if o == "stdout" || o.is_empty() => Some("stdout".to_string()),
        (None, Some(o)) => Some(match root {
            Some(r) => r.join(o).display().to_string(),
            None => o.clone(),
        }),
        (None, None) => None,
    };

    Ok(MapSettings {
        input_path,
        provider,
        delimiter,
        worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or_else(|| input_settings.worksheet_name.clone()),
        rules,
        out,
        sort,
        title: cfg.output_settings.title.clone(),
    })
}

fn read_records(settings: &MapSettings) -> MapResult<Vec<RawRecord>> {
    info!(
        "Attempting to read {:?} file {:?}",
        settings.provider, settings.input_path
    );
    match settings.provider {
        InputProvider::Csv => io_csv::read_csv_records(
            &settings.input_path,
            settings.rules.encoding,
            settings.delimiter,
        ),
        InputProvider::Xlsx => io_excel::read_excel_records(
            &settings.input_path,
            settings.worksheet_name.as_deref(),
        ),
    }
}

/// Reads the input and runs the whole pipeline.
pub fn load_dataset(settings: &MapSettings, generated_at: &str) -> MapResult<MapDataset> {
    let records = read_records(settings)?;
    debug!("load_dataset: {} records read", records.len());
    let source = SourceMeta {
        source_name: simplify_file_name(&settings.input_path),
        generated_at: generated_at.to_string(),
    };
    run_outcome_map(&records, &settings.rules, source).context(PipelineSnafu {})
}

pub fn dataset_to_json(ds: &MapDataset, order: SortOrder, title: Option<&str>) -> JSValue {
    let outcomes: Vec<JSValue> = ds
        .ordered(order)
        .iter()
        .map(|o| {
            json!({
                "outcome": o.outcome_text(),
                "focus": o.focus_label(),
                "importance": o.importance(),
                "satisfaction": o.satisfaction(),
                "sampleSize": o.sample_size(),
                "opportunityScore": o.opportunity_score(),
                "missingScores": o.missing_scores(),
            })
        })
        .collect();
    let stats = ds.stats();
    json!({
        "source": {
            "name": ds.source().source_name,
            "generatedAt": ds.source().generated_at,
        },
        "title": title,
        "stats": {
            "rowsRead": stats.rows_read,
            "rowsDropped": stats.rows_dropped,
            "outcomesAfterAggregation": stats.outcomes_after_aggregation,
            "outcomesMissingScores": stats.outcomes_missing_scores,
        },
        "outcomes": outcomes,
    })
}

// The generation time differs between runs and is not compared.
fn comparable_json(js: &JSValue) -> JSValue {
    let mut res = js.clone();
    if let Some(source) = res.get_mut("source").and_then(|s| s.as_object_mut()) {
        source.remove("generatedAt");
    }
    res
}

fn check_reference(dataset_js: &JSValue, reference_path: &str) -> MapResult<()> {
    let reference = read_reference(reference_path)?;
    let pretty_ref =
        serde_json::to_string_pretty(&comparable_json(&reference)).context(ParsingJsonSnafu {})?;
    let pretty_ds =
        serde_json::to_string_pretty(&comparable_json(dataset_js)).context(ParsingJsonSnafu {})?;
    if pretty_ref != pretty_ds {
        warn!("Found differences with the reference dataset");
        print_diff(pretty_ref.as_str(), pretty_ds.as_str(), "\n");
        whatever!(
            "Difference detected between the dataset and the reference {}",
            reference_path
        )
    }
    info!("check_reference: dataset matches {:?}", reference_path);
    Ok(())
}

fn write_output(pretty_js: &str, out: Option<&str>) -> MapResult<()> {
    match out {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty_js);
            Ok(())
        }
        Some(path) => {
            info!("Writing dataset to {:?}", path);
            fs::write(path, pretty_js).context(WritingOutputSnafu { path })
        }
    }
}

pub fn run_map(args: &Args) -> MapResult<()> {
    let config: Option<MapConfig> = match &args.config {
        Some(p) => Some(read_config(p)?),
        None => None,
    };
    info!("config: {:?}", config);
    let root: Option<&Path> = args.config.as_deref().and_then(|p| Path::new(p).parent());

    let settings = resolve_settings(args, config.as_ref(), root)?;
    info!("settings: {:?}", settings);

    let generated_at = chrono::Utc::now().to_rfc3339();
    let dataset = load_dataset(&settings, &generated_at)?;

    let stats = dataset.stats();
    if stats.rows_dropped > 0 {
        warn!("{} rows dropped (no outcome text)", stats.rows_dropped);
    }
    if stats.outcomes_missing_scores > 0 {
        warn!(
            "{} outcomes without importance or satisfaction values",
            stats.outcomes_missing_scores
        );
    }

    let dataset_js = dataset_to_json(&dataset, settings.sort, settings.title.as_deref());

    // The reference is checked before anything is written.
    if let Some(reference_path) = &args.reference {
        check_reference(&dataset_js, reference_path)?;
    }

    let pretty_js = serde_json::to_string_pretty(&dataset_js).context(ParsingJsonSnafu {})?;
    write_output(&pretty_js, settings.out.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn test_file(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn args_for(input: &str) -> Args {
        Args {
            input: Some(test_file(input)),
            ..Args::default()
        }
    }

    const TIME: &str = "2024-01-01T00:00:00+00:00";

    #[test]
    fn resultado_geral_with_config_and_reference() {
        init();
        let out = std::env::temp_dir().join(format!("outcomemap-test-{}.json", std::process::id()));
        let args = Args {
            config: Some(test_file("resultado_geral_config.json")),
            reference: Some(test_file("resultado_geral_expected.json")),
            out: Some(out.display().to_string()),
            ..Args::default()
        };
        run_map(&args).unwrap();
        let written = read_reference(&out.display().to_string()).unwrap();
        assert_eq!(written["stats"]["rowsRead"], json!(7));
        assert_eq!(written["outcomes"][0]["outcome"], json!("Minimize time to book"));
        let _ = fs::remove_file(out);
    }

    #[test]
    fn resultado_geral_counts() {
        let settings = resolve_settings(&args_for("resultado_geral.csv"), None, None).unwrap();
        let ds = load_dataset(&settings, TIME).unwrap();
        assert_eq!(ds.source().source_name, "resultado_geral.csv");
        assert_eq!(ds.stats().rows_read, 7);
        assert_eq!(ds.stats().rows_dropped, 1);
        assert_eq!(ds.stats().outcomes_after_aggregation, 4);
        assert_eq!(ds.stats().outcomes_missing_scores, 1);
        let first = &ds.outcomes()[0];
        assert_eq!(first.outcome_text(), "Find nearby options");
        assert_eq!(first.importance(), 7.75);
        assert_eq!(first.satisfaction(), 3.75);
        assert_eq!(first.opportunity_score(), 11.75);
        assert_eq!(ds.outcomes()[1].focus_label(), "Booking");
    }

    #[test]
    fn latin1_file_matches_utf8_file() {
        init();
        let utf8 = resolve_settings(&args_for("resultado_geral.csv"), None, None).unwrap();
        let latin1_auto =
            resolve_settings(&args_for("resultado_geral_latin1.csv"), None, None).unwrap();
        let latin1_forced = resolve_settings(
            &Args {
                encoding: Some("iso-8859-1".to_string()),
                ..args_for("resultado_geral_latin1.csv")
            },
            None,
            None,
        )
        .unwrap();
        let a = load_dataset(&utf8, TIME).unwrap();
        let b = load_dataset(&latin1_auto, TIME).unwrap();
        let c = load_dataset(&latin1_forced, TIME).unwrap();
        assert_eq!(a.outcomes(), b.outcomes());
        assert_eq!(b.outcomes(), c.outcomes());
    }

    #[test]
    fn latin1_file_rejected_in_strict_utf8() {
        let settings = resolve_settings(
            &Args {
                encoding: Some("utf-8".to_string()),
                ..args_for("resultado_geral_latin1.csv")
            },
            None,
            None,
        )
        .unwrap();
        let res = load_dataset(&settings, TIME);
        assert!(matches!(
            res,
            Err(MapError::Pipeline {
                source: OutcomeMapError::Encoding { .. }
            })
        ));
    }

    #[test]
    fn blank_outcomes_file() {
        let settings = resolve_settings(&args_for("blank_outcomes.csv"), None, None).unwrap();
        let res = load_dataset(&settings, TIME);
        assert!(matches!(
            res,
            Err(MapError::Pipeline {
                source: OutcomeMapError::EmptyDataset { .. }
            })
        ));
    }

    #[test]
    fn same_input_same_output() {
        let settings = resolve_settings(&args_for("resultado_geral.csv"), None, None).unwrap();
        let a = dataset_to_json(
            &load_dataset(&settings, TIME).unwrap(),
            SortOrder::OpportunityDesc,
            None,
        );
        let b = dataset_to_json(
            &load_dataset(&settings, TIME).unwrap(),
            SortOrder::OpportunityDesc,
            None,
        );
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn reference_mismatch_fails() {
        let settings = resolve_settings(
            &Args {
                agg_method: Some("max".to_string()),
                ..args_for("resultado_geral.csv")
            },
            None,
            None,
        )
        .unwrap();
        let ds = load_dataset(&settings, TIME).unwrap();
        let js = dataset_to_json(&ds, SortOrder::OpportunityDesc, Some("Resultado Geral"));
        assert!(check_reference(&js, &test_file("resultado_geral_expected.json")).is_err());
    }

    #[test]
    fn command_line_overrides_config() {
        let config = MapConfig {
            input_settings: InputSettings {
                file_path: Some("survey.csv".to_string()),
                decimal_separator: Some(".".to_string()),
                ..InputSettings::default()
            },
            rules: RulesSettings {
                aggregate: Some(true),
                aggregation_method: Some("median".to_string()),
            },
            output_settings: OutputSettings {
                output_path: Some("map.json".to_string()),
                sort: Some("opportunity".to_string()),
                title: None,
            },
        };
        let args = Args {
            agg_method: Some("min".to_string()),
            ..Args::default()
        };
        let root = Path::new("/data/surveys");
        let s = resolve_settings(&args, Some(&config), Some(root)).unwrap();
        assert_eq!(s.input_path, "/data/surveys/survey.csv");
        assert_eq!(s.out, Some("/data/surveys/map.json".to_string()));
        assert_eq!(s.provider, InputProvider::Csv);
        assert_eq!(s.rules.decimal_separator, DecimalSeparator::Dot);
        assert_eq!(s.rules.aggregation_method, AggregationMethod::Min);
        assert!(s.rules.aggregate);
        assert_eq!(s.sort, SortOrder::OpportunityDesc);

        let no_agg = Args {
            no_aggregate: true,
            ..Args::default()
        };
        let s = resolve_settings(&no_agg, Some(&config), Some(root)).unwrap();
        assert!(!s.rules.aggregate);
    }

    #[test]
    fn empty_output_path_is_stdout() {
        let config = MapConfig {
            output_settings: OutputSettings {
                output_path: Some("".to_string()),
                ..OutputSettings::default()
            },
            ..MapConfig::default()
        };
        let root = Path::new("/data/surveys");
        let s = resolve_settings(&args_for("resultado_geral.csv"), Some(&config), Some(root))
            .unwrap();
        assert_eq!(s.out, Some("stdout".to_string()));
    }

    #[test]
    fn defaults() {
        let s = resolve_settings(&args_for("resultado_geral.csv"), None, None).unwrap();
        assert_eq!(s.rules, ParseRules::DEFAULT_RULES);
        assert_eq!(s.sort, SortOrder::Input);
        assert_eq!(s.delimiter, None);
        assert_eq!(s.out, None);
    }

    #[test]
    fn invalid_options() {
        let bad = |a: Args| resolve_settings(&a, None, None).is_err();
        assert!(bad(Args::default()));
        assert!(bad(Args {
            agg_method: Some("mode".to_string()),
            ..args_for("x.csv")
        }));
        assert!(bad(Args {
            encoding: Some("utf-16".to_string()),
            ..args_for("x.csv")
        }));
        assert!(bad(Args {
            decimal_sep: Some(";".to_string()),
            ..args_for("x.csv")
        }));
        assert!(bad(Args {
            input_type: Some("ods".to_string()),
            ..args_for("x.csv")
        }));
        assert!(bad(Args {
            delimiter: Some("::".to_string()),
            ..args_for("x.csv")
        }));
    }

    #[test]
    fn provider_from_extension() {
        assert_eq!(
            validate_provider(None, "Resultado Geral.XLSX").unwrap(),
            InputProvider::Xlsx
        );
        assert_eq!(
            validate_provider(None, "resultado.csv").unwrap(),
            InputProvider::Csv
        );
        assert_eq!(
            validate_provider(Some("csv"), "resultado.xlsx").unwrap(),
            InputProvider::Csv
        );
    }

    #[test]
    fn delimiters() {
        assert_eq!(validate_delimiter(";").unwrap(), b';');
        assert_eq!(validate_delimiter("tab").unwrap(), b'\t');
        assert_eq!(validate_delimiter("\\t").unwrap(), b'\t');
    }
}
