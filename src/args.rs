use clap::Parser;

/// This program turns outcome survey exports into scored outcome maps.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with the input, rules and output settings.
    /// Options given on the command line take precedence over the ones in this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A dataset previously produced by this program. If provided, outcomemap
    /// will check that the new dataset matches it (the generation time is not compared).
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the dataset in JSON format.
    /// Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) The survey export to read. Setting this option overrides the path that
    /// may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default auto) The encoding of a CSV input: auto, utf-8 or iso-8859-1.
    #[clap(long, value_parser)]
    pub encoding: Option<String>,

    /// (default ',') The decimal separator of the scores: ',' or '.'.
    #[clap(long, value_parser)]
    pub decimal_sep: Option<String>,

    /// (default: detected from the header) The column separator of a CSV input.
    #[clap(long, value_parser)]
    pub delimiter: Option<String>,

    /// If passed as an argument, every row is kept as its own outcome.
    #[clap(long, takes_value = false)]
    pub no_aggregate: bool,

    /// (default average) How duplicated outcomes are merged: average, median, first, max or min.
    #[clap(long, value_parser)]
    pub agg_method: Option<String>,

    /// (default input) The order of the outcomes in the output: input or opportunity.
    #[clap(long, value_parser)]
    pub sort: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
