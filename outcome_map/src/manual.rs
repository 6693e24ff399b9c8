/*!

This is the long-form manual for `outcome_map` and `outcomemap`.

## Input formats

The following providers are supported by the command line:
* `csv` Comma (or semicolon, or tab) separated values, as exported by survey tools
* `xlsx` Excel workbooks

### `csv`

The first row is the header. The names of the columns do not need to be exact: they are
compared without accents, punctuation or case, and matched by the stems below, in this
order of priority:

| stem     | field        |
|----------|--------------|
| `satisf` | satisfaction |
| `import` | importance   |
| `outcom` | outcome      |
| `focus`  | focus label  |
| `foco`   | focus label  |
| `job`    | focus label  |

For example `Importância`, `IMPORTANCE (1-10)` and `importance` all designate the
importance column. A column is used for one field at most. When two columns contain the
same stem (for example `Importância` and `Importância Ponderada`), the first one is used.

```text
Focus Job;Outcome;Importância;Satisfação
Travel;Find nearby options;7,5;3
Travel;find nearby options ;8;4,5
```

The separator between columns is detected from the header row (`;`, `,` or tab), unless
it is set with the `delimiter` option. Columns other than the four fields are ignored.

The encoding of the file is detected automatically: UTF-8 when the content is valid UTF-8,
ISO-8859-1 otherwise. It can be forced with the `encoding` option (`utf-8`, `iso-8859-1`).

### `xlsx`

The first worksheet is used, unless `worksheetName` is provided. The first row is the
header and follows the same rules as the CSV header.

## Scores

Scores are read with the configured decimal separator (`,` by default). The other
separator is also accepted when the number contains exactly one separator, so `8,5` and
`8.5` are both read as 8.5. Numbers like `1.234,5`, or `1.234` with the comma separator,
look like thousands grouping and are ignored, as are empty cells
and text. An ignored score is not the same as a zero: it is left out of the
statistics of its outcome.

Rows without outcome text are dropped. The number of dropped rows is reported in the output.

## Aggregation

Rows describing the same outcome (ignoring case and extra spaces) are merged. The
importance and the satisfaction of the merged rows are combined with one of the methods
`average` (default), `median`, `first`, `max`, `min`. When no row of an outcome has a value
for a score, that score is 0 and the outcome is flagged with `missingScores`.

Aggregation can be turned off, in which case each row is an outcome.

## Opportunity score

```text
opportunity = importance + max(importance - satisfaction, 0)
```

Outcomes that are important and poorly satisfied get the highest scores. An outcome that
is more satisfied than it is important gets its importance as score.

## Configuration

All the options can be provided on the command line. They can also be written in a JSON
file passed with `--config`. Options on the command line take precedence.

```json
{
  "inputSettings": {
    "filePath": "resultado_geral.csv",
    "provider": "csv",
    "encoding": "auto",
    "decimalSeparator": ",",
    "delimiter": ";"
  },
  "rules": {
    "aggregate": true,
    "aggregationMethod": "median"
  },
  "outputSettings": {
    "outputPath": "outcome_map.json",
    "sort": "opportunity",
    "title": "Resultado Geral"
  }
}
```

The path of the input file is relative to the location of the configuration file.

## Output

The result is a JSON document with the outcomes, their scores and the number of rows read
and dropped. It is meant to be consumed by a renderer. With `--sort opportunity` the
outcomes are listed by decreasing opportunity score, otherwise in the order of the input.

 */
