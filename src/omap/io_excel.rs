use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::omap::*;

pub fn read_excel_records(path: &str, worksheet_name: Option<&str>) -> MapResult<Vec<RawRecord>> {
    let wrange = get_range(path, worksheet_name)?;
    Ok(range_to_records(&wrange))
}

/// The first row is the header, every other row is a record.
fn range_to_records(wrange: &Range<DataType>) -> Vec<RawRecord> {
    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row.iter().map(cell_to_string).collect(),
        None => return Vec::new(),
    };
    debug!("read_excel_records: header: {:?}", header);

    let mut res: Vec<RawRecord> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let values: Vec<String> = row.iter().map(cell_to_string).collect();
        debug!("read_excel_records: idx: {:?} row: {:?}", idx, &values);
        res.push(RawRecord::from_row(&header, &values));
    }
    res
}

// Numbers are rendered with a dot and go through the same parsing as CSV cells.
fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => String::new(),
        _ => {
            debug!("cell_to_string: ignoring cell {:?}", cell);
            String::new()
        }
    }
}

fn get_range(path: &str, worksheet_name: Option<&str>) -> MapResult<Range<DataType>> {
    debug!(
        "read_excel_records: path: {:?} worksheet: {:?}",
        path, worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(name) = worksheet_name {
        let wrange = workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    }
}
