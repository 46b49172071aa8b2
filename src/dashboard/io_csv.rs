// Primitives for reading CSV files.

use std::fs::File;

use crate::dashboard::{
    io_common::{datapoint_from_row, simplify_file_name, ColumnIndex, REQUIRED_COLUMNS},
    *,
};

/// Reads a CSV file of datapoints with a header row.
pub fn read_csv_datapoints(path: &str) -> DashboardResult<Vec<ParsedDatapoint>> {
    let default_id = make_default_id(path);
    let (columns, records) = get_records(path)?;

    let mut res: Vec<ParsedDatapoint> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let row: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if row.iter().all(|s| s.is_empty()) {
            debug!("read_csv_datapoints: lineno: {:?}: empty line", lineno);
            continue;
        }
        let pd = datapoint_from_row(&columns, &row, default_id(lineno), lineno);
        debug!("read_csv_datapoints: lineno: {:?} datapoint: {:?}", lineno, pd);
        res.push(pd);
    }
    Ok(res)
}

fn get_records(path: &str) -> DashboardResult<(ColumnIndex, csv::StringRecordsIntoIter<File>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    let header = rdr.headers().context(OpeningCsvSnafu { path })?;
    let header_cells: Vec<&str> = header.iter().collect();
    let columns = ColumnIndex::from_header(&header_cells);
    debug!("get_records: header: {:?}", header_cells);
    for column in REQUIRED_COLUMNS.iter() {
        columns.require(column, path)?;
    }
    Ok((columns, rdr.into_records()))
}

fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}
