use calamine::{open_workbook, DataType, Reader, Xlsx};
use chrono::{Duration, NaiveDate};

use crate::dashboard::{
    io_common::{datapoint_from_row, simplify_file_name, ColumnIndex, REQUIRED_COLUMNS},
    *,
};

/// Reads the datapoints of the first worksheet, or of the worksheet named in the source.
pub fn read_excel_datapoints(path: &str, source: &DataSource) -> DashboardResult<Vec<ParsedDatapoint>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &source.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };

    let simplified_file_name = simplify_file_name(path);

    let mut iter = wrange.rows();
    let header_cells: Vec<String> = iter
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(|c| cell_to_string(c, false))
        .collect::<DashboardResult<Vec<String>>>()?;
    debug!("read_excel_datapoints: header: {:?}", header_cells);
    let columns = ColumnIndex::from_header(&header_cells);
    for column in REQUIRED_COLUMNS.iter() {
        columns.require(column, path)?;
    }
    let date_idx = columns.position("date");

    let mut res: Vec<ParsedDatapoint> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let mut cells: Vec<String> = Vec::new();
        for (col, cell) in row.iter().enumerate() {
            let s = cell_to_string(cell, Some(col) == date_idx).map_err(|_| {
                DashboardError::ExcelWrongCellType {
                    lineno,
                    content: format!("{:?}", cell),
                }
            })?;
            cells.push(s);
        }
        if cells.iter().all(|s| s.is_empty()) {
            continue;
        }
        let pd = datapoint_from_row(
            &columns,
            &cells,
            format!("{}-{:08}", simplified_file_name, lineno),
            lineno,
        );
        debug!("read_excel_datapoints: datapoint: {:?}", pd);
        res.push(pd);
    }
    Ok(res)
}

/// Excel stores dates as a number of days since 1899-12-30.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn cell_to_string(cell: &DataType, is_date: bool) -> DashboardResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Empty => Ok("".to_string()),
        DataType::DateTime(f) => excel_serial_date(*f)
            .map(|d| d.to_string())
            .whatever_context(format!("Invalid date serial {}", f)),
        DataType::Float(f) if is_date => excel_serial_date(*f)
            .map(|d| d.to_string())
            .whatever_context(format!("Invalid date serial {}", f)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Int(i) if is_date => excel_serial_date(*i as f64)
            .map(|d| d.to_string())
            .whatever_context(format!("Invalid date serial {}", i)),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        _ => whatever!("could not understand cell {:?}", cell),
    }
}
