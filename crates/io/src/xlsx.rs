// Excel export of report tables

use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook};

use metagrid_engine::{Table, Value};

/// Fill for emphasized (aggregate) rows.
pub const EMPHASIS_FILL: u32 = 0xF4B084;

/// Excel's limit on sheet name length.
const MAX_SHEET_NAME: usize = 31;

pub fn sheet_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect()
}

/// Write `table` as a single sheet: bold header row, emphasized rows bold
/// with a fill, numbers as numbers, nulls as blanks.
pub fn write_xlsx(table: &Table, path: &Path, sheet: &str) -> Result<(), String> {
    let mut workbook = XlsxWorkbook::new();
    let name = sheet_name(sheet);
    let worksheet = workbook
        .add_worksheet()
        .set_name(&name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))?;

    let header = Format::new().set_bold();
    let plain = Format::new();
    let emphasis = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(EMPHASIS_FILL));

    for (col, label) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, label, &header)
            .map_err(|e| e.to_string())?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let emphasized = table.emphasized.get(i).copied().unwrap_or(false);
        let format = if emphasized { &emphasis } else { &plain };
        for (col, value) in row.iter().enumerate() {
            let c = col as u16;
            let written = match value {
                Value::Null if emphasized => worksheet.write_blank(r, c, format),
                Value::Null => continue,
                Value::Integer(n) => worksheet.write_number_with_format(r, c, *n as f64, format),
                Value::Real(n) => worksheet.write_number_with_format(r, c, *n, format),
                Value::Text(s) => worksheet.write_string_with_format(r, c, s, format),
            };
            written.map_err(|e| e.to_string())?;
        }
    }
    worksheet.autofit();

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    tracing::info!(path = %path.display(), sheet = %name, rows = table.len(), "xlsx written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use tempfile::tempdir;

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("SENA Mensual Nacional Sep 2025"), "SENA Mensual Nacional Sep 2025");
        assert_eq!(sheet_name("a/b:c"), "abc");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn written_table_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reporte.xlsx");

        let mut table = Table::new(["DEPARTAMENTO", "MUNICIPIO", "Total"]);
        table.push(vec!["ANTIOQUIA".into(), Value::Null, Value::Integer(12)], true);
        table.push(vec!["ANTIOQUIA".into(), "MEDELLÍN".into(), Value::Integer(12)], false);
        write_xlsx(&table, &path, "Cupos Disponibles").unwrap();

        let mut wb = open_workbook_auto(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Cupos Disponibles".to_string()]);
        let range = wb.worksheet_range("Cupos Disponibles").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("DEPARTAMENTO".into())));
        assert_eq!(range.get_value((2, 1)), Some(&Data::String("MEDELLÍN".into())));
        assert_eq!(range.get_value((1, 2)), Some(&Data::Float(12.0)));
    }
}
