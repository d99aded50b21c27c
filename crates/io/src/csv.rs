// CSV export of report tables

use std::fs::File;
use std::io::Write;
use std::path::Path;

use metagrid_engine::Table;

/// Excel only detects UTF-8 in CSV files that start with a byte-order mark.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn write_csv(table: &Table, path: &Path) -> Result<(), String> {
    let mut file = File::create(path).map_err(|e| e.to_string())?;
    file.write_all(UTF8_BOM).map_err(|e| e.to_string())?;
    write_records(table, file)?;
    tracing::info!(path = %path.display(), rows = table.len(), "csv written");
    Ok(())
}

pub fn write_records<W: Write>(table: &Table, out: W) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(&table.columns).map_err(|e| e.to_string())?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    use metagrid_engine::Value;

    fn table() -> Table {
        let mut t = Table::new(["Código Regional", "Nombre de la Regional", "Cupos"]);
        t.push(vec![Value::Integer(5), "ANTIOQUIA".into(), Value::Integer(-50)], false);
        t.push(vec![Value::Integer(11), "DISTRITO CAPITAL, BOGOTÁ".into()], false);
        t
    }

    #[test]
    fn starts_with_bom_and_quotes_commas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cupos.csv");
        write_csv(&table(), &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Código Regional,Nombre de la Regional,Cupos");
        assert_eq!(lines[1], "5,ANTIOQUIA,-50");
        assert_eq!(lines[2], "11,\"DISTRITO CAPITAL, BOGOTÁ\",");
    }
}
