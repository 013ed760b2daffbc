//! Raw record tables.
//!
//! A [`RecordTable`] holds the rows of one spreadsheet-like input source as
//! ordered field→raw string mappings. Nothing is interpreted at load time: typed
//! access goes through [`Record::text`], [`Record::number`] and [`Record::flag`],
//! which treat blank and unparsable cells as *unspecified* rather than zero.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use indexmap::IndexMap;

/// One input row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// 1-based position in the source table, header excluded.
    row: usize,
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            fields: IndexMap::new(),
        }
    }

    pub fn from_pairs<K, V>(row: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            row,
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Untrimmed cell content.
    pub fn raw(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Trimmed cell content; blank cells are `None`.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.raw(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Numeric cell content. Blank, non-numeric and NaN cells are `None`.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.text(field)
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| !value.is_nan())
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.text(field)?.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Named table of records sharing a header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    pub name: String,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a table from rows of `(column, value)` pairs; the header is the
    /// union of columns in first-seen order.
    pub fn from_rows<K, V, R>(name: impl Into<String>, rows: impl IntoIterator<Item = R>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        R: IntoIterator<Item = (K, V)>,
    {
        let mut table = Self::new(name);
        for (idx, row) in rows.into_iter().enumerate() {
            table.push(Record::from_pairs(idx + 1, row));
        }
        table
    }

    pub fn push(&mut self, record: Record) {
        for (field, _) in record.fields() {
            if !self.columns.iter().any(|c| c == field) {
                self.columns.push(field.to_string());
            }
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Parse CSV from any reader. Header names are trimmed; short rows are
    /// accepted and missing cells stay unspecified.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let name = name.into();
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .with_context(|| format!("reading header of table '{name}'"))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = Self::new(name);
        table.columns = headers.clone();
        for (idx, result) in rdr.records().enumerate() {
            let row = result.with_context(|| format!("reading row {} of table '{}'", idx + 1, table.name))?;
            let mut record = Record::new(idx + 1);
            for (column, value) in headers.iter().zip(row.iter()) {
                record.set(column.clone(), value);
            }
            table.records.push(record);
        }
        Ok(table)
    }

    /// Load a CSV file; the table takes the file stem as its name.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening table {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_reader(name, file).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = WriterBuilder::new()
            .from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        wtr.write_record(&self.columns)?;
        for record in &self.records {
            let row: Vec<&str> = self
                .columns
                .iter()
                .map(|column| record.raw(column).unwrap_or(""))
                .collect();
            wtr.write_record(&row)?;
        }
        wtr.flush()
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_non_numeric_cells_are_unspecified() {
        let record = Record::from_pairs(
            1,
            [("p_nom", "  "), ("p_nom_max", "n/a"), ("p_nom_min", " 0 "), ("nan", "NaN")],
        );
        assert_eq!(record.number("p_nom"), None);
        assert_eq!(record.number("p_nom_max"), None);
        assert_eq!(record.number("p_nom_min"), Some(0.0));
        assert_eq!(record.number("nan"), None);
        assert_eq!(record.number("missing"), None);
    }

    #[test]
    fn text_is_trimmed() {
        let record = Record::from_pairs(1, [("name", "  DE_EL \t"), ("carrier", "")]);
        assert_eq!(record.text("name"), Some("DE_EL"));
        assert_eq!(record.raw("name"), Some("  DE_EL \t"));
        assert_eq!(record.text("carrier"), None);
    }

    #[test]
    fn flags_accept_common_spellings() {
        let record = Record::from_pairs(1, [("a", "TRUE"), ("b", "0"), ("c", "maybe")]);
        assert_eq!(record.flag("a"), Some(true));
        assert_eq!(record.flag("b"), Some(false));
        assert_eq!(record.flag("c"), None);
    }

    #[test]
    fn csv_with_short_rows_and_padded_headers() {
        let data = "name , bus,p_nom\nA_pv,A_EL,10\nB_pv,B_EL\n";
        let table = RecordTable::from_reader("generators", data.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["name", "bus", "p_nom"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].number("p_nom"), Some(10.0));
        assert_eq!(table.records[1].number("p_nom"), None);
        assert_eq!(table.records[1].row(), 2);
    }

    #[test]
    fn from_rows_collects_header_union() {
        let table = RecordTable::from_rows(
            "buses",
            vec![vec![("name", "A_EL")], vec![("name", "A_H"), ("carrier", "heat")]],
        );
        assert_eq!(table.columns, vec!["name", "carrier"]);
        assert!(table.has_column("carrier"));
    }

    #[test]
    fn csv_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.csv");
        let table = RecordTable::from_rows(
            "lines",
            vec![vec![("name", "A-B"), ("bus0", "A_EL"), ("bus1", "B_EL")]],
        );
        table.write_csv(&path).unwrap();

        let loaded = RecordTable::read_csv(&path).unwrap();
        assert_eq!(loaded.name, "lines");
        assert_eq!(loaded.records[0].text("bus1"), Some("B_EL"));
    }
}
