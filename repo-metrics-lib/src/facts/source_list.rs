use crate::Result;
use camino::Utf8Path;
use ohno::{EnrichableExt, IntoAppError, bail};
use std::io::Read;

/// One input row: its original cells plus the repository identifier it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    /// Cells of the row, aligned with [`SourceList::columns`].
    pub values: Vec<String>,

    /// The repository identifier, if the row has a non-empty one.
    pub identifier: Option<String>,
}

/// The repositories to process, in input order.
///
/// Rows read from a CSV file keep all of their cells so they can be passed through
/// to the output. Identifiers given on the command line get empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    columns: Vec<String>,
    rows: Vec<SourceRow>,
}

impl SourceList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a CSV file whose `identifier_column` holds repository identifiers.
    pub fn from_csv_file(path: &Utf8Path, identifier_column: &str) -> Result<Self> {
        let file = std::fs::File::open(path).into_app_err_with(|| format!("opening input file '{path}'"))?;
        Self::from_csv_reader(file, identifier_column).map_err(|e| e.enrich_with(|| format!("reading input file '{path}'")))
    }

    /// Read CSV data whose `identifier_column` holds repository identifiers.
    pub fn from_csv_reader(reader: impl Read, identifier_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let Some(index) = columns.iter().position(|c| c.trim() == identifier_column) else {
            bail!("column '{identifier_column}' not found (available columns: {})", columns.join(", "));
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;

            let mut values: Vec<String> = record.iter().map(str::to_string).collect();
            values.resize(columns.len(), String::new());

            let identifier = record.get(index).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
            rows.push(SourceRow { values, identifier });
        }

        Ok(Self { columns, rows })
    }

    /// Append a repository identifier that did not come from the input file.
    pub fn push_identifier(&mut self, identifier: &str) {
        self.rows.push(SourceRow {
            values: vec![String::new(); self.columns.len()],
            identifier: Some(identifier.trim().to_string()).filter(|s| !s.is_empty()),
        });
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    const INPUT: &str = "Title,Github_links,Genre\n\
                         Space Game,https://github.com/owner/space,Shooter\n\
                         No Link,,Puzzle\n\
                         Short Row,https://github.com/owner/short\n";

    #[test]
    fn test_from_csv_reader() {
        let list = SourceList::from_csv_reader(INPUT.as_bytes(), "Github_links").unwrap();

        assert_eq!(list.columns(), ["Title", "Github_links", "Genre"]);
        assert_eq!(list.len(), 3);

        let rows = list.rows();
        assert_eq!(rows[0].identifier.as_deref(), Some("https://github.com/owner/space"));
        assert_eq!(rows[0].values, ["Space Game", "https://github.com/owner/space", "Shooter"]);
        assert_eq!(rows[1].identifier, None);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let list = SourceList::from_csv_reader(INPUT.as_bytes(), "Github_links").unwrap();
        assert_eq!(list.rows()[2].values, ["Short Row", "https://github.com/owner/short", ""]);
    }

    #[test]
    fn test_missing_identifier_column() {
        let err = SourceList::from_csv_reader(INPUT.as_bytes(), "Repository").unwrap_err();
        assert!(err.to_string().contains("Repository"));
    }

    #[test]
    fn test_push_identifier() {
        let mut list = SourceList::from_csv_reader(INPUT.as_bytes(), "Github_links").unwrap();
        list.push_identifier(" https://github.com/owner/extra ");
        list.push_identifier("   ");

        assert_eq!(list.len(), 5);
        assert_eq!(list.rows()[3].values, ["", "", ""]);
        assert_eq!(list.rows()[3].identifier.as_deref(), Some("https://github.com/owner/extra"));
        assert_eq!(list.rows()[4].identifier, None);
    }

    #[test]
    fn test_push_identifier_without_file() {
        let mut list = SourceList::new();
        assert!(list.is_empty());

        list.push_identifier("https://github.com/owner/repo");
        assert!(list.columns().is_empty());
        assert!(list.rows()[0].values.is_empty());
    }

    #[test]
    fn test_from_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("games.csv")).unwrap();
        std::fs::write(&path, INPUT).unwrap();

        let list = SourceList::from_csv_file(&path, "Github_links").unwrap();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_from_missing_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("missing.csv")).unwrap();

        let _ = SourceList::from_csv_file(&path, "Github_links").unwrap_err();
    }
}
