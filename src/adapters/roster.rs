use crate::domain::model::RosterRow;
use crate::domain::ports::RosterSource;
use crate::utils::error::Result;
use crate::utils::validation::validate_column_letters;
use std::path::{Path, PathBuf};

/// 試算表欄位代號轉成 0 起算的索引：A -> 0, B -> 1, AA -> 26
pub fn column_index(letters: &str) -> Result<usize> {
    validate_column_letters("column", letters)?;

    let index = letters
        .bytes()
        .map(|b| (b.to_ascii_uppercase() - b'A') as usize + 1)
        .fold(0usize, |acc, digit| acc * 26 + digit);
    Ok(index - 1)
}

/// 從試算表匯出的 CSV 讀取名冊，第 1 列為標題
#[derive(Debug, Clone)]
pub struct CsvRoster {
    path: PathBuf,
    group_column: usize,
    name_column: usize,
}

impl CsvRoster {
    pub fn new(path: impl AsRef<Path>, group_column: &str, name_column: &str) -> Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            group_column: column_index(group_column)?,
            name_column: column_index(name_column)?,
        })
    }

    fn parse<R: std::io::Read>(&self, reader: R) -> Result<Vec<RosterRow>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let cell = |column: usize| record.get(column).unwrap_or("").trim().to_string();
            let group = cell(self.group_column);
            let name = cell(self.name_column);

            if group.is_empty() && name.is_empty() {
                continue;
            }

            rows.push(RosterRow {
                row: index + 2,
                group,
                name,
            });
        }

        Ok(rows)
    }
}

impl RosterSource for CsvRoster {
    fn rows(&self) -> Result<Vec<RosterRow>> {
        let file = std::fs::File::open(&self.path)?;
        let rows = self.parse(file)?;
        tracing::debug!("📄 Read {} roster rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }
}
