use crate::core::SheetStore;
use crate::utils::error::{NotifyError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A directory of CSV files, one per sheet: `<base>/<sheet name>.csv`.
///
/// Cells are read as plain strings, which is what the sheet displays.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    base_path: PathBuf,
}

impl CsvWorkbook {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.base_path.join(format!("{sheet}.csv"))
    }

    fn read_grid(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut grid = Vec::new();
        for record in reader.records() {
            let record = record?;
            grid.push(record.iter().map(str::to_string).collect());
        }
        Ok(grid)
    }

    fn write_grid(path: &Path, grid: &[Vec<String>]) -> Result<()> {
        let tmp_path = path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp_path)?;
            for row in grid {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

impl SheetStore for CsvWorkbook {
    async fn read_display_values(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let path = self.sheet_path(sheet);
        tracing::debug!("Reading sheet from {}", path.display());
        Self::read_grid(&path)
    }

    async fn write_cell(&self, sheet: &str, row: usize, column: usize, value: &str) -> Result<()> {
        if row == 0 || column == 0 {
            return Err(NotifyError::config(format!(
                "cell coordinates are 1-based, got ({row}, {column})"
            )));
        }

        let path = self.sheet_path(sheet);
        let mut grid = Self::read_grid(&path)?;

        if grid.len() < row {
            grid.resize_with(row, || vec![String::new()]);
        }
        let cells = &mut grid[row - 1];
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value.to_string();

        Self::write_grid(&path, &grid)
    }
}
