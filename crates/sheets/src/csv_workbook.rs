//! Local CSV-backed spreadsheet service

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sync_core::{DataFrame, Error, Result};
use tokio::fs;
use tracing::{debug, instrument};

use crate::{SpreadsheetId, SpreadsheetService, WorksheetId};

/// Spreadsheets as directories of CSV worksheets under a root
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    root: PathBuf,
}

impl CsvWorkbook {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// On-disk location of a worksheet
    pub fn worksheet_path(&self, sheet: &SpreadsheetId, worksheet: &WorksheetId) -> PathBuf {
        self.root.join(&sheet.0).join(format!("{}.csv", worksheet.0))
    }

    fn check_title(title: &str) -> Result<()> {
        let bad = title.trim().is_empty()
            || title == "."
            || title == ".."
            || title.contains(['/', '\\']);
        if bad {
            return Err(Error::Spreadsheet {
                message: format!("invalid title: {:?}", title),
            });
        }
        Ok(())
    }

    fn render(frame: &DataFrame) -> Result<Vec<u8>> {
        let to_err = |e: csv::Error| Error::Spreadsheet {
            message: e.to_string(),
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(frame.columns()).map_err(to_err)?;
        for row in frame.rows() {
            writer
                .write_record(row.iter().map(|cell| cell.to_string()))
                .map_err(to_err)?;
        }
        writer.into_inner().map_err(|e| Error::Spreadsheet {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SpreadsheetService for CsvWorkbook {
    #[instrument(skip(self))]
    async fn create_spreadsheet(&self, title: &str) -> Result<SpreadsheetId> {
        Self::check_title(title)?;
        fs::create_dir_all(self.root.join(title)).await?;
        Ok(SpreadsheetId(title.to_string()))
    }

    #[instrument(skip(self))]
    async fn add_worksheet(
        &self,
        sheet: &SpreadsheetId,
        title: &str,
        rows: usize,
        cols: usize,
    ) -> Result<WorksheetId> {
        Self::check_title(title)?;
        let id = WorksheetId(title.to_string());
        let path = self.worksheet_path(sheet, &id);

        if fs::metadata(&path).await.is_ok() {
            return Err(Error::Spreadsheet {
                message: format!("worksheet {:?} already exists in {:?}", title, sheet.0),
            });
        }
        fs::write(&path, b"").await?;

        debug!(path = %path.display(), rows, cols, "Worksheet added");
        Ok(id)
    }

    #[instrument(skip(self, frame), fields(rows = frame.len()))]
    async fn write_frame(
        &self,
        sheet: &SpreadsheetId,
        worksheet: &WorksheetId,
        frame: &DataFrame,
    ) -> Result<()> {
        let path = self.worksheet_path(sheet, worksheet);
        if fs::metadata(&path).await.is_err() {
            return Err(Error::Spreadsheet {
                message: format!("no worksheet {:?} in {:?}", worksheet.0, sheet.0),
            });
        }

        fs::write(&path, Self::render(frame)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export_dataframe;
    use sync_core::Cell;
    use tempfile::TempDir;

    fn metrics() -> DataFrame {
        let mut frame = DataFrame::new(["epoch", "loss", "note"]);
        frame
            .push_row(vec![Cell::Int(1), Cell::Float(0.75), Cell::Text("warmup, lr=1e-3".into())])
            .unwrap();
        frame
            .push_row(vec![Cell::Int(2), Cell::Float(0.5), Cell::Null])
            .unwrap();
        frame
    }

    #[tokio::test]
    async fn test_export_writes_csv() {
        let dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::new(dir.path());

        let sheet = export_dataframe(&workbook, &metrics(), "exp1", "metrics")
            .await
            .unwrap();
        assert_eq!(sheet, SpreadsheetId("exp1".to_string()));

        let content = std::fs::read_to_string(dir.path().join("exp1/metrics.csv")).unwrap();
        assert_eq!(
            content,
            "epoch,loss,note\n1,0.75,\"warmup, lr=1e-3\"\n2,0.5,\n"
        );
    }

    #[tokio::test]
    async fn test_duplicate_worksheet_rejected() {
        let dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::new(dir.path());

        let sheet = workbook.create_spreadsheet("exp1").await.unwrap();
        workbook.add_worksheet(&sheet, "metrics", 3, 3).await.unwrap();
        let result = workbook.add_worksheet(&sheet, "metrics", 3, 3).await;
        assert!(matches!(result, Err(Error::Spreadsheet { .. })));
    }

    #[tokio::test]
    async fn test_invalid_titles_rejected() {
        let dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::new(dir.path());

        assert!(workbook.create_spreadsheet("../escape").await.is_err());
        assert!(workbook.create_spreadsheet("").await.is_err());
    }

    #[tokio::test]
    async fn test_write_to_missing_worksheet() {
        let dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::new(dir.path());
        let sheet = workbook.create_spreadsheet("exp1").await.unwrap();

        let result = workbook
            .write_frame(&sheet, &WorksheetId("nope".into()), &metrics())
            .await;
        assert!(matches!(result, Err(Error::Spreadsheet { .. })));
    }
}
