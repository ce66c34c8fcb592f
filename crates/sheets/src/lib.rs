//! Spreadsheet export for dataframes
//!
//! The spreadsheet provider sits behind `SpreadsheetService`. `CsvWorkbook`
//! is the local implementation: one directory per spreadsheet, one CSV file
//! per worksheet.

mod csv_workbook;

use async_trait::async_trait;
use sync_core::{DataFrame, Result};
use tracing::info;

pub use csv_workbook::CsvWorkbook;

/// Identifier of a created spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetId(pub String);

/// Identifier of a worksheet inside a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetId(pub String);

/// Call/response interface to a spreadsheet provider
#[async_trait]
pub trait SpreadsheetService: Send + Sync {
    /// Create a new, empty spreadsheet
    async fn create_spreadsheet(&self, title: &str) -> Result<SpreadsheetId>;

    /// Add a worksheet with room for `rows` x `cols` cells
    async fn add_worksheet(
        &self,
        sheet: &SpreadsheetId,
        title: &str,
        rows: usize,
        cols: usize,
    ) -> Result<WorksheetId>;

    /// Write the frame's header and rows into the worksheet
    async fn write_frame(
        &self,
        sheet: &SpreadsheetId,
        worksheet: &WorksheetId,
        frame: &DataFrame,
    ) -> Result<()>;
}

/// Create a spreadsheet holding `frame` in a single worksheet
pub async fn export_dataframe(
    service: &dyn SpreadsheetService,
    frame: &DataFrame,
    title: &str,
    worksheet: &str,
) -> Result<SpreadsheetId> {
    let sheet = service.create_spreadsheet(title).await?;
    let ws = service
        .add_worksheet(&sheet, worksheet, frame.len() + 1, frame.columns().len())
        .await?;
    service.write_frame(&sheet, &ws, frame).await?;

    info!(spreadsheet = %sheet.0, worksheet = %ws.0, rows = frame.len(), "Dataframe exported");
    Ok(sheet)
}
