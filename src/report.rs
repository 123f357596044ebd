use crate::error::Result;
use crate::models::{ResultRecord, SoldWindow};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Region,
    ForSale,
    Sold(SoldWindow),
    SellThrough(SoldWindow),
    ScrapedAt,
    Failure,
}

/// Output column: stable id, display title, and what it shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub kind: ColumnKind,
}

impl Column {
    fn new(id: impl Into<String>, title: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
        }
    }

    pub fn render(&self, record: &ResultRecord) -> String {
        match self.kind {
            ColumnKind::Region => record.region.to_string(),
            ColumnKind::ForSale => record.for_sale.to_string(),
            ColumnKind::Sold(window) => record.sold(window).to_string(),
            ColumnKind::SellThrough(window) => record
                .sell_through(window)
                .map(|pct| format!("{:.2}", pct))
                .unwrap_or_default(),
            ColumnKind::ScrapedAt => record.scraped_at.to_rfc3339(),
            ColumnKind::Failure => record.failure.clone().unwrap_or_default(),
        }
    }
}

/// Report layout for the configured windows, in window order
pub fn columns(windows: &[SoldWindow]) -> Vec<Column> {
    let mut columns = vec![
        Column::new("county", "County", ColumnKind::Region),
        Column::new("for_sale", "For Sale", ColumnKind::ForSale),
    ];
    for &window in windows {
        columns.push(Column::new(
            format!("sold_{}", window.key()),
            format!("Sold ({})", window),
            ColumnKind::Sold(window),
        ));
    }
    for &window in windows {
        columns.push(Column::new(
            format!("sell_through_{}", window.key()),
            format!("Sell-Through % ({})", window),
            ColumnKind::SellThrough(window),
        ));
    }
    columns.push(Column::new("scraped_at", "Scraped At", ColumnKind::ScrapedAt));
    columns.push(Column::new("error", "Error", ColumnKind::Failure));
    columns
}

/// Receives the finished table in one piece
pub trait ReportSink {
    fn write(&self, table: &[ResultRecord], columns: &[Column]) -> Result<()>;
}

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ReportSink for CsvSink {
    fn write(&self, table: &[ResultRecord], columns: &[Column]) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(columns.iter().map(|c| c.title.as_str()))?;
        for record in table {
            writer.write_record(columns.iter().map(|c| c.render(record)))?;
        }
        writer.flush()?;
        info!("💾 Wrote {} rows to {}", table.len(), self.path.display());
        Ok(())
    }
}
