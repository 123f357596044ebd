use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic search unit, e.g. a county name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filter axes exposed by the search UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    PropertyType,
    ListingStatus,
    SoldWindow,
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PropertyType => "property type",
            Self::ListingStatus => "listing status",
            Self::SoldWindow => "sold window",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Land,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    ForSale,
    Sold,
}

/// Trailing time range a sold count is measured over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SoldWindow {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "12m")]
    OneYear,
}

impl SoldWindow {
    /// Iteration order used when no windows are configured
    pub const DEFAULT_ORDER: [SoldWindow; 4] = [
        SoldWindow::ThreeMonths,
        SoldWindow::OneYear,
        SoldWindow::SixMonths,
        SoldWindow::OneMonth,
    ];

    /// Short stable key, used for config option names and column ids
    pub fn key(self) -> &'static str {
        match self {
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::OneYear => "12m",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OneMonth => "1 month",
            Self::ThreeMonths => "3 months",
            Self::SixMonths => "6 months",
            Self::OneYear => "1 year",
        }
    }
}

impl fmt::Display for SoldWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One extracted count, or the fact that the page did not show one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSample {
    Count(u64),
    #[default]
    Unavailable,
}

impl MetricSample {
    pub fn count(self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(n),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Self::Count(_))
    }
}

impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{}", n),
            Self::Unavailable => Ok(()),
        }
    }
}

/// Sold count for one window plus the derived sell-through percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub window: SoldWindow,
    pub sold: MetricSample,
    pub sell_through: Option<f64>,
}

/// Sold count as a percentage of the for-sale count, rounded to two decimals.
///
/// Undefined when either sample is unavailable or nothing is for sale.
pub fn sell_through_ratio(sold: MetricSample, for_sale: MetricSample) -> Option<f64> {
    let sold = sold.count()?;
    let for_sale = for_sale.count()?;
    if for_sale == 0 {
        return None;
    }
    let pct = sold as f64 / for_sale as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

/// Metrics collected for one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub region: Region,
    pub for_sale: MetricSample,
    pub windows: Vec<WindowMetrics>,
    pub scraped_at: DateTime<Utc>,
    /// Set when the region's workflow stopped early
    pub failure: Option<String>,
}

impl ResultRecord {
    /// Empty record with every metric unavailable
    pub fn new(region: Region, windows: &[SoldWindow]) -> Self {
        Self {
            region,
            for_sale: MetricSample::Unavailable,
            windows: windows
                .iter()
                .map(|&window| WindowMetrics {
                    window,
                    sold: MetricSample::Unavailable,
                    sell_through: None,
                })
                .collect(),
            scraped_at: Utc::now(),
            failure: None,
        }
    }

    pub fn set_for_sale(&mut self, sample: MetricSample) {
        self.for_sale = sample;
        for metrics in &mut self.windows {
            metrics.sell_through = sell_through_ratio(metrics.sold, sample);
        }
    }

    pub fn set_sold(&mut self, window: SoldWindow, sample: MetricSample) {
        let for_sale = self.for_sale;
        match self.windows.iter_mut().find(|m| m.window == window) {
            Some(metrics) => {
                metrics.sold = sample;
                metrics.sell_through = sell_through_ratio(sample, for_sale);
            }
            None => self.windows.push(WindowMetrics {
                window,
                sold: sample,
                sell_through: sell_through_ratio(sample, for_sale),
            }),
        }
    }

    pub fn sold(&self, window: SoldWindow) -> MetricSample {
        self.windows
            .iter()
            .find(|m| m.window == window)
            .map(|m| m.sold)
            .unwrap_or_default()
    }

    pub fn sell_through(&self, window: SoldWindow) -> Option<f64> {
        self.windows
            .iter()
            .find(|m| m.window == window)
            .and_then(|m| m.sell_through)
    }

    /// True while no metric at all has been extracted
    pub fn is_empty(&self) -> bool {
        !self.for_sale.is_available() && self.windows.iter().all(|m| !m.sold.is_available())
    }
}

/// Records in region iteration order
pub type ResultTable = Vec<ResultRecord>;
