//! Site, selector and timing configuration.
//!
//! Every selector here belongs to the target site's markup, so all of it can be
//! overridden from a JSON file. Fields missing from the file keep their defaults.

use crate::error::{Result, ScoutError};
use crate::models::{FilterDimension, Region, SoldWindow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Option keys the workflow relies on
pub mod keys {
    pub const LAND: &str = "land";
    pub const FOR_SALE: &str = "for_sale";
    pub const SOLD: &str = "sold";
}

/// How a toggle attribute encodes the option's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleKind {
    /// `"true"` / `"false"`; a missing or `"mixed"` value reads as indeterminate
    Aria,
    /// Boolean HTML attribute such as `checked`: present means on
    Presence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleAttribute {
    pub name: String,
    pub kind: ToggleKind,
}

impl ToggleAttribute {
    pub fn aria(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ToggleKind::Aria,
        }
    }

    pub fn presence(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ToggleKind::Presence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionControl {
    pub selector: String,
    /// Overrides the control-wide toggle attribute for this option
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle: Option<ToggleAttribute>,
}

impl OptionControl {
    fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            toggle: None,
        }
    }

    fn with_toggle(selector: &str, toggle: ToggleAttribute) -> Self {
        Self {
            selector: selector.to_string(),
            toggle: Some(toggle),
        }
    }
}

/// One filter popover on the search page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterControl {
    /// Button that opens the popover
    pub trigger: String,
    /// Collapsible header wrapping the options, if any
    #[serde(default)]
    pub section: Option<String>,
    /// Button that applies the selection and closes the popover
    #[serde(default)]
    pub confirm: Option<String>,
    pub toggle: ToggleAttribute,
    pub options: BTreeMap<String, OptionControl>,
}

impl FilterControl {
    pub fn option(&self, key: &str) -> Option<&OptionControl> {
        self.options.get(key)
    }

    /// Toggle attribute in effect for `key`
    pub fn toggle_for(&self, key: &str) -> &ToggleAttribute {
        self.options
            .get(key)
            .and_then(|o| o.toggle.as_ref())
            .unwrap_or(&self.toggle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterControls {
    pub property_type: FilterControl,
    pub listing_status: FilterControl,
    pub sold_window: FilterControl,
}

impl FilterControls {
    pub fn control(&self, dimension: FilterDimension) -> &FilterControl {
        match dimension {
            FilterDimension::PropertyType => &self.property_type,
            FilterDimension::ListingStatus => &self.listing_status,
            FilterDimension::SoldWindow => &self.sold_window,
        }
    }
}

impl Default for FilterControls {
    fn default() -> Self {
        let property_type = FilterControl {
            trigger: "#home-type button".to_string(),
            section: None,
            confirm: Some("#home-type .filter-apply".to_string()),
            toggle: ToggleAttribute::presence("checked"),
            options: [
                ("houses", "#isSingleFamily"),
                ("townhomes", "#isTownhouse"),
                ("multi_family", "#isMultiFamily"),
                ("condos", "#isCondo"),
                (keys::LAND, "#isLotLand"),
                ("apartments", "#isApartment"),
                ("manufactured", "#isManufactured"),
            ]
            .into_iter()
            .map(|(k, s)| (k.to_string(), OptionControl::new(s)))
            .collect(),
        };

        let radio = ToggleAttribute::aria("aria-checked");
        let listing_status = FilterControl {
            trigger: "#listing-type button".to_string(),
            section: Some("#listing-type .sub-status-toggle".to_string()),
            confirm: Some("#listing-type .filter-apply".to_string()),
            toggle: ToggleAttribute::presence("checked"),
            options: [
                (
                    keys::FOR_SALE,
                    OptionControl::with_toggle(
                        "#isForSaleByAgent_isForSaleByOwner_isNewConstruction_isComingSoon_isAuction_isForSaleForeclosure_isPreMarketForeclosure_isPreMarketPreForeclosure",
                        radio.clone(),
                    ),
                ),
                (
                    keys::SOLD,
                    OptionControl::with_toggle("#isRecentlySold", radio),
                ),
                ("active", OptionControl::new("#isActive")),
                ("pending", OptionControl::new("#isPending")),
                ("coming_soon", OptionControl::new("#isComingSoon")),
            ]
            .into_iter()
            .map(|(k, o)| (k.to_string(), o))
            .collect(),
        };

        let sold_window = FilterControl {
            trigger: "#sold-in-last button".to_string(),
            section: None,
            confirm: None,
            toggle: ToggleAttribute::aria("aria-selected"),
            options: [
                (SoldWindow::OneMonth, "#sold-in-last [data-value='30']"),
                (SoldWindow::ThreeMonths, "#sold-in-last [data-value='90']"),
                (SoldWindow::SixMonths, "#sold-in-last [data-value='6m']"),
                (SoldWindow::OneYear, "#sold-in-last [data-value='12m']"),
            ]
            .into_iter()
            .map(|(w, s)| (w.key().to_string(), OptionControl::new(s)))
            .collect(),
        };

        Self {
            property_type,
            listing_status,
            sold_window,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSelectors {
    pub search_input: String,
    pub suggestion_list: String,
    pub suggestion_item: String,
    pub results_count: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            search_input: "input".to_string(),
            suggestion_list: "#search-box-input-listbox".to_string(),
            suggestion_item: "li".to_string(),
            results_count: ".result-count".to_string(),
        }
    }
}

/// How the autocomplete list is resolved after typing a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStrategy {
    /// Arrow down onto the first suggestion and press Enter
    FirstSuggestion,
    /// Click the first suggestion naming both the region and the state code
    MatchStateCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub navigation_ms: u64,
    pub element_ms: u64,
    pub network_ms: u64,
    /// Pause after a refresh for client-side rendering; no readiness signal exists for it
    pub settle_ms: u64,
}

impl Timeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn network(&self) -> Duration {
        Duration::from_millis(self.network_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 20_000,
            element_ms: 10_000,
            network_ms: 15_000,
            settle_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub site_url: String,
    pub regions: Vec<Region>,
    /// Appended to the region name when typing it into the search box
    pub region_suffix: String,
    pub state_code: String,
    pub suggestion_strategy: SuggestionStrategy,
    pub sold_windows: Vec<SoldWindow>,
    /// On/off pattern forced on the for-sale sub-statuses
    pub for_sale_substatus: BTreeMap<String, bool>,
    /// URL fragment of the request that refreshes search results
    pub results_request: String,
    pub selectors: PageSelectors,
    pub filters: FilterControls,
    pub headless: bool,
    pub viewport: (u32, u32),
    pub timeouts: Timeouts,
    /// Times the search box is force-cleared before typing
    pub clear_attempts: u32,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            site_url: "https://www.zillow.com/homes/for_sale/land_type/1-_acre/1_pnd/12m_days"
                .to_string(),
            regions: ["Travis", "Williamson", "Hays", "Bastrop", "Burnet"]
                .into_iter()
                .map(Region::new)
                .collect(),
            region_suffix: " County".to_string(),
            state_code: "TX".to_string(),
            suggestion_strategy: SuggestionStrategy::MatchStateCode,
            sold_windows: SoldWindow::DEFAULT_ORDER.to_vec(),
            for_sale_substatus: [("active", true), ("pending", true), ("coming_soon", false)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            results_request: "GetSearchPageState".to_string(),
            selectors: PageSelectors::default(),
            filters: FilterControls::default(),
            headless: true,
            viewport: (1080, 1024),
            timeouts: Timeouts::default(),
            clear_attempts: 3,
        }
    }
}

impl ScoutConfig {
    /// Load a JSON override file on top of the defaults.
    ///
    /// Not validated here: command line overrides still apply on top, so call
    /// [`ScoutConfig::validate`] once the configuration is final.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Check that every option the workflow will target has a selector
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(ScoutError::Config("no regions configured".to_string()));
        }
        if self.sold_windows.is_empty() {
            return Err(ScoutError::Config("no sold windows configured".to_string()));
        }

        let require = |dimension: FilterDimension, key: &str| -> Result<()> {
            match self.filters.control(dimension).option(key) {
                Some(_) => Ok(()),
                None => Err(ScoutError::Config(format!(
                    "{} control has no option '{}'",
                    dimension, key
                ))),
            }
        };

        require(FilterDimension::PropertyType, keys::LAND)?;
        require(FilterDimension::ListingStatus, keys::FOR_SALE)?;
        require(FilterDimension::ListingStatus, keys::SOLD)?;
        for key in self.for_sale_substatus.keys() {
            require(FilterDimension::ListingStatus, key)?;
        }
        for window in &self.sold_windows {
            require(FilterDimension::SoldWindow, window.key())?;
        }
        Ok(())
    }

    /// Text typed into the search box for `region`
    pub fn search_text(&self, region: &Region) -> String {
        format!("{}{}", region.name(), self.region_suffix)
    }
}
