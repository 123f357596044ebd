//! Per-region state machine: pick the region, force land only, count for-sale,
//! then count sold listings for every configured window.

use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::extractor::MetricsExtractor;
use crate::models::{
    FilterDimension, ListingStatus, MetricSample, PropertyType, Region, ResultRecord, SoldWindow,
};
use crate::navigator::region::settle;
use crate::navigator::{FilterNavigator, FilterOutcome, FilterTarget, RegionSelector};
use crate::session::UiSession;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    RegionSelected,
    LandFilterApplied,
    ForSaleSelected,
    ForSaleCounted,
    SoldWindowSelected(SoldWindow),
    SoldCounted(SoldWindow),
    Done,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SoldWindowSelected(w) => write!(f, "SoldWindowSelected({})", w),
            Self::SoldCounted(w) => write!(f, "SoldCounted({})", w),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A region's workflow stopped while moving into `step`
#[derive(Debug, Error)]
#[error("{region}: failed entering {step}: {source}")]
pub struct WorkflowError {
    pub region: Region,
    pub step: WorkflowState,
    #[source]
    pub source: ScoutError,
}

pub struct RegionWorkflow<'a> {
    session: &'a dyn UiSession,
    config: &'a ScoutConfig,
}

impl<'a> RegionWorkflow<'a> {
    pub fn new(session: &'a dyn UiSession, config: &'a ScoutConfig) -> Self {
        Self { session, config }
    }

    /// Run the whole sequence for `region`, filling `record` as counts come in.
    ///
    /// On failure `record` keeps every metric extracted so far.
    pub async fn run(
        &self,
        region: &Region,
        record: &mut ResultRecord,
    ) -> std::result::Result<WorkflowState, WorkflowError> {
        let mut step = WorkflowState::Idle;
        match self.drive(region, record, &mut step).await {
            Ok(()) => Ok(WorkflowState::Done),
            Err(source) => {
                reached(region, WorkflowState::Failed);
                Err(WorkflowError {
                    region: region.clone(),
                    step,
                    source,
                })
            }
        }
    }

    async fn drive(
        &self,
        region: &Region,
        record: &mut ResultRecord,
        step: &mut WorkflowState,
    ) -> Result<()> {
        let timeouts = &self.config.timeouts;
        let extractor = MetricsExtractor::new(
            self.session,
            &self.config.selectors.results_count,
            timeouts.element(),
        );

        *step = WorkflowState::RegionSelected;
        RegionSelector::new(self.session, self.config)
            .select(region)
            .await?;
        reached(region, *step);

        // The site resets filters on every region change: always re-assert
        *step = WorkflowState::LandFilterApplied;
        self.apply(
            FilterDimension::PropertyType,
            FilterTarget::property_type(PropertyType::Land, &self.config.filters.property_type),
        )
        .await?;
        reached(region, *step);

        *step = WorkflowState::ForSaleSelected;
        self.apply(
            FilterDimension::ListingStatus,
            FilterTarget::listing_status(ListingStatus::ForSale, &self.config.for_sale_substatus),
        )
        .await?;
        reached(region, *step);

        *step = WorkflowState::ForSaleCounted;
        let for_sale = extractor.extract_count().await?;
        record.set_for_sale(for_sale);
        info!("{}: {} for sale", region, display_sample(for_sale));
        reached(region, *step);

        for &window in &self.config.sold_windows {
            *step = WorkflowState::SoldWindowSelected(window);
            self.apply(
                FilterDimension::ListingStatus,
                FilterTarget::listing_status(ListingStatus::Sold, &self.config.for_sale_substatus),
            )
            .await?;
            self.apply(FilterDimension::SoldWindow, FilterTarget::sold_window(window))
                .await?;
            reached(region, *step);

            *step = WorkflowState::SoldCounted(window);
            let sold = extractor.extract_count().await?;
            record.set_sold(window, sold);
            info!(
                "{}: {} sold in the last {}",
                region,
                display_sample(sold),
                window
            );
            reached(region, *step);
        }

        *step = WorkflowState::Done;
        Ok(())
    }

    /// Set one filter and wait for the results it triggers.
    ///
    /// The network wait is armed before the first click. Arming after the
    /// click races the refresh: a fast response goes unseen and the count read
    /// next is the stale one.
    async fn apply(&self, dimension: FilterDimension, target: FilterTarget) -> Result<FilterOutcome> {
        let timeouts = &self.config.timeouts;
        let refresh = self
            .session
            .arm_network_wait(&self.config.results_request)
            .await?;

        let outcome = FilterNavigator::new(self.session, &self.config.filters, timeouts.element())
            .set_filter(dimension, &target)
            .await?;

        if outcome.changed() {
            let url = refresh.wait(timeouts.network()).await?;
            debug!("{} refreshed by {}", dimension, url);
            settle(timeouts.settle()).await;
        } else {
            debug!("{} already set, nothing to wait for", dimension);
        }
        Ok(outcome)
    }
}

fn reached(region: &Region, state: WorkflowState) {
    debug!("{}: -> {}", region, state);
}

fn display_sample(sample: MetricSample) -> String {
    match sample.count() {
        Some(n) => n.to_string(),
        None => "unavailable".to_string(),
    }
}
