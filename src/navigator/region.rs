use crate::config::{ScoutConfig, SuggestionStrategy};
use crate::error::{Result, ScoutError};
use crate::models::Region;
use crate::session::UiSession;
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const SUGGESTION_POLL: Duration = Duration::from_millis(100);

/// Query for every autocomplete entry, in document order.
///
/// [`find_suggestion`] indexes the same matches, so the index it returns can be
/// clicked with [`UiSession::click_nth`] on this query.
pub fn suggestion_items(list: &str, item: &str) -> String {
    format!("{} {}", list, item)
}

/// Index of the first suggestion naming both `region` and `state_code`.
///
/// The region match is a case-insensitive substring match, the state code has
/// to appear as a whole word so "TX" does not match inside another name.
pub fn find_suggestion(
    list_html: &str,
    item_selector: &str,
    region: &str,
    state_code: &str,
) -> Result<Option<usize>> {
    let selector = Selector::parse(item_selector).map_err(|e| {
        ScoutError::Config(format!("bad suggestion item selector '{}': {:?}", item_selector, e))
    })?;
    let document = Html::parse_fragment(list_html);
    let region = region.to_lowercase();

    let position = document.select(&selector).position(|item| {
        let text = item.text().collect::<String>();
        text.to_lowercase().contains(&region)
            && text
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word.eq_ignore_ascii_case(state_code))
    });
    Ok(position)
}

/// Points the search page at a region through the search box
pub struct RegionSelector<'a> {
    session: &'a dyn UiSession,
    config: &'a ScoutConfig,
}

impl<'a> RegionSelector<'a> {
    pub fn new(session: &'a dyn UiSession, config: &'a ScoutConfig) -> Self {
        Self { session, config }
    }

    pub async fn select(&self, region: &Region) -> Result<()> {
        let selectors = &self.config.selectors;
        let timeouts = &self.config.timeouts;
        let input = selectors.search_input.as_str();

        self.session
            .wait_for(input, timeouts.element())
            .await
            .map_err(|e| ScoutError::navigation(format!("search box '{}'", input), e.to_string()))?;

        // Autocomplete can put text back after a clear, so clear repeatedly
        for attempt in 0..self.config.clear_attempts.max(1) {
            debug!("clearing search box (attempt {})", attempt + 1);
            self.session.clear(input).await?;
            settle(timeouts.settle()).await;
        }

        let text = self.config.search_text(region);
        info!("Searching for '{}'", text);
        self.session.type_text(input, &text).await?;

        self.session
            .wait_for(&selectors.suggestion_list, timeouts.element())
            .await
            .map_err(|e| ScoutError::RegionNotFound {
                region: region.to_string(),
                detail: format!("no suggestions appeared: {}", e),
            })?;

        // Armed before the pick so the results refresh cannot slip past
        let refresh = self
            .session
            .arm_network_wait(&self.config.results_request)
            .await?;

        match self.config.suggestion_strategy {
            SuggestionStrategy::FirstSuggestion => {
                self.session.press_key("ArrowDown").await?;
                self.session.press_key("Enter").await?;
            }
            SuggestionStrategy::MatchStateCode => {
                let idx = self.await_suggestion(region).await?;
                let items =
                    suggestion_items(&selectors.suggestion_list, &selectors.suggestion_item);
                debug!("picking suggestion #{} of {}", idx, items);
                self.session.click_nth(&items, idx).await?;
            }
        }

        refresh.wait(timeouts.network()).await?;
        self.session
            .wait_for(&selectors.results_count, timeouts.element())
            .await?;
        Ok(())
    }

    /// Re-read the list until an entry for `region` in the configured state
    /// shows up. The list can be empty or still hold the previous query's
    /// entries right after typing.
    async fn await_suggestion(&self, region: &Region) -> Result<usize> {
        let selectors = &self.config.selectors;
        let deadline = Instant::now() + self.config.timeouts.element();
        loop {
            let html = self.session.read_html(&selectors.suggestion_list).await?;
            if let Some(idx) = find_suggestion(
                &html,
                &selectors.suggestion_item,
                region.name(),
                &self.config.state_code,
            )? {
                return Ok(idx);
            }
            if Instant::now() >= deadline {
                return Err(ScoutError::RegionNotFound {
                    region: region.to_string(),
                    detail: format!("no suggestion in {}", self.config.state_code),
                });
            }
            tokio::time::sleep(SUGGESTION_POLL).await;
        }
    }
}

pub(crate) async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
