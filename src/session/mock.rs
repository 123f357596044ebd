//! Scripted in-memory page for exercising the workflow without a browser.
//!
//! The page keeps toggle attributes that flip when clicked, resets its filters
//! whenever a new region is picked, and only updates the displayed result
//! count when a results refresh "response" fires. Responses fired while no
//! wait is armed are lost, like the real event stream.

use crate::config::{keys, ScoutConfig, ToggleAttribute, ToggleKind};
use crate::error::{Result, ScoutError};
use crate::models::SoldWindow;
use crate::navigator::region::suggestion_items;
use crate::session::traits::{NetworkWait, UiSession};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

type Counter = Arc<dyn Fn(&MockPage) -> String + Send + Sync>;

/// Builds the suggestion list markup from the typed region and the state code
pub type SuggestionLayout = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

const EMPTY_LIST: &str = "<ul role=\"listbox\"></ul>";

/// One county in a foreign state, the county in `state`, then a road in `state`
pub fn flat_suggestions(region: &str, state: &str) -> String {
    format!(
        "<ul role=\"listbox\"><li>{r} County, OK</li><li>{r} County, {s}</li><li>{r} Road, {s}</li></ul>",
        r = region,
        s = state
    )
}

/// Observable page state
pub struct MockPage {
    pub present: HashSet<String>,
    pub attributes: HashMap<(String, String), String>,
    pub toggles: HashMap<String, ToggleAttribute>,
    pub radio_groups: Vec<Vec<String>>,
    pub texts: HashMap<String, String>,
    pub html: HashMap<String, String>,
    /// Clicks (or `key:<name>` presses) that refresh the results
    pub refresh_on: HashSet<String>,
    pub refresh_url: String,
    pub results_selector: String,
    pub search_selector: String,
    pub suggestion_list: String,
    pub suggestion_item: String,
    pub state_code: String,
    pub suggestion_layout: SuggestionLayout,
    /// Typing shows no suggestion list at all when false
    pub offer_suggestions: bool,
    /// Reads of the suggestion list that still come back empty after typing
    pub loading_reads: usize,
    /// Text of the suggestion that was clicked last
    pub picked: Option<String>,
    /// Selectors missing while a given region is active
    pub hidden: Vec<(String, String)>,
    pub typed: String,
    pub region: Option<String>,
    pub counter: Counter,
    initial_attributes: HashMap<(String, String), String>,
    log: Vec<String>,
    armed: Vec<(String, oneshot::Sender<String>)>,
}

impl MockPage {
    pub fn is_on(&self, selector: &str) -> bool {
        let Some(toggle) = self.toggles.get(selector) else {
            return false;
        };
        let value = self
            .attributes
            .get(&(selector.to_string(), toggle.name.clone()));
        match toggle.kind {
            ToggleKind::Aria => value.map(String::as_str) == Some("true"),
            ToggleKind::Presence => value.is_some(),
        }
    }

    fn set_on(&mut self, selector: &str, on: bool) {
        let Some(toggle) = self.toggles.get(selector).cloned() else {
            return;
        };
        let key = (selector.to_string(), toggle.name);
        match (toggle.kind, on) {
            (ToggleKind::Aria, on) => {
                self.attributes.insert(key, on.to_string());
            }
            (ToggleKind::Presence, true) => {
                self.attributes.insert(key, String::new());
            }
            (ToggleKind::Presence, false) => {
                self.attributes.remove(&key);
            }
        }
    }

    fn is_present(&self, selector: &str) -> bool {
        if let Some(region) = &self.region {
            if self
                .hidden
                .iter()
                .any(|(r, s)| r.eq_ignore_ascii_case(region) && s == selector)
            {
                return false;
            }
        }
        self.present.contains(selector)
    }

    fn press(&mut self, selector: &str) {
        if self.toggles.contains_key(selector) {
            let group = self
                .radio_groups
                .iter()
                .find(|g| g.iter().any(|s| s == selector))
                .cloned();
            match group {
                Some(group) => {
                    for member in group {
                        self.set_on(&member, member == selector);
                    }
                }
                None => {
                    let on = self.is_on(selector);
                    self.set_on(selector, !on);
                }
            }
        }
    }

    /// Activate the entry reading `text`, or the typed text via the keyboard
    fn pick_region(&mut self, text: Option<String>) {
        let source = text.as_deref().unwrap_or(&self.typed);
        let region = source.split_whitespace().next().unwrap_or_default().to_string();
        self.region = Some(region);
        self.picked = text;
        self.attributes = self.initial_attributes.clone();
    }

    fn suggestion_texts(&self) -> Vec<String> {
        let Some(html) = self.html.get(&self.suggestion_list) else {
            return Vec::new();
        };
        let Ok(selector) = Selector::parse(&self.suggestion_item) else {
            return Vec::new();
        };
        let document = Html::parse_fragment(html);
        let texts: Vec<String> = document
            .select(&selector)
            .map(|item| item.text().collect::<String>())
            .collect();
        texts
    }

    fn refresh(&mut self) {
        let counter = Arc::clone(&self.counter);
        let text = counter(self);
        self.texts.insert(self.results_selector.clone(), text);
        self.present.insert(self.results_selector.clone());

        let url = format!("https://example.test/{}?q=1", self.refresh_url);
        let mut delivered = false;
        let mut still_armed = Vec::new();
        for (fragment, tx) in self.armed.drain(..) {
            if tx.is_closed() {
                continue;
            }
            if url.contains(&fragment) {
                delivered |= tx.send(url.clone()).is_ok();
            } else {
                still_armed.push((fragment, tx));
            }
        }
        self.armed = still_armed;
        self.log.push(format!(
            "{}:{}",
            if delivered { "respond" } else { "lost" },
            self.refresh_url
        ));
    }

    fn type_into_search(&mut self, text: &str) {
        self.typed.push_str(text);
        if !self.offer_suggestions {
            return;
        }
        let region = text.split_whitespace().next().unwrap_or_default();
        let layout = Arc::clone(&self.suggestion_layout);
        let html = layout(region, &self.state_code);
        self.html.insert(self.suggestion_list.clone(), html);
        self.present.insert(self.suggestion_list.clone());
    }
}

/// Per-region counts served by the default counter
#[derive(Debug, Clone, Copy)]
pub struct Counts {
    pub for_sale: u64,
    pub sold: [(SoldWindow, u64); 4],
}

impl Default for Counts {
    fn default() -> Self {
        Self {
            for_sale: 1_200,
            sold: [
                (SoldWindow::OneMonth, 30),
                (SoldWindow::ThreeMonths, 120),
                (SoldWindow::SixMonths, 210),
                (SoldWindow::OneYear, 300),
            ],
        }
    }
}

pub struct MockSession {
    page: Mutex<MockPage>,
}

impl MockSession {
    /// Page laid out after `config`'s selectors, starting on the site's
    /// defaults: every home type on, for-sale with the default sub-statuses,
    /// sold window on one year.
    pub fn for_config(config: &ScoutConfig) -> Self {
        let mut page = MockPage {
            present: HashSet::new(),
            attributes: HashMap::new(),
            toggles: HashMap::new(),
            radio_groups: Vec::new(),
            texts: HashMap::new(),
            html: HashMap::new(),
            refresh_on: HashSet::new(),
            refresh_url: config.results_request.clone(),
            results_selector: config.selectors.results_count.clone(),
            search_selector: config.selectors.search_input.clone(),
            suggestion_list: config.selectors.suggestion_list.clone(),
            suggestion_item: config.selectors.suggestion_item.clone(),
            state_code: config.state_code.clone(),
            suggestion_layout: Arc::new(flat_suggestions),
            offer_suggestions: true,
            loading_reads: 0,
            picked: None,
            hidden: Vec::new(),
            typed: String::new(),
            region: None,
            counter: Arc::new(|_: &MockPage| String::new()),
            initial_attributes: HashMap::new(),
            log: Vec::new(),
            armed: Vec::new(),
        };
        page.present.insert(page.search_selector.clone());

        for control in [
            &config.filters.property_type,
            &config.filters.listing_status,
            &config.filters.sold_window,
        ] {
            page.present.insert(control.trigger.clone());
            if let Some(section) = &control.section {
                page.present.insert(section.clone());
                page.toggles
                    .insert(section.clone(), ToggleAttribute::aria("aria-expanded"));
                page.attributes
                    .insert((section.clone(), "aria-expanded".to_string()), "false".to_string());
            }
            if let Some(confirm) = &control.confirm {
                page.present.insert(confirm.clone());
                page.refresh_on.insert(confirm.clone());
            }
            for (key, option) in &control.options {
                page.present.insert(option.selector.clone());
                page.toggles
                    .insert(option.selector.clone(), control.toggle_for(key).clone());
            }
        }

        let status = &config.filters.listing_status;
        let selector = |key: &str| status.options[key].selector.clone();
        page.radio_groups
            .push(vec![selector(keys::FOR_SALE), selector(keys::SOLD)]);
        page.radio_groups.push(
            config
                .filters
                .sold_window
                .options
                .values()
                .map(|o| o.selector.clone())
                .collect(),
        );
        // Picking a window applies immediately; there is no confirm button
        for option in config.filters.sold_window.options.values() {
            page.refresh_on.insert(option.selector.clone());
        }
        page.refresh_on.insert("key:Enter".to_string());

        for option in config.filters.property_type.options.values() {
            page.set_on(&option.selector, true);
        }
        page.set_on(&selector(keys::FOR_SALE), true);
        page.set_on(&selector(keys::SOLD), false);
        for (key, on) in [("active", true), ("pending", false), ("coming_soon", true)] {
            if let Some(option) = status.options.get(key) {
                page.set_on(&option.selector, on);
            }
        }
        for (window, option) in &config.filters.sold_window.options {
            page.set_on(&option.selector, window == SoldWindow::OneYear.key());
        }
        page.initial_attributes = page.attributes.clone();

        let session = Self {
            page: Mutex::new(page),
        };
        session.serve_counts(config, HashMap::new());
        session
    }

    /// Serve `counts` per region (default counts otherwise), but only while the
    /// filters really are land only with the configured for-sale pattern.
    /// Any other filter combination shows a bogus count.
    pub fn serve_counts(&self, config: &ScoutConfig, counts: HashMap<String, Counts>) {
        let filters = config.filters.clone();
        let substatus = config.for_sale_substatus.clone();
        let counter: Counter = Arc::new(move |page: &MockPage| {
            let counts = page
                .region
                .as_ref()
                .and_then(|r| counts.get(r).copied())
                .unwrap_or_default();

            let land_only = filters.property_type.options.iter().all(|(key, option)| {
                page.is_on(&option.selector) == (key == keys::LAND)
            });
            if !land_only {
                return "99,999 results".to_string();
            }

            let status = &filters.listing_status.options;
            if page.is_on(&status[keys::SOLD].selector) {
                let window = filters
                    .sold_window
                    .options
                    .iter()
                    .find(|(_, option)| page.is_on(&option.selector))
                    .map(|(key, _)| key.clone());
                counts
                    .sold
                    .iter()
                    .find(|(w, _)| Some(w.key().to_string()) == window)
                    .map(|(_, n)| format!("{} results", n))
                    .unwrap_or_default()
            } else if page.is_on(&status[keys::FOR_SALE].selector)
                && substatus
                    .iter()
                    .all(|(key, &on)| page.is_on(&status[key].selector) == on)
            {
                format!("{} results", group_thousands(counts.for_sale))
            } else {
                "99,999 results".to_string()
            }
        });
        self.page().counter = counter;
    }

    /// Make `selector` disappear while `region` is active
    pub fn hide_for_region(&self, region: &str, selector: &str) {
        self.page()
            .hidden
            .push((region.to_string(), selector.to_string()));
    }

    pub fn with_page<T>(&self, f: impl FnOnce(&mut MockPage) -> T) -> T {
        f(&mut self.page())
    }

    pub fn log(&self) -> Vec<String> {
        self.page().log.clone()
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        let entry = format!("click:{}", selector);
        self.page().log.iter().filter(|e| **e == entry).count()
    }

    pub fn clear_log(&self) {
        self.page().log.clear();
    }

    fn page(&self) -> std::sync::MutexGuard<'_, MockPage> {
        self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn missing(selector: &str) -> ScoutError {
    ScoutError::session("find element", format!("no element matches '{}'", selector))
}

#[async_trait]
impl UiSession for MockSession {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.page().log.push(format!("navigate:{}", url));
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.page().is_present(selector) {
            Ok(())
        } else {
            Err(ScoutError::Timeout {
                what: format!("element '{}'", selector),
                after_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn read_attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let page = self.page();
        if !page.is_present(selector) {
            return Err(missing(selector));
        }
        Ok(page
            .attributes
            .get(&(selector.to_string(), name.to_string()))
            .cloned())
    }

    async fn read_text(&self, selector: &str) -> Result<String> {
        let page = self.page();
        if !page.is_present(selector) {
            return Err(missing(selector));
        }
        Ok(page.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn read_html(&self, selector: &str) -> Result<String> {
        let mut page = self.page();
        if !page.is_present(selector) {
            return Err(missing(selector));
        }
        if selector == page.suggestion_list && page.loading_reads > 0 {
            page.loading_reads -= 1;
            return Ok(EMPTY_LIST.to_string());
        }
        Ok(page.html.get(selector).cloned().unwrap_or_default())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut page = self.page();
        if !page.is_present(selector) {
            return Err(missing(selector));
        }
        page.log.push(format!("click:{}", selector));
        page.press(selector);
        if page.refresh_on.contains(selector) {
            page.refresh();
        }
        Ok(())
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<()> {
        let mut page = self.page();
        if selector != suggestion_items(&page.suggestion_list, &page.suggestion_item) {
            return Err(missing(selector));
        }
        let text = page
            .suggestion_texts()
            .into_iter()
            .nth(index)
            .ok_or_else(|| missing(&format!("{} #{}", selector, index)))?;
        page.log.push(format!("click:{}#{}", selector, index));
        page.pick_region(Some(text));
        page.refresh();
        Ok(())
    }

    async fn clear(&self, selector: &str) -> Result<()> {
        let mut page = self.page();
        page.log.push(format!("clear:{}", selector));
        if selector == page.search_selector {
            page.typed.clear();
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let mut page = self.page();
        page.log.push(format!("type:{}:{}", selector, text));
        if selector == page.search_selector {
            page.type_into_search(text);
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut page = self.page();
        page.log.push(format!("key:{}", key));
        if key == "Enter" && page.present.contains(&page.suggestion_list) {
            page.pick_region(None);
        }
        if page.refresh_on.contains(&format!("key:{}", key)) {
            page.refresh();
        }
        Ok(())
    }

    async fn arm_network_wait(&self, url_fragment: &str) -> Result<Box<dyn NetworkWait>> {
        let (tx, rx) = oneshot::channel();
        let mut page = self.page();
        page.log.push(format!("arm:{}", url_fragment));
        page.armed.push((url_fragment.to_string(), tx));
        Ok(Box::new(MockNetworkWait { rx }))
    }
}

struct MockNetworkWait {
    rx: oneshot::Receiver<String>,
}

#[async_trait]
impl NetworkWait for MockNetworkWait {
    async fn wait(self: Box<Self>, timeout: Duration) -> Result<String> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(url)) => Ok(url),
            Ok(Err(_)) => Err(ScoutError::session("network wait", "sender dropped")),
            Err(_) => Err(ScoutError::Timeout {
                what: "search results refresh".to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
