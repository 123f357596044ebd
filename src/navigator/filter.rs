//! Read-verify-toggle filter setting.
//!
//! The site's filter options are stateful checkboxes: clicking an option that
//! is already right inverts it and silently corrupts every count read after.
//! So every option is read before it is touched, only mismatches are clicked,
//! and the result is read back before the filter is applied.

use crate::config::{
    keys, FilterControl, FilterControls, OptionControl, ToggleAttribute, ToggleKind,
};
use crate::error::{Result, ScoutError};
use crate::models::{FilterDimension, ListingStatus, PropertyType, SoldWindow};
use crate::session::UiSession;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Selection state of one option as read from the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Checked,
    Unchecked,
    /// Attribute missing or mixed
    Indeterminate,
}

impl ToggleState {
    pub fn read(attribute: &ToggleAttribute, value: Option<&str>) -> Self {
        match (attribute.kind, value) {
            (ToggleKind::Presence, Some(_)) => Self::Checked,
            (ToggleKind::Presence, None) => Self::Unchecked,
            (ToggleKind::Aria, Some(v)) if v.eq_ignore_ascii_case("true") => Self::Checked,
            (ToggleKind::Aria, Some(v)) if v.eq_ignore_ascii_case("false") => Self::Unchecked,
            (ToggleKind::Aria, _) => Self::Indeterminate,
        }
    }

    /// An indeterminate option counts as off: it is clicked when it must be
    /// on and left alone when it must be off.
    pub fn satisfies(self, on: bool) -> bool {
        match self {
            Self::Checked => on,
            Self::Unchecked | Self::Indeterminate => !on,
        }
    }
}

/// Wanted on/off state for a subset of a control's options.
///
/// Radio-like options are targeted by naming only the one that must be on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTarget {
    options: Vec<(String, bool)>,
}

impl FilterTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, on: bool) -> Self {
        match self.options.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = on,
            None => self.options.push((key.to_string(), on)),
        }
        self
    }

    /// `kind` on, every other home type off
    pub fn property_type(kind: PropertyType, control: &FilterControl) -> Self {
        let wanted = match kind {
            PropertyType::Land => keys::LAND,
        };
        control
            .options
            .keys()
            .fold(Self::new(), |target, key| target.with(key, key == wanted))
    }

    /// For-sale carries its sub-status pattern; sold has none
    pub fn listing_status(status: ListingStatus, for_sale_substatus: &BTreeMap<String, bool>) -> Self {
        match status {
            ListingStatus::ForSale => for_sale_substatus
                .iter()
                .fold(Self::new().with(keys::FOR_SALE, true), |target, (key, &on)| {
                    target.with(key, on)
                }),
            ListingStatus::Sold => Self::new().with(keys::SOLD, true),
        }
    }

    pub fn sold_window(window: SoldWindow) -> Self {
        Self::new().with(window.key(), true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.options.iter().map(|(k, on)| (k.as_str(), *on))
    }
}

/// Options that have to be clicked once each to turn `current` into `target`.
///
/// Options missing from `current` are treated as indeterminate.
pub fn compute_required_clicks<'t>(
    current: &BTreeMap<String, ToggleState>,
    target: &'t FilterTarget,
) -> Vec<&'t str> {
    target
        .iter()
        .filter(|(key, on)| {
            let state = current
                .get(*key)
                .copied()
                .unwrap_or(ToggleState::Indeterminate);
            !state.satisfies(*on)
        })
        .map(|(key, _)| key)
        .collect()
}

/// What a `set_filter` call changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub dimension: FilterDimension,
    /// Option keys clicked, in click order; empty when the page already matched
    pub toggled: Vec<String>,
}

impl FilterOutcome {
    pub fn changed(&self) -> bool {
        !self.toggled.is_empty()
    }
}

pub struct FilterNavigator<'a> {
    session: &'a dyn UiSession,
    controls: &'a FilterControls,
    timeout: Duration,
}

impl<'a> FilterNavigator<'a> {
    pub fn new(session: &'a dyn UiSession, controls: &'a FilterControls, timeout: Duration) -> Self {
        Self {
            session,
            controls,
            timeout,
        }
    }

    /// Bring `dimension` to `target`, touching only options that differ
    pub async fn set_filter(
        &self,
        dimension: FilterDimension,
        target: &FilterTarget,
    ) -> Result<FilterOutcome> {
        let control = self.controls.control(dimension);

        self.require(dimension, &control.trigger).await?;
        self.session.click(&control.trigger).await?;

        if let Some(section) = &control.section {
            self.expand(dimension, section).await?;
        }

        let current = self.read_states(dimension, control, target).await?;
        let clicks = compute_required_clicks(&current, target);
        for key in &clicks {
            let option = option_control(dimension, control, key)?;
            debug!("{}: toggling '{}'", dimension, key);
            self.session.click(&option.selector).await?;
        }

        let after = self.read_states(dimension, control, target).await?;
        for (key, on) in target.iter() {
            let state = after.get(key).copied().unwrap_or(ToggleState::Indeterminate);
            if !state.satisfies(on) {
                return Err(ScoutError::navigation(
                    format!("{} option '{}'", dimension, key),
                    format!(
                        "still {:?} after toggling, wanted {}",
                        state,
                        if on { "on" } else { "off" }
                    ),
                ));
            }
        }

        if let Some(confirm) = &control.confirm {
            self.require(dimension, confirm).await?;
            self.session.click(confirm).await?;
        }

        Ok(FilterOutcome {
            dimension,
            toggled: clicks.into_iter().map(String::from).collect(),
        })
    }

    async fn read_states(
        &self,
        dimension: FilterDimension,
        control: &FilterControl,
        target: &FilterTarget,
    ) -> Result<BTreeMap<String, ToggleState>> {
        let mut states = BTreeMap::new();
        for (key, _) in target.iter() {
            let option = option_control(dimension, control, key)?;
            self.require(dimension, &option.selector).await?;
            let attribute = control.toggle_for(key);
            let value = self
                .session
                .read_attribute(&option.selector, &attribute.name)
                .await?;
            states.insert(key.to_string(), ToggleState::read(attribute, value.as_deref()));
        }
        Ok(states)
    }

    /// Open a collapsed detail section; leave an open one alone
    async fn expand(&self, dimension: FilterDimension, section: &str) -> Result<()> {
        self.require(dimension, section).await?;
        let expanded = self.session.read_attribute(section, "aria-expanded").await?;
        if expanded.as_deref() != Some("true") {
            debug!("{}: expanding '{}'", dimension, section);
            self.session.click(section).await?;
        }
        Ok(())
    }

    async fn require(&self, dimension: FilterDimension, selector: &str) -> Result<()> {
        self.session
            .wait_for(selector, self.timeout)
            .await
            .map_err(|err| match err {
                ScoutError::Timeout { .. } => ScoutError::navigation(
                    format!("{} control '{}'", dimension, selector),
                    err.to_string(),
                ),
                other => other,
            })
    }
}

fn option_control<'c>(
    dimension: FilterDimension,
    control: &'c FilterControl,
    key: &str,
) -> Result<&'c OptionControl> {
    control.option(key).ok_or_else(|| {
        ScoutError::navigation(
            format!("{} option '{}'", dimension, key),
            "no selector configured",
        )
    })
}
