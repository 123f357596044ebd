use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Control surface of one browser tab.
///
/// The workflow only talks to the page through this trait, which keeps the
/// filter and extraction logic testable without a browser.
#[async_trait]
pub trait UiSession: Send + Sync {
    /// Load `url` and wait for the navigation to finish
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until an element matching `selector` is present.
    /// Fails with `ScoutError::Timeout` when `timeout` elapses first.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Read an attribute of the first match; `None` when the attribute is absent
    async fn read_attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    async fn read_text(&self, selector: &str) -> Result<String>;

    /// Outer HTML of the first match
    async fn read_html(&self, selector: &str) -> Result<String>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Click the `index`-th (zero based, document order) of all elements
    /// matching `selector`
    async fn click_nth(&self, selector: &str, index: usize) -> Result<()>;

    /// Empty a text input, even when the page repopulates it
    async fn clear(&self, selector: &str) -> Result<()>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn press_key(&self, key: &str) -> Result<()>;

    /// Start listening for the first network response whose URL contains
    /// `url_fragment`.
    ///
    /// Responses that arrive before this call returns are not seen, so the
    /// wait has to be armed before the action that triggers the request.
    async fn arm_network_wait(&self, url_fragment: &str) -> Result<Box<dyn NetworkWait>>;
}

/// A registered network wait. Dropping it without waiting disarms it.
#[async_trait]
pub trait NetworkWait: Send {
    /// Resolve with the matching response URL, or `ScoutError::Timeout`
    async fn wait(self: Box<Self>, timeout: Duration) -> Result<String>;
}
