use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::session::traits::{NetworkWait, UiSession};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reads boolean DOM properties live (an input's `checked` attribute does not
/// follow clicks), everything else through `getAttribute`.
const READ_ATTRIBUTE_JS: &str = r#"
function(name) {
    if (name in this && typeof this[name] === 'boolean') {
        return this[name] ? '' : null;
    }
    return this.getAttribute(name);
}
"#;

const CLEAR_VALUE_JS: &str = r#"
function() {
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
}
"#;

/// `UiSession` backed by one tab of a headless Chrome
pub struct ChromeSession {
    // Keeps the browser process alive for as long as the tab is used
    _browser: Browser,
    tab: Arc<Tab>,
    next_handler: AtomicU64,
}

impl ChromeSession {
    /// Launch Chrome and open the tab every region will reuse
    pub fn launch(config: &ScoutConfig) -> Result<Self> {
        info!(
            "Launching {} Chrome...",
            if config.headless { "headless" } else { "visible" }
        );

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some(config.viewport))
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| ScoutError::session("build launch options", e))?;

        let browser =
            Browser::new(options).map_err(|e| ScoutError::session("launch Chrome", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScoutError::session("open tab", e))?;

        Ok(Self {
            _browser: browser,
            tab,
            next_handler: AtomicU64::new(0),
        })
    }

    /// Run a blocking tab call off the async runtime
    async fn blocking<T, F>(&self, action: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Tab) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| ScoutError::session(action, e))?
            .map_err(|e| ScoutError::session(action, e))
    }

    async fn poll_for(&self, selector: &str) -> Result<()> {
        loop {
            let sel = selector.to_string();
            let found = self
                .blocking("find element", move |tab| Ok(tab.find_element(&sel).is_ok()))
                .await?;
            if found {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl UiSession for ChromeSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        info!("Opening {}", url);
        let url = url.to_string();
        let nav = self.blocking("navigate", move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)?.wait_until_navigated()?;
            Ok(())
        });

        match tokio::time::timeout(timeout, nav).await {
            Ok(result) => result,
            Err(_) => Err(ScoutError::Timeout {
                what: "page navigation".to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.poll_for(selector)).await {
            Ok(result) => result,
            Err(_) => Err(ScoutError::Timeout {
                what: format!("element '{}'", selector),
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn read_attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let sel = selector.to_string();
        let name = name.to_string();
        self.blocking("read attribute", move |tab| {
            let object = tab
                .find_element(&sel)?
                .call_js_fn(READ_ATTRIBUTE_JS, vec![json!(name)], false)?;
            Ok(match object.value {
                Some(Value::String(value)) => Some(value),
                _ => None,
            })
        })
        .await
    }

    async fn read_text(&self, selector: &str) -> Result<String> {
        let sel = selector.to_string();
        self.blocking("read text", move |tab| tab.find_element(&sel)?.get_inner_text())
            .await
    }

    async fn read_html(&self, selector: &str) -> Result<String> {
        let sel = selector.to_string();
        self.blocking("read html", move |tab| tab.find_element(&sel)?.get_content())
            .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        debug!("click {}", selector);
        let sel = selector.to_string();
        self.blocking("click", move |tab| {
            tab.find_element(&sel)?.click()?;
            Ok(())
        })
        .await
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<()> {
        debug!("click {} #{}", selector, index);
        let sel = selector.to_string();
        self.blocking("click", move |tab| {
            let elements = tab.find_elements(&sel)?;
            let element = elements.get(index).ok_or_else(|| {
                anyhow::anyhow!("'{}' has {} matches, wanted #{}", sel, elements.len(), index)
            })?;
            element.click()?;
            Ok(())
        })
        .await
    }

    async fn clear(&self, selector: &str) -> Result<()> {
        let sel = selector.to_string();
        self.blocking("clear input", move |tab| {
            let element = tab.find_element(&sel)?;
            element.click()?;
            element.call_js_fn(CLEAR_VALUE_JS, vec![], false)?;
            tab.press_key("Backspace")?;
            Ok(())
        })
        .await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        debug!("type '{}' into {}", text, selector);
        let sel = selector.to_string();
        let text = text.to_string();
        self.blocking("type text", move |tab| {
            tab.find_element(&sel)?.type_into(&text)?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking("press key", move |tab| {
            tab.press_key(&key)?;
            Ok(())
        })
        .await
    }

    async fn arm_network_wait(&self, url_fragment: &str) -> Result<Box<dyn NetworkWait>> {
        let name = format!(
            "land-scout-wait-{}",
            self.next_handler.fetch_add(1, Ordering::Relaxed)
        );
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let fragment = url_fragment.to_string();

        let handler_name = name.clone();
        self.blocking("register response handler", move |tab| {
            tab.register_response_handling(
                handler_name,
                Box::new(move |params, _fetch_body| {
                    if !params.response.url.contains(&fragment) {
                        return;
                    }
                    if let Ok(mut slot) = slot.lock() {
                        if let Some(tx) = slot.take() {
                            let _ = tx.send(params.response.url.clone());
                        }
                    }
                }),
            )?;
            Ok(())
        })
        .await?;

        debug!("armed network wait {} for '{}'", name, url_fragment);
        Ok(Box::new(ChromeNetworkWait {
            tab: Arc::clone(&self.tab),
            name,
            rx: Some(rx),
        }))
    }
}

struct ChromeNetworkWait {
    tab: Arc<Tab>,
    name: String,
    rx: Option<oneshot::Receiver<String>>,
}

#[async_trait]
impl NetworkWait for ChromeNetworkWait {
    async fn wait(self: Box<Self>, timeout: Duration) -> Result<String> {
        let mut this = self;
        let rx = this
            .rx
            .take()
            .ok_or_else(|| ScoutError::session("network wait", "already awaited"))?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(url)) => {
                debug!("network wait {} matched {}", this.name, url);
                Ok(url)
            }
            Ok(Err(_)) => Err(ScoutError::session(
                "network wait",
                "response handler dropped",
            )),
            Err(_) => Err(ScoutError::Timeout {
                what: "search results refresh".to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

impl Drop for ChromeNetworkWait {
    fn drop(&mut self) {
        let _ = self.tab.deregister_response_handling(&self.name);
    }
}
