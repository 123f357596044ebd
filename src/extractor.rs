use crate::error::Result;
use crate::models::MetricSample;
use crate::session::UiSession;
use std::time::Duration;
use tracing::debug;

/// Parse a result-count label such as `"1,234 results"`.
///
/// Empty or non-numeric labels are a legitimate "no data" outcome.
pub fn parse_count(text: &str) -> MetricSample {
    let Some(token) = text.split_whitespace().next() else {
        return MetricSample::Unavailable;
    };
    match token.replace(',', "").parse::<u64>() {
        Ok(n) => MetricSample::Count(n),
        Err(_) => MetricSample::Unavailable,
    }
}

/// Reads the result count currently shown on the search page
pub struct MetricsExtractor<'a> {
    session: &'a dyn UiSession,
    selector: &'a str,
    timeout: Duration,
}

impl<'a> MetricsExtractor<'a> {
    pub fn new(session: &'a dyn UiSession, selector: &'a str, timeout: Duration) -> Self {
        Self {
            session,
            selector,
            timeout,
        }
    }

    pub async fn extract_count(&self) -> Result<MetricSample> {
        self.session.wait_for(self.selector, self.timeout).await?;
        let text = self.session.read_text(self.selector).await?;
        let sample = parse_count(&text);
        debug!("result count '{}' -> {:?}", text.trim(), sample);
        Ok(sample)
    }
}
