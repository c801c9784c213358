use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use screening_core::{PersonId, SearchDriver, SearchError, SearchQuery};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{BrowserSettings, FormSelectors};

/// `{YYYYMMDD}_{person_id}.png` under the screenshots directory
pub fn evidence_file_name(dir: &Path, person_id: PersonId, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_{}.png", date.format("%Y%m%d"), person_id))
}

/// Script selecting a dropdown option by its visible text. Evaluates to false
/// when the dropdown or the option is missing.
pub fn select_option_script(selector: &str, visible_text: &str) -> String {
    // JSON string literals are valid JS string literals
    let selector = serde_json::Value::String(selector.to_string());
    let text = serde_json::Value::String(visible_text.trim().to_string());
    format!(
        r#"(() => {{
    const select = document.querySelector({selector});
    if (!select) return false;
    const option = Array.from(select.options).find(o => o.text.trim() === {text});
    if (!option) return false;
    select.value = option.value;
    select.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;
}})()"#
    )
}

/// Map a CDP failure. A dead websocket or a closed command channel means the
/// whole session is gone; anything else stays scoped to the current record.
pub fn cdp_error(e: CdpError, record_error: fn(String) -> SearchError) -> SearchError {
    match e {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) => SearchError::SessionLost(e.to_string()),
        other => record_error(other.to_string()),
    }
}

/// The session is usable only while its handler task is still polling the connection
pub fn session_alive(handler: Option<&JoinHandle<()>>) -> bool {
    handler.map_or(false, |h| !h.is_finished())
}

/// Headless Chrome session against the sanctions search page
pub struct ChromeSearchDriver {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Page,
    settings: BrowserSettings,
}

impl ChromeSearchDriver {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, SearchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .request_timeout(Duration::from_secs(settings.request_timeout_secs));

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder
            .build()
            .map_err(|e| SearchError::Browser(format!("browser config error: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SearchError::Browser(e.to_string()))?;

        // The CDP connection only makes progress while the handler is polled
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handle.abort();
                return Err(SearchError::Browser(e.to_string()));
            }
        };

        debug!(headless = settings.headless, "Chrome launched");
        Ok(Self {
            browser: Some(browser),
            handler: Some(handle),
            page,
            settings: settings.clone(),
        })
    }

    fn ensure_alive(&self) -> Result<(), SearchError> {
        if session_alive(self.handler.as_ref()) {
            Ok(())
        } else {
            Err(SearchError::SessionLost("browser handler has exited".to_string()))
        }
    }

    fn form(&self) -> &FormSelectors {
        &self.settings.form
    }

    /// Poll for an element until it appears or the element wait elapses
    async fn wait_for(&self, selector: &str) -> Result<Element, SearchError> {
        let deadline = Instant::now() + Duration::from_secs(self.settings.element_wait_secs);
        let poll = Duration::from_millis(self.settings.poll_interval_ms);
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e @ (CdpError::Ws(_) | CdpError::ChannelSendError(_))) => {
                    return Err(cdp_error(e, SearchError::Browser))
                }
                Err(_) if !session_alive(self.handler.as_ref()) => {
                    return Err(SearchError::SessionLost("browser handler has exited".to_string()))
                }
                Err(e) if Instant::now() >= deadline => {
                    return Err(SearchError::ElementNotFound(format!("{}: {}", selector, e)))
                }
                Err(_) => tokio::time::sleep(poll).await,
            }
        }
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), SearchError> {
        self.wait_for(selector)
            .await?
            .click()
            .await
            .map_err(|e| cdp_error(e, SearchError::Browser))?
            .type_str(text)
            .await
            .map_err(|e| cdp_error(e, SearchError::Browser))?;
        Ok(())
    }

    async fn select_country(&self, country: &str) -> Result<(), SearchError> {
        let selector = self.form().country_select.clone();
        self.wait_for(&selector).await?;

        let selected: bool = self
            .page
            .evaluate(select_option_script(&selector, country))
            .await
            .map_err(|e| cdp_error(e, SearchError::Browser))?
            .into_value()
            .map_err(|e| SearchError::Browser(e.to_string()))?;

        if selected {
            Ok(())
        } else {
            Err(SearchError::ElementNotFound(format!("country option '{}'", country)))
        }
    }
}

#[async_trait]
impl SearchDriver for ChromeSearchDriver {
    async fn submit_query(&mut self, query: &SearchQuery) -> Result<String, SearchError> {
        self.ensure_alive()?;
        debug!(person_id = %query.person_id, "Submitting search");
        self.page
            .goto(self.settings.search_url.as_str())
            .await
            .map_err(|e| cdp_error(e, SearchError::Navigation))?;

        let form = self.form().clone();
        self.type_into(&form.name_input, &query.name).await?;
        self.type_into(&form.address_input, &query.address).await?;
        self.select_country(&query.country).await?;

        self.wait_for(&form.search_button)
            .await?
            .click()
            .await
            .map_err(|e| cdp_error(e, SearchError::Browser))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| cdp_error(e, SearchError::Navigation))?;

        self.wait_for(&form.results_ready).await?;
        self.page
            .content()
            .await
            .map_err(|e| cdp_error(e, SearchError::Browser))
    }

    async fn capture_evidence(&mut self, person_id: PersonId) -> Result<PathBuf, SearchError> {
        self.ensure_alive()?;
        let path = evidence_file_name(
            &self.settings.screenshots_dir,
            person_id,
            Local::now().date_naive(),
        );

        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(|e| cdp_error(e, SearchError::Evidence))?;

        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), &path)
            .await
            .map_err(|e| cdp_error(e, SearchError::Evidence))?;

        debug!(person_id = %person_id, path = %path.display(), "Screenshot saved");
        Ok(path)
    }

    async fn close(&mut self) -> Result<(), SearchError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| SearchError::Browser(e.to_string()));
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        if let Some(handle) = self.handler.take() {
            handle.abort();
        }

        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            evidence_file_name(Path::new("screenshots"), PersonId(1842), date),
            PathBuf::from("screenshots/20240309_1842.png")
        );
    }

    #[test]
    fn test_select_script_escapes_text() {
        let script = select_option_script("#ddlCountry", "Côte d'Ivoire \"north\"");
        assert!(script.contains(r##"document.querySelector("#ddlCountry")"##));
        assert!(script.contains(r#"=== "Côte d'Ivoire \"north\"""#));
    }

    #[test]
    fn test_request_timeout_stays_record_scoped() {
        let e = cdp_error(CdpError::Timeout, SearchError::Navigation);
        assert!(matches!(e, SearchError::Navigation(_)));
        assert!(!e.is_fatal());
    }

    #[test]
    fn test_missing_handler_is_dead_session() {
        assert!(!session_alive(None));
    }

    #[tokio::test]
    async fn test_session_alive_tracks_handler_task() {
        let running = tokio::spawn(futures::future::pending::<()>());
        assert!(session_alive(Some(&running)));

        let finished = tokio::spawn(async {});
        while !finished.is_finished() {
            tokio::task::yield_now().await;
        }
        assert!(!session_alive(Some(&finished)));
        running.abort();
    }

    #[test]
    fn test_select_script_trims_visible_text() {
        let script = select_option_script("#c", "  Peru ");
        assert!(script.contains(r#"=== "Peru""#));
    }
}
