use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EventRequestWillBeSent, EventResponseReceived};
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::patterns::is_media_url;
use crate::config::ResolverConfig;
use crate::error::ResolveError;

/// Dynamic strategy: run the page in a throwaway headless browser and keep the
/// first request or response URL that looks like media.
#[derive(Debug, Clone)]
pub struct BrowserCapture {
    navigation_timeout: Duration,
    capture_timeout: Duration,
    user_agent: String,
}

impl BrowserCapture {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout(),
            capture_timeout: config.capture_timeout(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Every exit path closes the page, disposes the incognito context and shuts
    /// the browser down before returning.
    #[instrument(skip(self))]
    pub async fn resolve(&self, page_url: &str) -> Result<String, ResolveError> {
        let config = BrowserConfig::builder()
            .request_timeout(self.navigation_timeout)
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--mute-audio")
            .arg("--autoplay-policy=no-user-gesture-required")
            .build()
            .map_err(ResolveError::BrowserLaunch)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ResolveError::BrowserLaunch(e.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = self.capture_in_context(&mut browser, page_url).await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "failed to close browser");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "failed to reap browser process");
        }
        handler_task.abort();

        result
    }

    async fn capture_in_context(
        &self,
        browser: &mut Browser,
        page_url: &str,
    ) -> Result<String, ResolveError> {
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| ResolveError::BrowserLaunch(e.to_string()))?;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(ResolveError::BrowserLaunch)?;

        let result = match browser.new_page(target).await {
            Ok(page) => {
                let result = self.observe(&page, page_url).await;
                if let Err(e) = page.close().await {
                    debug!(error = %e, "failed to close page");
                }
                result
            }
            Err(e) => Err(ResolveError::BrowserLaunch(e.to_string())),
        };

        if let Err(e) = browser.dispose_browser_context(context).await {
            warn!(error = %e, "failed to dispose browser context");
        }
        result
    }

    async fn observe(&self, page: &Page, page_url: &str) -> Result<String, ResolveError> {
        let browser_err = |e: chromiumoxide::error::CdpError| ResolveError::Navigation(e.to_string());
        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(browser_err)?;
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_err)?;

        let deadline = Instant::now() + self.capture_timeout;
        let navigation = tokio::time::timeout(self.navigation_timeout, page.goto(page_url));
        tokio::pin!(navigation);
        let mut navigating = true;

        loop {
            tokio::select! {
                Some(event) = requests.next() => {
                    if is_media_url(&event.request.url) {
                        debug!(stream = %event.request.url, "media request observed");
                        return Ok(event.request.url.clone());
                    }
                }
                Some(event) = responses.next() => {
                    if is_media_url(&event.response.url) {
                        debug!(stream = %event.response.url, "media response observed");
                        return Ok(event.response.url.clone());
                    }
                }
                outcome = &mut navigation, if navigating => {
                    navigating = false;
                    match outcome {
                        Ok(Ok(_)) => debug!("navigation finished, still observing"),
                        Ok(Err(e)) => return Err(ResolveError::Navigation(e.to_string())),
                        Err(_) => warn!(error = %ResolveError::NavigationTimeout, "still observing until capture deadline"),
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    return Err(ResolveError::CaptureTimeout);
                }
            }
        }
    }
}
