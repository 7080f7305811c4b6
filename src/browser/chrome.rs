// src/browser/chrome.rs
use super::{poll_until, Browser, JobPage, POLL_INTERVAL};
use crate::autofill::{ControlId, FillAction, FormControl};
use crate::error::{BotError, BotResult, PageFault};
use crate::session::StoredCookie;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CONTROL_ATTR: &str = "data-autoapply-id";
const TARGET_ATTR: &str = "data-autoapply-target";

const SNAPSHOT_CONTROLS_JS: &str = r#"(() => {
  const nodes = Array.from(document.querySelectorAll('input, textarea, select'));
  const labelFor = (el) => {
    const aria = el.getAttribute('aria-label');
    if (aria) return aria;
    if (el.labels && el.labels.length) return el.labels[0].innerText.trim();
    return el.getAttribute('placeholder');
  };
  const visible = (el) => {
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';
  };
  return nodes.map((el, i) => {
    el.setAttribute('data-autoapply-id', String(i));
    const tag = el.tagName.toLowerCase();
    const type = (el.getAttribute('type') || '').toLowerCase();
    let kind = 'other';
    if (tag === 'textarea') kind = 'textarea';
    else if (tag === 'select') kind = 'select';
    else if (type === '' || type === 'text') kind = 'text';
    else if (type === 'tel') kind = 'tel';
    else if (type === 'radio') kind = 'radio';
    else if (type === 'checkbox') kind = 'checkbox';
    const toggle = kind === 'radio' || kind === 'checkbox';
    return {
      id: i,
      kind,
      name: el.getAttribute('name'),
      label: labelFor(el),
      value: toggle ? '' : (el.value || ''),
      visible: visible(el),
      enabled: !el.disabled,
      checked: !!el.checked,
      options: tag === 'select'
        ? Array.from(el.options).map((o) => ({ value: o.value, disabled: o.disabled }))
        : [],
    };
  });
})()"#;

/// Empty the value of the first match of `selector`, firing `input` so the
/// page's own handlers see it.
fn clear_value_script(selector: &str) -> Result<String, PageFault> {
    let selector_json = serde_json::to_string(selector).map_err(PageFault::command)?;
    Ok(format!(
        r#"(() => {{
  const el = document.querySelector({selector_json});
  if (!el) return false;
  el.focus();
  el.value = '';
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  return true;
}})()"#,
        selector_json = selector_json,
    ))
}

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub user_data_dir: Option<PathBuf>,
    pub user_agent: String,
}

/// Chromium session driven over the DevTools protocol.
pub struct ChromeBrowser {
    browser: CdpBrowser,
    handler_task: JoinHandle<()>,
}

impl ChromeBrowser {
    pub async fn launch(options: &ChromeOptions) -> BotResult<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--start-maximized")
            .arg(format!("--user-agent={}", options.user_agent));
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let config = builder.build().map_err(BotError::Browser)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BotError::Browser(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("chromiumoxide handler event error: {}", e);
                }
            }
        });

        info!(headless = options.headless, "Launched Chromium");
        Ok(Self {
            browser,
            handler_task,
        })
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        self.handler_task.abort();
        info!("Browser closed");
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn new_page(&self) -> Result<Box<dyn JobPage>, PageFault> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(PageFault::command)?;
        Ok(Box::new(ChromePage { page }))
    }
}

pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    async fn eval_bool(&self, script: String) -> Result<bool, PageFault> {
        self.page
            .evaluate(script)
            .await
            .map_err(PageFault::command)?
            .into_value::<bool>()
            .map_err(PageFault::command)
    }

    async fn find(&self, selector: &str) -> Result<chromiumoxide::Element, PageFault> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| PageFault::MissingElement(selector.to_string()))
    }

    fn control_selector(control: ControlId) -> String {
        format!("[{}=\"{}\"]", CONTROL_ATTR, control.0)
    }

    /// Tag the first enabled button labelled with any of `labels`.
    async fn mark_button(&self, labels: &[&str]) -> Result<bool, PageFault> {
        let labels_json = serde_json::to_string(labels).map_err(PageFault::command)?;
        let script = format!(
            r#"(() => {{
  const labels = {labels_json};
  const buttons = Array.from(document.querySelectorAll('button, [role="button"], input[type="submit"]'));
  const hit = buttons.find((b) => {{
    const text = (b.innerText || b.value || '').trim();
    return !b.disabled && labels.some((l) => text.includes(l));
  }});
  document.querySelectorAll('[{target}]').forEach((e) => e.removeAttribute('{target}'));
  if (!hit) return false;
  hit.setAttribute('{target}', '1');
  return true;
}})()"#,
            labels_json = labels_json,
            target = TARGET_ATTR,
        );
        self.eval_bool(script).await
    }
}

#[async_trait]
impl JobPage for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), PageFault> {
        debug!("Navigating to {}", url);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(PageFault::command(e)),
            Err(_) => Err(PageFault::timeout(format!("navigation to {}", url), timeout)),
        }
    }

    async fn reload(&self, timeout: Duration) -> Result<(), PageFault> {
        match tokio::time::timeout(timeout, self.page.reload()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(PageFault::command(e)),
            Err(_) => Err(PageFault::timeout("page reload", timeout)),
        }
    }

    async fn html(&self) -> Result<String, PageFault> {
        self.page.content().await.map_err(PageFault::command)
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageFault> {
        poll_until(selector, timeout, POLL_INTERVAL, || async move {
            Ok(self.page.find_element(selector).await.is_ok())
        })
        .await
    }

    async fn submit_text(&self, selector: &str, text: &str) -> Result<(), PageFault> {
        // The site pre-fills the box with the previous search.
        if !self.eval_bool(clear_value_script(selector)?).await? {
            return Err(PageFault::MissingElement(selector.to_string()));
        }
        let element = self.find(selector).await?;
        element.click().await.map_err(PageFault::command)?;
        element.type_str(text).await.map_err(PageFault::command)?;
        element.press_key("Enter").await.map_err(PageFault::command)?;
        Ok(())
    }

    async fn click_button(&self, labels: &[&str], timeout: Duration) -> Result<(), PageFault> {
        let what = format!("button labelled {}", labels.join(" or "));
        poll_until(&what, timeout, POLL_INTERVAL, || self.mark_button(labels)).await?;

        let selector = format!("[{}=\"1\"]", TARGET_ATTR);
        let button = self.find(&selector).await?;
        button.click().await.map_err(PageFault::command)?;
        Ok(())
    }

    async fn upload_file(&self, path: &Path) -> Result<bool, PageFault> {
        let Ok(input) = self.page.find_element("input[type=file]").await else {
            return Ok(false);
        };
        let absolute = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());
        let mut params = SetFileInputFilesParams::new(vec![absolute.display().to_string()]);
        params.backend_node_id = Some(input.backend_node_id);
        self.page.execute(params).await.map_err(PageFault::command)?;
        Ok(true)
    }

    async fn form_controls(&self) -> Result<Vec<FormControl>, PageFault> {
        self.page
            .evaluate(SNAPSHOT_CONTROLS_JS)
            .await
            .map_err(PageFault::command)?
            .into_value::<Vec<FormControl>>()
            .map_err(PageFault::command)
    }

    async fn apply(&self, action: &FillAction) -> Result<(), PageFault> {
        let selector = Self::control_selector(action.control());
        match action {
            FillAction::Type { text, .. } => {
                let element = self.find(&selector).await?;
                element.click().await.map_err(PageFault::command)?;
                element.type_str(text).await.map_err(PageFault::command)?;
            }
            FillAction::Select { value, .. } => {
                let value_json = serde_json::to_string(value).map_err(PageFault::command)?;
                let script = format!(
                    r#"(() => {{
  const el = document.querySelector('{selector}');
  if (!el) return false;
  el.value = {value_json};
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#,
                    selector = selector,
                    value_json = value_json,
                );
                if !self.eval_bool(script).await? {
                    return Err(PageFault::MissingElement(selector));
                }
            }
            FillAction::Click { .. } => {
                let element = self.find(&selector).await?;
                element.click().await.map_err(PageFault::command)?;
            }
        }
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), PageFault> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(PageFault::command(e)),
            Err(_) => Err(PageFault::timeout("page transition", timeout)),
        }
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), PageFault> {
        self.page
            .evaluate(format!("window.scrollBy(0, {})", dy))
            .await
            .map_err(PageFault::command)?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<StoredCookie>, PageFault> {
        let cookies = self.page.get_cookies().await.map_err(PageFault::command)?;
        Ok(cookies
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: (c.expires > 0.0).then_some(c.expires),
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect())
    }

    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<(), PageFault> {
        let params: Vec<CookieParam> = cookies
            .iter()
            .map(|c| {
                let mut param = CookieParam::new(c.name.clone(), c.value.clone());
                param.domain = Some(c.domain.clone());
                param.path = Some(c.path.clone());
                param.secure = Some(c.secure);
                param.http_only = Some(c.http_only);
                param.expires = c.expires.map(TimeSinceEpoch::new);
                param
            })
            .collect();
        self.page.set_cookies(params).await.map_err(PageFault::command)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PageFault> {
        self.page.clone().close().await.map_err(PageFault::command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_value_script_quotes_selector() {
        let script = clear_value_script("#text-input-where").expect("script");
        assert!(script.contains(r##"document.querySelector("#text-input-where")"##));
        assert!(script.contains("el.value = '';"));

        let tricky = clear_value_script(r#"input[name="where"]"#).expect("script");
        assert!(tricky.contains(r#"document.querySelector("input[name=\"where\"]")"#));
    }
}
