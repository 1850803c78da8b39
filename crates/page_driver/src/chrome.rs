//! ChromePage — živý Chromium tab přes headless_chrome (CDP).
//!
//! Do stránky se vstříkne malý helper (`window.__twh`), který elementy
//! označí atributem `data-twh-id` a přes něj je pak najde znovu.
//! Odpojený element se už querySelector-em nenajde → `PageError::Detached`.
//!
//! Každé volání je blokující CDP round-trip. Na multi-thread runtime jde
//! přes `block_in_place`, takže timery ostatních subsystémů běží dál,
//! i když tab odpovídá pomalu.

use crate::{ChangeSource, ElementId, ElementState, Page, PageError};
use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;
use tracing::{debug, info};

const PRELUDE: &str = r#"
window.__twh || (function () {
  let seq = 0;
  const stamp = Date.now().toString(36);
  const tag = (el) => {
    if (!el.dataset.twhId) el.dataset.twhId = 'c' + (++seq) + '-' + stamp;
    return el.dataset.twhId;
  };
  const byId = (id) => document.querySelector('[data-twh-id="' + CSS.escape(id) + '"]');
  const need = (id) => {
    const el = byId(id);
    if (!el) throw new Error('__detached__');
    return el;
  };
  const visible = (el) => {
    if (!el || !el.isConnected) return false;
    const st = getComputedStyle(el);
    if (st.display === 'none' || st.visibility === 'hidden' || st.opacity === '0') return false;
    const r = el.getBoundingClientRect();
    return r.width > 0 && r.height > 0;
  };
  window.__twh = {
    added: [],
    observer: null,
    query(scopeId, sel) {
      const root = scopeId ? need(scopeId) : document;
      return Array.from(root.querySelectorAll(sel)).map(tag);
    },
    matches(id, sel) { return need(id).matches(sel); },
    closest(id, sel) {
      const hit = need(id).closest(sel);
      return hit ? tag(hit) : null;
    },
    state(id) {
      const el = byId(id);
      if (!el || !el.isConnected) return { attached: false, visible: false, enabled: false };
      return { attached: true, visible: visible(el), enabled: !el.disabled };
    },
    text(id) { return need(id).textContent || ''; },
    html(id) { return need(id).outerHTML; },
    attr(id, name) { return need(id).getAttribute(name); },
    style(id, prop) { return need(id).style.getPropertyValue(prop) || null; },
    value(id) {
      const el = need(id);
      return el.value != null ? String(el.value) : '';
    },
    click(id) { need(id).click(); return true; },
    setValue(id, v) {
      const el = need(id);
      el.focus();
      const desc = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(el), 'value');
      if (desc && desc.set) desc.set.call(el, v); else el.value = v;
      el.dispatchEvent(new Event('input', { bubbles: true }));
      el.dispatchEvent(new Event('change', { bubbles: true }));
      return true;
    },
    observe(rootSel) {
      if (this.observer) return true;
      const root = document.querySelector(rootSel) || document.documentElement;
      this.observer = new MutationObserver((muts) => {
        for (const m of muts) {
          for (const n of m.addedNodes) {
            if (n instanceof HTMLElement) this.added.push(tag(n));
          }
        }
      });
      this.observer.observe(root, { childList: true, subtree: true });
      return true;
    },
    takeAdded() {
      if (!this.observer) throw new Error('__not_observing__');
      const out = this.added;
      this.added = [];
      return out;
    },
  };
})();
"#;

/// Jak spustit Chrome (z env)
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    /// Profil s přihlášením; bez něj nejsou kanálové body
    pub user_data_dir: Option<PathBuf>,
    pub window: (u32, u32),
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_path: None,
            user_data_dir: None,
            window: (1400, 900),
        }
    }
}

impl ChromeOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            headless: env::var("CHROME_HEADLESS")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(defaults.headless),
            chrome_path: env::var("CHROME_PATH").ok().map(PathBuf::from),
            user_data_dir: env::var("CHROME_USER_DATA_DIR").ok().map(PathBuf::from),
            window: defaults.window,
        }
    }
}

pub struct ChromePage {
    // Browser musí žít, jinak se tab zavře
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn launch(opts: &ChromeOptions) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(opts.headless)
            .sandbox(false)
            .path(opts.chrome_path.clone())
            .user_data_dir(opts.user_data_dir.clone())
            .window_size(Some(opts.window))
            .idle_browser_timeout(Duration::from_secs(7 * 24 * 3600))
            .build()
            .context("Failed to build Chrome launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome")?;
        let tab = browser.new_tab().context("Failed to create browser tab")?;
        info!(headless = opts.headless, "Chrome launched");

        Ok(Self { _browser: browser, tab })
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .context("Chrome navigate failed")?
            .wait_until_navigated()
            .context("Chrome navigation did not finish")?;
        self.tab
            .wait_for_element("body")
            .context("Chrome wait_for_element(body) failed")?;
        Ok(())
    }

    /// Zavolá `window.__twh.<op>(args)` a dekóduje výsledek
    fn call<T: DeserializeOwned>(&self, op: &str, target: Option<&ElementId>, args: &[Value]) -> Result<T, PageError> {
        let args = args.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
        let expr = format!(
            "{PRELUDE}\n(() => {{ try {{ return JSON.stringify({{ ok: window.__twh.{op}({args}) }}); }} \
             catch (e) {{ return JSON.stringify({{ err: String(e && e.message || e) }}); }} }})()"
        );

        let remote = off_runtime(|| self.tab.evaluate(&expr, false))
            .map_err(|e| PageError::Browser(e.to_string()))?;

        let raw = match remote.value {
            Some(Value::String(s)) => s,
            other => return Err(PageError::Decode(format!("{op}: {other:?}"))),
        };
        let envelope: Value =
            serde_json::from_str(&raw).map_err(|e| PageError::Decode(format!("{op}: {e}")))?;

        if let Some(err) = envelope.get("err").and_then(Value::as_str) {
            if err.contains("__detached__") {
                if let Some(el) = target {
                    return Err(PageError::Detached(el.clone()));
                }
            }
            debug!(op, "page script error: {}", err);
            return Err(PageError::Script(err.to_string()));
        }

        let ok = envelope.get("ok").cloned().unwrap_or(Value::Null);
        serde_json::from_value(ok).map_err(|e| PageError::Decode(format!("{op}: {e}")))
    }
}

/// Blokující práce mimo async worker. Na current_thread runtime (a mimo
/// runtime) jen zavolá `work`, `block_in_place` by tam panikařil.
pub(crate) fn off_runtime<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => block_in_place(work),
        _ => work(),
    }
}

fn ids(raw: Vec<String>) -> Vec<ElementId> {
    raw.into_iter().map(ElementId::new).collect()
}

impl Page for ChromePage {
    fn query_all(&self, scope: Option<&ElementId>, selector: &str) -> Result<Vec<ElementId>, PageError> {
        let scope_arg = scope.map(|s| json!(s.as_str())).unwrap_or(Value::Null);
        let found: Vec<String> = self.call("query", scope, &[scope_arg, json!(selector)])?;
        Ok(ids(found))
    }

    fn matches(&self, el: &ElementId, selector: &str) -> Result<bool, PageError> {
        self.call("matches", Some(el), &[json!(el.as_str()), json!(selector)])
    }

    fn closest(&self, el: &ElementId, selector: &str) -> Result<Option<ElementId>, PageError> {
        let hit: Option<String> = self.call("closest", Some(el), &[json!(el.as_str()), json!(selector)])?;
        Ok(hit.map(ElementId::new))
    }

    fn state(&self, el: &ElementId) -> Result<ElementState, PageError> {
        self.call("state", Some(el), &[json!(el.as_str())])
    }

    fn text(&self, el: &ElementId) -> Result<String, PageError> {
        self.call("text", Some(el), &[json!(el.as_str())])
    }

    fn outer_html(&self, el: &ElementId) -> Result<String, PageError> {
        self.call("html", Some(el), &[json!(el.as_str())])
    }

    fn attribute(&self, el: &ElementId, name: &str) -> Result<Option<String>, PageError> {
        self.call("attr", Some(el), &[json!(el.as_str()), json!(name)])
    }

    fn inline_style(&self, el: &ElementId, property: &str) -> Result<Option<String>, PageError> {
        self.call("style", Some(el), &[json!(el.as_str()), json!(property)])
    }

    fn value(&self, el: &ElementId) -> Result<String, PageError> {
        self.call("value", Some(el), &[json!(el.as_str())])
    }

    fn click(&self, el: &ElementId) -> Result<(), PageError> {
        let _: bool = self.call("click", Some(el), &[json!(el.as_str())])?;
        Ok(())
    }

    fn set_value(&self, el: &ElementId, value: &str) -> Result<(), PageError> {
        let _: bool = self.call("setValue", Some(el), &[json!(el.as_str()), json!(value)])?;
        Ok(())
    }
}

impl ChangeSource for ChromePage {
    fn observe(&self, root_selector: &str) -> Result<(), PageError> {
        let _: bool = self.call("observe", None, &[json!(root_selector)])?;
        Ok(())
    }

    fn take_added(&self) -> Result<Vec<ElementId>, PageError> {
        let added: Vec<String> = self.call("takeAdded", None, &[])?;
        Ok(ids(added))
    }
}
