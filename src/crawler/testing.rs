//! Scripted renderer used by the crawler unit tests

use crate::renderer::{RenderError, RenderResult, Renderer, WaitStrategy};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type NavigateHook = Box<dyn Fn(&str) + Send + Sync>;

/// Replays a fixed sequence of navigation results
///
/// Each `navigate` pops the next scripted entry: `Ok(markup)` becomes the
/// current page, `Err` is returned as-is. Selector waits and option labels are
/// answered from the current markup. `closes` may be shared with a factory to
/// observe sessions it handed out.
#[derive(Default)]
pub(crate) struct ScriptedSession {
    script: VecDeque<RenderResult<String>>,
    markup: String,
    url: Option<String>,
    pub navigations: Vec<String>,
    pub selections: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub pointer_moves: usize,
    pub closes: Arc<AtomicUsize>,
    on_navigate: Option<NavigateHook>,
}

impl ScriptedSession {
    pub fn new(script: Vec<RenderResult<String>>) -> Self {
        Self {
            script: script.into(),
            ..Default::default()
        }
    }

    /// Counts closes in a counter owned by the caller
    pub fn with_close_counter(mut self, closes: Arc<AtomicUsize>) -> Self {
        self.closes = closes;
        self
    }

    /// Runs `hook` with the URL of every navigation before it resolves
    pub fn on_navigate(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_navigate = Some(Box::new(hook));
        self
    }

    fn matches(&self, selector: &str) -> RenderResult<usize> {
        let selector = Selector::parse(selector)
            .map_err(|_| RenderError::InvalidSelector(selector.to_string()))?;
        Ok(Html::parse_document(&self.markup).select(&selector).count())
    }
}

#[async_trait]
impl Renderer for ScriptedSession {
    async fn navigate(&mut self, url: &str, _wait: WaitStrategy, _timeout: Duration) -> RenderResult<()> {
        self.navigations.push(url.to_string());
        if let Some(hook) = &self.on_navigate {
            hook(url);
        }
        let next = self
            .script
            .pop_front()
            .unwrap_or_else(|| Err(RenderError::Session("script exhausted".to_string())));
        self.markup = next?;
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> RenderResult<()> {
        if self.matches(selector)? > 0 {
            Ok(())
        } else {
            Err(RenderError::timeout(selector, timeout))
        }
    }

    async fn content(&mut self) -> RenderResult<String> {
        Ok(self.markup.clone())
    }

    fn current_url(&self) -> Option<String> {
        self.url.clone()
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> RenderResult<()> {
        if self.matches(selector)? == 0 {
            return Err(RenderError::ElementNotFound(selector.to_string()));
        }
        self.selections.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> RenderResult<()> {
        self.clicks.push(selector.to_string());
        Ok(())
    }

    async fn hover(&mut self, _selector: &str) -> RenderResult<()> {
        Ok(())
    }

    async fn move_pointer(&mut self, _x: u32, _y: u32) -> RenderResult<()> {
        self.pointer_moves += 1;
        Ok(())
    }

    async fn scroll_by(&mut self, _delta: i32) -> RenderResult<()> {
        Err(RenderError::Unsupported("scroll"))
    }

    async fn option_labels(&mut self, selector: &str) -> RenderResult<Vec<String>> {
        let selector = Selector::parse(selector)
            .map_err(|_| RenderError::InvalidSelector(selector.to_string()))?;
        Ok(Html::parse_document(&self.markup)
            .select(&selector)
            .map(|element| element.text().collect())
            .collect())
    }

    async fn close(&mut self) -> RenderResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
