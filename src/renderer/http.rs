//! HTTP-backed rendering sessions
//!
//! This renderer fetches markup with `reqwest` and never executes page
//! scripts, so it suits catalogs that serve pre-rendered HTML:
//! - navigation is a GET; the final URL after redirects becomes the current URL
//! - selector waits inspect the current snapshot and fail fast when nothing matches
//! - selecting an option submits the surrounding form as a GET query
//! - pointer moves and scrolls are accepted and have no effect

use crate::config::CatalogConfig;
use crate::renderer::{IdentityProfile, RenderError, RenderResult, Renderer, SessionFactory, WaitStrategy};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Opens [`HttpSession`]s
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    navigation_timeout: Duration,
}

impl HttpSessionFactory {
    pub fn new(catalog: &CatalogConfig) -> Self {
        Self {
            navigation_timeout: catalog.navigation_timeout(),
        }
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    async fn open(&self, profile: &IdentityProfile) -> RenderResult<HttpSession> {
        let client = build_http_client(profile)?;
        if !profile.init_scripts.is_empty() {
            tracing::debug!(
                "HTTP sessions do not run scripts; ignoring {} init script(s)",
                profile.init_scripts.len()
            );
        }
        Ok(HttpSession {
            client,
            navigation_timeout: self.navigation_timeout,
            current_url: None,
            markup: String::new(),
            closed: false,
        })
    }
}

/// Builds an HTTP client presenting the given identity
///
/// # Arguments
///
/// * `profile` - User agent and extra headers for every request
///
/// # Returns
///
/// * `Ok(Client)` - Client with its own cookie jar
/// * `Err(RenderError)` - A header in the profile is not valid HTTP
pub fn build_http_client(profile: &IdentityProfile) -> RenderResult<Client> {
    let mut headers = HeaderMap::new();
    for (name, value) in &profile.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RenderError::Session(format!("Invalid header name '{}': {}", name, e)))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            RenderError::Session(format!("Invalid value for header '{}': {}", name, e))
        })?;
        headers.insert(header_name, header_value);
    }

    let client = Client::builder()
        .user_agent(profile.user_agent.as_str())
        .default_headers(headers)
        .cookie_store(true)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// One HTTP rendering session with its own cookie jar
pub struct HttpSession {
    client: Client,
    navigation_timeout: Duration,
    current_url: Option<Url>,
    markup: String,
    closed: bool,
}

impl HttpSession {
    fn ensure_open(&self) -> RenderResult<()> {
        if self.closed {
            Err(RenderError::Session("session is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn require_element(&self, selector: &str) -> RenderResult<()> {
        self.ensure_open()?;
        if count_matches(&self.markup, selector)? == 0 {
            return Err(RenderError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Renderer for HttpSession {
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitStrategy,
        timeout: Duration,
    ) -> RenderResult<()> {
        self.ensure_open()?;
        tracing::debug!("GET {} (wait: {:?})", url, wait);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, timeout, e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(RenderError::Status {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, timeout, e))?;

        self.current_url = Some(final_url);
        self.markup = body;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> RenderResult<()> {
        self.ensure_open()?;
        // Without scripts the snapshot never changes, so there is nothing to wait for.
        if count_matches(&self.markup, selector)? > 0 {
            Ok(())
        } else {
            Err(RenderError::timeout(format!("'{}'", selector), timeout))
        }
    }

    async fn content(&mut self) -> RenderResult<String> {
        self.ensure_open()?;
        Ok(self.markup.clone())
    }

    fn current_url(&self) -> Option<String> {
        self.current_url.as_ref().map(|url| url.to_string())
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> RenderResult<()> {
        self.ensure_open()?;
        let field = form_field(&self.markup, selector, value)?;

        let mut url = self
            .current_url
            .clone()
            .ok_or_else(|| RenderError::Session("no page loaded".to_string()))?;
        set_query_param(&mut url, &field, value);

        let timeout = self.navigation_timeout;
        self.navigate(url.as_str(), WaitStrategy::ContentLoaded, timeout)
            .await
    }

    async fn click(&mut self, selector: &str) -> RenderResult<()> {
        self.require_element(selector)
    }

    async fn hover(&mut self, selector: &str) -> RenderResult<()> {
        self.require_element(selector)
    }

    async fn move_pointer(&mut self, x: u32, y: u32) -> RenderResult<()> {
        self.ensure_open()?;
        tracing::trace!("Pointer move to ({}, {}) ignored", x, y);
        Ok(())
    }

    async fn scroll_by(&mut self, delta: i32) -> RenderResult<()> {
        self.ensure_open()?;
        tracing::trace!("Scroll by {} ignored", delta);
        Ok(())
    }

    async fn option_labels(&mut self, selector: &str) -> RenderResult<Vec<String>> {
        self.ensure_open()?;
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.markup);
        Ok(document
            .select(&selector)
            .map(|element| element.text().collect())
            .collect())
    }

    async fn close(&mut self) -> RenderResult<()> {
        self.closed = true;
        self.markup.clear();
        self.current_url = None;
        Ok(())
    }
}

fn classify_error(url: &str, timeout: Duration, error: reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::timeout(format!("navigation to {}", url), timeout)
    } else if error.is_connect() || error.is_request() || error.is_body() {
        RenderError::Connection {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        RenderError::Http(error)
    }
}

fn parse_selector(selector: &str) -> RenderResult<Selector> {
    Selector::parse(selector).map_err(|_| RenderError::InvalidSelector(selector.to_string()))
}

fn count_matches(markup: &str, selector: &str) -> RenderResult<usize> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(markup);
    let count = document.select(&selector).count();
    Ok(count)
}

/// Resolves the form field a `<select>` submits, checking that `value` is one of its options
fn form_field(markup: &str, selector: &str, value: &str) -> RenderResult<String> {
    let select_selector = parse_selector(selector)?;
    let option_selector = parse_selector("option")?;
    let document = Html::parse_document(markup);

    let select = document
        .select(&select_selector)
        .next()
        .ok_or_else(|| RenderError::ElementNotFound(selector.to_string()))?;

    let has_option = select.select(&option_selector).any(|option| {
        match option.value().attr("value") {
            Some(option_value) => option_value == value,
            None => option.text().collect::<String>().trim() == value,
        }
    });
    if !has_option {
        return Err(RenderError::ElementNotFound(format!(
            "{} option '{}'",
            selector, value
        )));
    }

    select
        .value()
        .attr("name")
        .or_else(|| select.value().attr("id"))
        .map(str::to_string)
        .ok_or_else(|| RenderError::Session(format!("'{}' has neither name nor id", selector)))
}

fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in &retained {
        pairs.append_pair(k, v);
    }
    pairs.append_pair(key, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentityConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FORM: &str = r#"<html><body><form id="vehicle_form">
        <select id="auto_vendor" name="vendor"><option value="">Make</option><option value="audi">Audi</option></select>
        <select id="auto_year"><option>2024</option></select>
        </form></body></html>"#;

    async fn open_session() -> HttpSession {
        let profile = IdentityProfile::random(&IdentityConfig::default());
        HttpSessionFactory::new(&CatalogConfig::default())
            .open(&profile)
            .await
            .unwrap()
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_string(body.to_string())
            .insert_header("content-type", "text/html")
    }

    #[test]
    fn test_form_field_uses_name_then_id() {
        assert_eq!(form_field(FORM, "select#auto_vendor", "audi").unwrap(), "vendor");
        assert_eq!(form_field(FORM, "select#auto_year", "2024").unwrap(), "auto_year");
    }

    #[test]
    fn test_form_field_rejects_unknown_option() {
        assert!(matches!(
            form_field(FORM, "select#auto_vendor", "tesla"),
            Err(RenderError::ElementNotFound(_))
        ));
        assert!(matches!(
            form_field(FORM, "select#missing", "audi"),
            Err(RenderError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_set_query_param_replaces_existing() {
        let mut url = Url::parse("https://example.com/?vendor=bmw&x=1").unwrap();
        set_query_param(&mut url, "vendor", "audi");
        assert_eq!(url.as_str(), "https://example.com/?x=1&vendor=audi");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            count_matches(FORM, "select[[["),
            Err(RenderError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_build_http_client_rejects_bad_header() {
        let mut profile = IdentityProfile::random(&IdentityConfig::default());
        profile
            .headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(matches!(
            build_http_client(&profile),
            Err(RenderError::Session(_))
        ));
    }

    #[tokio::test]
    async fn test_navigate_and_wait() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(FORM))
            .mount(&server)
            .await;

        let mut session = open_session().await;
        let url = format!("{}/", server.uri());
        session
            .navigate(&url, WaitStrategy::ContentLoaded, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(session.current_url(), Some(url));
        assert!(session.content().await.unwrap().contains("vehicle_form"));
        session
            .wait_for_selector("#vehicle_form", Duration::from_secs(1))
            .await
            .unwrap();

        let missing = session
            .wait_for_selector(".trims-list", Duration::from_secs(1))
            .await;
        assert!(matches!(missing, Err(RenderError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut session = open_session().await;
        let err = session
            .navigate(&server.uri(), WaitStrategy::NetworkIdle, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Status { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_select_option_submits_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("vendor", "audi"))
            .respond_with(html("<p class=\"picked\">audi</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(FORM))
            .mount(&server)
            .await;

        let mut session = open_session().await;
        session
            .navigate(
                &format!("{}/", server.uri()),
                WaitStrategy::ContentLoaded,
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        session
            .select_option("select#auto_vendor", "audi")
            .await
            .unwrap();

        assert!(session.current_url().unwrap().ends_with("/?vendor=audi"));
        let labels = session.option_labels("p.picked").await.unwrap();
        assert_eq!(labels, vec!["audi".to_string()]);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_calls() {
        let mut session = open_session().await;
        session.scroll_by(300).await.unwrap();
        session.move_pointer(10, 10).await.unwrap();

        session.close().await.unwrap();
        assert!(matches!(
            session.content().await,
            Err(RenderError::Session(_))
        ));
        assert!(session.move_pointer(10, 10).await.is_err());
    }
}
