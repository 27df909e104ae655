//! Bot-challenge detection
//!
//! Checked right after every navigation. A hit is a retryable
//! `DetectionSuspected` failure, never a fatal one. Phrases are matched
//! against the page's visible text, so script sources, inline scripts and
//! attribute values never trigger a hit.

use crate::config::DetectionConfig;
use scraper::Html;

/// Elements whose text content is never rendered
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Case-insensitive challenge markers for page content and URLs
#[derive(Debug, Clone)]
pub struct DetectionRules {
    phrases: Vec<String>,
    url_patterns: Vec<String>,
}

impl DetectionRules {
    /// Returns a description of the first marker found, if any
    ///
    /// # Arguments
    ///
    /// * `content` - Rendered markup of the current page
    /// * `url` - URL the session landed on after the navigation
    pub fn check(&self, content: &str, url: Option<&str>) -> Option<String> {
        if let Some(url) = url {
            let url_lower = url.to_lowercase();
            if let Some(pattern) = self.url_patterns.iter().find(|p| url_lower.contains(*p)) {
                return Some(format!("challenge pattern '{}' in URL {}", pattern, url));
            }
        }

        if self.phrases.is_empty() {
            return None;
        }
        let text = visible_text(content);
        self.phrases
            .iter()
            .find(|phrase| text.contains(*phrase))
            .map(|phrase| format!("challenge phrase '{}' in page content", phrase))
    }
}

/// Lowercased text a reader would see, one space between text nodes
fn visible_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut text = String::new();

    for node in document.tree.root().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }

    text.to_lowercase()
}

impl From<&DetectionConfig> for DetectionRules {
    fn from(config: &DetectionConfig) -> Self {
        let lowered = |items: &[String]| {
            items
                .iter()
                .map(|item| item.trim().to_lowercase())
                .filter(|item| !item.is_empty())
                .collect()
        };
        Self {
            phrases: lowered(&config.phrases),
            url_patterns: lowered(&config.url_patterns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> DetectionRules {
        DetectionRules::from(&DetectionConfig::default())
    }

    #[test]
    fn test_clean_page_passes() {
        let page = r#"<h1 id="title-header">Audi A4 2024</h1><div class="trims-list"></div>"#;
        assert_eq!(
            rules().check(page, Some("https://www.wheel-size.com/size/audi/a4/2024/")),
            None
        );
    }

    #[test]
    fn test_phrase_is_case_insensitive() {
        let reason = rules()
            .check("<p>Please complete the CAPTCHA below</p>", None)
            .unwrap();
        assert!(reason.contains("captcha"));
    }

    #[test]
    fn test_scripts_and_attributes_are_ignored() {
        let page = r#"<html><head>
            <script src="https://static.cloudflareinsights.com/beacon.min.js"></script>
            <script>var blocked = false; // rate limit handled by the edge</script>
            <style>.captcha { display: none }</style>
            </head><body data-note="access denied">
            <h1 id="title-header">Audi A4 2024</h1></body></html>"#;
        assert_eq!(rules().check(page, None), None);
    }

    #[test]
    fn test_visible_challenge_text_is_detected() {
        let page = r#"<html><head><title>Just a moment...</title></head>
            <body><h2>Checking your browser before accessing the catalog</h2></body></html>"#;
        let reason = rules().check(page, None).unwrap();
        assert!(reason.contains("checking your browser"));
    }

    #[test]
    fn test_url_pattern() {
        let reason = rules()
            .check("<p>ok</p>", Some("https://catalog.example/cdn-cgi/Challenge?r=1"))
            .unwrap();
        assert!(reason.contains("challenge"));
        assert!(reason.contains("URL"));
    }

    #[test]
    fn test_blank_markers_are_ignored() {
        let config = DetectionConfig {
            phrases: vec!["  ".to_string()],
            url_patterns: vec![String::new()],
        };
        let rules = DetectionRules::from(&config);
        assert_eq!(rules.check("anything", Some("https://x.example/")), None);
    }
}
