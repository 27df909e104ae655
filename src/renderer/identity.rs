//! Session identity profiles

use crate::config::{IdentityConfig, Viewport};
use std::collections::BTreeMap;

const FALLBACK_VIEWPORT: Viewport = Viewport {
    width: 1366,
    height: 768,
};

/// The identity one rendering session presents to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub user_agent: String,
    pub viewport: Viewport,
    pub locale: String,
    pub timezone: String,
    pub headers: BTreeMap<String, String>,
    pub init_scripts: Vec<String>,
}

impl IdentityProfile {
    /// Draws a profile from the configured pool
    ///
    /// The user agent and viewport are picked independently at random.
    pub fn random(config: &IdentityConfig) -> Self {
        let user_agents: Vec<&String> = config
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();

        let user_agent = pick(&user_agents)
            .map(|ua| ua.to_string())
            .unwrap_or_default();
        let viewport = pick(&config.viewports)
            .copied()
            .unwrap_or(FALLBACK_VIEWPORT);

        Self {
            user_agent,
            viewport,
            locale: config.locale.clone(),
            timezone: config.timezone.clone(),
            headers: config.headers.clone(),
            init_scripts: config.init_scripts.clone(),
        }
    }
}

fn pick<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        None
    } else {
        items.get(fastrand::usize(..items.len()))
    }
}
