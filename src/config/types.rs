use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Wheel-Harvest
///
/// Every section falls back to its defaults, so an empty file (or no file at
/// all) describes the full production run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub harvest: HarvestSection,
    pub catalog: CatalogConfig,
    pub targets: TargetsConfig,
    pub retry: RetryConfig,
    pub pacing: PacingConfig,
    pub extraction: ExtractionConfig,
    pub detection: DetectionConfig,
    pub identity: IdentityConfig,
    pub output: OutputConfig,
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestSection {
    /// Number of concurrent workers, each owning one rendering session
    pub workers: u32,
}

impl Default for HarvestSection {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Catalog site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root of the catalog; target pages live under `size/{make}/{model}/{year}/`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Upper bound for a single navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Upper bound for a single selector wait (milliseconds)
    #[serde(rename = "selector-timeout-ms")]
    pub selector_timeout_ms: u64,
}

impl CatalogConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.wheel-size.com/".to_string(),
            navigation_timeout_ms: 30_000,
            selector_timeout_ms: 20_000,
        }
    }
}

/// The (make × year) cross-product to harvest
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    /// Catalog make identifiers
    pub makes: Vec<String>,

    /// First model year (inclusive)
    #[serde(rename = "first-year")]
    pub first_year: u16,

    /// Last model year (inclusive)
    #[serde(rename = "last-year")]
    pub last_year: u16,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            makes: DEFAULT_MAKES.iter().map(|m| m.to_string()).collect(),
            first_year: 2000,
            last_year: 2025,
        }
    }
}

const DEFAULT_MAKES: &[&str] = &[
    "acura",
    "alfa-romeo",
    "aston-martin",
    "audi",
    "bentley",
    "bmw",
    "bugatti",
    "buick",
    "cadillac",
    "chevrolet",
    "chrysler",
    "dodge",
    "ferrari",
    "ford",
    "genesis",
    "gmc",
    "honda",
    "hummer",
    "hyundai",
    "infiniti",
    "jaguar",
    "jeep",
    "kia",
    "lamborghini",
    "land-rover",
    "lexus",
    "lincoln",
    "lotus",
    "maserati",
    "maybach",
    "mazda",
    "mclaren",
    "mercedes-benz",
    "mercury",
    "mini",
    "mitsubishi",
    "nissan",
    "oldsmobile",
    "pontiac",
    "porsche",
    "ram",
    "rolls-royce",
    "saab",
    "saturn",
    "scion",
    "subaru",
    "suzuki",
    "tesla",
    "toyota",
    "volkswagen",
    "volvo",
];

/// Retry/backoff configuration for page fetches
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per target (including the first)
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay after the first retryable failure; doubles on each further one
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 30_000,
        }
    }
}

/// Inter-step pacing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Lower bound of the jitter applied between rendering steps (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the jitter applied between rendering steps (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Lower bound of the pause between two targets (milliseconds)
    #[serde(rename = "between-targets-min-ms")]
    pub between_targets_min_ms: u64,

    /// Upper bound of the pause between two targets (milliseconds)
    #[serde(rename = "between-targets-max-ms")]
    pub between_targets_max_ms: u64,

    /// Move the pointer and scroll after each navigation
    #[serde(rename = "simulate-activity")]
    pub simulate_activity: bool,
}

impl PacingConfig {
    /// Pacing with every delay set to zero and no activity simulation
    pub fn immediate() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
            between_targets_min_ms: 0,
            between_targets_max_ms: 0,
            simulate_activity: false,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 500,
            max_delay_ms: 2_000,
            between_targets_min_ms: 1_000,
            between_targets_max_ms: 3_000,
            simulate_activity: true,
        }
    }
}

/// Extractor behavior flags
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Keep only panels carrying `market-class`
    #[serde(rename = "usa-market-only")]
    pub usa_market_only: bool,

    /// Region class marking USA-market trim panels
    #[serde(rename = "market-class")]
    pub market_class: String,

    /// Row class marking original-equipment fitments
    #[serde(rename = "stock-row-class")]
    pub stock_row_class: String,

    /// Attach the outer HTML of the trims list to every record
    #[serde(rename = "capture-html")]
    pub capture_html: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            usa_market_only: true,
            market_class: "region-trim-usdm".to_string(),
            stock_row_class: "stock".to_string(),
            capture_html: false,
        }
    }
}

/// Bot-challenge markers checked after every navigation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Case-insensitive phrases searched for in the rendered markup
    pub phrases: Vec<String>,

    /// Case-insensitive fragments searched for in the post-navigation URL
    #[serde(rename = "url-patterns")]
    pub url_patterns: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let phrases = [
            "access denied",
            "blocked",
            "captcha",
            "security check",
            "suspicious activity",
            "automated requests",
            "bot detected",
            "rate limit",
            "too many requests",
            "checking your browser",
            "please verify you are human",
        ];
        Self {
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            url_patterns: vec![
                "challenge".to_string(),
                "verify".to_string(),
                "captcha".to_string(),
            ],
        }
    }
}

/// Viewport dimensions for a rendering session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Pool of identity settings a session profile is drawn from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,

    pub viewports: Vec<Viewport>,

    pub locale: String,

    pub timezone: String,

    /// Extra request headers sent with every navigation
    pub headers: BTreeMap<String, String>,

    /// Scripts a session runs before each navigation
    #[serde(rename = "init-scripts")]
    pub init_scripts: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let user_agents = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
        ];
        let viewports = [
            (1920, 1080),
            (1366, 768),
            (1440, 900),
            (1536, 864),
            (1600, 900),
            (1280, 720),
        ];

        let mut headers = BTreeMap::new();
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        );
        headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());

        Self {
            user_agents: user_agents.iter().map(|ua| ua.to_string()).collect(),
            viewports: viewports
                .iter()
                .map(|&(width, height)| Viewport { width, height })
                .collect(),
            locale: "en-US".to_string(),
            timezone: "America/New_York".to_string(),
            headers,
            init_scripts: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the persisted `results/<make>/<year>/` layout
    #[serde(rename = "results-dir")]
    pub results_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: "results".to_string(),
        }
    }
}
