//! Work units: discovery tasks and page targets

use std::fmt;
use url::Url;

/// One (make, year) unit of discovery work
///
/// Created at startup from the configured cross-product and consumed exactly
/// once by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    pub make: String,
    pub year: u16,
}

impl Task {
    pub fn new(make: impl Into<String>, year: u16) -> Self {
        Self {
            make: make.into(),
            year,
        }
    }

    /// Derives the page target for a model discovered under this task
    pub fn target(&self, model: impl Into<String>) -> Target {
        Target {
            make: self.make.clone(),
            model: model.into(),
            year: self.year,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.make.to_uppercase(), self.year)
    }
}

/// One (make, model, year) page to fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub make: String,
    pub model: String,
    pub year: u16,
}

impl Target {
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: u16) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
        }
    }

    /// Resolves the catalog page for this target against the catalog root
    ///
    /// ```
    /// use url::Url;
    /// use wheel_harvest::Target;
    ///
    /// let base = Url::parse("https://catalog.example/").unwrap();
    /// let url = Target::new("audi", "a4", 2024).url(&base).unwrap();
    /// assert_eq!(url.as_str(), "https://catalog.example/size/audi/a4/2024/");
    /// ```
    pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
        base.join(&format!("size/{}/{}/{}/", self.make, self.model, self.year))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.make, self.model, self.year)
    }
}
