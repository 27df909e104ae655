//! Structured extraction of trim records from a rendered catalog page
//!
//! # Page contract
//!
//! - one `h1#title-header` carrying `data-make-name`, `data-model-name` and `data-year`
//! - zero or more `div.panel` trim panels with an id starting with `trim-`,
//!   each tagged with a market-region class
//! - per panel, an optional `li.element-parameter` descriptor list and a
//!   `table.table-ws` whose body rows have at least six cells in the order
//!   size, rim, offset, backspacing, weight, max-psi

use crate::config::ExtractionConfig;
use crate::extract::normalize::{
    canonicalize_number, clean_text, compile, has_class, slugify, split_staggered, stripped_text,
};
use crate::extract::record::{Staggered, TireRow, TrimRecord};
use crate::state::Target;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static TITLE: Lazy<Selector> = Lazy::new(|| compile("h1#title-header"));
static TRIMS_LIST: Lazy<Selector> = Lazy::new(|| compile("div.trims-list"));
static PANEL: Lazy<Selector> = Lazy::new(|| compile(r#"div.panel[id^="trim-"]"#));
static PANEL_HEADER: Lazy<Selector> = Lazy::new(|| compile("div.panel-hdr"));
static TRIM_NAME: Lazy<Selector> = Lazy::new(|| compile("span.panel-hdr-trim-name"));
static SPAN: Lazy<Selector> = Lazy::new(|| compile("span"));
static PARAMETER: Lazy<Selector> = Lazy::new(|| compile("li.element-parameter"));
static PARAMETER_NAME: Lazy<Selector> = Lazy::new(|| compile("span.parameter-name"));
static IMPERIAL: Lazy<Selector> = Lazy::new(|| compile("span.imperial"));
static TABLE: Lazy<Selector> = Lazy::new(|| compile("table.table-ws"));
static TBODY: Lazy<Selector> = Lazy::new(|| compile("tbody"));
static ROW: Lazy<Selector> = Lazy::new(|| compile("tr"));
static CELL: Lazy<Selector> = Lazy::new(|| compile("td"));
static SNOWFLAKE: Lazy<Selector> = Lazy::new(|| compile("i.fa-snowflake"));

static HP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*hp").unwrap_or_else(|e| panic!("invalid hp pattern: {e}")));

/// Minimum number of cells a fitment row needs
const MIN_ROW_CELLS: usize = 6;

/// Identity a page declares for itself in its title element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIdentity {
    pub make: String,
    pub model: String,
    pub year: u16,
}

impl PageIdentity {
    /// Returns true if this identity names the same vehicle as `target`
    ///
    /// Display names are compared in their catalog-slug form.
    pub fn matches(&self, target: &Target) -> bool {
        slugify(&self.make) == target.make
            && slugify(&self.model) == target.model.to_lowercase()
            && self.year == target.year
    }
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    /// `None` when the page did not render its title element
    pub identity: Option<PageIdentity>,
    pub records: Vec<TrimRecord>,
}

/// Descriptive parameters recognised in a panel's parameter list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Descriptor {
    Generation,
    Production,
    Centerbore,
    BoltPattern,
    WheelFasteners,
    ThreadSize,
}

impl Descriptor {
    fn from_label(label: &str) -> Option<Self> {
        const LABELS: [(&str, Descriptor); 6] = [
            ("generation", Descriptor::Generation),
            ("production", Descriptor::Production),
            ("center bore", Descriptor::Centerbore),
            ("bolt pattern", Descriptor::BoltPattern),
            ("wheel fasteners", Descriptor::WheelFasteners),
            ("thread size", Descriptor::ThreadSize),
        ];
        LABELS
            .iter()
            .find(|(needle, _)| label.contains(needle))
            .map(|&(_, descriptor)| descriptor)
    }

    fn slot(self, record: &mut TrimRecord) -> &mut Option<String> {
        match self {
            Self::Generation => &mut record.generation,
            Self::Production => &mut record.production,
            Self::Centerbore => &mut record.centerbore,
            Self::BoltPattern => &mut record.bolt_pattern,
            Self::WheelFasteners => &mut record.wheel_fasteners,
            Self::ThreadSize => &mut record.thread_size,
        }
    }
}

/// Converts rendered catalog pages into [`TrimRecord`]s
///
/// Extraction is a pure function of the markup and the configured flags.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extracts every qualifying trim record from a page
    ///
    /// A page without its title element yields an empty sequence.
    ///
    /// # Example
    ///
    /// ```
    /// use wheel_harvest::Extractor;
    ///
    /// let records = Extractor::default().extract("<html><body>maintenance</body></html>");
    /// assert!(records.is_empty());
    /// ```
    pub fn extract(&self, markup: &str) -> Vec<TrimRecord> {
        self.extract_page(markup).records
    }

    /// Extracts the page identity together with its records
    pub fn extract_page(&self, markup: &str) -> PageExtraction {
        let document = Html::parse_document(markup);

        let identity = match page_identity(&document) {
            Some(identity) => identity,
            None => return PageExtraction::default(),
        };

        let html_output = if self.config.capture_html {
            Some(
                document
                    .select(&TRIMS_LIST)
                    .next()
                    .map(|list| list.html())
                    .unwrap_or_default(),
            )
        } else {
            None
        };

        let records = document
            .select(&PANEL)
            .filter(|panel| {
                !self.config.usa_market_only || has_class(*panel, &self.config.market_class)
            })
            .filter_map(|panel| self.extract_panel(panel, &identity, html_output.as_deref()))
            .collect();

        PageExtraction {
            identity: Some(identity),
            records,
        }
    }

    /// Builds one record from a trim panel; `None` if the panel has no fitment table body
    fn extract_panel(
        &self,
        panel: ElementRef<'_>,
        identity: &PageIdentity,
        html_output: Option<&str>,
    ) -> Option<TrimRecord> {
        let mut record = TrimRecord {
            html_output: html_output.map(str::to_string),
            make: identity.make.clone(),
            model: identity.model.clone(),
            year: identity.year,
            ..Default::default()
        };

        if let Some(header) = panel.select(&PANEL_HEADER).next() {
            record.engine = trim_name(header);
            record.hp = horsepower(header);
        }

        for item in panel.select(&PARAMETER) {
            apply_parameter(&mut record, item);
        }

        let body = panel.select(&TABLE).next()?.select(&TBODY).next()?;
        record.tires = body
            .select(&ROW)
            .filter_map(|row| self.tire_row(row))
            .collect();

        Some(record)
    }

    fn tire_row(&self, row: ElementRef<'_>) -> Option<TireRow> {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
        if cells.len() < MIN_ROW_CELLS {
            return None;
        }

        let numeric = |pair: Staggered| pair.map(|value| canonicalize_number(value.as_deref()));

        Some(TireRow {
            original_equipment: self.is_original_equipment(row),
            recommended_for_winter: row.select(&SNOWFLAKE).next().is_some(),
            size: split_staggered(cells[0], false),
            rim: split_staggered(cells[1], false),
            offset: split_staggered(cells[2], false),
            backspacing: numeric(split_staggered(cells[3], true)),
            tire_weight: numeric(split_staggered(cells[4], true)),
            max_psi: numeric(split_staggered(cells[5], true)),
        })
    }

    fn is_original_equipment(&self, row: ElementRef<'_>) -> bool {
        has_class(row, &self.config.stock_row_class)
    }
}

fn page_identity(document: &Html) -> Option<PageIdentity> {
    let title = document.select(&TITLE).next()?;
    let element = title.value();

    Some(PageIdentity {
        make: element.attr("data-make-name")?.to_string(),
        model: element.attr("data-model-name")?.to_string(),
        year: element.attr("data-year")?.trim().parse().ok()?,
    })
}

fn trim_name(header: ElementRef<'_>) -> Option<String> {
    let span = header.select(&TRIM_NAME).next();
    match span.and_then(|s| s.value().attr("data-trim-name")) {
        Some(name) if !name.is_empty() => Some(name.to_string()),
        _ => clean_text(span),
    }
}

fn horsepower(header: ElementRef<'_>) -> Option<u32> {
    let text = header
        .select(&SPAN)
        .map(|span| span.text().collect::<String>())
        .find(|text| text.contains("hp"))?;
    HP_PATTERN.captures(&text)?.get(1)?.as_str().parse().ok()
}

fn apply_parameter(record: &mut TrimRecord, item: ElementRef<'_>) {
    let label = match clean_text(item.select(&PARAMETER_NAME).next()) {
        Some(label) => label.to_lowercase(),
        None => return,
    };

    // Torque is read from the imperial variant only.
    if label.contains("wheel tightening torque") {
        if let Some(torque) = item.select(&IMPERIAL).next() {
            record.wheel_tightening_torque = clean_text(Some(torque))
                .map(|text| text.to_lowercase().replace("lbf⋅ft", "lbf ft"));
        }
        return;
    }

    let full_text = stripped_text(item);
    if let Some((_, value)) = full_text.split_once(':') {
        if let Some(descriptor) = Descriptor::from_label(&label) {
            *descriptor.slot(record) = Some(value.trim().to_string());
        }
    }
}
