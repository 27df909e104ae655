//! Normalization of raw markup fragments into clean scalar values
//!
//! Everything here is a pure function of its input: text cleanup,
//! numeric canonicalization, and front/rear splitting of staggered cells.

use crate::extract::record::Staggered;
use once_cell::sync::Lazy;
use scraper::node::Element;
use scraper::{ElementRef, Selector};

/// Tags that may carry decorative content
const DECORATIVE_TAGS: [&str; 3] = ["i", "img", "span"];

/// Classes marking badges, icon glyphs and load/speed index markers
const DECORATIVE_CLASSES: [&str; 4] = ["badge", "tire_load_index", "d-block", "fa-li"];

pub(crate) fn compile(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

static IMPERIAL: Lazy<Selector> = Lazy::new(|| compile("span.imperial"));
static REAR_MARKER: Lazy<Selector> = Lazy::new(|| compile("span.rear-tire-data"));

/// Returns the whitespace-collapsed text of a fragment with decorative
/// sub-elements removed, or `None` when there is no fragment
///
/// Each text node is trimmed before the pieces are joined, so adjacent
/// nodes are glued without a separator.
pub fn clean_text(fragment: Option<ElementRef<'_>>) -> Option<String> {
    fragment.map(|element| text_excluding(element, &|_: ElementRef<'_>| false))
}

/// Splits a table cell into its front and rear values
///
/// With `imperial` set, the cell is first narrowed to its imperial variant
/// when one exists. Then:
/// 1. an explicit rear marker becomes `rear` and the rest becomes `front`;
/// 2. otherwise the first line break splits the cell in two;
/// 3. otherwise both sides carry the whole cell's text.
pub fn split_staggered(cell: ElementRef<'_>, imperial: bool) -> Staggered {
    let target = if imperial {
        cell.select(&IMPERIAL).next().unwrap_or(cell)
    } else {
        cell
    };

    if let Some(rear) = target.select(&REAR_MARKER).next() {
        let rear_id = rear.id();
        let front = text_excluding(target, &|element: ElementRef<'_>| element.id() == rear_id);
        return Staggered::new(Some(front), clean_text(Some(rear)));
    }

    let mut split = BreakSplit::default();
    split.walk(target, true);
    if split.broken {
        Staggered::new(
            Some(collapse_whitespace(&split.front)),
            Some(collapse_whitespace(&split.rear)),
        )
    } else {
        Staggered::uniform(clean_text(Some(target)))
    }
}

/// Renders integral numbers without a fractional part
///
/// Non-integral and non-numeric values are returned unchanged.
///
/// ```
/// use wheel_harvest::extract::canonicalize_number;
///
/// assert_eq!(canonicalize_number(Some("25.0")).as_deref(), Some("25"));
/// assert_eq!(canonicalize_number(Some("22.4")).as_deref(), Some("22.4"));
/// assert_eq!(canonicalize_number(Some("n/a")).as_deref(), Some("n/a"));
/// assert_eq!(canonicalize_number(None), None);
/// ```
pub fn canonicalize_number(value: Option<&str>) -> Option<String> {
    let value = value?;
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number.fract() == 0.0 => {
            if number == 0.0 {
                Some("0".to_string())
            } else {
                Some(format!("{:.0}", number))
            }
        }
        _ => Some(value.to_string()),
    }
}

/// Lower-cases a catalog label and joins its words with hyphens
pub fn slugify(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "-")
}

/// Trimmed text of every descendant text node, decorative content included
pub(crate) fn stripped_text(element: ElementRef<'_>) -> String {
    let joined: String = element.text().map(str::trim).collect();
    collapse_whitespace(&joined)
}

pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn is_decorative(element: &Element) -> bool {
    DECORATIVE_TAGS.contains(&element.name())
        && element
            .classes()
            .any(|class| DECORATIVE_CLASSES.contains(&class))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_excluding(element: ElementRef<'_>, exclude: &dyn Fn(ElementRef<'_>) -> bool) -> String {
    let mut raw = String::new();
    push_text(element, exclude, &mut raw);
    collapse_whitespace(&raw)
}

fn push_text(element: ElementRef<'_>, exclude: &dyn Fn(ElementRef<'_>) -> bool, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text.trim());
        } else if let Some(child) = ElementRef::wrap(child) {
            if !is_decorative(child.value()) && !exclude(child) {
                push_text(child, exclude, out);
            }
        }
    }
}

/// Text on either side of the first `<br>` in document order
#[derive(Default)]
struct BreakSplit {
    front: String,
    rear: String,
    broken: bool,
}

impl BreakSplit {
    // Decorative subtrees are still walked so a break inside one splits the cell.
    fn walk(&mut self, element: ElementRef<'_>, emit: bool) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                if emit {
                    let side = if self.broken {
                        &mut self.rear
                    } else {
                        &mut self.front
                    };
                    side.push_str(text.trim());
                }
            } else if let Some(child) = ElementRef::wrap(child) {
                if !self.broken && child.value().name() == "br" {
                    self.broken = true;
                    continue;
                }
                let emit = emit && !is_decorative(child.value());
                self.walk(child, emit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_cell(html: &Html) -> ElementRef<'_> {
        html.select(&compile("td")).next().unwrap()
    }

    fn cell_fragment(inner: &str) -> Html {
        Html::parse_fragment(&format!("<table><tr><td>{}</td></tr></table>", inner))
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_canonicalize_number() {
        assert_eq!(canonicalize_number(Some("25.0")), s("25"));
        assert_eq!(canonicalize_number(Some("25")), s("25"));
        assert_eq!(canonicalize_number(Some("22.4")), s("22.4"));
        assert_eq!(canonicalize_number(Some("n/a")), s("n/a"));
        assert_eq!(canonicalize_number(Some("")), s(""));
        assert_eq!(canonicalize_number(Some("-0.0")), s("0"));
        assert_eq!(canonicalize_number(None), None);
    }

    #[test]
    fn test_clean_text_strips_decorations() {
        let html = cell_fragment(
            r#"225/45R17 <span class="tire_load_index">94W</span><span class="badge">OE</span><i class="fa-li"></i>"#,
        );
        assert_eq!(clean_text(Some(first_cell(&html))), s("225/45R17"));
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        let html = cell_fragment("  8.5J   x 18 \n  <b> ET35 </b> ");
        assert_eq!(clean_text(Some(first_cell(&html))), s("8.5J x 18ET35"));
    }

    #[test]
    fn test_clean_text_absent_fragment() {
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn test_split_on_rear_marker() {
        let html = cell_fragment(
            r#"245/35R19 <span class="rear-tire-data">275/30R19</span>"#,
        );
        let split = split_staggered(first_cell(&html), false);
        assert_eq!(split.front, s("245/35R19"));
        assert_eq!(split.rear, s("275/30R19"));
    }

    #[test]
    fn test_split_on_line_break() {
        let html = cell_fragment("35<br>40");
        let split = split_staggered(first_cell(&html), false);
        assert_eq!(split.front, s("35"));
        assert_eq!(split.rear, s("40"));
    }

    #[test]
    fn test_split_only_on_first_line_break() {
        let html = cell_fragment("35<br>40<br>45");
        let split = split_staggered(first_cell(&html), false);
        assert_eq!(split.front, s("35"));
        assert_eq!(split.rear, s("4045"));
    }

    #[test]
    fn test_non_staggered_cell_duplicates_value() {
        let html = cell_fragment("8.5Jx18");
        let split = split_staggered(first_cell(&html), false);
        assert_eq!(split.front, s("8.5Jx18"));
        assert_eq!(split.front, split.rear);
        assert!(!split.is_staggered());
    }

    #[test]
    fn test_imperial_narrowing() {
        let html = cell_fragment(
            r#"<span class="metric">160.5<br>170.2</span><span class="imperial">6.3<br>6.7</span>"#,
        );
        let split = split_staggered(first_cell(&html), true);
        assert_eq!(split.front, s("6.3"));
        assert_eq!(split.rear, s("6.7"));
    }

    #[test]
    fn test_imperial_hint_without_imperial_variant() {
        let html = cell_fragment("44");
        let split = split_staggered(first_cell(&html), true);
        assert_eq!(split, Staggered::uniform(s("44")));
    }

    #[test]
    fn test_rear_marker_inside_imperial_variant() {
        let html = cell_fragment(
            r#"<span class="metric">2.5</span><span class="imperial">36 <span class="rear-tire-data">41</span></span>"#,
        );
        let split = split_staggered(first_cell(&html), true);
        assert_eq!(split.front, s("36"));
        assert_eq!(split.rear, s("41"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify(" A6 Allroad "), "a6-allroad");
        assert_eq!(slugify("Model 3"), "model-3");
        assert_eq!(slugify("x5"), "x5");
    }
}
