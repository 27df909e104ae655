//! Extraction of fitment records from rendered catalog markup
//!
//! This module contains:
//! - the typed records (`TrimRecord`, `TireRow`, `Staggered`)
//! - the normalizer: text cleanup, numeric canonicalization, staggered splitting
//! - the extractor: page markup in, zero or more trim records out

mod extractor;
mod normalize;
mod record;

pub use extractor::{Extractor, PageExtraction, PageIdentity};
pub use normalize::{canonicalize_number, clean_text, slugify, split_staggered};
pub use record::{Staggered, TireRow, TrimRecord};
