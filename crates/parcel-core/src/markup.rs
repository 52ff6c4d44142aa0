//! Markup adapter for the courier's tracking page
//!
//! Turns page HTML into [`ParsedEntry`] values (ordered label/value pairs).
//! Everything that knows about the provider's class names lives here; the
//! extractor only ever sees labels.
//!
//! The J&T page renders each milestone as
//!
//! ```html
//! <div class="result-vandon-item">
//!   <div>
//!     <span class="text-[14px] SFProDisplayBold">10:00</span>
//!     <span class="text-[14px] SFProDisplayBold">01/01/2024</span>
//!   </div>
//!   <div>Delivered</div>
//! </div>
//! ```
//!
//! where the bold spans carry time then date, and the last text block is
//! the description.

use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};

/// Container of the status list on the J&T page
pub const JT_CONTAINER_SELECTOR: &str = ".result-vandon";
/// One status milestone on the J&T page
pub const JT_ENTRY_SELECTOR: &str = ".result-vandon-item";
/// Bold timestamp fields inside a milestone
pub const JT_LABEL_SELECTOR: &str = "span.SFProDisplayBold";
/// Text blocks inside a milestone; the last one without labels is the description
pub const JT_BLOCK_SELECTOR: &str = "div";

/// Meaning of a field inside a status entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Time,
    Date,
    Description,
}

/// One status entry as ordered label/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEntry {
    pub fields: Vec<(FieldLabel, String)>,
}

impl ParsedEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: FieldLabel, value: impl Into<String>) -> Self {
        self.fields.push((label, value.into()));
        self
    }

    /// First non-empty value carrying `label`
    pub fn get(&self, label: FieldLabel) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, v)| *l == label && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed view of a whole tracking page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// Whether the status list container exists at all
    pub container_found: bool,
    /// Entries in source order (newest first on the J&T page)
    pub entries: Vec<ParsedEntry>,
}

/// CSS selectors describing one provider's markup
#[derive(Debug, Clone)]
pub struct MarkupProfile {
    container: Selector,
    entry: Selector,
    label: Selector,
    block: Selector,
}

impl MarkupProfile {
    /// Build a profile from CSS selector strings
    pub fn new(container: &str, entry: &str, label: &str, block: &str) -> Result<Self> {
        Ok(Self {
            container: parse_selector(container)?,
            entry: parse_selector(entry)?,
            label: parse_selector(label)?,
            block: parse_selector(block)?,
        })
    }

    /// Profile for jtexpress.vn
    pub fn jt_express() -> Result<Self> {
        Self::new(
            JT_CONTAINER_SELECTOR,
            JT_ENTRY_SELECTOR,
            JT_LABEL_SELECTOR,
            JT_BLOCK_SELECTOR,
        )
    }

    /// Whether the status list container is present in `html`
    pub fn has_container(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        document.select(&self.container).next().is_some()
            || document.select(&self.entry).next().is_some()
    }

    /// Parse every status entry in source order
    pub fn parse(&self, html: &str) -> ParsedPage {
        let document = Html::parse_document(html);

        let entries: Vec<ParsedEntry> = document
            .select(&self.entry)
            .map(|entry| self.parse_entry(entry))
            .collect();

        let container_found =
            !entries.is_empty() || document.select(&self.container).next().is_some();

        ParsedPage {
            container_found,
            entries,
        }
    }

    fn parse_entry(&self, entry: ElementRef<'_>) -> ParsedEntry {
        let mut parsed = ParsedEntry::new();

        let labels: Vec<String> = entry.select(&self.label).map(element_text).collect();
        if let Some(time) = labels.first() {
            parsed.fields.push((FieldLabel::Time, time.clone()));
        }
        if let Some(date) = labels.get(1) {
            parsed.fields.push((FieldLabel::Date, date.clone()));
        }

        let description = entry
            .select(&self.block)
            .filter(|block| block.select(&self.label).next().is_none())
            .map(element_text)
            .filter(|text| !text.is_empty())
            .last();
        if let Some(description) = description {
            parsed.fields.push((FieldLabel::Description, description));
        }

        parsed
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::config(format!("Invalid CSS selector '{}': {}", css, e)))
}

/// Element text with runs of whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}
