//! Live search suggestions with highlighted match spans.
//!
//! Suggestions ignore the active filter and read the whole store. Queries
//! shorter than [`SuggestConfig::min_query_chars`] produce nothing; that is a
//! typing throttle, not an error. The query is regex-escaped before the
//! highlight pattern is built, so input such as `c++` or `(корт` is matched
//! literally.

use std::sync::Arc;

use log::debug;
use regex::{Regex, RegexBuilder};

use crate::filter::text_matches;
use crate::FacilityRecord;

/// Opening tag of a highlighted span in [`HighlightedText::to_markup`].
pub const HIGHLIGHT_OPEN: &str = r#"<span class="suggestion-highlight">"#;
/// Closing tag of a highlighted span.
pub const HIGHLIGHT_CLOSE: &str = "</span>";

/// Configuration for live search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestConfig {
    /// Queries with fewer characters return no suggestions. Default: 2
    pub min_query_chars: usize,
    /// Maximum suggestions returned. Default: 5
    pub max_results: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            min_query_chars: 2,
            max_results: 5,
        }
    }
}

/// A run of text, either matching the query or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

/// Field text split into highlighted and plain runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightedText {
    pub segments: Vec<Segment>,
}

impl HighlightedText {
    fn plain_only(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            segments: vec![Segment { text: text.to_string(), highlighted: false }],
        }
    }

    /// The original field text.
    pub fn plain(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Number of highlighted runs.
    pub fn highlight_count(&self) -> usize {
        self.segments.iter().filter(|s| s.highlighted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render with highlighted runs wrapped in [`HIGHLIGHT_OPEN`]/[`HIGHLIGHT_CLOSE`].
    ///
    /// Field text is HTML-escaped, so tags in the data never look like
    /// highlight tags.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            if segment.highlighted {
                out.push_str(HIGHLIGHT_OPEN);
                out.push_str(&html_escape(&segment.text));
                out.push_str(HIGHLIGHT_CLOSE);
            } else {
                out.push_str(&html_escape(&segment.text));
            }
        }
        out
    }
}

/// Remove highlight tags produced by [`HighlightedText::to_markup`] and undo
/// its escaping, giving back the original field text.
pub fn strip_markup(markup: &str) -> String {
    html_unescape(&markup.replace(HIGHLIGHT_OPEN, "").replace(HIGHLIGHT_CLOSE, ""))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// `&amp;` goes last so `&amp;lt;` comes back as `&lt;`
fn html_unescape(s: &str) -> String {
    s.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}

/// Case-insensitive literal matcher for one query.
struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    fn new(query: &str) -> Self {
        let pattern = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build();
        match pattern {
            Ok(pattern) => Self { pattern: Some(pattern) },
            Err(e) => {
                // Only reachable for queries that exceed the regex size limit
                debug!("[SearchSuggester] Highlighting disabled for query: {}", e);
                Self { pattern: None }
            }
        }
    }

    fn highlight(&self, text: &str) -> HighlightedText {
        let Some(pattern) = &self.pattern else {
            return HighlightedText::plain_only(text);
        };

        let mut segments = Vec::new();
        let mut last = 0;
        for m in pattern.find_iter(text) {
            if m.start() > last {
                segments.push(Segment { text: text[last..m.start()].to_string(), highlighted: false });
            }
            segments.push(Segment { text: m.as_str().to_string(), highlighted: true });
            last = m.end();
        }
        if last < text.len() {
            segments.push(Segment { text: text[last..].to_string(), highlighted: false });
        }

        HighlightedText { segments }
    }
}

/// One live-search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionMatch {
    pub record: Arc<FacilityRecord>,
    pub highlighted_name: HighlightedText,
    pub highlighted_address: HighlightedText,
    pub highlighted_sports: HighlightedText,
}

/// Suggest records whose name, address or sports contain `query`.
///
/// Results keep store order and are capped at `config.max_results`. The name
/// is highlighted as displayed, so unnamed records show [`UNNAMED`](crate::UNNAMED).
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use facility_map::{suggest, FacilityRecord, SuggestConfig};
///
/// let records = vec![Arc::new(FacilityRecord {
///     id: 1,
///     sports: Some("Футбол".into()),
///     ..Default::default()
/// })];
///
/// let matches = suggest("фут", &records, &SuggestConfig::default());
/// assert_eq!(matches.len(), 1);
/// assert_eq!(
///     matches[0].highlighted_sports.to_markup(),
///     r#"<span class="suggestion-highlight">Фут</span>бол"#
/// );
///
/// assert!(suggest("ф", &records, &SuggestConfig::default()).is_empty());
/// ```
pub fn suggest(
    query: &str,
    records: &[Arc<FacilityRecord>],
    config: &SuggestConfig,
) -> Vec<SuggestionMatch> {
    if query.is_empty() || query.chars().count() < config.min_query_chars {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    let highlighter = Highlighter::new(query);
    let highlight = |field: &Option<String>| highlighter.highlight(field.as_deref().unwrap_or(""));

    records
        .iter()
        .filter(|r| text_matches(r, &needle))
        .take(config.max_results)
        .map(|r| SuggestionMatch {
            record: Arc::clone(r),
            highlighted_name: highlighter.highlight(r.display_name()),
            highlighted_address: highlight(&r.address),
            highlighted_sports: highlight(&r.sports),
        })
        .collect()
}
