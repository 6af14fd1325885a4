use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::identity::SignerIdentity;

/// Inserted for signature placeholders when no identity is available.
pub const SIGNATURE_MARKER: &str = "[SIGNATURE]";

/// How far back to look for a label word in front of a bare underscore run.
const LABEL_LOOKBEHIND: usize = 24;

static UNDERSCORE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{3,}").expect("underscore pattern"));
static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]+)\)").expect("paren pattern"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("bracket pattern"));
static BRACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("brace pattern"));
static SIGNATURE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)signature\s*:?\s*(_{3,})").expect("signature pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    Name,
    Date,
    Signature,
    Text,
}

impl PlaceholderKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Date => "date",
            Self::Signature => "signature",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fill-in-the-blank marker detected in contract body text.
///
/// Placeholders are derived, never persisted: the list is a pure function
/// of the body, recomputed on every load, so a body edit can never leave a
/// stale placeholder behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placeholder {
    /// Byte offset of the match start within the body.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    pub kind: PlaceholderKind,
    /// The exact substring that matched. Fills replace this text, not the
    /// span, so identical literals elsewhere in the body are replaced too.
    pub original: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<String>,
}

/// Today's date as shown to the user in suggestions.
#[must_use]
pub fn suggested_date() -> String {
    Local::now().format("%m/%d/%Y").to_string()
}

fn kind_from_label(label: &str) -> PlaceholderKind {
    let label = label.to_lowercase();
    if label.contains("date") {
        PlaceholderKind::Date
    } else if label.contains("signature") {
        PlaceholderKind::Signature
    } else if label.contains("name") {
        PlaceholderKind::Name
    } else {
        PlaceholderKind::Text
    }
}

/// Bare underscore runs carry no label of their own; the words just before
/// the run on the same line decide the kind ("Name: ___", "Date ___").
/// The label closest to the run wins.
fn kind_from_context(body: &str, start: usize) -> PlaceholderKind {
    let mut from = start.saturating_sub(LABEL_LOOKBEHIND);
    while !body.is_char_boundary(from) {
        from += 1;
    }
    let window = body[from..start]
        .rsplit('\n')
        .next()
        .unwrap_or("")
        .to_lowercase();

    [
        (window.rfind("date"), PlaceholderKind::Date),
        (window.rfind("signature"), PlaceholderKind::Signature),
        (window.rfind("name"), PlaceholderKind::Name),
    ]
    .into_iter()
    .filter_map(|(pos, kind)| pos.map(|p| (p, kind)))
    .max_by_key(|(pos, _)| *pos)
    .map_or(PlaceholderKind::Text, |(_, kind)| kind)
}

fn suggestion(kind: PlaceholderKind, identity: &SignerIdentity) -> Option<String> {
    match kind {
        PlaceholderKind::Date => Some(suggested_date()),
        PlaceholderKind::Name => identity.suggested_name().map(str::to_string),
        PlaceholderKind::Signature => Some(
            identity
                .suggested_name()
                .unwrap_or(SIGNATURE_MARKER)
                .to_string(),
        ),
        PlaceholderKind::Text => None,
    }
}

/// Scan contract body text for placeholders, ordered by start offset.
///
/// Five pattern families: underscore runs, parenthesized, bracketed, and
/// braced text, and a dedicated `Signature ___` pattern. Overlapping
/// matches from different families all appear in the result; the scanner
/// sorts but never de-duplicates.
#[must_use]
pub fn scan(body: &str, identity: &SignerIdentity) -> Vec<Placeholder> {
    let mut found = Vec::new();

    for m in UNDERSCORE_RUN.find_iter(body) {
        let kind = kind_from_context(body, m.start());
        found.push(make(m.start(), m.end(), kind, m.as_str(), identity));
    }

    for re in [&*PARENTHESIZED, &*BRACKETED, &*BRACED] {
        for caps in re.captures_iter(body) {
            let whole = caps.get(0).expect("match group");
            let label = caps.get(1).map_or("", |g| g.as_str());
            let kind = kind_from_label(label);
            found.push(make(whole.start(), whole.end(), kind, whole.as_str(), identity));
        }
    }

    for caps in SIGNATURE_LINE.captures_iter(body) {
        // Only the underscore run is replaceable; the "Signature" label
        // stays in the document.
        let run = caps.get(1).expect("underscore group");
        found.push(make(
            run.start(),
            run.end(),
            PlaceholderKind::Signature,
            run.as_str(),
            identity,
        ));
    }

    found.sort_by_key(|p| (p.start, p.end));
    found
}

fn make(
    start: usize,
    end: usize,
    kind: PlaceholderKind,
    original: &str,
    identity: &SignerIdentity,
) -> Placeholder {
    Placeholder {
        start,
        end,
        kind,
        original: original.to_string(),
        value: String::new(),
        suggested: suggestion(kind, identity),
    }
}

/// Replace every placeholder's value with its suggestion in one pass.
/// Placeholders without a suggestion keep their current value. Idempotent
/// as long as the suggestions themselves are unchanged.
pub fn autofill(placeholders: &mut [Placeholder]) {
    for p in placeholders {
        if let Some(s) = p.suggested.as_ref().filter(|s| !s.is_empty()) {
            p.value = s.clone();
        }
    }
}

/// Produce the final text by substituting each placeholder's original
/// matched text with its value, in list order.
///
/// Replacement is text-based, not span-based: if the same literal appears
/// more than once, every occurrence is replaced together. This mirrors the
/// observed behavior of the source workflow and is pinned by tests rather
/// than "fixed".
#[must_use]
pub fn apply_fills(body: &str, placeholders: &[Placeholder]) -> String {
    let mut text = body.to_string();
    for p in placeholders {
        if !p.value.is_empty() && !p.original.is_empty() {
            text = text.replace(&p.original, &p.value);
        }
    }
    text
}
