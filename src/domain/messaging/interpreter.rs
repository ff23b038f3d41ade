//! Chat message interpreter.
//!
//! Best-effort heuristic that turns free text such as
//! `"2x robe africaine\nadresse: Bonanjo"` into a draft order. It is not
//! language understanding; anything it cannot read is left for a human.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, ValidationError};

/// Upper bound on a parsed quantity; larger numbers are not item counts.
const MAX_QUANTITY: u32 = 999;

/// `<int> x? <text>`, e.g. `2x robe`, `2xrobe`, `3 pagnes`, `2 * sac`.
///
/// A spaced-out `x` only counts as a separator when followed by a space, so
/// `2 xylophones` keeps its first letter.
static LEADING_QTY: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3})(?:\s*[×*]\s*|x\s*|\s+x\s+|\s*)(\p{L}.*)$")
});

/// `<text> x <int>`, e.g. `robe x 2`, `sac x3`.
static TRAILING_QTY: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^(\p{L}.*?)\s+[x×*]\s*(\d{1,3})$"));

static ADDRESS_HINT: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:adresse|address|livraison|delivery|quartier|lieu)\b\s*[:\-]?\s*(.*)$")
});

static NAME_HINT: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?i)^(?:nom|name|je suis|client)\b\s*[:\-]?\s*(.*)$"));

static PRODUCT_WORD: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({})s?\b",
        PRODUCT_VOCABULARY.join("|")
    ))
});

/// Product category words recognized when no quantity line matches.
pub const PRODUCT_VOCABULARY: &[&str] = &[
    "robe", "pagne", "chaussure", "sac", "chemise", "pantalon", "jupe", "tissu", "boubou",
    "perruque", "t-shirt", "bijou", "parfum", "tenue", "sandale", "montre",
];

/// One item line read from the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLine {
    pub name: String,
    pub quantity: u32,
}

/// What the interpreter could read, before prices are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub lines: Vec<ParsedLine>,
    pub delivery_hint: Option<String>,
    pub customer_name_hint: Option<String>,
    /// True when the only item is a vocabulary placeholder.
    pub needs_clarification: bool,
}

/// A priced draft item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

/// Unpersisted order candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrder {
    pub items: Vec<DraftItem>,
    pub delivery_hint: Option<String>,
    pub customer_name_hint: Option<String>,
    pub needs_clarification: bool,
}

impl ParsedMessage {
    /// Attaches unit prices, one lookup per line name.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` when a line total does not fit in an amount
    pub fn price_with<F>(self, mut unit_price: F) -> Result<DraftOrder, ValidationError>
    where
        F: FnMut(&str) -> Money,
    {
        let items = self
            .lines
            .into_iter()
            .map(|line| {
                let price = unit_price(&line.name);
                Ok(DraftItem {
                    total: price.times(line.quantity)?,
                    unit_price: price,
                    quantity: line.quantity,
                    name: line.name,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(DraftOrder {
            items,
            delivery_hint: self.delivery_hint,
            customer_name_hint: self.customer_name_hint,
            needs_clarification: self.needs_clarification,
        })
    }
}

/// Reads a chat message. Returns `None` when nothing order-like is found,
/// including when only hints are present.
pub fn interpret(text: &str) -> Option<ParsedMessage> {
    let mut lines = Vec::new();
    let mut other_lines = Vec::new();
    let mut delivery_hint = None;
    let mut customer_name_hint = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(hint) = capture_hint(&ADDRESS_HINT, line) {
            delivery_hint.get_or_insert(hint);
            continue;
        }
        if let Some(hint) = capture_hint(&NAME_HINT, line) {
            customer_name_hint.get_or_insert(hint);
            continue;
        }
        if is_hint_line(line) {
            continue;
        }

        match parse_item_line(line) {
            Some(parsed) => lines.push(parsed),
            None => other_lines.push(line),
        }
    }

    let mut needs_clarification = false;
    if lines.is_empty() {
        let placeholder = other_lines.into_iter().find_map(vocabulary_hit)?;
        lines.push(ParsedLine {
            name: placeholder,
            quantity: 1,
        });
        needs_clarification = true;
    }

    Some(ParsedMessage {
        lines,
        delivery_hint,
        customer_name_hint,
        needs_clarification,
    })
}

fn regex(cell: &'static Lazy<Result<Regex, regex::Error>>) -> Option<&'static Regex> {
    cell.as_ref().ok()
}

/// Keyword line with a non-empty remainder.
fn capture_hint(cell: &'static Lazy<Result<Regex, regex::Error>>, line: &str) -> Option<String> {
    let caps = regex(cell)?.captures(line)?;
    let value = caps.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Keyword line whose remainder is empty. Never an item line.
fn is_hint_line(line: &str) -> bool {
    [&ADDRESS_HINT, &NAME_HINT]
        .into_iter()
        .filter_map(regex)
        .any(|re| re.is_match(line))
}

fn parse_item_line(line: &str) -> Option<ParsedLine> {
    // Matching is case-insensitive; the stored name keeps the sender's casing.
    let lower = line.to_lowercase();

    let (quantity, name_range) = if let Some(caps) = regex(&LEADING_QTY)?.captures(&lower) {
        (caps.get(1)?.as_str(), caps.get(2)?.range())
    } else {
        let caps = regex(&TRAILING_QTY)?.captures(&lower)?;
        (caps.get(2)?.as_str(), caps.get(1)?.range())
    };

    let quantity: u32 = quantity.parse().ok()?;
    if quantity == 0 || quantity > MAX_QUANTITY {
        return None;
    }

    // Lower-casing can change byte lengths outside ASCII; fall back to the
    // lower-cased slice when the ranges no longer line up.
    let original = if lower.len() == line.len() {
        line.get(name_range.clone())
    } else {
        None
    };
    let name = original.unwrap_or(&lower[name_range]).trim().to_string();

    (!name.is_empty()).then_some(ParsedLine { name, quantity })
}

fn vocabulary_hit(line: &str) -> Option<String> {
    let m = regex(&PRODUCT_WORD)?.find(line)?;
    Some(m.as_str().to_string())
}
