//! Placeholder extraction and message rendering.
//!
//! Rule messages embed paths as `{Path}` tokens, for example
//! `"{Town.Name} already has {Town.Districts.Count} districts"`.

use std::collections::BTreeMap;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder token regex should compile"));

/// Extracts placeholder paths from a message template.
///
/// Returned paths do not include the braces, are trimmed, deduplicated, and
/// keep first-seen order. Empty tokens (`{}`) are skipped.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut placeholders = IndexSet::new();
    collect_placeholders(template, &mut placeholders);
    placeholders.into_iter().collect()
}

/// Extracts the union of placeholders across several templates, in order.
pub fn extract_placeholders_from_all<'a, I>(templates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut placeholders = IndexSet::new();
    for template in templates {
        collect_placeholders(template, &mut placeholders);
    }
    placeholders.into_iter().collect()
}

fn collect_placeholders(template: &str, placeholders: &mut IndexSet<String>) {
    for captures in PLACEHOLDER_TOKEN.captures_iter(template) {
        let path = captures[1].trim();
        if !path.is_empty() {
            placeholders.insert(path.to_string());
        }
    }
}

/// Substitutes resolved values into a message template.
///
/// Tokens without a resolved value are left exactly as written, braces
/// included, so the UI can still show the message.
pub fn render_template(template: &str, resolved: &BTreeMap<String, String>) -> String {
    PLACEHOLDER_TOKEN
        .replace_all(template, |captures: &Captures<'_>| match resolved.get(captures[1].trim()) {
            Some(value) => value.clone(),
            None => captures[0].to_string(),
        })
        .into_owned()
}
