//! Display-label derivation from property and group names.
//!
//! Names like `testBaseUrl` become `Test Base URL`: the name is split into
//! capitalized words, then known abbreviations from the definition's label
//! dictionary are substituted. A property label additionally drops words
//! already present in its group's label.

/// Split a camelCase / snake_case / kebab-case name into capitalized words.
pub fn capital_words(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == ' ' || ch == '.' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| capital_letter(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uppercase the first letter of a word, lowercasing the rest.
pub fn capital_letter(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Apply abbreviation substitutions ("Url" -> "URL") to a composed label.
pub fn substitute_abbrs(label: &str, dict: &[(String, String)]) -> String {
    dict.iter()
        .fold(label.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Remove words from a property label that already appear in the group
/// label, so "Local Env Monitoring" under group "Local Env" shows as
/// "Monitoring". Falls back to the full label when nothing would remain.
pub fn remove_common_words(label: &str, group_label: &str) -> String {
    let group_words: Vec<&str> = group_label.split_whitespace().collect();
    let kept: Vec<&str> = label
        .split_whitespace()
        .filter(|w| !group_words.contains(w))
        .collect();
    if kept.is_empty() {
        label.to_string()
    } else {
        kept.join(" ")
    }
}
