// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic English-like singularisation and tokenisation of
//! identifier strings (e.g. `"DBInstanceIdentifiers"` -> `["db", "instance",
//! "identifier"]`).

/// Reduce a lower-case English-like plural word to its singular form.
///
/// Applies the first matching rule in order; words that don't match any
/// rule are returned unchanged. This is deliberately not a general English
/// stemmer — it only needs to collapse the plural forms that occur in
/// cloud API member/operation names.
///
/// # Examples
///
/// ```
/// use ccx_core::singularise;
///
/// assert_eq!(singularise("indices"), "index");
/// assert_eq!(singularise("analysis"), "analysis");
/// assert_eq!(singularise("api"), "api");
/// assert_eq!(singularise("instances"), "instance");
/// assert_eq!(singularise("addresses"), "address");
/// ```
#[must_use]
pub fn singularise(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = word.strip_suffix("aliases") {
        return format!("{stem}alias");
    }
    if let Some(stem) = word.strip_suffix("indices") {
        return format!("{stem}index");
    }
    if ends_with_any(word, &["addresses", "prefixes", "patches"]) {
        return word[..word.len() - 2].to_string();
    }
    if word.ends_with('s') && !ends_with_any(word, &["ss", "bus", "status", "alias", "analysis"]) {
        return word[..word.len() - 1].to_string();
    }
    if word.ends_with('i') && !word.ends_with("api") {
        return format!("{}us", &word[..word.len() - 1]);
    }
    word.to_string()
}

fn ends_with_any(word: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| word.ends_with(s))
}

/// Split an identifier string on `_`, `-`, `.`, whitespace, and camel-case
/// boundaries, lower-case each part, and singularise it. Empty parts are
/// dropped.
///
/// # Examples
///
/// ```
/// use ccx_core::tokenise;
///
/// assert_eq!(
///     tokenise("DBInstanceIdentifiers"),
///     vec!["db", "instance", "identifier"]
/// );
/// assert_eq!(tokenise("VpcId"), vec!["vpc", "id"]);
/// ```
#[must_use]
pub fn tokenise(s: &str) -> Vec<String> {
    let spaced = split_camel_case(s);
    spaced
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| singularise(&part.to_lowercase()))
        .collect()
}

/// Insert a space at every camelCase/PascalCase boundary: before an
/// uppercase letter followed by a lowercase letter (`"DBInstance"` ->
/// `"DB Instance"` boundary at `I`), and between a lowercase letter and a
/// following uppercase letter.
fn split_camel_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|j| chars[j]);
        let next = chars.get(i + 1).copied();

        let boundary_before_upper_lower = c.is_uppercase()
            && next.is_some_and(|n| n.is_lowercase())
            && prev.is_some_and(|p| p.is_uppercase() || p.is_alphanumeric());
        let boundary_lower_upper =
            c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase());

        if i > 0 && (boundary_before_upper_lower || boundary_lower_upper) && !out.ends_with(' ') {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
