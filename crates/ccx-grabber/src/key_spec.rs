// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`KeySpec`] turns a requested key name (and, optionally, the method that
//! wants it) into a ranked set of match patterns against candidate method
//! and output-path token sequences.

use ccx_core::{singularise, tokenise};

/// A score tuple: `(matched_length, correct_format_bit, not_suffix_bit)`.
///
/// Compared lexicographically; a longer match beats a shorter one, a
/// format-correct match beats a format-mismatched one, and a non-suffix
/// match beats a suffix-only one. [`NEG_INF_SCORE`] sorts below every real
/// score and stands in for "no match".
pub type Score = (i64, i64, i64);

/// Sorts below any score a real matcher can produce.
pub const NEG_INF_SCORE: Score = (i64::MIN, i64::MIN, i64::MIN);

const ID_FORMATS: [&str; 6] = ["id", "name", "arn", "code", "list", "identifier"];
const SUFFIXES: [&str; 1] = ["key"];

/// A key spec: the token sequence a caller is looking for, derived from a
/// raw identifier string and (optionally) the method requesting it.
///
/// Two `KeySpec`s are equal exactly when their token sequences are equal.
/// The [`matchers`](KeySpec::matchers) list is expensive to build and is
/// computed once per instance.
#[derive(Debug, Clone)]
pub struct KeySpec {
    tokens: Vec<String>,
}

impl PartialEq for KeySpec {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}
impl Eq for KeySpec {}

impl KeySpec {
    /// Build a key spec for `key`, optionally prefixed by the tokens of
    /// `method`'s name (with its leading verb, e.g. `describe`, dropped).
    #[must_use]
    pub fn make(key: &str, method: Option<&str>) -> Self {
        let mut tokens = Vec::new();
        if let Some(m) = method {
            tokens.extend(
                m.to_lowercase()
                    .split('_')
                    .skip(1)
                    .map(singularise)
                    .filter(|t| !t.is_empty()),
            );
        }
        tokens.extend(tokenise(key));
        KeySpec { tokens }
    }

    /// Build a key spec directly from an already-tokenised sequence.
    #[must_use]
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        KeySpec { tokens }
    }

    /// The trailing token, if it names a recognised identifier format
    /// (`id`, `name`, `arn`, `code`, `list`, `identifier`).
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        let last = self.tokens.last()?;
        ID_FORMATS.contains(&last.as_str()).then(|| last.as_str())
    }

    /// The token sequence with any trailing format token removed.
    #[must_use]
    pub fn without_format(&self) -> &[String] {
        if self.format().is_some() {
            &self.tokens[..self.tokens.len() - 1]
        } else {
            &self.tokens[..]
        }
    }

    /// Whether any token of `without_format()` appears in `items`.
    #[must_use]
    pub fn matches(&self, items: &[String]) -> bool {
        self.without_format().iter().any(|k| items.contains(k))
    }

    /// The ranked `(score, pattern)` matcher list for this key spec,
    /// descending by score. `pattern` is a space-delimited, space-bounded
    /// string (e.g. `" instance id "`) suitable for a suffix check against
    /// a similarly bounded candidate token string.
    #[must_use]
    pub fn matchers(&self) -> Vec<(Score, String)> {
        let prefix = self.without_format();
        let max_len = prefix.len();
        let mut matchers = Vec::new();

        for l in (0..=max_len).rev() {
            if l == 0 {
                // Every start position yields the same empty window; one
                // representative is enough.
                push_window_matchers(&mut matchers, self, &[], 0);
                continue;
            }
            for start in 0..=(max_len - l) {
                push_window_matchers(&mut matchers, self, &prefix[start..start + l], l as i64);
            }
        }

        let with_suffixes: Vec<(Score, String)> = matchers
            .iter()
            .flat_map(|(score, pattern)| {
                SUFFIXES.iter().map(move |suffix| {
                    let zeroed = (score.0, score.1, 0);
                    (zeroed, format!("{pattern}{suffix} "))
                })
            })
            .collect();
        matchers.extend(with_suffixes);

        matchers.sort_by(|a, b| b.cmp(a));
        matchers
    }

    /// The matcher patterns as token vectors (whitespace-split), used to
    /// test exact equality against a candidate token sequence such as a
    /// method's derived path.
    #[must_use]
    pub fn matcher_token_patterns(&self) -> Vec<Vec<String>> {
        self.matchers()
            .into_iter()
            .map(|(_, pattern)| {
                pattern
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// The score of the highest-ranked matcher whose pattern is a suffix of
    /// the space-bounded join of `items`, or [`None`] if no matcher
    /// matches.
    #[must_use]
    pub fn score(&self, items: &[String]) -> Option<Score> {
        let joined = format!(" {} ", items.join(" "));
        self.matchers()
            .into_iter()
            .find(|(_, pattern)| joined.ends_with(pattern.as_str()))
            .map(|(score, _)| score)
    }
}

fn push_window_matchers(out: &mut Vec<(Score, String)>, spec: &KeySpec, window: &[String], l: i64) {
    let k = if window.is_empty() {
        " ".to_string()
    } else {
        format!(" {} ", window.join(" "))
    };
    if l > 0 {
        out.push(((l, 0, 1), k.clone()));
    }
    for id in ID_FORMATS {
        let correct_format = spec.format() == Some(id);
        let score = (l, i64::from(correct_format), 1);
        out.push((score, format!("{k}{id} ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_format_strips_trailing_format_token() {
        let spec = KeySpec::from_tokens(vec!["instance".into(), "id".into()]);
        assert_eq!(spec.format(), Some("id"));
        assert_eq!(spec.without_format(), &["instance".to_string()]);
    }

    #[test]
    fn without_format_is_noop_without_format_token() {
        let spec = KeySpec::from_tokens(vec!["instance".into(), "type".into()]);
        assert_eq!(spec.format(), None);
        assert_eq!(spec.without_format(), &["instance".to_string(), "type".to_string()]);
    }

    #[test]
    fn score_prefers_longer_and_format_correct_matches() {
        let spec = KeySpec::make("InstanceId", None);
        let exact = spec.score(&["instance".to_string(), "id".to_string()]).unwrap();
        let partial = spec.score(&["id".to_string()]).unwrap();
        assert!(exact > partial);
    }

    #[test]
    fn score_is_none_when_nothing_matches() {
        let spec = KeySpec::make("VpcId", None);
        assert_eq!(spec.score(&["totally".to_string(), "unrelated".to_string()]), None);
    }

    #[test]
    fn matches_checks_any_token_overlap() {
        let spec = KeySpec::make("InstanceId", None);
        assert!(spec.matches(&["instance".to_string()]));
        assert!(!spec.matches(&["subnet".to_string()]));
    }

    #[test]
    fn make_prefixes_method_tokens_after_verb() {
        let spec = KeySpec::make("Id", Some("describe_instances"));
        assert_eq!(spec.without_format(), &["instance".to_string()]);
        assert_eq!(spec.format(), Some("id"));
    }

    #[test]
    fn matchers_sorted_descending_by_score() {
        let spec = KeySpec::make("InstanceId", None);
        let matchers = spec.matchers();
        for pair in matchers.windows(2) {
            assert!(pair[0].0 >= pair[1].0);
        }
    }
}
