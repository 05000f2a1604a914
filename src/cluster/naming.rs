use regex::Regex;
use serde::{de, Deserialize, Deserializer};

use super::numbering::short_name;

/// Regex substitution producing display labels from node names
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameRule {
    #[serde(deserialize_with = "regex_from_str")]
    pub pattern: Regex,
    /// Replacement text; `$1` etc. refer to capture groups
    pub replacement: String,
}

/// Returns the label shown for `name`.
///
/// The first matching rule rewrites the full name; without a match the label is the
/// name stripped of its domain. At most `max_len` characters are kept, counted from
/// the end of the label, since the distinguishing part of a name is usually the number.
pub fn display_label(name: &str, rules: &[NameRule], max_len: usize) -> String {
    let label = rules
        .iter()
        .find(|rule| rule.pattern.is_match(name))
        .map(|rule| {
            rule.pattern
                .replace(name, rule.replacement.as_str())
                .into_owned()
        })
        .unwrap_or_else(|| short_name(name).to_string());

    let length = label.chars().count();
    label.chars().skip(length.saturating_sub(max_len)).collect()
}

pub fn regex_from_str<'de, D>(deserializer: D) -> Result<Regex, D::Error>
where
    D: Deserializer<'de>,
{
    let value: String = Deserialize::deserialize(deserializer)?;
    Regex::new(&value)
        .map_err(|err| de::Error::custom(format!("invalid pattern {:?}: {}", value, err)))
}
