//! Token replacement for a single string

use super::types::TokenRule;

/// Replace every token occurrence in `original` in a single left-to-right scan.
///
/// All rules are matched against the same input, so a replacement value is
/// never rescanned and cannot be mistaken for another token. At any position
/// the longest matching token wins. Rules without a replacement still consume
/// their token, which is emitted unchanged.
pub fn replace_tokens(original: &str, rules: &[TokenRule]) -> String {
    let mut ordered: Vec<&TokenRule> = rules.iter().filter(|r| !r.token.is_empty()).collect();
    ordered.sort_by(|a, b| b.token.len().cmp(&a.token.len()));

    if ordered.is_empty() {
        return original.to_string();
    }

    let mut result = String::with_capacity(original.len());
    let mut rest = original;

    while !rest.is_empty() {
        match ordered.iter().find(|rule| rest.starts_with(rule.token.as_str())) {
            Some(rule) => {
                result.push_str(rule.replacement.as_deref().unwrap_or(&rule.token));
                rest = &rest[rule.token.len()..];
            }
            None => {
                let next = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                result.push_str(&rest[..next]);
                rest = &rest[next..];
            }
        }
    }

    result
}
