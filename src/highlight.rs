//! Search terms for highlighting matched log lines
//!
//! A left-to-right scan over the raw query text, independent of the parser.
//! Only positive line filters contribute terms; `|=` terms are escaped so
//! they match literally, `|~` terms are already regular expressions.

use regex::Regex;
use std::sync::LazyLock;

static FILTER_OPERATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|=|\|~|!=|!~").expect("valid filter operator regex"));
static QUOTED_TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(.*?)""#).expect("valid quoted term regex"));
static BACKTICKED_TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`(.*?)`").expect("valid backticked term regex"));

/// Extract highlight expressions from the line filters of `query`.
///
/// Scanning stops at the first positive filter without a quoted or
/// backticked term, returning what was collected so far.
pub fn highlight(query: &str) -> Vec<String> {
    let mut expressions = Vec::new();
    let mut rest = query;

    while let Some(found) = FILTER_OPERATOR_RE.find(rest) {
        let operator = found.as_str();
        rest = &rest[found.end()..];
        if operator.starts_with('!') {
            continue;
        }

        // The term runs up to the next pipe, if any
        let term = match rest.find('|') {
            Some(end) => {
                let term = rest[..end].trim();
                rest = &rest[end..];
                term
            }
            None => rest.trim(),
        };

        // A quoted string wins over a backticked one, but any backtick
        // string keeps a regex term verbatim
        let quoted = QUOTED_TERM_RE.captures(term);
        let backticked = BACKTICKED_TERM_RE.captures(term);
        let Some(caps) = quoted.as_ref().or(backticked.as_ref()) else {
            tracing::trace!(term, "line filter without a quoted term, stopping");
            return expressions;
        };
        let content = caps.get(1).map_or("", |m| m.as_str());
        let backticked = backticked.is_some();

        let expression = match operator {
            "|~" if backticked => content.to_string(),
            "|~" => content.replace(r"\\", r"\"),
            _ => regex::escape(content),
        };
        if !expression.is_empty() {
            expressions.push(expression);
        }
    }

    expressions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{foo="bar"}"#, &[])]
    #[case(r#"{foo="bar"} |= "x""#, &["x"])]
    #[case(r#"{foo="bar"} |= "x" != "y""#, &["x"])]
    #[case(r#"{foo="bar"} != "y" |= "x""#, &["x"])]
    #[case(r#"{foo="bar"} |= "x" | logfmt |= "z""#, &["x", "z"])]
    #[case(r#"{foo="bar"} |~ "a.*b" !~ "c""#, &["a.*b"])]
    #[case(r#"{foo="bar"} |= "a.b(c)""#, &[r"a\.b\(c\)"])]
    #[case(r#"{foo="bar"} |~ "\\d+""#, &[r"\d+"])]
    #[case(r"{foo='bar'} |~ `\\d+`", &[r"\\d+"])]
    #[case(r#"{foo="bar"} |= `x`"#, &["x"])]
    #[case(r#"{foo="bar"} |= """#, &[])]
    fn test_highlight(#[case] query: &str, #[case] expected: &[&str]) {
        assert_eq!(highlight(query), expected);
    }

    #[test]
    fn test_highlight_stops_at_unquoted_term() {
        assert_eq!(
            highlight(r#"{foo="bar"} |= "x" |= y |= "z""#),
            vec!["x".to_string()]
        );
    }

    #[test]
    fn test_highlight_regex_term_with_backticks_stays_verbatim() {
        assert_eq!(
            highlight(r#"{foo="bar"} |~ "a\\d" `x`"#),
            vec![r"a\\d".to_string()]
        );
    }

    #[test]
    fn test_highlight_skips_negative_selector_matchers() {
        assert_eq!(highlight(r#"{foo!="bar"} |= "x""#), vec!["x".to_string()]);
    }
}
