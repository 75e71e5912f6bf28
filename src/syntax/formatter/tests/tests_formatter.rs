//! Tests for the canonical formatter

use super::super::{FormatOptions, format, format_with_options, format_with_variables};
use crate::template::{VariableDefinition, VariableKind};

/// Assert that formatting produces the expected output (single line)
fn assert_format(input: &str, expected: &str) {
    let result = format(input);
    assert_eq!(
        result.trim(),
        expected,
        "\nInput:    |{}|\nExpected: |{}|\nGot:      |{}|",
        input,
        expected,
        result.trim()
    );
}

/// Assert multiline formatting produces expected output
fn assert_format_multiline(input: &str, expected: &str) {
    let result = format(input);
    assert_eq!(
        result.trim(),
        expected.trim(),
        "\n=== Input ===\n{}\n=== Expected ===\n{}\n=== Got ===\n{}",
        input,
        expected.trim(),
        result.trim()
    );
}

// ============================================================================
// Selectors
// ============================================================================

#[test]
fn test_format_sorts_matchers() {
    assert_format(r#"{bravo!="", alpha=""}"#, r#"{alpha="", bravo!=""}"#);
}

#[test]
fn test_format_normalizes_selector_spacing() {
    assert_format(r#"{  job = "api" ,env=~`prod.*` }"#, r#"{env=~`prod.*`, job="api"}"#);
}

#[test]
fn test_format_keeps_duplicate_label_order() {
    assert_format(r#"{b="1", a="2", a="1"}"#, r#"{a="2", a="1", b="1"}"#);
}

// ============================================================================
// Pipelines
// ============================================================================

#[test]
fn test_format_compresses_same_kind_stages() {
    assert_format_multiline(
        r#"{}|="a"!="b"|logfmt"#,
        r#"
{}
  |= "a" != "b"
  | logfmt"#,
    );
}

#[test]
fn test_format_label_filters_share_a_line() {
    assert_format_multiline(
        r#"{a="b"} | json | level="error" | status>=500 | line_format "{{.msg}}""#,
        r#"
{a="b"}
  | json
  | level="error" | status>=500
  | line_format "{{.msg}}""#,
    );
}

#[test]
fn test_format_comment_gets_its_own_line() {
    assert_format_multiline(
        "{}\n  |= \"x\"\n#   c\n  | logfmt",
        r#"
{}
  |= "x"
  # c
  | logfmt"#,
    );
}

#[test]
fn test_format_comment_resets_compression() {
    assert_format_multiline(
        "{} |= \"a\" # note\n |= \"b\"",
        r#"
{}
  |= "a"
  # note
  |= "b""#,
    );
}

#[test]
fn test_format_parser_stages() {
    assert_format_multiline(
        r#"{a="b"} | regexp "(?P<x>\\w+)" | json  first="x",  second="y" | label_format  dst=src"#,
        r#"
{a="b"}
  | regexp "(?P<x>\\w+)"
  | json first="x", second="y"
  | label_format dst=src"#,
    );
}

#[test]
fn test_format_compound_label_filter() {
    assert_format_multiline(
        r#"{a="b"} | logfmt | (x="1" or y>2) and z!="3""#,
        r#"
{a="b"}
  | logfmt
  | (x="1" or y>2) and z!="3""#,
    );
}

#[test]
fn test_format_ip_filters_and_label_lists() {
    assert_format_multiline(
        r#"{a="b"} |= ip("10.0.0.0/8") | addr = ip("1.2.3.4") | drop x,y="z" | decolorize"#,
        r#"
{a="b"}
  |= ip("10.0.0.0/8")
  | addr=ip("1.2.3.4")
  | drop x, y="z"
  | decolorize"#,
    );
}

// ============================================================================
// Metric expressions
// ============================================================================

#[test]
fn test_format_range_aggregation() {
    assert_format_multiline(
        r#"rate({a="b"}[5m])"#,
        r#"
rate(
  {a="b"} [5m]
)"#,
    );
}

#[test]
fn test_format_nested_aggregation() {
    assert_format_multiline(
        r#"sum by (job) (rate({job="api"} |= "err" [5m]))"#,
        r#"
sum(
  rate(
    {job="api"}
      |= "err" [5m]
  )
) by(job)"#,
    );
}

#[test]
fn test_format_range_aggregation_with_param_and_unwrap() {
    assert_format_multiline(
        r#"quantile_over_time(0.99, {a="b"} | unwrap duration(latency) [1m] offset 1h) by (job, env)"#,
        r#"
quantile_over_time(
  0.99,
  {a="b"}
    | unwrap duration(latency) [1m] offset 1h
) by(job, env)"#,
    );
}

#[test]
fn test_format_range_after_comment() {
    assert_format_multiline(
        "count_over_time({a=\"b\"} | json # parse\n[5m])",
        r#"
count_over_time(
  {a="b"}
    | json
    # parse
    [5m]
)"#,
    );
}

#[test]
fn test_format_vector_aggregation_with_param() {
    assert_format_multiline(
        r#"topk(5, count_over_time({a="b"}[1m]))"#,
        r#"
topk(
  5,
  count_over_time(
    {a="b"} [1m]
  )
)"#,
    );
}

#[test]
fn test_format_binary_expression() {
    assert_format_multiline(
        r#"rate({a="b"}[1m]) / on (job) group_left (env) rate({c="d"}[1m])"#,
        r#"
rate(
  {a="b"} [1m]
)
/ on(job) group_left(env)
rate(
  {c="d"} [1m]
)"#,
    );
}

#[test]
fn test_format_binary_with_scalar() {
    assert_format_multiline(
        r#"count_over_time({a="b"}[1m]) > bool 1"#,
        r#"
count_over_time(
  {a="b"} [1m]
)
> bool
1"#,
    );
}

// ============================================================================
// Templates and unformattable input
// ============================================================================

#[test]
fn test_format_keeps_interval_variable_in_range() {
    assert_format_multiline(
        r#"rate({a="b"}[$__interval])"#,
        r#"
rate(
  {a="b"} [$__interval]
)"#,
    );
}

#[test]
fn test_format_keeps_template_variables() {
    assert_format_multiline(
        r#"{job="$job"} |= "${text:raw}""#,
        r#"
{job="$job"}
  |= "${text:raw}""#,
    );
}

#[test]
fn test_format_returns_unformattable_input_unchanged() {
    for input in ["", "   ", r#"{a="b""#, "rate(", "vector(1)", r#"{a="b"} | unknown"#] {
        assert_eq!(format(input), input);
    }
}

#[test]
fn test_format_keeps_queries_with_comments_outside_pipelines() {
    for input in [
        "{a=\"b\", # inside\nc=\"d\"} | json",
        "sum by (a) (count_over_time({a=\"b\"}[5m])) # tail",
        "# leading\n{a=\"b\"} | json",
    ] {
        assert_eq!(format(input), input);
    }
}

#[test]
fn test_format_with_variables() {
    let registry = vec![
        VariableDefinition::new("job", VariableKind::Custom).with_current_value("api"),
    ];
    assert_format_multiline(
        &format_with_variables(r#"{job="$job"}|json"#, &registry),
        r#"
{job="$job"}
  | json"#,
    );
}

// ============================================================================
// Options and idempotence
// ============================================================================

#[test]
fn test_format_with_tabs() {
    let options = FormatOptions {
        insert_spaces: false,
        ..Default::default()
    };
    assert_eq!(
        format_with_options(r#"{a="b"} | json"#, &options),
        "{a=\"b\"}\n\t| json"
    );
}

#[test]
fn test_format_is_idempotent() {
    let queries = [
        r#"{b="1",a="2"} |= "x" # c
| json | x > 1"#,
        r#"sum without (a) (rate({a="b"} | logfmt | unwrap bytes(size) [5m] offset 5m))"#,
        r#"topk(3, sum by (job) (count_over_time({a="b"}[1m]))) / 2"#,
        r#"(rate({a="b"}[1m]) + rate({c="d"}[1m])) * 100"#,
        r#"rate({a="b"}[$__auto])"#,
    ];
    for query in queries {
        let once = format(query);
        assert_eq!(format(&once), once, "\n{once}");
    }
}
