//! Template Variable Tests - placeholder masking and registry substitution

use logql_syntax::template::{
    AppliedSubstitution, mask_placeholders, mask_variables, unmask_placeholders,
    unmask_variables,
};
use logql_syntax::{VariableDefinition, VariableKind, parse};
use rstest::rstest;

#[rstest]
#[case(r#"{job="$job"}"#)]
#[case(r#"{job="[[job]]"} |= "[[text:raw]]""#)]
#[case(r#"{job="${job}"} |~ "${text:regex}""#)]
#[case(r#"rate({a="b"}[$__interval]) by (${group.by:csv})"#)]
#[case(r#"{a="b"} |= "no variables here""#)]
fn test_mask_round_trip(#[case] query: &str) {
    assert_eq!(unmask_placeholders(&mask_placeholders(query)), query);
}

#[rstest]
#[case(r#"{job="$job"}"#)]
#[case(r#"{job=~"[[job]]"}"#)]
#[case(r#"{job!="${job:pipe}"}"#)]
fn test_masked_query_parses(#[case] query: &str) {
    assert!(parse(&mask_placeholders(query)).ok(), "{query}");
}

#[test]
fn test_registry_substitution_round_trip() {
    let registry = vec![
        VariableDefinition::new("env", VariableKind::Custom).with_current_value("prod"),
        VariableDefinition::new("search", VariableKind::Textbox).with_query_default_text("err"),
        VariableDefinition::new("unused", VariableKind::Constant).with_current_value("x"),
    ];
    let (substituted, applied) = mask_variables(r#"{env="$env"} |= "$search""#, &registry);

    assert_eq!(substituted, r#"{env="prod"} |= "err""#);
    assert_eq!(
        applied,
        vec![
            AppliedSubstitution {
                name: "env".into(),
                value: "prod".into()
            },
            AppliedSubstitution {
                name: "search".into(),
                value: "err".into()
            },
        ]
    );
    assert_eq!(
        unmask_variables(&substituted, &applied),
        r#"{env="$env"} |= "$search""#
    );
}
