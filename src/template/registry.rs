//! Value substitution driven by the dashboard's variable definitions
//!
//! `$name` references are replaced with the variable's resolved value before
//! formatting and the values are turned back into references afterwards.
//! Unmasking is literal: any occurrence of a resolved value is reverted,
//! including ones that did not come from a substitution.

use rustc_hash::FxHashSet;

/// Kind of a dashboard variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VariableKind {
    Query,
    Constant,
    Custom,
    Textbox,
    Interval,
    /// Ad hoc filters have no inline textual form and are never substituted
    Adhoc,
}

/// A variable as exposed by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct VariableDefinition {
    pub name: String,
    pub kind: VariableKind,
    pub current_value: Option<String>,
    pub query_default_text: Option<String>,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            current_value: None,
            query_default_text: None,
        }
    }

    pub fn with_current_value(mut self, value: impl Into<String>) -> Self {
        self.current_value = Some(value.into());
        self
    }

    pub fn with_query_default_text(mut self, text: impl Into<String>) -> Self {
        self.query_default_text = Some(text.into());
        self
    }

    /// The value substituted for `$name`, if the variable has one
    fn resolved_value(&self) -> Option<&str> {
        let value = match self.kind {
            VariableKind::Adhoc => None,
            VariableKind::Textbox => self
                .current_value
                .as_deref()
                .filter(|v| !v.is_empty())
                .or(self.query_default_text.as_deref()),
            _ => self.current_value.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Read-only source of variable definitions, in definition order
pub trait VariableRegistry {
    fn variables(&self) -> Vec<VariableDefinition>;
}

impl VariableRegistry for [VariableDefinition] {
    fn variables(&self) -> Vec<VariableDefinition> {
        self.to_vec()
    }
}

impl VariableRegistry for Vec<VariableDefinition> {
    fn variables(&self) -> Vec<VariableDefinition> {
        self.clone()
    }
}

/// A substitution performed by [`mask_variables`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedSubstitution {
    pub name: String,
    pub value: String,
}

impl AppliedSubstitution {
    fn reference(&self) -> String {
        format!("${}", self.name)
    }
}

/// Replace `$name` references with resolved values.
///
/// Returns the substituted query and the substitutions that actually
/// happened, in definition order.
pub fn mask_variables<R>(query: &str, registry: &R) -> (String, Vec<AppliedSubstitution>)
where
    R: VariableRegistry + ?Sized,
{
    let mut masked = query.to_string();
    let mut applied = Vec::new();
    let mut seen = FxHashSet::default();

    for variable in registry.variables() {
        if !seen.insert(variable.name.clone()) {
            continue;
        }
        let Some(value) = variable.resolved_value() else {
            continue;
        };

        let substitution = AppliedSubstitution {
            name: variable.name.clone(),
            value: value.to_string(),
        };
        let reference = substitution.reference();
        if !masked.contains(&reference) {
            continue;
        }

        masked = masked.replace(&reference, &substitution.value);
        tracing::trace!(name = %substitution.name, "substituted template variable");
        applied.push(substitution);
    }

    (masked, applied)
}

/// Turn resolved values back into `$name` references, in recorded order
pub fn unmask_variables(text: &str, applied: &[AppliedSubstitution]) -> String {
    applied.iter().fold(text.to_string(), |acc, substitution| {
        acc.replace(&substitution.value, &substitution.reference())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Vec<VariableDefinition> {
        vec![
            VariableDefinition::new("job", VariableKind::Query).with_current_value("api"),
            VariableDefinition::new("filter", VariableKind::Adhoc).with_current_value("x"),
            VariableDefinition::new("search", VariableKind::Textbox)
                .with_query_default_text("timeout"),
            VariableDefinition::new("empty", VariableKind::Custom).with_current_value(""),
        ]
    }

    #[test]
    fn test_mask_substitutes_in_definition_order() {
        let (masked, applied) = mask_variables(
            r#"{job="$job"} |= "$search" |= "$filter" |= "$empty""#,
            &registry(),
        );
        assert_eq!(
            masked,
            r#"{job="api"} |= "timeout" |= "$filter" |= "$empty""#
        );
        let names: Vec<_> = applied.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["job", "search"]);
    }

    #[test]
    fn test_mask_records_only_used_variables() {
        let (_, applied) = mask_variables(r#"{app="$job"}"#, &registry());
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].value, "api");
    }

    #[test]
    fn test_textbox_prefers_current_value() {
        let defs = [VariableDefinition::new("q", VariableKind::Textbox)
            .with_current_value("now")
            .with_query_default_text("default")];
        let (masked, _) = mask_variables("$q", &defs[..]);
        assert_eq!(masked, "now");
    }

    #[test]
    fn test_unmask_reverses_substitutions() {
        let query = r#"{job="$job"} |= "$search""#;
        let (masked, applied) = mask_variables(query, &registry());
        assert_eq!(unmask_variables(&masked, &applied), query);
    }

    #[test]
    fn test_unmask_is_literal() {
        // an unrelated occurrence of the value is reverted too
        let applied = [AppliedSubstitution {
            name: "job".to_string(),
            value: "api".to_string(),
        }];
        assert_eq!(
            unmask_variables(r#"{job="api", svc="api"}"#, &applied),
            r#"{job="$job", svc="$job"}"#
        );
    }
}
