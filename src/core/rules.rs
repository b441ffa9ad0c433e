//! Rename rules: loading, validation, and conflict detection.
//!
//! A rules file is JSON (`.json`) or YAML (`.yaml`/`.yml`) holding either a
//! bare list of rules or a document:
//!
//! ```yaml
//! rules:
//!   - { old: userId, new: user_id }
//!   - { old: createdAt, case: snake_case, scope: object_key }
//! protected: [toFixed]
//! extensions: [.ts, .tsx]
//! exclude: [node_modules, dist]
//! ```

use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::defaults::DEFAULT_PROTECTED;
use crate::error::{Error, Result};

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_$][A-Za-z0-9_$]*$";

// ============================================================================
// Types
// ============================================================================

/// Where in the source a rule is allowed to rename.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Any identifier token in code.
    #[default]
    Identifier,
    /// `name=` inside a JSX tag.
    JsxAttribute,
    /// `name:` in an object literal or type, or a quoted `"name":` key.
    ObjectKey,
    /// A quoted string whose whole content is the name.
    StringLiteral,
}

impl RuleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Identifier => "identifier",
            RuleScope::JsxAttribute => "jsx_attribute",
            RuleScope::ObjectKey => "object_key",
            RuleScope::StringLiteral => "string_literal",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "identifier" => Ok(RuleScope::Identifier),
            "jsx_attribute" => Ok(RuleScope::JsxAttribute),
            "object_key" => Ok(RuleScope::ObjectKey),
            "string_literal" => Ok(RuleScope::StringLiteral),
            _ => Err(Error::config_invalid_value(
                "scope",
                Some(s.to_string()),
                format!(
                    "Unknown scope '{}'. Use: identifier, jsx_attribute, object_key, string_literal",
                    s
                ),
            )),
        }
    }

    /// Whether two scopes can ever claim the same occurrence.
    fn overlaps(&self, other: &RuleScope) -> bool {
        use RuleScope::*;
        if self == other {
            return true;
        }
        !matches!(
            (self, other),
            (Identifier, StringLiteral)
                | (StringLiteral, Identifier)
                | (JsxAttribute, StringLiteral)
                | (StringLiteral, JsxAttribute)
                | (JsxAttribute, ObjectKey)
                | (ObjectKey, JsxAttribute)
        )
    }
}

/// Naming convention used to derive `new` from `old`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStyle {
    #[serde(rename = "snake_case")]
    Snake,
    #[serde(rename = "camelCase")]
    Camel,
    #[serde(rename = "PascalCase")]
    Pascal,
    #[serde(rename = "SCREAMING_SNAKE_CASE")]
    ScreamingSnake,
}

impl CaseStyle {
    pub fn apply(&self, name: &str) -> String {
        match self {
            CaseStyle::Snake => name.to_snake_case(),
            CaseStyle::Camel => name.to_lower_camel_case(),
            CaseStyle::Pascal => name.to_upper_camel_case(),
            CaseStyle::ScreamingSnake => name.to_shouty_snake_case(),
        }
    }
}

/// A single `old -> new` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameRule {
    pub old: String,
    pub new: String,
    pub scope: RuleScope,
}

impl RenameRule {
    pub fn new(old: &str, new: &str, scope: RuleScope) -> Self {
        RenameRule {
            old: old.to_string(),
            new: new.to_string(),
            scope,
        }
    }

    /// Report key, e.g. `userId->user_id`.
    pub fn label(&self) -> String {
        format!("{}->{}", self.old, self.new)
    }

    pub fn inverse(&self) -> Self {
        RenameRule {
            old: self.new.clone(),
            new: self.old.clone(),
            scope: self.scope,
        }
    }

    /// Label qualified with the scope when it is not `identifier`. Unique per
    /// rule in a conflict-free set, so it keys the report's hit counts.
    pub fn describe(&self) -> String {
        if self.scope == RuleScope::Identifier {
            self.label()
        } else {
            format!("{} [{}]", self.label(), self.scope.as_str())
        }
    }
}

/// One rule as written in a rules file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    old: String,
    #[serde(default)]
    new: Option<String>,
    #[serde(default)]
    case: Option<CaseStyle>,
    #[serde(default)]
    scope: RuleScope,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesDocument {
    rules: Vec<RuleEntry>,
    #[serde(default)]
    protected: Vec<String>,
    #[serde(default)]
    extensions: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesFormat {
    Json,
    Yaml,
}

impl RulesFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(RulesFormat::Json),
            Some("yaml") | Some("yml") => Some(RulesFormat::Yaml),
            _ => None,
        }
    }
}

/// A validated set of rules plus the names they must never touch.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub rules: Vec<RenameRule>,
    pub protected: BTreeSet<String>,
    /// Extensions requested by the rules file, if any.
    pub extensions: Option<Vec<String>>,
    /// Exclusions requested by the rules file, if any.
    pub excluded: Option<Vec<String>>,
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    DuplicateSource,
    CollidingTarget,
    Chain,
    InversePair,
    ProtectedSource,
    ProtectedTarget,
}

impl ConflictKind {
    /// Whether this conflict refuses a writing run without `--force`. A
    /// protected source only ever produces skips, so it is reported but
    /// never blocks.
    pub fn blocks_write(&self) -> bool {
        !matches!(self, ConflictKind::ProtectedSource)
    }
}

/// A problem with the rule set that makes a destructive run unsafe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleConflict {
    pub kind: ConflictKind,
    pub message: String,
    pub rules: Vec<String>,
}

// ============================================================================
// Loading
// ============================================================================

impl RuleSet {
    /// Load and validate a rules file.
    pub fn load(path: &Path) -> Result<Self> {
        let shown = path.display().to_string();
        let format =
            RulesFormat::from_path(path).ok_or_else(|| Error::config_unsupported_format(&shown))?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config_invalid_value(
                "rules_file",
                Some(shown.clone()),
                format!("cannot read rules file: {}", e),
            )
        })?;

        let mut set = Self::parse(&content, format, &shown)?;
        set.source = Some(path.to_path_buf());
        Ok(set)
    }

    /// Parse rules from text already read into memory.
    pub fn parse(content: &str, format: RulesFormat, origin: &str) -> Result<Self> {
        let value: Value = match format {
            RulesFormat::Json => serde_json::from_str(content)
                .map_err(|e| Error::config_invalid_rules(origin, e.to_string()))?,
            RulesFormat::Yaml => serde_yml::from_str(content)
                .map_err(|e| Error::config_invalid_rules(origin, e.to_string()))?,
        };

        let document = match value {
            Value::Array(_) => RulesDocument {
                rules: serde_json::from_value(value)
                    .map_err(|e| Error::config_invalid_rules(origin, e.to_string()))?,
                protected: Vec::new(),
                extensions: None,
                exclude: None,
            },
            Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| Error::config_invalid_rules(origin, e.to_string()))?,
            _ => {
                return Err(Error::config_invalid_rules(
                    origin,
                    "expected a list of rules or an object with a 'rules' list",
                ))
            }
        };

        let rules = document
            .rules
            .into_iter()
            .enumerate()
            .map(|(i, entry)| resolve_entry(i, entry))
            .collect::<Result<Vec<_>>>()?;

        let mut set = Self::from_rules(rules, document.protected)?;
        set.extensions = document.extensions;
        set.excluded = document.exclude;
        Ok(set)
    }

    /// Build a rule set from rules constructed in code. The default protected
    /// names are always included.
    pub fn from_rules(rules: Vec<RenameRule>, extra_protected: Vec<String>) -> Result<Self> {
        let identifier = Regex::new(IDENTIFIER_PATTERN)
            .map_err(|e| Error::internal_unexpected(e.to_string()))?;

        for (i, rule) in rules.iter().enumerate() {
            validate_rule(i, rule, &identifier)?;
        }

        let mut protected: BTreeSet<String> =
            DEFAULT_PROTECTED.iter().map(|s| s.to_string()).collect();
        protected.extend(extra_protected);

        Ok(RuleSet {
            rules,
            protected,
            extensions: None,
            excluded: None,
            source: None,
        })
    }

    /// Add protected names on top of the ones already present.
    pub fn protect<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.protected.extend(names);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn resolve_entry(index: usize, entry: RuleEntry) -> Result<RenameRule> {
    let key = format!("rules[{}]", index);
    let new = match (entry.new, entry.case) {
        (Some(new), None) => new,
        (None, Some(case)) => case.apply(&entry.old),
        (Some(_), Some(_)) => {
            return Err(Error::config_invalid_value(
                key,
                Some(entry.old),
                "give either 'new' or 'case', not both",
            ))
        }
        (None, None) => {
            return Err(Error::config_invalid_value(
                key,
                Some(entry.old),
                "missing 'new' (or a 'case' to derive it)",
            ))
        }
    };

    Ok(RenameRule {
        old: entry.old,
        new,
        scope: entry.scope,
    })
}

fn validate_rule(index: usize, rule: &RenameRule, identifier: &Regex) -> Result<()> {
    let key = format!("rules[{}]", index);

    if rule.old.is_empty() || rule.new.is_empty() {
        return Err(Error::config_invalid_value(
            key,
            Some(rule.label()),
            "old and new names must be non-empty",
        ));
    }

    if rule.old == rule.new {
        return Err(Error::config_invalid_value(
            key,
            Some(rule.label()),
            format!("rule renames '{}' to itself", rule.old),
        ));
    }

    match rule.scope {
        RuleScope::StringLiteral => {
            for name in [&rule.old, &rule.new] {
                if name.contains(['\'', '"', '`', '\\', '\n', '\r']) {
                    return Err(Error::config_invalid_value(
                        key,
                        Some(rule.label()),
                        format!("'{}' contains quote, backslash or newline characters", name),
                    ));
                }
            }
        }
        _ => {
            for name in [&rule.old, &rule.new] {
                if !identifier.is_match(name) {
                    return Err(Error::config_invalid_value(
                        key,
                        Some(rule.label()),
                        format!("'{}' is not a valid identifier", name),
                    ));
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Conflict detection
// ============================================================================

impl RuleSet {
    /// Find rule pairs that make the set non-confluent, plus rules that touch
    /// protected names.
    pub fn conflicts(&self) -> Vec<RuleConflict> {
        let mut conflicts = Vec::new();
        let rules = &self.rules;

        for (i, a) in rules.iter().enumerate() {
            for b in rules.iter().skip(i + 1) {
                if !a.scope.overlaps(&b.scope) {
                    continue;
                }

                if a.old == b.old && a.scope == b.scope {
                    conflicts.push(RuleConflict {
                        kind: ConflictKind::DuplicateSource,
                        message: format!(
                            "'{}' is renamed by more than one rule ({} and {})",
                            a.old,
                            a.describe(),
                            b.describe()
                        ),
                        rules: vec![a.label(), b.label()],
                    });
                }

                if a.old != b.old && a.new == b.new {
                    conflicts.push(RuleConflict {
                        kind: ConflictKind::CollidingTarget,
                        message: format!(
                            "'{}' and '{}' would both become '{}'",
                            a.old, b.old, a.new
                        ),
                        rules: vec![a.label(), b.label()],
                    });
                }

                if a.old == b.new && a.new == b.old {
                    conflicts.push(RuleConflict {
                        kind: ConflictKind::InversePair,
                        message: format!(
                            "{} and {} undo each other",
                            a.describe(),
                            b.describe()
                        ),
                        rules: vec![a.label(), b.label()],
                    });
                    continue;
                }

                for (first, second) in [(a, b), (b, a)] {
                    if first.new == second.old {
                        conflicts.push(RuleConflict {
                            kind: ConflictKind::Chain,
                            message: format!(
                                "{} feeds {}: a second run would rename '{}' again",
                                first.describe(),
                                second.describe(),
                                first.new
                            ),
                            rules: vec![first.label(), second.label()],
                        });
                    }
                }
            }
        }

        for rule in rules {
            if self.protected.contains(&rule.old) {
                conflicts.push(RuleConflict {
                    kind: ConflictKind::ProtectedSource,
                    message: format!(
                        "'{}' is a protected API name; every occurrence will be skipped",
                        rule.old
                    ),
                    rules: vec![rule.label()],
                });
            }
            if self.protected.contains(&rule.new) {
                conflicts.push(RuleConflict {
                    kind: ConflictKind::ProtectedTarget,
                    message: format!(
                        "'{}' would be renamed to the protected API name '{}'",
                        rule.old, rule.new
                    ),
                    rules: vec![rule.label()],
                });
            }
        }

        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(rules: &[(&str, &str)]) -> RuleSet {
        RuleSet::from_rules(
            rules
                .iter()
                .map(|(o, n)| RenameRule::new(o, n, RuleScope::Identifier))
                .collect(),
            Vec::new(),
        )
        .unwrap()
    }

    fn kinds(set: &RuleSet) -> Vec<ConflictKind> {
        set.conflicts().into_iter().map(|c| c.kind).collect()
    }

    #[test]
    fn parses_bare_json_list() {
        let json = r#"[{"old": "userId", "new": "user_id"}, {"old": "x", "new": "y", "scope": "object_key"}]"#;
        let set = RuleSet::parse(json, RulesFormat::Json, "rules.json").unwrap();
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.rules[0].scope, RuleScope::Identifier);
        assert_eq!(set.rules[1].scope, RuleScope::ObjectKey);
        assert!(set.extensions.is_none());
    }

    #[test]
    fn parses_yaml_document_with_case_derivation() {
        let yaml = "rules:\n  - old: createdAt\n    case: snake_case\n  - old: order_total\n    case: camelCase\nprotected: [customThing]\nextensions: [.ts]\nexclude: [generated]\n";
        let set = RuleSet::parse(yaml, RulesFormat::Yaml, "rules.yaml").unwrap();
        assert_eq!(set.rules[0].new, "created_at");
        assert_eq!(set.rules[1].new, "orderTotal");
        assert!(set.protected.contains("customThing"));
        assert!(set.protected.contains("toFixed"));
        assert_eq!(set.extensions, Some(vec![".ts".to_string()]));
        assert_eq!(set.excluded, Some(vec!["generated".to_string()]));
    }

    #[test]
    fn rejects_identity_rule() {
        let err = RuleSet::parse(r#"[{"old": "a", "new": "a"}]"#, RulesFormat::Json, "r.json")
            .unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn rejects_missing_new_and_case() {
        let err =
            RuleSet::parse(r#"[{"old": "a"}]"#, RulesFormat::Json, "r.json").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn rejects_invalid_identifier() {
        let err = RuleSet::parse(
            r#"[{"old": "user-id", "new": "user_id"}]"#,
            RulesFormat::Json,
            "r.json",
        )
        .unwrap_err();
        assert_eq!(err.details["key"], "rules[0]");
    }

    #[test]
    fn string_literal_rules_allow_non_identifiers() {
        let set = RuleSet::parse(
            r#"[{"old": "BRACELET type", "new": "LOOSE BEADS", "scope": "string_literal"}]"#,
            RulesFormat::Json,
            "r.json",
        )
        .unwrap();
        assert_eq!(set.rules.len(), 1);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_shapes() {
        assert!(RuleSet::parse(r#"[{"old": "a", "neww": "b"}]"#, RulesFormat::Json, "r").is_err());
        let err = RuleSet::parse("42", RulesFormat::Json, "r").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_rules");
        let err = RuleSet::parse("{not json", RulesFormat::Json, "r").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_rules");
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let err = RuleSet::load(Path::new("rules.txt")).unwrap_err();
        assert_eq!(err.code.as_str(), "config.unsupported_format");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = RuleSet::load(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(err.code.is_config());
    }

    #[test]
    fn clean_set_has_no_conflicts() {
        let s = set(&[("userId", "user_id"), ("orderTotal", "order_total")]);
        assert!(s.conflicts().is_empty());
    }

    #[test]
    fn detects_chain() {
        let s = set(&[("userName", "user_name"), ("user_name", "username")]);
        assert_eq!(kinds(&s), vec![ConflictKind::Chain]);
    }

    #[test]
    fn detects_inverse_pair() {
        let s = set(&[("onSubmit2", "on_submit2"), ("on_submit2", "onSubmit2")]);
        assert_eq!(kinds(&s), vec![ConflictKind::InversePair]);
    }

    #[test]
    fn detects_duplicate_source_and_collision() {
        let s = set(&[("a", "b"), ("a", "c"), ("d", "b")]);
        let found = kinds(&s);
        assert!(found.contains(&ConflictKind::DuplicateSource));
        assert!(found.contains(&ConflictKind::CollidingTarget));
    }

    #[test]
    fn disjoint_scopes_do_not_conflict() {
        let s = RuleSet::from_rules(
            vec![
                RenameRule::new("userId", "user_id", RuleScope::Identifier),
                RenameRule::new("userId", "user_ref", RuleScope::StringLiteral),
            ],
            Vec::new(),
        )
        .unwrap();
        assert!(s.conflicts().is_empty());
    }

    #[test]
    fn detects_protected_source_and_target() {
        let s = set(&[("toFixed", "to_fixed"), ("myState", "useState")]);
        let found = kinds(&s);
        assert_eq!(
            found,
            vec![ConflictKind::ProtectedSource, ConflictKind::ProtectedTarget]
        );
    }

    #[test]
    fn protected_source_is_advisory() {
        assert!(!ConflictKind::ProtectedSource.blocks_write());
        assert!(ConflictKind::ProtectedTarget.blocks_write());
        assert!(ConflictKind::Chain.blocks_write());
    }

    #[test]
    fn scope_from_str_round_trips_names() {
        for scope in [
            RuleScope::Identifier,
            RuleScope::JsxAttribute,
            RuleScope::ObjectKey,
            RuleScope::StringLiteral,
        ] {
            assert_eq!(RuleScope::from_str(scope.as_str()).unwrap(), scope);
        }
        assert!(RuleScope::from_str("everything").is_err());
    }
}
