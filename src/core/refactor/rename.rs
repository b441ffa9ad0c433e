//! Rename engine: replace genuine identifier occurrences, nothing else.
//!
//! Given source text and a rule set, this:
//! 1. Classifies the text into code/string/comment segments (see `lexer`)
//! 2. Finds whole-word identifier tokens in code segments
//! 3. Picks the most specific rule whose scope matches the token's context
//! 4. Skips protected API names, recording where they were seen
//! 5. Rebuilds the text with every rule applied in a single pass
//!
//! Rules apply simultaneously: output of one rule is never re-scanned by another.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::lexer::{self, is_ident_byte, Segment, SegmentKind};
use crate::rules::{RenameRule, RuleScope};

// ============================================================================
// Types
// ============================================================================

/// An occurrence left untouched because its name is a protected API name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedOccurrence {
    pub name: String,
    /// Line number (1-indexed).
    pub line: usize,
}

/// Result of running a rule set over one piece of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    /// New text after all replacements.
    pub text: String,
    /// Total replacements made.
    pub occurrences: usize,
    /// Replacement count per rule, indexed like the input rules.
    pub rule_hits: Vec<usize>,
    pub skipped: Vec<SkippedOccurrence>,
}

impl RenameOutcome {
    pub fn changed(&self) -> bool {
        self.occurrences > 0
    }
}

/// Words that introduce a declaration, so `const x = ...` is never a JSX attribute.
const DECLARATION_KEYWORDS: &[&str] = &[
    "const", "let", "var", "type", "enum", "readonly", "static", "public", "private",
    "protected", "export", "return",
];

// ============================================================================
// Boundary matching
// ============================================================================

/// Identifier bytes for boundary purposes. Non-ASCII bytes count as part of a
/// word so `userIdé` never yields a `userId` match.
fn is_word_byte(b: u8) -> bool {
    is_ident_byte(b) || b >= 0x80
}

/// Find the whole-word tokens in `text[start..end]` as absolute byte ranges.
fn word_tokens(bytes: &[u8], start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut tokens = Vec::new();
    let mut i = start;
    while i < end {
        if is_word_byte(bytes[i]) {
            let mut j = i + 1;
            while j < end && is_word_byte(bytes[j]) {
                j += 1;
            }
            if !bytes[i].is_ascii_digit() {
                tokens.push((i, j));
            }
            i = j;
        } else {
            i += 1;
        }
    }
    tokens
}

fn next_non_space(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len()).find(|&i| !bytes[i].is_ascii_whitespace())
}

fn prev_non_space(bytes: &[u8], before: usize) -> Option<usize> {
    (0..before).rev().find(|&i| !bytes[i].is_ascii_whitespace())
}

fn word_ending_at(bytes: &[u8], last: usize) -> &[u8] {
    let start = bytes[..=last]
        .iter()
        .rposition(|b| !is_word_byte(*b))
        .map(|p| p + 1)
        .unwrap_or(0);
    &bytes[start..=last]
}

// ============================================================================
// Context tests
// ============================================================================

/// Byte mask of `source`: `true` where the byte belongs to a code segment.
fn code_mask(len: usize, segments: &[Segment]) -> Vec<bool> {
    let mut mask = vec![false; len];
    for seg in segments.iter().filter(|s| s.kind == SegmentKind::Code) {
        mask[seg.start..seg.end].iter_mut().for_each(|b| *b = true);
    }
    mask
}

/// Innermost unclosed `(`, `[` or `{` before `pos`, ignoring brackets
/// inside strings and comments.
fn enclosing_bracket(bytes: &[u8], code: &[bool], pos: usize) -> Option<u8> {
    let mut depth = 0usize;
    for i in (0..pos).rev() {
        if !code[i] {
            continue;
        }
        match bytes[i] {
            b')' | b']' | b'}' => depth += 1,
            b'(' | b'[' | b'{' if depth == 0 => return Some(bytes[i]),
            b'(' | b'[' | b'{' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// `{ userId: 1 }`, `a, userId: 1`, `interface X { userId?: string; }`.
/// Parameter annotations such as `(a: number, userId: string)` are not keys.
fn is_object_key(bytes: &[u8], code: &[bool], start: usize, end: usize) -> bool {
    let Some(next) = next_non_space(bytes, end) else {
        return false;
    };
    let colon = match bytes[next] {
        b':' => next,
        b'?' if bytes.get(next + 1) == Some(&b':') => next + 1,
        _ => return false,
    };
    if bytes.get(colon + 1) == Some(&b':') {
        return false;
    }
    match prev_non_space(bytes, start) {
        None => true,
        Some(p) => match bytes[p] {
            b'{' => true,
            b',' | b';' => enclosing_bracket(bytes, code, start) == Some(b'{'),
            _ => false,
        },
    }
}

/// `<Field userId={id} />`, `<input name="a" userId="b">`
fn is_jsx_attribute(bytes: &[u8], code: &[bool], start: usize, end: usize) -> bool {
    let Some(next) = next_non_space(bytes, end) else {
        return false;
    };
    if bytes[next] != b'=' || matches!(bytes.get(next + 1), Some(b'=') | Some(b'>')) {
        return false;
    }
    if start == 0 || !bytes[start - 1].is_ascii_whitespace() {
        return false;
    }
    let Some(prev) = prev_non_space(bytes, start) else {
        return false;
    };
    let prev_ok = match bytes[prev] {
        b'"' | b'\'' | b'}' => true,
        b if is_word_byte(b) => {
            let word = word_ending_at(bytes, prev);
            !DECLARATION_KEYWORDS
                .iter()
                .any(|kw| kw.as_bytes() == word)
        }
        _ => false,
    };
    prev_ok && inside_jsx_tag(bytes, code, start)
}

/// Whether `pos` sits between an opening `<Name` and the tag's closing `>`.
/// Walks back over attribute `{...}` expressions; any other `>`, `;` or
/// bracket means the position is ordinary code.
fn inside_jsx_tag(bytes: &[u8], code: &[bool], pos: usize) -> bool {
    let mut depth = 0usize;
    for i in (0..pos).rev() {
        if !code[i] {
            continue;
        }
        match bytes[i] {
            b'}' => depth += 1,
            b'{' if depth == 0 => return false,
            b'{' => depth -= 1,
            _ if depth > 0 => {}
            b'<' => return opens_tag(bytes, i),
            b'>' | b';' | b'(' | b')' | b'[' | b']' => return false,
            _ => {}
        }
    }
    false
}

/// `<` followed by a tag name, in a position where an expression can start
/// (so `a <b` comparisons do not count).
fn opens_tag(bytes: &[u8], lt: usize) -> bool {
    let names_tag = bytes
        .get(lt + 1)
        .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_' || *b == b'$');
    if !names_tag {
        return false;
    }
    match prev_non_space(bytes, lt) {
        None => true,
        Some(p) if is_word_byte(bytes[p]) => word_ending_at(bytes, p) == b"return",
        Some(p) => !matches!(bytes[p], b')' | b']'),
    }
}

fn scope_matches(
    scope: &RuleScope,
    bytes: &[u8],
    code: &[bool],
    start: usize,
    end: usize,
    in_code: bool,
) -> bool {
    match scope {
        RuleScope::Identifier => in_code,
        RuleScope::ObjectKey => is_object_key(bytes, code, start, end),
        RuleScope::JsxAttribute => in_code && is_jsx_attribute(bytes, code, start, end),
        RuleScope::StringLiteral => !in_code,
    }
}

/// More specific scopes are tried first.
fn scope_rank(scope: &RuleScope) -> u8 {
    match scope {
        RuleScope::StringLiteral => 0,
        RuleScope::ObjectKey => 1,
        RuleScope::JsxAttribute => 2,
        RuleScope::Identifier => 3,
    }
}

// ============================================================================
// Rename application
// ============================================================================

struct Edit {
    start: usize,
    end: usize,
    rule: usize,
}

/// Apply every rule to `source` in one pass.
pub fn rename_text(
    source: &str,
    rules: &[RenameRule],
    protected: &BTreeSet<String>,
) -> RenameOutcome {
    let bytes = source.as_bytes();
    let segments = lexer::segment(source);
    let code = code_mask(bytes.len(), &segments);

    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, rule) in rules.iter().enumerate() {
        index.entry(rule.old.as_str()).or_default().push(i);
    }
    for candidates in index.values_mut() {
        candidates.sort_by_key(|&i| (scope_rank(&rules[i].scope), i));
    }

    let mut edits: Vec<Edit> = Vec::new();
    let mut skipped_at: Vec<(String, usize)> = Vec::new();

    let mut consider = |name: &str, start: usize, end: usize, ctx_start: usize, ctx_end: usize, in_code: bool| {
        let Some(candidates) = index.get(name) else {
            return;
        };
        let Some(&rule) = candidates
            .iter()
            .find(|&&i| scope_matches(&rules[i].scope, bytes, &code, ctx_start, ctx_end, in_code))
        else {
            return;
        };
        if protected.contains(name) {
            skipped_at.push((name.to_string(), start));
        } else {
            edits.push(Edit { start, end, rule });
        }
    };

    for seg in &segments {
        match seg.kind {
            SegmentKind::Code => {
                for (start, end) in word_tokens(bytes, seg.start, seg.end) {
                    consider(&source[start..end], start, end, start, end, true);
                }
            }
            SegmentKind::String => {
                if let Some(content) = seg.literal_content(source) {
                    let start = seg.start + 1;
                    consider(content, start, start + content.len(), seg.start, seg.end, false);
                }
            }
            SegmentKind::Comment => {}
        }
    }

    let mut rule_hits = vec![0; rules.len()];
    let mut text = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in &edits {
        text.push_str(&source[cursor..edit.start]);
        text.push_str(&rules[edit.rule].new);
        cursor = edit.end;
        rule_hits[edit.rule] += 1;
    }
    text.push_str(&source[cursor..]);

    let line_starts = line_starts(source);
    let skipped = skipped_at
        .into_iter()
        .map(|(name, pos)| SkippedOccurrence {
            name,
            line: line_at(&line_starts, pos),
        })
        .collect();

    RenameOutcome {
        text,
        occurrences: edits.len(),
        rule_hits,
        skipped,
    }
}

/// Apply a single rule. Returns the new text, the replacement count and any
/// skipped protected occurrences.
pub fn rename_one(
    source: &str,
    rule: &RenameRule,
    protected: &BTreeSet<String>,
) -> (String, usize, Vec<SkippedOccurrence>) {
    let outcome = rename_text(source, std::slice::from_ref(rule), protected);
    (outcome.text, outcome.occurrences, outcome.skipped)
}

fn line_starts(source: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

fn line_at(line_starts: &[usize], pos: usize) -> usize {
    match line_starts.binary_search(&pos) {
        Ok(i) => i + 1,
        Err(i) => i,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(old: &str, new: &str) -> RenameRule {
        RenameRule::new(old, new, RuleScope::Identifier)
    }

    fn scoped(old: &str, new: &str, scope: RuleScope) -> RenameRule {
        RenameRule::new(old, new, scope)
    }

    fn none() -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn protect(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn renames_code_but_not_strings_or_comments() {
        let src = r#"const userId = "userId_literal"; // userId comment"#;
        let (text, count, skipped) = rename_one(src, &rule("userId", "user_id"), &none());
        assert_eq!(text, r#"const user_id = "userId_literal"; // userId comment"#);
        assert_eq!(count, 1);
        assert!(skipped.is_empty());
    }

    #[test]
    fn protected_name_is_skipped_and_recorded() {
        let src = "const total = price.toFixed(2);";
        let (text, count, skipped) =
            rename_one(src, &rule("toFixed", "to_fixed"), &protect(&["toFixed"]));
        assert_eq!(text, src);
        assert_eq!(count, 0);
        assert_eq!(
            skipped,
            vec![SkippedOccurrence {
                name: "toFixed".to_string(),
                line: 1
            }]
        );
    }

    #[test]
    fn protected_name_untouched_in_every_context() {
        let src = "x.toFixed(1);\nconst o = { toFixed: 1 };\n<A toFixed={2} />\nf('toFixed');";
        let rules = vec![
            rule("toFixed", "to_fixed"),
            scoped("toFixed", "to_fixed", RuleScope::ObjectKey),
            scoped("toFixed", "to_fixed", RuleScope::JsxAttribute),
            scoped("toFixed", "to_fixed", RuleScope::StringLiteral),
        ];
        let outcome = rename_text(src, &rules, &protect(&["toFixed"]));
        assert_eq!(outcome.text, src);
        assert_eq!(outcome.occurrences, 0);
        let lines: Vec<usize> = outcome.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }

    #[test]
    fn word_boundaries() {
        let src = "const valid = grid.hidden || id || obj.id || $id || id_x || id2;";
        let (text, count, _) = rename_one(src, &rule("id", "identifier"), &none());
        assert_eq!(
            text,
            "const valid = grid.hidden || identifier || obj.identifier || $id || id_x || id2;"
        );
        assert_eq!(count, 2);
    }

    #[test]
    fn only_string_or_comment_occurrences_leave_text_identical() {
        let src = "// userId\n/* userId */\nconst a = 'userId is here';\nconst b = `userId ${x}`;";
        let (text, count, _) = rename_one(src, &rule("userId", "user_id"), &none());
        assert_eq!(count, 0);
        assert_eq!(text, src);
    }

    #[test]
    fn template_substitution_code_is_renamed() {
        let src = "const msg = `user ${userId} logged in, not userId`;";
        let (text, count, _) = rename_one(src, &rule("userId", "user_id"), &none());
        assert_eq!(text, "const msg = `user ${user_id} logged in, not userId`;");
        assert_eq!(count, 1);
    }

    #[test]
    fn idempotent_for_conflict_free_rules() {
        let rules = vec![rule("userId", "user_id"), rule("createdAt", "created_at")];
        let src = "function f(userId) { return { userId, createdAt: now(userId) }; }";
        let once = rename_text(src, &rules, &none());
        let twice = rename_text(&once.text, &rules, &none());
        assert_eq!(twice.text, once.text);
        assert_eq!(twice.occurrences, 0);
    }

    #[test]
    fn inverse_rules_restore_original() {
        let rules = vec![rule("userId", "user_id"), rule("orderTotal", "order_total")];
        let inverse: Vec<RenameRule> = rules.iter().map(|r| r.inverse()).collect();
        let src = "const userId = order.orderTotal + 'userId'; // orderTotal\nuse(userId);";
        let forward = rename_text(src, &rules, &none());
        assert_eq!(forward.occurrences, 3);
        let back = rename_text(&forward.text, &inverse, &none());
        assert_eq!(back.text, src);
    }

    #[test]
    fn rules_apply_simultaneously() {
        // A swap would collapse to one name if applied sequentially.
        let rules = vec![rule("a", "b"), rule("b", "a")];
        let outcome = rename_text("a + b", &rules, &none());
        assert_eq!(outcome.text, "b + a");
        assert_eq!(outcome.rule_hits, vec![1, 1]);
    }

    #[test]
    fn object_key_scope() {
        let rules = vec![scoped("userId", "user_id", RuleScope::ObjectKey)];
        let src = "const q = { where: { userId: id }, \"userId\": 1 };\nconst userId = x ? userId : y;";
        let outcome = rename_text(src, &rules, &none());
        assert_eq!(
            outcome.text,
            "const q = { where: { user_id: id }, \"user_id\": 1 };\nconst userId = x ? userId : y;"
        );
        assert_eq!(outcome.occurrences, 2);
    }

    #[test]
    fn object_key_scope_handles_optional_interface_fields() {
        let rules = vec![scoped("userId", "user_id", RuleScope::ObjectKey)];
        let src = "interface P {\n  userId?: string;\n  name: string;\n}";
        let outcome = rename_text(src, &rules, &none());
        assert_eq!(outcome.text, "interface P {\n  user_id?: string;\n  name: string;\n}");
    }

    #[test]
    fn jsx_attribute_scope() {
        let rules = vec![scoped("onSubmit", "on_submit", RuleScope::JsxAttribute)];
        let src = "const onSubmit = () => {};\n<Form className=\"f\" onSubmit={onSubmit} />\nif (onSubmit == null) {}";
        let outcome = rename_text(src, &rules, &none());
        assert_eq!(
            outcome.text,
            "const onSubmit = () => {};\n<Form className=\"f\" on_submit={onSubmit} />\nif (onSubmit == null) {}"
        );
        assert_eq!(outcome.occurrences, 1);
    }

    #[test]
    fn jsx_attribute_scope_spans_multiline_tags() {
        let rules = vec![scoped("userId", "user_id", RuleScope::JsxAttribute)];
        let src = "return (\n  <Field\n    label=\"a > b\"\n    onChange={(e) => set(e)}\n    userId={userId}\n  />\n);";
        let outcome = rename_text(src, &rules, &none());
        assert_eq!(
            outcome.text,
            "return (\n  <Field\n    label=\"a > b\"\n    onChange={(e) => set(e)}\n    user_id={userId}\n  />\n);"
        );
    }

    #[test]
    fn jsx_attribute_scope_ignores_plain_assignments() {
        let rules = vec![scoped("userId", "user_id", RuleScope::JsxAttribute)];
        for src in [
            "let userId;\nif (x) {\n  go();\n}\nuserId = 5;\nuse(userId);",
            "let userId;\nif (x) go();\nelse userId = 5;",
            "if (a <b) {\n}\nuserId = 1;",
        ] {
            let outcome = rename_text(src, &rules, &none());
            assert_eq!(outcome.text, src);
            assert_eq!(outcome.occurrences, 0);
        }
    }

    #[test]
    fn object_key_scope_ignores_parameter_annotations() {
        let rules = vec![scoped("userId", "user_id", RuleScope::ObjectKey)];
        for src in [
            "function f(a: number, userId: string) { return userId; }",
            "const g = (a: number, userId: string) => userId;",
            "type T = [a: number, userId: string];",
        ] {
            let outcome = rename_text(src, &rules, &none());
            assert_eq!(outcome.text, src);
        }

        let outcome = rename_text("f({ a: 1, userId: 2 }, { b: [1, 2], 'userId': 3 })", &rules, &none());
        assert_eq!(outcome.text, "f({ a: 1, user_id: 2 }, { b: [1, 2], 'user_id': 3 })");
    }

    #[test]
    fn string_literal_scope_matches_whole_literal_only() {
        let rules = vec![scoped("userId", "user_id", RuleScope::StringLiteral)];
        let src = "select('userId', \"userId\", 'userId_x', `userId`, userId)";
        let outcome = rename_text(src, &rules, &none());
        assert_eq!(
            outcome.text,
            "select('user_id', \"user_id\", 'userId_x', `user_id`, userId)"
        );
        assert_eq!(outcome.occurrences, 3);
    }

    #[test]
    fn specific_scope_wins_over_identifier() {
        let rules = vec![
            rule("userId", "uid"),
            scoped("userId", "user_id", RuleScope::ObjectKey),
        ];
        let outcome = rename_text("f({ userId: userId })", &rules, &none());
        assert_eq!(outcome.text, "f({ user_id: uid })");
        assert_eq!(outcome.rule_hits, vec![1, 1]);
    }

    #[test]
    fn skipped_lines_are_counted() {
        let src = "a\nb\nc.toISOString()";
        let (_, _, skipped) = rename_one(
            src,
            &rule("toISOString", "to_iso_string"),
            &protect(&["toISOString"]),
        );
        assert_eq!(skipped[0].line, 3);
    }

    #[test]
    fn line_at_boundaries() {
        let starts = line_starts("ab\ncd\n");
        assert_eq!(line_at(&starts, 0), 1);
        assert_eq!(line_at(&starts, 2), 1);
        assert_eq!(line_at(&starts, 3), 2);
        assert_eq!(line_at(&starts, 6), 3);
    }

    #[test]
    fn non_ascii_neighbours_are_part_of_the_word() {
        let (text, count, _) = rename_one("let userIdé = userId;", &rule("userId", "uid"), &none());
        assert_eq!(text, "let userIdé = uid;");
        assert_eq!(count, 1);
    }
}
