//! Wikitext template resolution.
//!
//! Wiki markup embeds nested `{{name|arg|arg}}` expressions. Spans are found
//! with a bracket stack and recorded in the order their closing pair appears,
//! so the innermost expression is always rewritten before anything containing
//! it. Each rewrite splices a replacement string into the text and the scan
//! restarts, since splicing invalidates every prior offset.

use lazy_static::lazy_static;
use regex::Regex;

/// Delimiter around templates whose whole containing definition must be
/// dropped later, instead of merely being stripped of markup.
pub const DISCARD_DELIMITER: &str = "$$";

lazy_static! {
    // One-or-more pipes as separator, collapsing doubled pipes
    static ref ARG_SEPARATOR: Regex = Regex::new(r"\|+").unwrap();
}

/// Substitution behavior bound to a template name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateRule {
    /// `m`, `mention`: 2nd argument, plus an optional quoted remark
    Mention,
    /// `l`, `link`: 2nd argument
    Link,
    /// `lb`, `label`: parenthesized comma list, language code dropped
    Label,
    /// `gloss`, `qualifier`, `qual`, `q`: raw arguments in parentheses
    Gloss,
    /// `taxlink`, `w`, `n-g`, `non-gloss definition`, `vern`: 1st argument
    FirstArg,
    /// Names containing `for`/`form`: mark the whole definition for removal
    Marked,
    /// `cln` and anything unknown: resolve to nothing
    Omit,
}

fn rule_for(name: &str) -> TemplateRule {
    match name {
        "m" | "mention" => TemplateRule::Mention,
        "l" | "link" => TemplateRule::Link,
        "lb" | "label" => TemplateRule::Label,
        "gloss" | "qualifier" | "qual" | "q" => TemplateRule::Gloss,
        "taxlink" | "w" | "n-g" | "non-gloss definition" | "vern" => TemplateRule::FirstArg,
        "cln" => TemplateRule::Omit,
        _ if name.contains("for") || name.contains("form") => TemplateRule::Marked,
        _ => TemplateRule::Omit,
    }
}

/// Locate every balanced `{{`/`}}` span, innermost (earliest-closing) first.
/// A stray closing pair with nothing open is skipped; a stray opening pair
/// simply never produces a span.
fn detect_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    let mut i = 0;
    while i + 1 < bytes.len() {
        if &bytes[i..i + 2] == b"{{" {
            stack.push(i);
            i += 2;
        } else if &bytes[i..i + 2] == b"}}" {
            if let Some(start) = stack.pop() {
                spans.push((start, i + 2));
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    spans
}

fn mark_for_discard(name: &str, args: &str) -> String {
    format!("{d}{name}|{args}{d}", d = DISCARD_DELIMITER)
}

/// Rewrite the body of one template (the text between the brackets).
///
/// Argument splitting happens on the text after the first pipe; a body with
/// no pipe at all carries no name/argument split and falls back to the
/// default rule. A rule that indexes past the argument list marks the
/// definition for discard rather than guessing a value.
fn apply_rule(body: &str) -> String {
    let (name, args) = match body.split_once('|') {
        Some(split) => split,
        None => return String::new(),
    };
    let splits: Vec<&str> = ARG_SEPARATOR.split(args).collect();

    match rule_for(name) {
        TemplateRule::Mention => match splits.get(1) {
            Some(mention) if splits.len() == 3 => format!("{} (\"{}\")", mention, splits[2]),
            Some(mention) => (*mention).to_string(),
            None => mark_for_discard(name, args),
        },
        TemplateRule::Link => match splits.get(1) {
            Some(target) => (*target).to_string(),
            None => mark_for_discard(name, args),
        },
        TemplateRule::Label => format!("({})", splits[1..].join(", ")),
        TemplateRule::Gloss => format!("({})", args),
        TemplateRule::FirstArg => splits[0].to_string(),
        TemplateRule::Marked => mark_for_discard(name, args),
        TemplateRule::Omit => String::new(),
    }
}

/// Resolve every balanced template expression in `text`.
///
/// Idempotent: text without bracket pairs passes through untouched, and no
/// rule output contains a bracket pair. The splice loop is capped by the
/// span count of the first scan so malformed nesting cannot loop forever.
pub fn resolve(text: &str) -> String {
    let mut current = text.to_string();
    let max_passes = detect_spans(&current).len();

    for _ in 0..max_passes {
        let spans = detect_spans(&current);
        let (start, end) = match spans.first() {
            Some(&span) => span,
            None => break,
        };
        let replacement = apply_rule(&current[start + 2..end - 2]);
        current = format!("{}{}{}", &current[..start], replacement, &current[end..]);
    }

    current
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for the Template Resolver
// ─────────────────────────────────────────────────────────────────────────────
