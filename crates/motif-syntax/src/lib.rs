//! Syntax-tree data contract for the motif pattern engine.
//!
//! The textual parser and the declarative builder both produce [`Syntax`]
//! trees; the compiler and the capture analysis consume them. Nothing in
//! this crate interprets a tree, it only defines the shape and a few
//! structural conveniences.

use serde::{Deserialize, Serialize};

/// Byte range into the pattern source a node was parsed from.
///
/// Builder-composed trees have no source text; they carry the default
/// empty span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Match-time options a pattern starts executing with.
///
/// These travel with the compiled program; scoped option changes inside a
/// pattern are the compiler's business, not part of this contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchOptions {
    pub case_insensitive: bool,
    pub multiline: bool,
    pub dot_matches_newline: bool,
    pub unicode_word: bool,
}

impl MatchOptions {
    /// Field-wise union. Layered scopes each contribute options; a flag
    /// set anywhere stays set.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            case_insensitive: self.case_insensitive || other.case_insensitive,
            multiline: self.multiline || other.multiline,
            dot_matches_newline: self.dot_matches_newline || other.dot_matches_newline,
            unicode_word: self.unicode_word || other.unicode_word,
        }
    }
}

/// Zero-width condition on the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Assertion {
    StartOfInput,
    EndOfInput,
    StartOfLine,
    EndOfLine,
    WordBoundary,
    NotWordBoundary,
}

/// Smallest matchable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atom {
    /// One scalar, matched literally (subject to match options).
    Char(char),
    /// Any scalar; newline behavior depends on match options.
    Dot,
    /// Zero-width assertion.
    Assert(Assertion),
}

/// One entry of a custom character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Char(char),
    /// Inclusive scalar range.
    Range(char, char),
}

/// Custom character class, `[...]` in textual syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    pub negated: bool,
    pub items: Vec<ClassItem>,
}

impl CharClass {
    pub fn new(items: Vec<ClassItem>) -> Self {
        Self { negated: false, items }
    }

    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }
}

/// What a group contributes beyond grouping.
///
/// Only the first three kinds produce a capture; `capture_name` reports
/// the name a capture is retrievable under, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// Plain capturing group.
    Capture,
    /// Capturing group retrievable by name.
    NamedCapture(String),
    /// Balancing group: captures while popping `prior`'s most recent
    /// capture, optionally under its own name.
    BalancedCapture { name: Option<String>, prior: String },
    /// Non-capturing group.
    Plain,
    /// Non-capturing group that discards backtracking positions on exit.
    Atomic,
    /// Zero-width lookahead.
    Lookahead { negated: bool },
}

impl GroupKind {
    pub fn is_capturing(&self) -> bool {
        matches!(
            self,
            GroupKind::Capture | GroupKind::NamedCapture(_) | GroupKind::BalancedCapture { .. }
        )
    }

    pub fn capture_name(&self) -> Option<&str> {
        match self {
            GroupKind::NamedCapture(name) => Some(name),
            GroupKind::BalancedCapture { name, .. } => name.as_deref(),
            _ => None,
        }
    }
}

/// Backtracking behavior of a quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatKind {
    Greedy,
    Lazy,
    Possessive,
}

/// Role of an absent-function construct, `(?~...)` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentKind {
    /// Matches content while the absent pattern stays absent.
    Expression,
    /// Clears the surrounding absence constraint.
    Clearer,
    /// Re-arms the absence constraint for the rest of the enclosing scope.
    Repeater,
    /// Bounds how far an absence constraint reaches.
    Stopper,
}

/// A pattern's structural form, as handed over by the parser or builder.
///
/// The tree is immutable and owned; analyses walk it by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Syntax {
    /// Children matched in order.
    Concat(Vec<Syntax>),
    /// Ordered choice; exactly one branch matches.
    Alternation(Vec<Syntax>),
    Group {
        kind: GroupKind,
        child: Box<Syntax>,
        span: Span,
    },
    /// Quantified child; `max` of `None` is unbounded.
    Repeat {
        min: u32,
        max: Option<u32>,
        kind: RepeatKind,
        child: Box<Syntax>,
    },
    /// Two-way branch selected by a runtime test.
    Conditional {
        condition: Box<Syntax>,
        then_branch: Box<Syntax>,
        else_branch: Box<Syntax>,
    },
    Atom(Atom),
    CharClass(CharClass),
    Absent {
        kind: AbsentKind,
        children: Vec<Syntax>,
    },
    /// Literal text matched verbatim.
    Quote(String),
    /// Comment or ignorable whitespace from extended syntax.
    Trivia(String),
    /// Host-language value spliced into the pattern; opaque here.
    Interpolation(String),
    /// Matches nothing, always succeeds.
    Empty,
}

impl Syntax {
    pub fn concat(children: impl IntoIterator<Item = Syntax>) -> Syntax {
        Syntax::Concat(children.into_iter().collect())
    }

    pub fn alt(branches: impl IntoIterator<Item = Syntax>) -> Syntax {
        Syntax::Alternation(branches.into_iter().collect())
    }

    pub fn group(kind: GroupKind, child: Syntax, span: Span) -> Syntax {
        Syntax::Group {
            kind,
            child: Box::new(child),
            span,
        }
    }

    /// Unnamed capturing group with an empty span.
    pub fn capture(child: Syntax) -> Syntax {
        Syntax::group(GroupKind::Capture, child, Span::default())
    }

    /// Named capturing group with an empty span.
    pub fn named(name: impl Into<String>, child: Syntax) -> Syntax {
        Syntax::group(GroupKind::NamedCapture(name.into()), child, Span::default())
    }

    pub fn repeat(min: u32, max: Option<u32>, child: Syntax) -> Syntax {
        Syntax::Repeat {
            min,
            max,
            kind: RepeatKind::Greedy,
            child: Box::new(child),
        }
    }

    pub fn optional(child: Syntax) -> Syntax {
        Syntax::repeat(0, Some(1), child)
    }

    pub fn zero_or_more(child: Syntax) -> Syntax {
        Syntax::repeat(0, None, child)
    }

    pub fn one_or_more(child: Syntax) -> Syntax {
        Syntax::repeat(1, None, child)
    }

    pub fn literal(text: impl Into<String>) -> Syntax {
        Syntax::Quote(text.into())
    }

    pub fn class(class: CharClass) -> Syntax {
        Syntax::CharClass(class)
    }

    /// Source span, for node kinds that carry one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Syntax::Group { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Direct structural children, in match order.
    pub fn children(&self) -> Vec<&Syntax> {
        match self {
            Syntax::Concat(children)
            | Syntax::Alternation(children)
            | Syntax::Absent { children, .. } => children.iter().collect(),
            Syntax::Group { child, .. } | Syntax::Repeat { child, .. } => vec![child],
            Syntax::Conditional {
                condition,
                then_branch,
                else_branch,
            } => vec![condition, then_branch, else_branch],
            Syntax::Atom(_)
            | Syntax::CharClass(_)
            | Syntax::Quote(_)
            | Syntax::Trivia(_)
            | Syntax::Interpolation(_)
            | Syntax::Empty => Vec::new(),
        }
    }

    /// True if any node of the tree is a capturing group.
    ///
    /// Structural check only; the capture analysis decides which of those
    /// groups actually surface and at what depth.
    pub fn has_capture(&self) -> bool {
        if let Syntax::Group { kind, .. } = self
            && kind.is_capturing()
        {
            return true;
        }
        self.children().into_iter().any(Syntax::has_capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_a_union() {
        let a = MatchOptions {
            case_insensitive: true,
            ..MatchOptions::default()
        };
        let b = MatchOptions {
            multiline: true,
            ..MatchOptions::default()
        };
        let merged = a.merge(b);
        assert!(merged.case_insensitive);
        assert!(merged.multiline);
        assert!(!merged.dot_matches_newline);
    }

    #[test]
    fn capture_name_per_kind() {
        assert_eq!(GroupKind::Capture.capture_name(), None);
        assert_eq!(
            GroupKind::NamedCapture("year".into()).capture_name(),
            Some("year")
        );
        assert_eq!(
            GroupKind::BalancedCapture {
                name: None,
                prior: "open".into()
            }
            .capture_name(),
            None
        );
        assert!(!GroupKind::Lookahead { negated: true }.is_capturing());
    }

    #[test]
    fn has_capture_sees_through_structure() {
        let tree = Syntax::concat([
            Syntax::literal("a"),
            Syntax::zero_or_more(Syntax::alt([
                Syntax::literal("b"),
                Syntax::capture(Syntax::literal("c")),
            ])),
        ]);
        assert!(tree.has_capture());
        assert!(!Syntax::literal("plain").has_capture());
    }

    #[test]
    fn children_cover_every_compound_kind() {
        let cond = Syntax::Conditional {
            condition: Box::new(Syntax::capture(Syntax::literal("x"))),
            then_branch: Box::new(Syntax::literal("y")),
            else_branch: Box::new(Syntax::Empty),
        };
        assert_eq!(cond.children().len(), 3);
        assert!(Syntax::Empty.children().is_empty());

        let span = Span::new(2, 5);
        let group = Syntax::group(GroupKind::Plain, Syntax::Empty, span);
        assert_eq!(group.span(), Some(span));
        assert_eq!(group.children().len(), 1);
    }
}
