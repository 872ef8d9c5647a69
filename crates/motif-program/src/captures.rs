//! Capture metadata derived from a pattern's syntax tree.
//!
//! Match results are typed before a pattern is ever compiled: one
//! source-order walk over the tree yields the ordered list of capture
//! groups together with how many layers of "may not have participated"
//! the pattern's own structure wraps around each. The walk performs no
//! instruction selection and visits every node exactly once.

use std::fmt;

use motif_syntax::{AbsentKind, Span, Syntax};
use serde::{Deserialize, Serialize};

/// Identifier under which an external construct refers to a capture,
/// assigned by the compiler when it resolves e.g. a named backreference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ReferenceId(pub u32);

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tracks how many ways the structure above a node can skip its captures.
///
/// Alternation branches, zero-minimum quantifiers and conditional arms
/// each add one layer. A scope boundary can forbid further accumulation:
/// past such a boundary the depth so far is frozen and at most one more
/// layer is ever reported, no matter how deeply optional constructs nest
/// below it.
///
/// Values are copied on every descent; sibling subtrees never observe
/// each other's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalNesting {
    /// Depth accumulated before the most recent nesting boundary.
    outer_depth: u32,
    /// Depth accumulated past that boundary.
    inner_depth: u32,
    /// Whether `inner_depth` may still grow.
    can_nest: bool,
}

impl OptionalNesting {
    /// State at the root of a tree. Nesting starts out permitted; only an
    /// embedding host crossing a literal boundary forbids it.
    pub fn root() -> Self {
        Self {
            outer_depth: 0,
            inner_depth: 0,
            can_nest: true,
        }
    }

    /// Layers of optionality currently in effect.
    pub fn depth(&self) -> u32 {
        self.outer_depth + self.inner_depth
    }

    /// One more optional layer. Saturates at a single extra layer once
    /// nesting has been disabled.
    #[must_use]
    pub fn adding_optional(self) -> Self {
        let inner_depth = if self.can_nest { self.inner_depth + 1 } else { 1 };
        Self {
            inner_depth,
            ..self
        }
    }

    /// Freeze the accumulated depth and stop counting further layers.
    #[must_use]
    pub fn disabling_nesting(self) -> Self {
        Self {
            outer_depth: self.depth(),
            inner_depth: 0,
            can_nest: false,
        }
    }
}

/// Element type stored in a capture slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureShape {
    /// The matched slice of input.
    Slice,
    /// A value produced by a transform or matcher function; `type_name`
    /// is the compiler-declared result type.
    Transformed { type_name: &'static str },
    /// The inner shape, one more level of optionality applied.
    Optional(Box<CaptureShape>),
}

impl fmt::Display for CaptureShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureShape::Slice => write!(f, "slice"),
            CaptureShape::Transformed { type_name } => write!(f, "value<{type_name}>"),
            CaptureShape::Optional(inner) => write!(f, "optional<{inner}>"),
        }
    }
}

/// One capture group of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    name: Option<String>,
    shape: CaptureShape,
    optional_depth: u32,
    span: Span,
}

impl Capture {
    pub fn new(name: Option<String>, shape: CaptureShape, optional_depth: u32, span: Span) -> Self {
        Self {
            name,
            shape,
            optional_depth,
            span,
        }
    }

    /// The implicit capture covering the entire match.
    pub fn whole_match(span: Span) -> Self {
        Self::new(None, CaptureShape::Slice, 0, span)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Underlying element shape, before optionality is applied.
    pub fn shape(&self) -> &CaptureShape {
        &self.shape
    }

    /// Layers of structural optionality around this capture.
    pub fn optional_depth(&self) -> u32 {
        self.optional_depth
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Element shape as surfaced to match results: the underlying shape
    /// wrapped in one `Optional` per depth layer.
    pub fn value_shape(&self) -> CaptureShape {
        let mut shape = self.shape.clone();
        for _ in 0..self.optional_depth {
            shape = CaptureShape::Optional(Box::new(shape));
        }
        shape
    }
}

/// Ordered capture groups of a pattern.
///
/// Position in the list is the capture's register offset at run time.
/// Entry 0 is always the implicit whole-match capture, so the list is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureList {
    captures: Vec<Capture>,
}

impl CaptureList {
    /// The default list: nothing but the whole-match entry.
    pub fn whole_match_only() -> Self {
        Self {
            captures: vec![Capture::whole_match(Span::default())],
        }
    }

    /// Rebuild a list from already-derived entries.
    ///
    /// Panics when `captures` is empty; callers deserializing untrusted
    /// data must reject an empty list before reaching this point.
    pub fn from_captures(captures: Vec<Capture>) -> Self {
        assert!(
            !captures.is_empty(),
            "a capture list always holds the whole-match entry"
        );
        Self { captures }
    }

    /// Derive the capture list of `root` in one source-order pass.
    pub fn from_syntax(root: &Syntax) -> Self {
        let mut list = Self {
            captures: vec![Capture::whole_match(root.span().unwrap_or_default())],
        };
        list.visit(root, OptionalNesting::root());
        list
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Capture> {
        self.captures.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Capture> {
        self.captures.iter()
    }

    /// Offset of the first capture named `name`. Names are unique once a
    /// pattern passes parsing, so first match is the only match.
    pub fn position_of_name(&self, name: &str) -> Option<usize> {
        self.captures.iter().position(|c| c.name() == Some(name))
    }

    pub(crate) fn set_shape(&mut self, index: usize, shape: CaptureShape) {
        self.captures[index].shape = shape;
    }

    fn visit(&mut self, node: &Syntax, nesting: OptionalNesting) {
        match node {
            Syntax::Concat(children) => {
                for child in children {
                    self.visit(child, nesting);
                }
            }
            // Exactly one branch runs, so every branch's captures gain a layer.
            Syntax::Alternation(branches) => {
                let inner = nesting.adding_optional();
                for branch in branches {
                    self.visit(branch, inner);
                }
            }
            Syntax::Group { kind, child, span } => {
                if kind.is_capturing() {
                    self.captures.push(Capture::new(
                        kind.capture_name().map(str::to_owned),
                        CaptureShape::Slice,
                        nesting.depth(),
                        *span,
                    ));
                }
                self.visit(child, nesting);
            }
            // A zero-minimum quantifier may skip its child entirely; any
            // mandatory repetition leaves depth untouched regardless of
            // the upper bound.
            Syntax::Repeat { min, child, .. } => {
                let inner = if *min == 0 {
                    nesting.adding_optional()
                } else {
                    nesting
                };
                self.visit(child, inner);
            }
            Syntax::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                // A capturing condition always participates; its capture
                // precedes both branches at the current depth.
                if let Syntax::Group { kind, span, .. } = condition.as_ref()
                    && kind.is_capturing()
                {
                    self.captures.push(Capture::new(
                        kind.capture_name().map(str::to_owned),
                        CaptureShape::Slice,
                        nesting.depth(),
                        *span,
                    ));
                }
                let inner = nesting.adding_optional();
                self.visit(then_branch, inner);
                self.visit(else_branch, inner);
            }
            Syntax::Absent { kind, children } => match kind {
                AbsentKind::Expression => {
                    for child in children {
                        self.visit(child, nesting);
                    }
                }
                AbsentKind::Clearer | AbsentKind::Repeater | AbsentKind::Stopper => {}
            },
            Syntax::Atom(_)
            | Syntax::CharClass(_)
            | Syntax::Quote(_)
            | Syntax::Trivia(_)
            | Syntax::Interpolation(_)
            | Syntax::Empty => {}
        }
    }
}

impl Default for CaptureList {
    fn default() -> Self {
        Self::whole_match_only()
    }
}

impl<'a> IntoIterator for &'a CaptureList {
    type Item = &'a Capture;
    type IntoIter = std::slice::Iter<'a, Capture>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
