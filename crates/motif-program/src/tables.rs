//! Static constant pools and run-time function tables.
//!
//! Instructions refer into these by dense index. The three function
//! tables are the only part of a program that cannot be serialized; a
//! decoded program carries panicking placeholders until the host
//! reattaches real closures.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use motif_syntax::{CharClass, ClassItem};
use serde::{Deserialize, Serialize};

use crate::registers::RegisterInfo;

/// 256-bit membership set for scalar values below 256.
///
/// The compiler lowers a custom character class to one of these only
/// when every member fits; the membership test itself is byte-cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharBitset(pub [u64; 4]);

impl CharBitset {
    pub const EMPTY: CharBitset = CharBitset([0; 4]);

    pub fn insert(&mut self, byte: u8) {
        self.0[(byte >> 6) as usize] |= 1 << (byte & 63);
    }

    pub fn insert_range(&mut self, lo: u8, hi: u8) {
        for byte in lo..=hi {
            self.insert(byte);
        }
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.0[(byte >> 6) as usize] & (1 << (byte & 63)) != 0
    }

    /// Complement within the table's 256-value range.
    pub fn invert(&mut self) {
        for word in &mut self.0 {
            *word = !*word;
        }
    }

    pub fn count(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }

    /// Lower a syntactic class, when every member is ASCII.
    ///
    /// Negation complements within the table range; whether that is a
    /// faithful lowering for a given input encoding is the compiler's
    /// decision, not this type's.
    pub fn from_class(class: &CharClass) -> Option<Self> {
        let mut set = Self::EMPTY;
        for item in &class.items {
            match *item {
                ClassItem::Char(c) => {
                    if !c.is_ascii() {
                        return None;
                    }
                    set.insert(c as u8);
                }
                ClassItem::Range(lo, hi) => {
                    if !lo.is_ascii() || !hi.is_ascii() || lo > hi {
                        return None;
                    }
                    set.insert_range(lo as u8, hi as u8);
                }
            }
        }
        if class.negated {
            set.invert();
        }
        Some(set)
    }
}

impl fmt::Display for CharBitset {
    /// Compact run notation, `['0'-'9' 'x']` style.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        let mut byte = 0u16;
        while byte < 256 {
            if self.contains(byte as u8) {
                let start = byte;
                while byte < 256 && self.contains(byte as u8) {
                    byte += 1;
                }
                let end = byte - 1;
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                if start == end {
                    write_byte(f, start as u8)?;
                } else {
                    write_byte(f, start as u8)?;
                    write!(f, "-")?;
                    write_byte(f, end as u8)?;
                }
            } else {
                byte += 1;
            }
        }
        write!(f, "]")
    }
}

fn write_byte(f: &mut fmt::Formatter<'_>, byte: u8) -> fmt::Result {
    if byte.is_ascii_graphic() {
        write!(f, "'{}'", byte as char)
    } else {
        write!(f, "\\x{byte:02x}")
    }
}

// =====
// Function tables
// =====

/// Consumes input starting at an offset; returns the new end on success.
pub type ConsumeFn = Arc<dyn Fn(&str, usize) -> Option<usize> + Send + Sync>;

/// Turns a captured slice into a host value.
pub type TransformFn = Arc<dyn Fn(&str) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Consumes input and produces a value: returns the new end and the value.
pub type MatcherFn =
    Arc<dyn Fn(&str, usize) -> Option<(usize, Box<dyn Any + Send + Sync>)> + Send + Sync>;

/// Which of the three function tables is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    Consume,
    Transform,
    Matcher,
}

impl ClosureKind {
    pub const fn name(self) -> &'static str {
        match self {
            ClosureKind::Consume => "consume",
            ClosureKind::Transform => "transform",
            ClosureKind::Matcher => "matcher",
        }
    }
}

impl fmt::Display for ClosureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn unattached(kind: ClosureKind, index: usize) -> ! {
    panic!(
        "uninitialized {kind} function {index}: decoded programs carry no closures \
         until the host reattaches them"
    )
}

fn placeholder_consume(index: usize) -> ConsumeFn {
    Arc::new(move |_, _| unattached(ClosureKind::Consume, index))
}

fn placeholder_transform(index: usize) -> TransformFn {
    Arc::new(move |_| unattached(ClosureKind::Transform, index))
}

fn placeholder_matcher(index: usize) -> MatcherFn {
    Arc::new(move |_, _| unattached(ClosureKind::Matcher, index))
}

/// The three function tables of a program.
///
/// Entries are opaque; two tables compare equal when their lengths do.
#[derive(Clone, Default)]
pub struct ClosureTables {
    pub(crate) consume: Vec<ConsumeFn>,
    pub(crate) transform: Vec<TransformFn>,
    pub(crate) matcher: Vec<MatcherFn>,
}

impl ClosureTables {
    pub fn new(
        consume: Vec<ConsumeFn>,
        transform: Vec<TransformFn>,
        matcher: Vec<MatcherFn>,
    ) -> Self {
        Self {
            consume,
            transform,
            matcher,
        }
    }

    /// Tables sized to `info`, every entry a panicking placeholder.
    pub fn placeholders(info: &RegisterInfo) -> Self {
        Self {
            consume: (0..info.consume_functions as usize)
                .map(placeholder_consume)
                .collect(),
            transform: (0..info.transform_functions as usize)
                .map(placeholder_transform)
                .collect(),
            matcher: (0..info.matcher_functions as usize)
                .map(placeholder_matcher)
                .collect(),
        }
    }

    pub fn len_of(&self, kind: ClosureKind) -> usize {
        match kind {
            ClosureKind::Consume => self.consume.len(),
            ClosureKind::Transform => self.transform.len(),
            ClosureKind::Matcher => self.matcher.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.consume.is_empty() && self.transform.is_empty() && self.matcher.is_empty()
    }
}

impl fmt::Debug for ClosureTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureTables")
            .field("consume", &self.consume.len())
            .field("transform", &self.transform.len())
            .field("matcher", &self.matcher.len())
            .finish()
    }
}

impl PartialEq for ClosureTables {
    fn eq(&self, other: &Self) -> bool {
        self.consume.len() == other.consume.len()
            && self.transform.len() == other.transform.len()
            && self.matcher.len() == other.matcher.len()
    }
}
