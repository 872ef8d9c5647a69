//! Compile-on-demand program cache.

use std::sync::Arc;

use motif_syntax::{MatchOptions, Syntax};

use crate::cell::RaceCell;
use crate::program::Program;
use crate::wire;

/// Options applied when a pattern is compiled, as opposed to the
/// match-time [`MatchOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub enable_tracing: bool,
    pub enable_metrics: bool,
}

impl CompileOptions {
    /// Field-wise union.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            enable_tracing: self.enable_tracing || other.enable_tracing,
            enable_metrics: self.enable_metrics || other.enable_metrics,
        }
    }
}

/// Failure reported by a program compiler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The tree uses a construct this compiler cannot lower.
    #[error("unsupported construct: {0}")]
    Unsupported(String),
    /// A reference does not resolve to any capture.
    #[error("unknown capture reference `{0}`")]
    UnknownReference(String),
    /// Anything else the compiler wants to say.
    #[error("{0}")]
    Other(String),
}

/// Turns a syntax tree plus options into an executable program.
///
/// Concurrent first use of a pattern may run `compile` several times for
/// the same inputs; results must be interchangeable.
pub trait Compiler {
    fn compile(
        &self,
        syntax: &Syntax,
        options: &MatchOptions,
        compile_options: &CompileOptions,
    ) -> Result<Program, CompileError>;
}

/// A pattern plus its compiled program, produced on first use.
///
/// A hit costs one atomic load. Concurrent first uses compile
/// independently on their own threads, race to install, and every caller
/// returns the single winning instance; losers discard their own result.
/// A failed compile caches nothing, so a later access retries.
pub struct LazyProgram<C> {
    syntax: Syntax,
    options: MatchOptions,
    compiler: C,
    compile_options: CompileOptions,
    exercise_wire: bool,
    slot: RaceCell<Program>,
}

impl<C: Compiler> LazyProgram<C> {
    pub fn new(syntax: Syntax, options: MatchOptions, compiler: C) -> Self {
        Self {
            syntax,
            options,
            compiler,
            compile_options: CompileOptions::default(),
            exercise_wire: false,
            slot: RaceCell::empty(),
        }
    }

    /// Round-trip every freshly compiled program through the wire format
    /// before installing it, installing the decoded copy.
    ///
    /// Encodable programs round-trip equal in every field, so the swap is
    /// invisible to callers. A program the format cannot carry, such as
    /// one with attached closures, fails the trip and is installed
    /// unchanged; failures are never surfaced.
    #[must_use]
    pub fn with_wire_exercise(mut self, on: bool) -> Self {
        self.exercise_wire = on;
        self
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    pub fn compile_options(&self) -> CompileOptions {
        self.compile_options
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// The compiled program, cached or compiled on the spot.
    ///
    /// On a miss this compiles on the calling thread and publishes the
    /// result; whoever wins the publish race is what every caller gets.
    pub fn program(&self) -> Result<Arc<Program>, CompileError> {
        if let Some(program) = self.slot.load() {
            return Ok(program);
        }
        let compiled = self
            .compiler
            .compile(&self.syntax, &self.options, &self.compile_options)?;
        let candidate = if self.exercise_wire {
            exercise_round_trip(compiled)
        } else {
            compiled
        };
        Ok(self.slot.publish(Arc::new(candidate)))
    }

    /// Peek at the cache without compiling.
    pub fn cached(&self) -> Option<Arc<Program>> {
        self.slot.load()
    }

    /// Merge `extra` into the compile options and drop the cached
    /// program; the next access recompiles under the merged set.
    /// Diagnostic path, hence the exclusive borrow.
    pub fn add_compile_options(&mut self, extra: CompileOptions) {
        self.compile_options = self.compile_options.union(extra);
        self.slot.clear();
    }

    /// Drop the cached program unconditionally. Diagnostic path.
    pub fn force_recompile(&mut self) {
        self.slot.clear();
    }
}

/// Encode then decode `program`, returning the decoded copy when the
/// trip succeeds and `program` itself otherwise.
fn exercise_round_trip(program: Program) -> Program {
    let Ok(text) = wire::encode(&program) else {
        return program;
    };
    match wire::decode(&text) {
        Ok(decoded) => decoded,
        Err(_) => program,
    }
}
