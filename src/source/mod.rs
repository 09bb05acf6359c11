//! Test case sources: where a cycle's suite comes from.
//!
//! Sources are values, not services. The id counter lives in a
//! [`CaseIdAllocator`] owned by the caller and threaded through every
//! `generate` call, so two cycles never share hidden state.

#![allow(missing_docs)]

pub mod llm;
pub mod rules;

use crate::core::errors::Result;
use crate::model::{Requirements, TestCase};

pub use llm::LlmResponseSource;
pub use rules::RuleBasedSource;

/// Monotonic test case id counter for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseIdAllocator {
    next: u32,
}

impl Default for CaseIdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl CaseIdAllocator {
    #[must_use]
    pub const fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    /// Take the next sequence number.
    pub fn next_seq(&mut self) -> u32 {
        let seq = self.next;
        self.next = self.next.saturating_add(1);
        seq
    }

    /// `TC-<prefix>-<NNN>` with the next sequence number.
    pub fn allocate(&mut self, prefix: &str) -> String {
        let seq = self.next_seq();
        format!("TC-{prefix}-{seq:03}")
    }

    /// Sequence number the next allocation will use.
    #[must_use]
    pub const fn peek(&self) -> u32 {
        self.next
    }
}

/// Produces a suite of test cases from requirements.
pub trait TestCaseSource {
    /// Short stable name for logs and errors.
    fn name(&self) -> &'static str;

    fn generate(&self, requirements: &Requirements, ids: &mut CaseIdAllocator)
    -> Result<Vec<TestCase>>;
}

impl<S: TestCaseSource + ?Sized> TestCaseSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn generate(
        &self,
        requirements: &Requirements,
        ids: &mut CaseIdAllocator,
    ) -> Result<Vec<TestCase>> {
        (**self).generate(requirements, ids)
    }
}

/// Tries `primary`; on failure, rewinds the allocator and uses `secondary`.
#[derive(Debug, Clone)]
pub struct FallbackSource<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackSource<P, S> {
    #[must_use]
    pub const fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: TestCaseSource, S: TestCaseSource> TestCaseSource for FallbackSource<P, S> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn generate(
        &self,
        requirements: &Requirements,
        ids: &mut CaseIdAllocator,
    ) -> Result<Vec<TestCase>> {
        let checkpoint = *ids;
        match self.primary.generate(requirements, ids) {
            Ok(cases) => Ok(cases),
            Err(err) => {
                eprintln!(
                    "[FQA-SOURCE] {} failed ({err}); falling back to {}",
                    self.primary.name(),
                    self.secondary.name()
                );
                *ids = checkpoint;
                self.secondary.generate(requirements, ids)
            }
        }
    }
}
