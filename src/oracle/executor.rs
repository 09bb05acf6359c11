//! Runs a suite against an oracle and validates every output.
//!
//! Output is always positionally aligned with the input: `results[i]`
//! belongs to `cases[i]`, whether the suite ran on one thread or many.
//! Oracle failures become BLOCKED results and never abort the run.

#![allow(missing_docs)]

use std::thread;
use std::time::Instant;

use crossbeam_channel as channel;
use parking_lot::Mutex;

use crate::analysis::validator::ResultValidator;
use crate::core::errors::{QaError, Result};
use crate::model::{TestCase, TestResult};
use crate::oracle::DetectionOracle;

/// Suite executor bound to one oracle.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a, O: ?Sized> {
    oracle: &'a O,
    validator: ResultValidator,
    workers: usize,
}

impl<'a, O: DetectionOracle + ?Sized> Executor<'a, O> {
    #[must_use]
    pub fn new(oracle: &'a O, validator: ResultValidator) -> Self {
        Self {
            oracle,
            validator,
            workers: 1,
        }
    }

    /// Worker threads; values below 1 run sequentially.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Execute and validate one case.
    #[must_use]
    pub fn execute_one(&self, case: &TestCase) -> TestResult {
        let start = Instant::now();
        let outcome = self.oracle.detect(case);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            Ok(actual) => self
                .validator
                .validate(case, &actual)
                .into_result(case, actual, elapsed_ms),
            Err(err) => TestResult::blocked(case, &err.to_string(), elapsed_ms),
        }
    }

    pub fn run(&self, cases: &[TestCase]) -> Result<Vec<TestResult>> {
        self.run_with(cases, |_| {})
    }

    /// Run the suite, calling `on_result` as each result completes
    /// (completion order, which differs from input order when parallel).
    pub fn run_with<F>(&self, cases: &[TestCase], on_result: F) -> Result<Vec<TestResult>>
    where
        F: Fn(&TestResult) + Sync,
    {
        let results = if self.workers <= 1 || cases.len() <= 1 {
            cases
                .iter()
                .map(|case| {
                    let result = self.execute_one(case);
                    on_result(&result);
                    result
                })
                .collect()
        } else {
            self.run_parallel(cases, &on_result)?
        };
        check_alignment(cases, &results)?;
        Ok(results)
    }

    fn run_parallel<F>(&self, cases: &[TestCase], on_result: &F) -> Result<Vec<TestResult>>
    where
        F: Fn(&TestResult) + Sync,
    {
        let (work_tx, work_rx) = channel::bounded::<usize>(cases.len());
        for idx in 0..cases.len() {
            work_tx
                .send(idx)
                .map_err(|_| QaError::ChannelClosed {
                    component: "executor",
                })?;
        }
        drop(work_tx);

        let slots: Mutex<Vec<Option<TestResult>>> = Mutex::new(vec![None; cases.len()]);
        let workers = self.workers.min(cases.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let slots = &slots;
                scope.spawn(move || {
                    worker_loop(self, cases, &work_rx, slots, on_result);
                });
            }
        });

        slots
            .into_inner()
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.ok_or_else(|| QaError::CycleInvariant {
                    details: format!("no result produced for case #{idx}"),
                })
            })
            .collect()
    }
}

fn worker_loop<O, F>(
    executor: &Executor<'_, O>,
    cases: &[TestCase],
    work_rx: &channel::Receiver<usize>,
    slots: &Mutex<Vec<Option<TestResult>>>,
    on_result: &F,
) where
    O: DetectionOracle + ?Sized,
    F: Fn(&TestResult) + Sync,
{
    for idx in work_rx.iter() {
        let result = executor.execute_one(&cases[idx]);
        on_result(&result);
        slots.lock()[idx] = Some(result);
    }
}

/// Enforce `results[i].test_case_id == cases[i].id` for every `i`.
pub fn check_alignment(cases: &[TestCase], results: &[TestResult]) -> Result<()> {
    if cases.len() != results.len() {
        return Err(QaError::CycleInvariant {
            details: format!("{} cases but {} results", cases.len(), results.len()),
        });
    }
    if let Some((idx, (case, result))) = cases
        .iter()
        .zip(results)
        .enumerate()
        .find(|(_, (case, result))| case.id != result.test_case_id)
    {
        return Err(QaError::CycleInvariant {
            details: format!(
                "position {idx}: case {} paired with result {}",
                case.id, result.test_case_id
            ),
        });
    }
    Ok(())
}
