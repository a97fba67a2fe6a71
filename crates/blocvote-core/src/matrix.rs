//! Favoritism over the full entity × entity grid.
//!
//! Architecture:
//! 1. Collect every entity with a record in the range
//! 2. Enumerate ordered pairs with donor ≠ recipient
//! 3. Test pairs in parallel on scoped worker threads
//! 4. Report progress per finished pair; honor cancellation between pairs
//! 5. Assemble a dense matrix or a sparse list of significant pairs
//!
//! Every pair gets its own generator derived from the base seed and the pair
//! index, so a seeded run gives the same matrix for any worker count.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::TestConfig;
use crate::error::{Error, Result};
use crate::favoritism::{FavoritismResult, FavoritismTester};
use crate::period::PeriodRange;
use crate::record::Entity;
use crate::session::AnalysisSession;

/// Options for a matrix run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixOptions {
    pub config: TestConfig,
    /// Parallel workers. Zero is treated as one.
    pub worker_threads: usize,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            config: TestConfig::default(),
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Emitted after each finished pair.
#[derive(Debug, Clone)]
pub struct MatrixProgress<'a> {
    pub range: PeriodRange,
    pub completed: usize,
    pub total: usize,
    pub donor: &'a Entity,
    pub recipient: &'a Entity,
    pub result: FavoritismResult,
}

/// A significant cell of the sparse output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificantPair {
    pub donor: Entity,
    pub recipient: Entity,
    pub observed_mean: f64,
    pub threshold_value: f64,
}

/// Dense donor × recipient significance matrix for one range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoritismMatrix {
    range: PeriodRange,
    seed: u64,
    entities: Vec<Entity>,
    /// Row-major, `cells[donor * n + recipient]`.
    cells: Vec<bool>,
    significant: Vec<SignificantPair>,
}

impl FavoritismMatrix {
    pub fn range(&self) -> PeriodRange {
        self.range
    }

    /// Base seed the run used; pass it back in to reproduce the matrix.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn index_of(&self, entity: &Entity) -> Option<usize> {
        self.entities.binary_search(entity).ok()
    }

    /// Whether `donor → recipient` tested significant. `None` for entities
    /// outside the matrix.
    pub fn get(&self, donor: &Entity, recipient: &Entity) -> Option<bool> {
        let n = self.entities.len();
        let d = self.index_of(donor)?;
        let r = self.index_of(recipient)?;
        Some(self.cells[d * n + r])
    }

    pub fn row(&self, donor: &Entity) -> Option<&[bool]> {
        let n = self.entities.len();
        let d = self.index_of(donor)?;
        Some(&self.cells[d * n..(d + 1) * n])
    }

    pub fn significant_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Statistics of every significant cell, in row-major order.
    pub fn significant(&self) -> &[SignificantPair] {
        &self.significant
    }

    /// Significant `(donor, recipient)` cells in row-major order.
    pub fn significant_pairs(&self) -> impl Iterator<Item = (&Entity, &Entity)> + '_ {
        let n = self.entities.len();
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c)
            .map(move |(i, _)| (&self.entities[i / n], &self.entities[i % n]))
    }

    /// Unordered pairs significant in both directions, lower entity first.
    pub fn collusive_pairs(&self) -> Vec<(Entity, Entity)> {
        let n = self.entities.len();
        let mut out = Vec::new();
        for a in 0..n {
            for b in (a + 1)..n {
                if self.cells[a * n + b] && self.cells[b * n + a] {
                    out.push((self.entities[a].clone(), self.entities[b].clone()));
                }
            }
        }
        out
    }
}

type ProgressFn<'a> = dyn Fn(&MatrixProgress<'_>) + Sync + 'a;
type PairResults = Vec<((usize, usize), FavoritismResult)>;

/// Runs favoritism tests over every ordered entity pair of a range.
pub struct MatrixCompiler<'a> {
    tester: FavoritismTester<'a>,
    worker_threads: usize,
    progress: Option<&'a ProgressFn<'a>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> MatrixCompiler<'a> {
    pub fn new(session: &'a AnalysisSession, options: MatrixOptions) -> Result<Self> {
        Ok(Self {
            tester: FavoritismTester::new(session, options.config)?,
            worker_threads: options.worker_threads.max(1),
            progress: None,
            cancel: None,
        })
    }

    /// Call `f` after every finished pair, from whichever worker finished it.
    pub fn with_progress(mut self, f: &'a ProgressFn<'a>) -> Self {
        self.progress = Some(f);
        self
    }

    /// Abort with [`Error::Cancelled`] once `flag` is set. Checked between
    /// pairs; a running simulation is never interrupted.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Dense matrix for `range`.
    pub fn compile(&self, range: PeriodRange) -> Result<FavoritismMatrix> {
        let (entities, seed, results) = self.evaluate(range)?;
        let n = entities.len();
        let mut cells = vec![false; n * n];
        for &((d, r), result) in &results {
            cells[d * n + r] = result.is_significant();
        }
        let significant = collect_significant(&entities, results);
        Ok(FavoritismMatrix {
            range,
            seed,
            entities,
            cells,
            significant,
        })
    }

    /// Only the significant pairs of `range`, with their statistics.
    pub fn compile_sparse(&self, range: PeriodRange) -> Result<Vec<SignificantPair>> {
        let (entities, _, results) = self.evaluate(range)?;
        Ok(collect_significant(&entities, results))
    }

    /// Dense matrices for several, possibly non-contiguous, ranges.
    pub fn compile_ranges(&self, ranges: &[PeriodRange]) -> Result<Vec<FavoritismMatrix>> {
        ranges.iter().map(|&range| self.compile(range)).collect()
    }

    fn evaluate(&self, range: PeriodRange) -> Result<(Vec<Entity>, u64, PairResults)> {
        let entities = self.tester.session().entities_in(range);
        let n = entities.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|d| (0..n).filter(move |&r| r != d).map(move |r| (d, r)))
            .collect();
        let total = pairs.len();
        let seed = self
            .tester
            .config()
            .seed
            .unwrap_or_else(|| rand::rng().random());

        log::info!(
            "compiling {range}: {n} entities, {total} pairs, {} workers, seed {seed}",
            self.worker_threads
        );

        let completed = AtomicUsize::new(0);
        let cancelled = AtomicBool::new(false);
        let workers = self.worker_threads.min(total.max(1));

        let partials: Vec<Result<PairResults>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    let pairs = &pairs;
                    let entities = &entities;
                    let completed = &completed;
                    let cancelled = &cancelled;
                    s.spawn(move || -> Result<PairResults> {
                        let mut out = Vec::new();
                        for idx in (w..total).step_by(workers) {
                            if self.is_cancelled() {
                                cancelled.store(true, Ordering::SeqCst);
                                break;
                            }
                            let (d, r) = pairs[idx];
                            let mut rng = StdRng::seed_from_u64(pair_seed(seed, idx));
                            let result = self.tester.test(
                                &entities[d],
                                &entities[r],
                                range,
                                &mut rng,
                            )?;
                            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                            if let Some(progress) = self.progress {
                                progress(&MatrixProgress {
                                    range,
                                    completed: done,
                                    total,
                                    donor: &entities[d],
                                    recipient: &entities[r],
                                    result,
                                });
                            }
                            out.push(((d, r), result));
                        }
                        Ok(out)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(partial) => partial,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut results = Vec::with_capacity(total);
        for partial in partials {
            results.extend(partial?);
        }

        if cancelled.load(Ordering::SeqCst) {
            let completed = completed.load(Ordering::SeqCst);
            log::warn!("compiling {range}: cancelled after {completed}/{total} pairs");
            return Err(Error::Cancelled { completed, total });
        }

        results.sort_by_key(|&(pair, _)| pair);
        log::info!(
            "compiled {range}: {} significant of {total}",
            results.iter().filter(|(_, r)| r.is_significant()).count()
        );
        Ok((entities, seed, results))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn collect_significant(entities: &[Entity], results: PairResults) -> Vec<SignificantPair> {
    results
        .into_iter()
        .filter_map(|((d, r), result)| match result {
            FavoritismResult::Significant {
                observed_mean,
                threshold_value,
            } => Some(SignificantPair {
                donor: entities[d].clone(),
                recipient: entities[r].clone(),
                observed_mean,
                threshold_value,
            }),
            _ => None,
        })
        .collect()
}

/// SplitMix64 step over `seed` and the pair index, so neighbouring pairs get
/// unrelated generator states.
fn pair_seed(seed: u64, idx: usize) -> u64 {
    let mut z = seed.wrapping_add((idx as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
