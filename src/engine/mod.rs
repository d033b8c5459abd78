//! The engine façade.
//!
//! [`RangeEngine`] is the public entry point of the crate: it serves reads
//! and writes straight from the backing source while incrementally
//! discovering the dataset's value range on the side.
//!
//! ```text
//!  read(access) ──► normalize ──► source.read_region ──► data to caller
//!                       │
//!                       ▼
//!                covered / fully-covered? ── yes ──► done
//!                       │ no
//!                       ▼
//!                calc_expansion ──► collapse ──► inline pipeline
//!                                         │            or
//!                                         └──► FIFO queue ──► RangeDaemon
//!                                                                  │
//!                             listeners ◄── aggregate changed ◄────┘
//! ```
//!
//! The engine never caches data; it only tracks which regions have been
//! scanned and what `(min, max)` they produced, so re-reads of known
//! regions cost nothing in bookkeeping.
//!
//! Construction attaches the dataset (the `ACTIVE` state); `destroy`, or
//! dropping the engine, cancels background work and rejects further
//! operations. Callers using the engine from several threads must
//! serialize `read`/`write`/`reset` themselves; all internal store
//! mutation is single-threaded by construction.

mod daemon;
mod error;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use ndarray::ArrayD;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::aggregate::apply_expansions;
use crate::coverage::{CoverageStore, DataRange};
use crate::planner::{calc_expansion, collapse_expansions, Expansion};
use crate::region::{
    bounds_of_access, expand_to_include, AccessSpec, IndexRange, Overlap, SliceRegion, VolumeShape,
};
use crate::source::{SourceError, VolumeSource};

use daemon::UpdateTask;

pub use daemon::RangeDaemon;
pub use error::EngineError;

/// Default capacity of the deferred-mode task queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// When coverage bookkeeping runs relative to the triggering access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Bookkeeping runs on the caller's thread before `read`/`write`
    /// returns. Suits small or in-memory datasets.
    Inline,
    /// Bookkeeping is enqueued for the [`RangeDaemon`]; callers never
    /// block on it. Suits large disk-backed datasets.
    Deferred,
}

/// Dedup key for queued bookkeeping work: the requested unit range plus
/// spatial region. Identical not-yet-started requests collapse onto one
/// queued task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TaskKey {
    units: (usize, usize),
    spatial: Vec<(usize, usize)>,
}

impl TaskKey {
    fn from_region(region: &SliceRegion) -> Self {
        Self {
            units: (region.units.start, region.units.end),
            spatial: region.spatial.iter().map(|r| (r.start, r.end)).collect(),
        }
    }
}

/// Monotonic counters for observing engine behaviour.
#[derive(Debug, Default)]
struct EngineStats {
    planner_runs: AtomicU64,
    empty_plans: AtomicU64,
    covered_skips: AtomicU64,
    tasks_enqueued: AtomicU64,
    tasks_coalesced: AtomicU64,
    pipelines: AtomicU64,
    notifications: AtomicU64,
}

/// A point-in-time copy of the engine's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    /// Times the planner was invoked.
    pub planner_runs: u64,
    /// Planner invocations that produced no expansions.
    pub empty_plans: u64,
    /// Accesses skipped because coverage already contained them.
    pub covered_skips: u64,
    /// Tasks handed to the deferred queue.
    pub tasks_enqueued: u64,
    /// Requests dropped because an identical task was already queued.
    pub tasks_coalesced: u64,
    /// Completed aggregation pipelines (inline or deferred).
    pub pipelines: u64,
    /// Change notifications delivered to listeners.
    pub notifications: u64,
}

type RangeCallback = Box<dyn Fn(DataRange) + Send + Sync>;

/// State shared between the façade and the deferred worker.
pub(crate) struct EngineShared<S: VolumeSource> {
    source: S,
    shape: VolumeShape,
    store: Mutex<CoverageStore>,
    listeners: Mutex<Vec<RangeCallback>>,
    last_error: Mutex<Option<SourceError>>,
    in_flight: DashMap<TaskKey, ()>,
    cancel: CancellationToken,
    stats: EngineStats,
}

impl<S: VolumeSource> EngineShared<S> {
    /// Run the full update pipeline for an access region: skip when
    /// coverage already contains it, otherwise plan, collapse and apply.
    ///
    /// Planning happens here, against the coverage current at execution
    /// time, so deferred tasks queued behind one another never apply a
    /// plan made against state that has since moved.
    fn run_update(&self, region: &SliceRegion) {
        let expansions = {
            let store = self.store.lock().expect("coverage store lock poisoned");
            if store.covered() || store.is_fully_covered(region) {
                self.stats.covered_skips.fetch_add(1, Ordering::Relaxed);
                return;
            }
            self.stats.planner_runs.fetch_add(1, Ordering::Relaxed);
            let planned = calc_expansion(region, &store);
            if planned.is_empty() {
                self.stats.empty_plans.fetch_add(1, Ordering::Relaxed);
                return;
            }
            collapse_expansions(planned)
        };
        self.run_pipeline(&expansions);
    }

    /// Run one aggregation pipeline and notify listeners when the
    /// aggregate range moved. Exactly one notification per changed run.
    fn run_pipeline(&self, expansions: &[Expansion]) {
        let changed_to = {
            let mut store = self.store.lock().expect("coverage store lock poisoned");
            let outcome = apply_expansions(&mut store, expansions, &self.source);
            if let Some(error) = outcome.error {
                warn!(error = %error, "bookkeeping expansion failed");
                *self.last_error.lock().expect("error slot lock poisoned") = Some(error);
            }
            if outcome.changed {
                store.aggregate()
            } else {
                None
            }
        };
        self.stats.pipelines.fetch_add(1, Ordering::Relaxed);
        if let Some(range) = changed_to {
            self.notify(range);
        }
    }

    fn notify(&self, range: DataRange) {
        self.stats.notifications.fetch_add(1, Ordering::Relaxed);
        debug!(range = %range, "data range changed");
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        for listener in listeners.iter() {
            listener(range);
        }
    }
}

/// Incremental data-range tracker for one N-dimensional dataset.
///
/// See the [module docs](self) for the data flow. The engine exclusively
/// owns its coverage store; the backing source is only ever read from or
/// written to.
pub struct RangeEngine<S: VolumeSource> {
    shared: Arc<EngineShared<S>>,
    mode: UpdateMode,
    queue: Option<mpsc::Sender<UpdateTask>>,
}

impl<S: VolumeSource> RangeEngine<S> {
    /// Attach a dataset with inline (synchronous) bookkeeping.
    ///
    /// The aggregate range is seeded from the source's calibration hint,
    /// when it offers one.
    pub fn new(source: S) -> Result<Self, EngineError> {
        let (engine, _) = Self::build(source, UpdateMode::Inline, 0)?;
        Ok(engine)
    }

    /// Attach a dataset with deferred (background-queued) bookkeeping.
    ///
    /// Returns the engine and its worker; spawn the worker on a tokio
    /// runtime:
    ///
    /// ```ignore
    /// let (engine, daemon) = RangeEngine::deferred(source)?;
    /// tokio::spawn(daemon.run());
    /// ```
    pub fn deferred(source: S) -> Result<(Self, RangeDaemon<S>), EngineError> {
        let (engine, daemon) = Self::build(source, UpdateMode::Deferred, DEFAULT_QUEUE_CAPACITY)?;
        Ok((engine, daemon.expect("deferred build always yields a daemon")))
    }

    fn build(
        source: S,
        mode: UpdateMode,
        capacity: usize,
    ) -> Result<(Self, Option<RangeDaemon<S>>), EngineError> {
        let shape = VolumeShape::new(&source.shape())?;
        let hint = source.calibration_hint();
        let store = CoverageStore::new(shape.clone(), hint);
        let shared = Arc::new(EngineShared {
            source,
            shape,
            store: Mutex::new(store),
            listeners: Mutex::new(Vec::new()),
            last_error: Mutex::new(None),
            in_flight: DashMap::new(),
            cancel: CancellationToken::new(),
            stats: EngineStats::default(),
        });

        let (queue, daemon) = match mode {
            UpdateMode::Inline => (None, None),
            UpdateMode::Deferred => {
                let (tx, rx) = mpsc::channel(capacity);
                (Some(tx), Some(RangeDaemon::new(Arc::clone(&shared), rx)))
            }
        };
        Ok((
            Self {
                shared,
                mode,
                queue,
            },
            daemon,
        ))
    }

    /// The scheduling mode selected at construction.
    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// The normalized shape of the attached dataset.
    pub fn shape(&self) -> &VolumeShape {
        &self.shared.shape
    }

    /// Read the requested data, updating range bookkeeping on the side.
    ///
    /// The data always comes straight from the backing source and is
    /// returned immediately whether bookkeeping runs inline or deferred.
    /// Source failures of this directly-requested read propagate;
    /// bookkeeping failures never do.
    pub fn read(&self, access: &[AccessSpec]) -> Result<ArrayD<f64>, EngineError> {
        self.ensure_active()?;
        let region = bounds_of_access(access, &self.shared.shape)?;
        let full = self.shared.shape.full_ranges(&region.spatial, region.units);
        let data = self.shared.source.read_region(&full)?;
        self.update_range(&region);
        Ok(data)
    }

    /// Write `values` through to the backing source and repair range
    /// bookkeeping.
    ///
    /// `values` must match the full-shape footprint of the access, padding
    /// axes included. A write that overlaps existing coverage invalidates
    /// every touched unit and rescans each unit's enclosing rectangle
    /// (prior coverage united with the write region): the old extremum
    /// may have lived exactly under the overwrite, so nothing narrower is
    /// safe. A write with no overlap books like a first-time read.
    pub fn write(&self, access: &[AccessSpec], values: &ArrayD<f64>) -> Result<(), EngineError> {
        self.ensure_active()?;
        let region = bounds_of_access(access, &self.shared.shape)?;
        let full = self.shared.shape.full_ranges(&region.spatial, region.units);
        self.shared.source.write_region(&full, values)?;
        if region.is_empty() {
            return Ok(());
        }

        let overlap = {
            let store = self.shared.store.lock().expect("coverage store lock poisoned");
            store.classify_overlap(&region)
        };
        debug!(region = %region, ?overlap, "write-through complete");

        match overlap {
            Overlap::None => self.update_range(&region),
            Overlap::Partial | Overlap::Full => match self.mode {
                UpdateMode::Inline => {
                    // One pipeline run for the whole write, one notification.
                    let expansions = {
                        let mut store =
                            self.shared.store.lock().expect("coverage store lock poisoned");
                        let rescans = region
                            .units
                            .iter()
                            .map(|unit| Expansion {
                                units: IndexRange::new(unit, unit + 1),
                                spatial: expand_to_include(
                                    store.unit_coverage_ref(unit),
                                    &region.spatial,
                                ),
                            })
                            .collect();
                        store.invalidate_units(region.units);
                        collapse_expansions(rescans)
                    };
                    self.shared.run_pipeline(&expansions);
                }
                UpdateMode::Deferred => {
                    // Capture each unit's enclosing rectangle before the
                    // invalidation erases the coverage it derives from;
                    // the worker re-plans each rectangle when it runs.
                    let rescans: Vec<SliceRegion> = {
                        let mut store =
                            self.shared.store.lock().expect("coverage store lock poisoned");
                        let rescans = region
                            .units
                            .iter()
                            .map(|unit| {
                                SliceRegion::new(
                                    expand_to_include(
                                        store.unit_coverage_ref(unit),
                                        &region.spatial,
                                    ),
                                    IndexRange::new(unit, unit + 1),
                                )
                            })
                            .collect();
                        store.invalidate_units(region.units);
                        rescans
                    };
                    for rescan in rescans {
                        self.enqueue(TaskKey::from_region(&rescan), rescan);
                    }
                }
            },
        }
        Ok(())
    }

    /// Drop all coverage knowledge, optionally reseeding the aggregate.
    ///
    /// Pass a hint when a previously-computed range is known to be valid
    /// (it will only ever be widened); pass `None` to force full
    /// re-derivation.
    pub fn reset(&self, hint: Option<DataRange>) -> Result<(), EngineError> {
        self.ensure_active()?;
        self.shared.in_flight.clear();
        self.shared
            .store
            .lock()
            .expect("coverage store lock poisoned")
            .reset(hint);
        *self.shared.last_error.lock().expect("error slot lock poisoned") = None;
        Ok(())
    }

    /// Best-current-knowledge dataset range: everything scanned so far,
    /// united with the calibration hint. `None` until either exists.
    pub fn data_range(&self) -> Option<DataRange> {
        self.shared
            .store
            .lock()
            .expect("coverage store lock poisoned")
            .aggregate()
    }

    /// True once every unit has been scanned in full: no further
    /// bookkeeping reads will ever be needed.
    pub fn covered(&self) -> bool {
        self.shared
            .store
            .lock()
            .expect("coverage store lock poisoned")
            .covered()
    }

    /// One unit's scanned region, for diagnostics and tests.
    pub fn coverage(&self, unit: usize) -> Option<Vec<IndexRange>> {
        self.shared
            .store
            .lock()
            .expect("coverage store lock poisoned")
            .unit_coverage(unit)
    }

    /// One unit's known `(min, max)`, for diagnostics and tests.
    pub fn unit_range(&self, unit: usize) -> Option<DataRange> {
        self.shared
            .store
            .lock()
            .expect("coverage store lock poisoned")
            .unit_range(unit)
    }

    /// Register a callback invoked with the new `(min, max)` whenever the
    /// aggregate range changes. One invocation per changed pipeline run.
    pub fn on_range_changed<F>(&self, callback: F)
    where
        F: Fn(DataRange) + Send + Sync + 'static,
    {
        self.shared
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .push(Box::new(callback));
    }

    /// The most recent bookkeeping failure, if any. Failed bookkeeping
    /// leaves coverage conservatively unknown and the engine fully usable.
    pub fn last_error(&self) -> Option<String> {
        self.shared
            .last_error
            .lock()
            .expect("error slot lock poisoned")
            .as_ref()
            .map(|error| error.to_string())
    }

    /// Counter snapshot for instrumentation and tests.
    pub fn stats(&self) -> EngineStatsSnapshot {
        let stats = &self.shared.stats;
        EngineStatsSnapshot {
            planner_runs: stats.planner_runs.load(Ordering::Relaxed),
            empty_plans: stats.empty_plans.load(Ordering::Relaxed),
            covered_skips: stats.covered_skips.load(Ordering::Relaxed),
            tasks_enqueued: stats.tasks_enqueued.load(Ordering::Relaxed),
            tasks_coalesced: stats.tasks_coalesced.load(Ordering::Relaxed),
            pipelines: stats.pipelines.load(Ordering::Relaxed),
            notifications: stats.notifications.load(Ordering::Relaxed),
        }
    }

    /// Tear the engine down: cancel queued and in-flight background work
    /// and reject all further operations. Dropping the engine does the
    /// same.
    pub fn destroy(&self) {
        self.shared.cancel.cancel();
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        if self.shared.cancel.is_cancelled() {
            return Err(EngineError::Destroyed);
        }
        Ok(())
    }

    /// Route bookkeeping for an access region: inline runs the pipeline
    /// on the caller's thread, deferred hands the region to the worker.
    fn update_range(&self, region: &SliceRegion) {
        if region.is_empty() {
            return;
        }
        match self.mode {
            UpdateMode::Inline => self.shared.run_update(region),
            UpdateMode::Deferred => {
                // Cheap pre-check keeps known regions out of the queue;
                // the worker re-checks before doing any work.
                {
                    let store = self.shared.store.lock().expect("coverage store lock poisoned");
                    if store.covered() || store.is_fully_covered(region) {
                        self.shared.stats.covered_skips.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                }
                self.enqueue(TaskKey::from_region(region), region.clone());
            }
        }
    }

    /// Queue one region for the worker, deduplicating identical
    /// not-yet-started requests.
    fn enqueue(&self, key: TaskKey, region: SliceRegion) {
        let stats = &self.shared.stats;
        match self.shared.in_flight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                stats.tasks_coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = ?key, "identical update already queued; coalescing");
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(());
                let queue = self.queue.as_ref().expect("deferred engine has a queue");
                match queue.try_send(UpdateTask {
                    key: key.clone(),
                    region,
                }) {
                    Ok(()) => {
                        stats.tasks_enqueued.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(error) => {
                        // Queue full or daemon gone: coverage simply
                        // stays conservative for this region.
                        self.shared.in_flight.remove(&key);
                        warn!(key = ?key, error = %error, "dropping range update task");
                    }
                }
            }
        }
    }
}

impl<S: VolumeSource> Drop for RangeEngine<S> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use ndarray::IxDyn;
    use std::sync::atomic::AtomicUsize;

    fn r(start: usize, end: usize) -> IndexRange {
        IndexRange::new(start, end)
    }

    /// 4x4x3 dataset; value at (x, y, u) is u*100 + x*4 + y.
    fn source() -> MemorySource {
        let mut values = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                for unit in 0..3usize {
                    values.push((unit * 100 + x * 4 + y) as f64);
                }
            }
        }
        MemorySource::new(ArrayD::from_shape_vec(IxDyn(&[4, 4, 3]), values).unwrap())
    }

    fn engine() -> RangeEngine<MemorySource> {
        RangeEngine::new(source()).unwrap()
    }

    #[test]
    fn test_read_returns_requested_data() {
        let engine = engine();
        let data = engine
            .read(&[AccessSpec::Index(1), AccessSpec::Index(2), AccessSpec::Index(0)])
            .unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.iter().next().copied(), Some(6.0));
    }

    #[test]
    fn test_read_tracks_range_of_touched_unit() {
        let engine = engine();
        engine
            .read(&[AccessSpec::All, AccessSpec::All, AccessSpec::Index(1)])
            .unwrap();
        assert_eq!(engine.data_range(), Some(DataRange::new(100.0, 115.0)));
        assert_eq!(engine.coverage(1), Some(vec![r(0, 4), r(0, 4)]));
        assert!(engine.coverage(0).is_none());
        assert!(!engine.covered());
    }

    #[test]
    fn test_reading_everything_sets_covered() {
        let engine = engine();
        engine
            .read(&[AccessSpec::All, AccessSpec::All, AccessSpec::All])
            .unwrap();
        assert!(engine.covered());
        assert_eq!(engine.data_range(), Some(DataRange::new(0.0, 215.0)));
    }

    #[test]
    fn test_repeat_read_is_free() {
        let engine = engine();
        let access = [AccessSpec::All, AccessSpec::All, AccessSpec::Index(0)];
        engine.read(&access).unwrap();
        let before = engine.stats();

        engine.read(&access).unwrap();
        let after = engine.stats();
        assert_eq!(after.planner_runs, before.planner_runs);
        assert_eq!(after.covered_skips, before.covered_skips + 1);
        assert_eq!(after.pipelines, before.pipelines);
    }

    #[test]
    fn test_hint_seeds_and_widens() {
        let source = source().with_hint(DataRange::new(-50.0, 10.0));
        let engine = RangeEngine::new(source).unwrap();
        assert_eq!(engine.data_range(), Some(DataRange::new(-50.0, 10.0)));

        engine
            .read(&[AccessSpec::All, AccessSpec::All, AccessSpec::Index(2)])
            .unwrap();
        // The hint's low end survives; the high end widens to the data.
        assert_eq!(engine.data_range(), Some(DataRange::new(-50.0, 215.0)));
    }

    #[test]
    fn test_notification_fires_once_per_change() {
        let engine = engine();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));
        {
            let fired = Arc::clone(&fired);
            let seen = Arc::clone(&seen);
            engine.on_range_changed(move |range| {
                fired.fetch_add(1, Ordering::SeqCst);
                *seen.lock().unwrap() = Some(range);
            });
        }

        let access = [AccessSpec::All, AccessSpec::All, AccessSpec::Index(0)];
        engine.read(&access).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), Some(DataRange::new(0.0, 15.0)));

        // Covered region again: no pipeline, no notification.
        engine.read(&access).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_access_rejected_before_io() {
        let engine = engine();
        assert!(matches!(
            engine.read(&[AccessSpec::Index(7), AccessSpec::All, AccessSpec::All]),
            Err(EngineError::Access(_))
        ));
        assert!(matches!(
            engine.read(&[AccessSpec::All, AccessSpec::All]),
            Err(EngineError::Access(_))
        ));
    }

    #[test]
    fn test_write_without_overlap_books_like_a_read() {
        let engine = engine();
        let values = ArrayD::from_shape_vec(IxDyn(&[2, 2, 1]), vec![500.0; 4]).unwrap();
        engine
            .write(
                &[AccessSpec::Range(0, 2), AccessSpec::Range(0, 2), AccessSpec::Index(0)],
                &values,
            )
            .unwrap();
        // Coverage is exactly the written rectangle, not the whole unit.
        assert_eq!(engine.coverage(0), Some(vec![r(0, 2), r(0, 2)]));
        assert_eq!(engine.data_range(), Some(DataRange::new(500.0, 500.0)));
    }

    #[test]
    fn test_write_with_overlap_rescans_enclosing_rectangle() {
        let engine = engine();
        engine
            .read(&[AccessSpec::All, AccessSpec::All, AccessSpec::Index(0)])
            .unwrap();
        assert_eq!(engine.data_range(), Some(DataRange::new(0.0, 15.0)));

        // Overwrite the cell that held the unit's maximum with a low value.
        let values = ArrayD::from_shape_vec(IxDyn(&[1, 1, 1]), vec![-9.0]).unwrap();
        engine
            .write(
                &[AccessSpec::Index(3), AccessSpec::Index(3), AccessSpec::Index(0)],
                &values,
            )
            .unwrap();

        // The old maximum is gone and the range reflects the re-scan of
        // the full enclosing rectangle.
        assert_eq!(engine.data_range(), Some(DataRange::new(-9.0, 14.0)));
        assert_eq!(engine.coverage(0), Some(vec![r(0, 4), r(0, 4)]));
    }

    #[test]
    fn test_write_raises_max_without_subsequent_read() {
        let engine = engine();
        engine
            .read(&[AccessSpec::All, AccessSpec::All, AccessSpec::All])
            .unwrap();
        assert!(engine.covered());

        let values = ArrayD::from_shape_vec(IxDyn(&[1, 1, 1]), vec![9000.0]).unwrap();
        engine
            .write(
                &[AccessSpec::Index(0), AccessSpec::Index(0), AccessSpec::Index(1)],
                &values,
            )
            .unwrap();
        assert_eq!(engine.data_range(), Some(DataRange::new(0.0, 9000.0)));
        // The rescan restores full coverage of the touched unit.
        assert!(engine.covered());
    }

    #[test]
    fn test_reset_forces_rederivation() {
        let engine = engine();
        engine
            .read(&[AccessSpec::All, AccessSpec::All, AccessSpec::All])
            .unwrap();
        assert!(engine.covered());

        engine.reset(None).unwrap();
        assert!(!engine.covered());
        assert_eq!(engine.data_range(), None);
        assert!(engine.coverage(0).is_none());
    }

    #[test]
    fn test_destroyed_engine_rejects_operations() {
        let engine = engine();
        engine.destroy();
        assert!(matches!(
            engine.read(&[AccessSpec::All, AccessSpec::All, AccessSpec::All]),
            Err(EngineError::Destroyed)
        ));
        assert!(matches!(engine.reset(None), Err(EngineError::Destroyed)));
    }

    #[test]
    fn test_bookkeeping_failure_is_recorded_not_raised() {
        /// Fails every read after the first, so the directly-requested
        /// read succeeds and the bookkeeping expansion read fails.
        struct FlakySource {
            inner: MemorySource,
            reads: AtomicUsize,
        }
        impl VolumeSource for FlakySource {
            fn shape(&self) -> Vec<usize> {
                self.inner.shape()
            }
            fn dtype(&self) -> crate::source::DtypeKind {
                self.inner.dtype()
            }
            fn read_region(&self, region: &[IndexRange]) -> Result<ArrayD<f64>, SourceError> {
                if self.reads.fetch_add(1, Ordering::SeqCst) > 0 {
                    return Err(SourceError::Failed("flaky storage".into()));
                }
                self.inner.read_region(region)
            }
        }

        let engine = RangeEngine::new(FlakySource {
            inner: source(),
            reads: AtomicUsize::new(0),
        })
        .unwrap();

        // The caller still gets their data even though the bookkeeping
        // expansion read behind it failed.
        let data = engine
            .read(&[AccessSpec::All, AccessSpec::All, AccessSpec::Index(0)])
            .unwrap();
        assert_eq!(data.len(), 16);

        // Coverage stayed conservatively unknown and the failure is
        // visible on the engine for diagnostics.
        assert!(engine.coverage(0).is_none());
        assert_eq!(engine.data_range(), None);
        assert!(engine.last_error().unwrap().contains("flaky storage"));

        // The directly-requested read now fails too: that one propagates.
        assert!(matches!(
            engine.read(&[AccessSpec::All, AccessSpec::All, AccessSpec::Index(1)]),
            Err(EngineError::Source(_))
        ));
    }
}
