//! Memoized, read-only views over the state tree.
//!
//! A [`Selector`] caches its last `(state, value)` pair and recomputes only
//! when handed a different root `Arc<State>`; contents are never compared.
//! Combined selectors additionally compare their dependencies' outputs by
//! reference and rerun the combiner only when one of them changed.
//!
//! # Example
//!
//! ```ignore
//! let features = Arc::new(Selector::region("features", |s| Arc::clone(&s.selections)));
//! let count = Selector::combine("count", (features,), |(selections,)| {
//!     selections.features.len()
//! });
//! let n = count.select(&store.get_state());
//! ```

mod standard;

pub use standard::{QuoteSummary, Selectors, ValidationIssue};

use crate::state::State;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Compute<T> = Box<dyn Fn(&Arc<State>) -> Arc<T> + Send + Sync>;

/// A memoized derivation `state -> T`.
pub struct Selector<T> {
    name: &'static str,
    compute: Compute<T>,
    memo: Mutex<Option<(Arc<State>, Arc<T>)>>,
    recomputations: Arc<AtomicU64>,
}

impl<T: Send + Sync + 'static> Selector<T> {
    /// Selector over a pure function of the state.
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&State) -> T + Send + Sync + 'static,
    {
        let recomputations = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&recomputations);
        let compute = move |state: &Arc<State>| {
            counter.fetch_add(1, Ordering::Relaxed);
            Arc::new(f(state))
        };
        Self::from_parts(name, Box::new(compute), recomputations)
    }

    /// Selector returning an existing sub-tree of the state.
    ///
    /// The output keeps the sub-tree's identity, so combined selectors that
    /// depend on it only rerun when the region was actually replaced.
    pub fn region<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&State) -> Arc<T> + Send + Sync + 'static,
    {
        let recomputations = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&recomputations);
        let compute = move |state: &Arc<State>| {
            counter.fetch_add(1, Ordering::Relaxed);
            f(state)
        };
        Self::from_parts(name, Box::new(compute), recomputations)
    }

    /// Selector derived from other selectors' outputs.
    pub fn combine<D, F>(name: &'static str, deps: D, combiner: F) -> Self
    where
        D: Dependencies,
        F: Fn(&D::Values) -> T + Send + Sync + 'static,
    {
        let recomputations = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&recomputations);
        let last: Mutex<Option<(D::Values, Arc<T>)>> = Mutex::new(None);

        let compute = move |state: &Arc<State>| {
            let values = deps.select(state);
            let mut last = last.lock();
            if let Some((previous, output)) = last.as_ref() {
                if D::unchanged(previous, &values) {
                    return Arc::clone(output);
                }
            }
            counter.fetch_add(1, Ordering::Relaxed);
            let output = Arc::new(combiner(&values));
            *last = Some((values, Arc::clone(&output)));
            output
        };
        Self::from_parts(name, Box::new(compute), recomputations)
    }

    fn from_parts(name: &'static str, compute: Compute<T>, recomputations: Arc<AtomicU64>) -> Self {
        Self {
            name,
            compute,
            memo: Mutex::new(None),
            recomputations,
        }
    }

    /// Value for `state`, from the memo when `state` is the last root seen.
    pub fn select(&self, state: &Arc<State>) -> Arc<T> {
        let mut memo = self.memo.lock();
        if let Some((last_state, value)) = memo.as_ref() {
            if Arc::ptr_eq(last_state, state) {
                return Arc::clone(value);
            }
        }
        let value = (self.compute)(state);
        *memo = Some((Arc::clone(state), Arc::clone(&value)));
        value
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// How many times the derivation itself has run.
    pub fn recomputations(&self) -> u64 {
        self.recomputations.load(Ordering::Relaxed)
    }

    /// Drop the memo (the next call recomputes from the root).
    pub fn reset(&self) {
        *self.memo.lock() = None;
    }
}

impl<T> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("name", &self.name)
            .field("recomputations", &self.recomputations.load(Ordering::Relaxed))
            .finish()
    }
}

/// A tuple of selectors a combined selector reads from.
pub trait Dependencies: Send + Sync + 'static {
    /// The tuple of dependency outputs handed to the combiner.
    type Values: Send + 'static;

    fn select(&self, state: &Arc<State>) -> Self::Values;

    /// True when every output is reference-identical.
    fn unchanged(previous: &Self::Values, current: &Self::Values) -> bool;
}

macro_rules! impl_dependencies {
    ($($ty:ident : $idx:tt),+) => {
        impl<$($ty: Send + Sync + 'static),+> Dependencies for ($(Arc<Selector<$ty>>,)+) {
            type Values = ($(Arc<$ty>,)+);

            fn select(&self, state: &Arc<State>) -> Self::Values {
                ($(self.$idx.select(state),)+)
            }

            fn unchanged(previous: &Self::Values, current: &Self::Values) -> bool {
                true $(&& Arc::ptr_eq(&previous.$idx, &current.$idx))+
            }
        }
    };
}

impl_dependencies!(A: 0);
impl_dependencies!(A: 0, B: 1);
impl_dependencies!(A: 0, B: 1, C: 2);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3, E: 4);
