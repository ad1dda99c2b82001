// SPDX: CC0-1.0

//! Per-function caches: quantized `(y, dy)` samples with strict LRU
//! eviction, and the last curve set keyed by viewport, view state and
//! sampler settings.

use crate::{
    sample::{Curve, SamplerConfig},
    transform::TransformSnapshot,
    Number, Rect,
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub const NORMAL_CAPACITY: usize = 5000;
pub const HARD_CAPACITY: usize = 10000;

/// Decimal digits kept in a cache key.
pub const QUANTIZE_DIGITS: i32 = 6;

/// Value and derivative at one x. Either may be NaN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub y: Number,
    pub dy: Number,
}

impl Sample {
    pub const NAN: Self = Self {
        y: Number::NAN,
        dy: Number::NAN,
    };
}

/// Anything that can produce a [`Sample`]; must collapse failures to NaN.
pub trait Evaluator {
    fn sample(&self, x: Number) -> Sample;
}

impl<F: Fn(Number) -> Sample> Evaluator for F {
    fn sample(&self, x: Number) -> Sample {
        self(x)
    }
}

/// `x` rounded to [`QUANTIZE_DIGITS`] decimals, as an integer key.
pub fn quantize(x: Number) -> i64 {
    // saturating cast; NaN maps to 0
    (x * 10f64.powi(QUANTIZE_DIGITS)).round() as i64
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct Lru {
    capacity: usize,
    tick: u64,
    entries: HashMap<i64, (Sample, u64)>,
    order: BTreeMap<u64, i64>, // last touch -> key
}

impl Lru {
    fn touch(&mut self, key: i64) -> Option<Sample> {
        let tick = self.tick;
        let (sample, last) = self.entries.get_mut(&key)?;
        self.order.remove(&*last);
        *last = tick;
        self.order.insert(tick, key);
        self.tick += 1;
        Some(*sample)
    }

    fn insert(&mut self, key: i64, sample: Sample) {
        if self.touch(key).is_some() {
            if let Some((old, _)) = self.entries.get_mut(&key) {
                *old = sample;
            }
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.entries.remove(&oldest);
                log::trace!("evicted sample {oldest}");
            }
        }
        self.entries.insert(key, (sample, self.tick));
        self.order.insert(self.tick, key);
        self.tick += 1;
    }
}

/// Bounded, lock-guarded sample cache.
#[derive(Debug)]
pub struct EvalCache {
    inner: Mutex<Lru>,
}

impl EvalCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru {
                capacity: capacity.max(1),
                tick: 0,
                entries: HashMap::new(),
                order: BTreeMap::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        lock(&self.inner).capacity
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, x: Number) -> bool {
        lock(&self.inner).entries.contains_key(&quantize(x))
    }

    /// Look up `x`, marking it most recently used.
    pub fn get(&self, x: Number) -> Option<Sample> {
        lock(&self.inner).touch(quantize(x))
    }

    pub fn put(&self, x: Number, sample: Sample) {
        lock(&self.inner).insert(quantize(x), sample);
    }

    /// Cached sample at `x`, evaluating `eval` on a miss.
    ///
    /// The lock is not held while evaluating; a concurrent miss on the same
    /// key evaluates twice and the later write wins.
    pub fn get_or_eval(&self, x: Number, eval: &impl Evaluator) -> Sample {
        if let Some(hit) = self.get(x) {
            return hit;
        }
        let sample = eval.sample(x);
        self.put(x, sample);
        sample
    }

    pub fn clear(&self) {
        let mut lru = lock(&self.inner);
        lru.entries.clear();
        lru.order.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveKey {
    pub rect: Rect,
    pub transform: TransformSnapshot,
    pub config: SamplerConfig,
}

/// Single slot holding the last computed curves of one function.
#[derive(Debug, Default)]
pub struct CurveCache {
    slot: Mutex<Option<(CurveKey, Arc<[Curve]>)>>,
}

impl CurveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CurveKey) -> Option<Arc<[Curve]>> {
        match &*lock(&self.slot) {
            Some((stored, curves)) if stored == key => Some(Arc::clone(curves)),
            _ => None,
        }
    }

    /// Replace the slot wholesale.
    pub fn set(&self, key: CurveKey, curves: Arc<[Curve]>) {
        *lock(&self.slot) = Some((key, curves));
    }

    pub fn clear(&self) {
        *lock(&self.slot) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    impl Evaluator for Counting {
        fn sample(&self, x: Number) -> Sample {
            self.0.fetch_add(1, Ordering::SeqCst);
            Sample { y: x * x, dy: 2.0 * x }
        }
    }

    #[test]
    fn repeated_lookups_evaluate_once() {
        let cache = EvalCache::new(16);
        let eval = Counting(AtomicUsize::new(0));
        let a = cache.get_or_eval(1.5, &eval);
        let b = cache.get_or_eval(1.5, &eval);
        assert_eq!(a, b);
        assert_eq!(eval.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn quantization_boundary() {
        assert_eq!(quantize(1.0), quantize(1.0 + 1e-7));
        assert_ne!(quantize(1.0), quantize(1.0 + 1e-5));

        let cache = EvalCache::new(16);
        let eval = Counting(AtomicUsize::new(0));
        cache.get_or_eval(2.0, &eval);
        cache.get_or_eval(2.0 + 1e-7, &eval);
        assert_eq!(eval.0.load(Ordering::SeqCst), 1);
        cache.get_or_eval(2.0 + 1e-5, &eval);
        assert_eq!(eval.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn evicts_least_recently_inserted() {
        let cache = EvalCache::new(3);
        for x in [1.0, 2.0, 3.0] {
            cache.put(x, Sample::NAN);
        }
        cache.put(4.0, Sample::NAN);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(1.0));
        for x in [2.0, 3.0, 4.0] {
            assert!(cache.contains(x));
        }
    }

    #[test]
    fn touching_protects_from_eviction() {
        let cache = EvalCache::new(3);
        for x in [1.0, 2.0, 3.0] {
            cache.put(x, Sample::NAN);
        }
        assert!(cache.get(1.0).is_some());
        cache.put(4.0, Sample::NAN);
        assert!(cache.contains(1.0));
        assert!(!cache.contains(2.0));
    }

    #[test]
    fn overwrite_does_not_grow() {
        let cache = EvalCache::new(2);
        cache.put(1.0, Sample { y: 1.0, dy: 0.0 });
        cache.put(1.0, Sample { y: 2.0, dy: 0.0 });
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1.0).map(|s| s.y), Some(2.0));
    }

    #[test]
    fn concurrent_access_keeps_capacity() {
        let cache = EvalCache::new(100);
        std::thread::scope(|s| {
            for t in 0..4 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..1000 {
                        let x = Number::from(t * 1000 + i) * 0.01;
                        cache.get_or_eval(x, &|x: Number| Sample { y: x, dy: 1.0 });
                    }
                });
            }
        });
        assert_eq!(cache.len(), 100);
    }

    #[test]
    fn curve_slot_matches_on_key() {
        let cache = CurveCache::new();
        let key = CurveKey {
            rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            transform: TransformSnapshot {
                offset: Point::ZERO,
                scale: 1.0,
                unit: 1.0,
            },
            config: SamplerConfig::default(),
        };
        assert!(cache.get(&key).is_none());
        let curves: Arc<[Curve]> = Arc::from(Vec::new());
        cache.set(key, Arc::clone(&curves));
        assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &curves));

        let moved = CurveKey {
            transform: TransformSnapshot {
                scale: 2.0,
                ..key.transform
            },
            ..key
        };
        assert!(cache.get(&moved).is_none());

        let retuned = CurveKey {
            config: SamplerConfig {
                derivative_jump: 10.0,
                ..key.config
            },
            ..key
        };
        assert!(cache.get(&retuned).is_none());
    }
}
