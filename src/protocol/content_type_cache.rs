use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Bounded memo of content-type parse results.
///
/// Once `capacity` distinct keys are held, inserting another evicts the
/// oldest inserted key. Lookups do not refresh an entry's position.
#[derive(Debug)]
pub struct ContentTypeCache<V> {
    inner: Mutex<CacheInner<V>>,
}

#[derive(Debug)]
struct CacheInner<V> {
    capacity: usize,
    entries: HashMap<String, V>,
    order: VecDeque<String>,
}

impl<V: Clone> ContentTypeCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                capacity,
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with(&self, key: &str, compute: impl FnOnce(&str) -> V) -> V {
        let Ok(mut inner) = self.inner.lock() else {
            return compute(key);
        };

        if let Some(value) = inner.entries.get(key) {
            return value.clone();
        }

        let value = compute(key);
        if inner.capacity == 0 {
            return value;
        }

        while inner.entries.len() >= inner.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        inner.entries.insert(key.to_owned(), value.clone());
        inner.order.push_back(key.to_owned());
        value
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
