//! Glyph cache
//!
//! Maps `(font, character)` to a rendered glyph with least-recently-used
//! eviction. The cache may be private to one session or shared by several
//! through an `Arc`. All bookkeeping sits behind one mutex that is held only
//! for lookup, insert and evict; rasterization runs outside it, so two threads
//! missing on the same key may both render, and the last insert wins.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ui::font::{FontId, Glyph};

/// Cache key
pub type GlyphKey = (FontId, char);

/// Lookup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheInner {
    entries: HashMap<GlyphKey, Arc<Glyph>>,
    /// Usage order, least recently used first
    order: VecDeque<GlyphKey>,
    stats: CacheStats,
}

impl CacheInner {
    fn touch(&mut self, key: GlyphKey) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key);
    }
}

/// Bounded LRU store of rendered glyphs
pub struct GlyphCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl GlyphCache {
    /// Create a cache holding at most `capacity` glyphs; 0 disables caching
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `(font, ch)` is cached, without touching its usage
    pub fn contains(&self, font: FontId, ch: char) -> bool {
        self.lock().entries.contains_key(&(font, ch))
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Return the cached glyph, or render, insert and return it.
    ///
    /// `render` is called without the cache lock held. A `None` from it is
    /// passed through and nothing is cached.
    pub fn get_or_render<F>(&self, font: FontId, ch: char, render: F) -> Option<Arc<Glyph>>
    where
        F: FnOnce(FontId, char) -> Option<Glyph>,
    {
        let key = (font, ch);

        {
            let mut inner = self.lock();
            if let Some(glyph) = inner.entries.get(&key).cloned() {
                inner.touch(key);
                inner.stats.hits += 1;
                return Some(glyph);
            }
            inner.stats.misses += 1;
        }

        let glyph = Arc::new(render(font, ch)?);
        if self.capacity == 0 {
            return Some(glyph);
        }

        let mut inner = self.lock();
        // A concurrent miss may have inserted the same key meanwhile; the
        // content is identical, so overwrite it.
        inner.entries.insert(key, Arc::clone(&glyph));
        inner.touch(key);

        // The new key sits at the back of `order`, so it is never the victim
        while inner.entries.len() > self.capacity {
            let Some(victim) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&victim);
            inner.stats.evictions += 1;
            tracing::trace!("Evicted glyph {:?} from font {}", victim.1, victim.0);
        }

        Some(glyph)
    }

    /// Drop every glyph of `font`, returning how many were removed
    pub fn invalidate_font(&self, font: FontId) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|(f, _), _| *f != font);
        inner.order.retain(|(f, _)| *f != font);
        before - inner.entries.len()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl std::fmt::Debug for GlyphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
