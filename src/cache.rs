//! Per-hash store of generated art, filled ahead of display.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::art::{ArtEngine, ArtMetadata};

/// Seam between the cache and the generator.
pub trait Generate {
    fn generate(&self, hash: &str, size: u32) -> Result<ArtMetadata>;
}

impl Generate for ArtEngine {
    fn generate(&self, hash: &str, size: u32) -> Result<ArtMetadata> {
        ArtEngine::generate(self, hash, size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderProgress {
    pub completed: usize,
    pub total: usize,
}

impl RenderProgress {
    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, ArtMetadata>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<&ArtMetadata> {
        self.entries.get(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keeps the first entry stored for a hash.
    pub fn insert(&mut self, art: ArtMetadata) {
        self.entries.entry(art.hash.clone()).or_insert(art);
    }

    /// Generates every hash not already cached, reporting progress after each
    /// input element (cache hits and duplicates included), in input order.
    pub fn pre_render<G, F>(
        &mut self,
        generator: &G,
        hashes: &[String],
        size: u32,
        mut on_progress: F,
    ) -> Result<RenderProgress>
    where
        G: Generate + ?Sized,
        F: FnMut(RenderProgress),
    {
        info!(total = hashes.len(), size, "pre-rendering hashes");
        let mut job = PreRenderJob::new(hashes, size);
        while let Some(progress) = job.step(self, generator)? {
            on_progress(progress);
        }
        info!(
            generated = job.generated(),
            cached = self.len(),
            "pre-render finished"
        );
        Ok(job.progress())
    }
}

/// A pre-render that advances one hash per `step`, so a host loop can yield
/// between items.
#[derive(Debug)]
pub struct PreRenderJob<'a> {
    hashes: &'a [String],
    size: u32,
    next: usize,
    generated: usize,
}

impl<'a> PreRenderJob<'a> {
    pub fn new(hashes: &'a [String], size: u32) -> Self {
        Self {
            hashes,
            size,
            next: 0,
            generated: 0,
        }
    }

    pub fn progress(&self) -> RenderProgress {
        RenderProgress {
            completed: self.next,
            total: self.hashes.len(),
        }
    }

    /// Number of generator calls made so far.
    pub fn generated(&self) -> usize {
        self.generated
    }

    /// Processes the next hash. Returns `None` once every item is done.
    pub fn step<G>(&mut self, cache: &mut ImageCache, generator: &G) -> Result<Option<RenderProgress>>
    where
        G: Generate + ?Sized,
    {
        let Some(hash) = self.hashes.get(self.next) else {
            return Ok(None);
        };

        if !cache.has(hash) {
            let art = generator
                .generate(hash, self.size)
                .with_context(|| format!("failed to generate art for '{hash}'"))?;
            cache.insert(art);
            self.generated += 1;
        } else {
            debug!(hash = hash.as_str(), "cache hit");
        }

        self.next += 1;
        Ok(Some(self.progress()))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::Result;

    use super::{Generate, ImageCache, PreRenderJob, RenderProgress};
    use crate::art::{ArtEngine, ArtMetadata};

    struct CountingGenerator {
        engine: ArtEngine,
        calls: RefCell<Vec<String>>,
    }

    impl Generate for CountingGenerator {
        fn generate(&self, hash: &str, size: u32) -> Result<ArtMetadata> {
            self.calls.borrow_mut().push(hash.to_owned());
            self.engine.generate(hash, size)
        }
    }

    fn counting() -> CountingGenerator {
        CountingGenerator {
            engine: ArtEngine::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn hashes(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn duplicates_generate_once_but_report_every_element() {
        let generator = counting();
        let mut cache = ImageCache::new();
        let mut seen = Vec::new();
        let done = cache
            .pre_render(&generator, &hashes(&["a", "b", "a"]), 16, |p| seen.push(p))
            .expect("pre-render");

        assert_eq!(*generator.calls.borrow(), vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(
            seen.iter().map(|p| p.completed).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(seen.iter().all(|p| p.total == 3));
        assert_eq!(done, RenderProgress { completed: 3, total: 3 });
    }

    #[test]
    fn overlapping_calls_are_idempotent() {
        let generator = counting();
        let mut cache = ImageCache::new();
        cache
            .pre_render(&generator, &hashes(&["a", "b"]), 16, |_| {})
            .expect("first");
        cache
            .pre_render(&generator, &hashes(&["b", "c"]), 16, |_| {})
            .expect("second");
        assert_eq!(generator.calls.borrow().len(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn get_is_absent_before_pre_render() {
        let cache = ImageCache::new();
        assert!(!cache.has("a"));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn job_yields_between_items() {
        let generator = counting();
        let mut cache = ImageCache::new();
        let list = hashes(&["x", "y"]);
        let mut job = PreRenderJob::new(&list, 16);

        let first = job.step(&mut cache, &generator).expect("step").expect("progress");
        assert_eq!(first.completed, 1);
        assert!(cache.has("x") && !cache.has("y"));

        let second = job.step(&mut cache, &generator).expect("step").expect("progress");
        assert!(second.is_done());
        assert!(job.step(&mut cache, &generator).expect("step").is_none());
    }
}
