//! Bounded in-memory cache of raw model replies.
//!
//! Identical requests (same images, same resolved options) reuse the reply
//! from an earlier upstream call instead of paying for another one. Backed by
//! a bounded moka cache: entries expire after a TTL and are evicted once the
//! cache is full. Concurrent misses for one key share a single upstream call.

use crate::image::EncodedImage;
use crate::models::GenerationOptions;
use crate::{Error, Result};
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Deterministic cache key for one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(
        images: &[EncodedImage],
        options: &GenerationOptions,
        max_output_tokens: u32,
    ) -> Self {
        let mut hasher = Sha256::new();

        write_field(&mut hasher, &(images.len() as u64).to_le_bytes());
        for image in images {
            write_field(&mut hasher, image.mime_type.as_bytes());
            write_field(&mut hasher, image.base64.as_bytes());
        }
        write_field(&mut hasher, options.tone.as_bytes());
        write_field(
            &mut hasher,
            &[options.include_hashtags as u8, options.include_emojis as u8],
        );
        write_field(&mut hasher, &(options.categories.len() as u64).to_le_bytes());
        for category in &options.categories {
            write_field(&mut hasher, category.as_bytes());
        }
        write_field(&mut hasher, &max_output_tokens.to_le_bytes());

        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Length-prefix every field so adjacent values cannot run together.
fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct ResponseCache {
    entries: Option<Cache<Fingerprint, String>>,
}

impl ResponseCache {
    /// A `max_entries` or `ttl` of zero disables caching.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let entries = (max_entries > 0 && !ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(max_entries as u64)
                .time_to_live(ttl)
                .build()
        });
        Self { entries }
    }

    pub fn disabled() -> Self {
        Self { entries: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub async fn get(&self, key: &Fingerprint) -> Option<String> {
        self.entries.as_ref()?.get(key).await
    }

    pub async fn insert(&self, key: Fingerprint, response: String) {
        if let Some(entries) = &self.entries {
            entries.insert(key, response).await;
        }
    }

    /// Return the cached reply for `key`, or await `compute` and store its
    /// successful result. Errors are returned to every waiter, never cached.
    pub async fn get_or_try_insert_with<F, Fut>(
        &self,
        key: &Fingerprint,
        compute: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let Some(entries) = &self.entries else {
            return compute().await;
        };

        let entry = entries
            .entry_by_ref(key)
            .or_try_insert_with(compute())
            .await
            .map_err(Error::from_shared)?;

        if entry.is_fresh() {
            tracing::debug!("Cache miss for {}", key);
        } else {
            tracing::debug!("Cache hit for {}", key);
        }
        Ok(entry.into_value())
    }

    /// Number of live entries, after pending evictions are applied.
    pub async fn len(&self) -> u64 {
        match &self.entries {
            Some(entries) => {
                entries.run_pending_tasks().await;
                entries.entry_count()
            }
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.invalidate_all();
        }
    }
}
