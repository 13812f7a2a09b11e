//! Quantized, bucketed similarity index over one vector table

use std::sync::Arc;

use tracing::{debug, info};

use super::{
    quantize, rank_candidates, BucketAssigner, BucketPlacement, CacheEntry, Fingerprint,
    SearchMatch, VectorStore, VectorTable,
};
use crate::domain::DomainError;

/// Approximate nearest-neighbour index: quantizer + bucket assigner + store.
///
/// Only the query's own bucket is scanned, so neighbours that fall into a
/// different bucket are never found.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    binarize_threshold: f64,
    buckets: BucketAssigner,
    debug: bool,
}

impl VectorIndex {
    pub fn new(store: Arc<dyn VectorStore>, binarize_threshold: f64, buckets: BucketAssigner) -> Self {
        Self {
            store,
            binarize_threshold,
            buckets,
            debug: false,
        }
    }

    /// Log norms, buckets and distances at info level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn table(&self) -> VectorTable {
        self.store.table()
    }

    pub fn fingerprint(&self, vector: &[f64]) -> Fingerprint {
        // The rayon join blocks the calling async worker thread until done
        quantize(vector, self.binarize_threshold)
    }

    /// Norm and bucket of a vector
    pub fn placement(&self, vector: &[f64]) -> BucketPlacement {
        let placement = self.buckets.place(vector);

        if self.debug {
            info!(
                table = self.table().table_name(),
                norm = placement.norm,
                scaled = placement.scaled,
                bucket = placement.bucket,
                bucket_count = self.buckets.count(),
                "Vector placement"
            );
        } else {
            debug!(
                table = self.table().table_name(),
                norm = placement.norm,
                bucket = placement.bucket,
                "Vector placement"
            );
        }

        placement
    }

    /// Quantize and store a vector, returning the new row id
    pub async fn insert(&self, text: &str, vector: &[f64]) -> Result<i64, DomainError> {
        let placement = self.placement(vector);
        let entry = CacheEntry {
            text: text.to_string(),
            fingerprint: self.fingerprint(vector),
            norm: placement.norm,
            bucket_id: placement.bucket,
        };

        let id = self.store.insert(entry).await?;
        debug!(table = self.table().table_name(), id, bucket = placement.bucket, "Stored vector");

        Ok(id)
    }

    /// Search the vector's own bucket
    pub async fn search(
        &self,
        vector: &[f64],
        threshold: u32,
    ) -> Result<Vec<SearchMatch>, DomainError> {
        let bucket = self.placement(vector).bucket;
        self.search_in_bucket(vector, threshold, bucket).await
    }

    /// Rank every row of `bucket` by Hamming distance to the vector
    pub async fn search_in_bucket(
        &self,
        vector: &[f64],
        threshold: u32,
        bucket: i64,
    ) -> Result<Vec<SearchMatch>, DomainError> {
        let query = self.fingerprint(vector);
        let records = self.store.scan_bucket(bucket).await?;
        let scanned = records.len();

        if self.debug {
            for record in &records {
                info!(
                    table = self.table().table_name(),
                    text = %record.text,
                    distance = query.distance(&record.fingerprint),
                    threshold,
                    "Candidate distance"
                );
            }
        }

        let matches = rank_candidates(&query, records, threshold);
        debug!(
            table = self.table().table_name(),
            bucket,
            scanned,
            matched = matches.len(),
            "Bucket search complete"
        );

        Ok(matches)
    }

    /// Whether the text is already stored in the vector's bucket
    pub async fn contains(&self, text: &str, vector: &[f64]) -> Result<bool, DomainError> {
        let bucket = self.placement(vector).bucket;
        self.store.contains(text, bucket).await
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        self.store.count().await
    }
}
