//! # Haplotype and Sample Definitions
//!
//! Type-safe indices for samples and reference haplotypes, plus the sample
//! registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Zero-cost newtype for target sample indices
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct SampleIdx(pub u32);

impl SampleIdx {
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for SampleIdx {
    fn from(idx: u32) -> Self {
        Self(idx)
    }
}

impl From<usize> for SampleIdx {
    fn from(idx: usize) -> Self {
        Self(idx as u32)
    }
}

/// Zero-cost newtype for full-panel reference haplotype indices
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct HapIdx(pub u32);

impl HapIdx {
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for HapIdx {
    fn from(idx: u32) -> Self {
        Self(idx)
    }
}

impl From<usize> for HapIdx {
    fn from(idx: usize) -> Self {
        Self(idx as u32)
    }
}

/// A collection of target samples
///
/// All samples are diploid: each owns exactly two mosaic strands.
#[derive(Clone, Debug, Default)]
pub struct Samples {
    /// Sample IDs
    ids: Vec<Arc<str>>,
    /// Map from sample ID to index for fast lookup
    id_to_idx: HashMap<Arc<str>, SampleIdx>,
}

impl Samples {
    /// Create from a vector of sample IDs
    pub fn from_ids(ids: Vec<String>) -> Self {
        let ids: Vec<Arc<str>> = ids.into_iter().map(|s| s.into()).collect();
        let id_to_idx = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), SampleIdx::new(i as u32)))
            .collect();
        Self { ids, id_to_idx }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Get a sample ID by index
    pub fn id(&self, idx: SampleIdx) -> Option<&str> {
        self.ids.get(idx.as_usize()).map(|s| s.as_ref())
    }

    /// Look up a sample index by ID
    pub fn index_of(&self, id: &str) -> Option<SampleIdx> {
        self.id_to_idx.get(id).copied()
    }

    /// Get all sample IDs
    pub fn ids(&self) -> &[Arc<str>] {
        &self.ids
    }
}

impl std::ops::Index<SampleIdx> for Samples {
    type Output = str;

    fn index(&self, idx: SampleIdx) -> &Self::Output {
        &self.ids[idx.as_usize()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_lookup() {
        let samples = Samples::from_ids(vec!["NA001".to_string(), "NA002".to_string()]);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples.index_of("NA002"), Some(SampleIdx::new(1)));
        assert_eq!(samples.id(SampleIdx::new(0)), Some("NA001"));
        assert_eq!(&samples[SampleIdx::new(1)], "NA002");
        assert_eq!(samples.index_of("NA999"), None);
    }

    #[test]
    fn test_index_newtypes() {
        let h = HapIdx::from(7usize);
        assert_eq!(h.as_usize(), 7);
        let s: SampleIdx = 3u32.into();
        assert_eq!(s.as_usize(), 3);
    }
}
