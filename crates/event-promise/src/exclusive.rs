//! # Mutually Exclusive Predicates
//!
//! When several correlators watch the same role for successive states of one
//! request, a payload must satisfy at most one of their predicates, or a
//! single callback would resolve two steps at once. `ExclusivePredicates`
//! names each step's predicate and checks that a sample set is partitioned.

use crate::error::PartitionError;
use callback_bus::Predicate;
use callback_types::CallbackPayload;

/// Named predicates that are expected to be pairwise disjoint.
#[derive(Default)]
pub struct ExclusivePredicates {
    entries: Vec<(String, Box<dyn Predicate>)>,
}

impl ExclusivePredicates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named predicate.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, predicate: impl Predicate) -> Self {
        self.entries.push((name.into(), Box::new(predicate)));
        self
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Which predicate matches `payload`, if any.
    ///
    /// Errors with [`PartitionError::Overlap`] (sample index 0) when more than
    /// one matches.
    pub fn classify(&self, payload: &CallbackPayload) -> Result<Option<&str>, PartitionError> {
        self.classify_sample(0, payload)
    }

    /// Check that every sample matches exactly one predicate.
    pub fn assert_partition(&self, samples: &[CallbackPayload]) -> Result<(), PartitionError> {
        for (index, payload) in samples.iter().enumerate() {
            if self.classify_sample(index, payload)?.is_none() {
                return Err(PartitionError::Unmatched { sample: index });
            }
        }
        Ok(())
    }

    /// Take the predicate named `name` out of the set, e.g. to hand it to a
    /// correlator after the partition has been checked:
    /// `expect(&stream, move |p: &CallbackPayload| step.test(p))`.
    pub fn take(&mut self, name: &str) -> Option<Box<dyn Predicate>> {
        let position = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(position).1)
    }

    fn classify_sample(
        &self,
        sample: usize,
        payload: &CallbackPayload,
    ) -> Result<Option<&str>, PartitionError> {
        let matched: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, predicate)| predicate.test(payload))
            .map(|(name, _)| name.as_str())
            .collect();

        match matched.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(PartitionError::Overlap {
                sample,
                matched: matched.iter().map(|name| (*name).to_string()).collect(),
            }),
        }
    }
}
