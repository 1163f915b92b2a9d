//! Ordered, tagged collections of candidate handles.

use core::ops::Range;

use crate::tag::Tag;

/// Handle to a candidate stored in a [`Container`](crate::Container).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(pub(crate) usize);

impl CandidateId {
    /// Position in the container's arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a set stored in a [`Container`](crate::Container).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub(crate) usize);

/// An ordered, duplicate-tolerant sequence of candidate handles plus tags.
///
/// A set never owns its candidates; several sets may reference the same one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateSet {
    members: Vec<CandidateId>,
    tags: Vec<Tag>,
}

impl CandidateSet {
    /// An empty set with the given tags.
    #[must_use]
    pub fn new(tags: Vec<Tag>) -> Self {
        let mut set = Self::default();
        for t in tags {
            set.add_tag(t);
        }
        set
    }

    /// Number of members, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CandidateId> {
        self.members.get(index).copied()
    }

    /// All members in order.
    #[must_use]
    pub fn members(&self) -> &[CandidateId] {
        &self.members
    }

    /// Iterate over members in order.
    pub fn iter(&self) -> impl Iterator<Item = CandidateId> + '_ {
        self.members.iter().copied()
    }

    /// Members in `range`, clamped to the set length.
    #[must_use]
    pub fn range(&self, range: Range<usize>) -> &[CandidateId] {
        let end = range.end.min(self.members.len());
        let start = range.start.min(end);
        &self.members[start..end]
    }

    /// Whether `id` is a member.
    #[must_use]
    pub fn contains(&self, id: CandidateId) -> bool {
        self.members.contains(&id)
    }

    /// Append a member.
    pub fn append(&mut self, id: CandidateId) {
        self.members.push(id);
    }

    /// Append several members.
    pub fn extend(&mut self, ids: impl IntoIterator<Item = CandidateId>) {
        self.members.extend(ids);
    }

    /// Remove the member at `index`. Out of range is a no-op.
    pub fn remove(&mut self, index: usize) -> Option<CandidateId> {
        (index < self.members.len()).then(|| self.members.remove(index))
    }

    /// Remove every occurrence of `id`. Returns how many were removed.
    pub fn remove_candidate(&mut self, id: CandidateId) -> usize {
        let before = self.members.len();
        self.members.retain(|&m| m != id);
        before - self.members.len()
    }

    /// Replace the member at `index`. Out of range is a no-op.
    pub fn replace(&mut self, index: usize, id: CandidateId) {
        if let Some(slot) = self.members.get_mut(index) {
            *slot = id;
        }
    }

    /// Replace all members.
    pub fn define(&mut self, ids: Vec<CandidateId>) {
        self.members = ids;
    }

    /// Keep only the first `len` members.
    pub fn truncate(&mut self, len: usize) {
        self.members.truncate(len);
    }

    /// Shuffle members in place.
    pub fn shuffle(&mut self, rng: &mut fastrand::Rng) {
        rng.shuffle(&mut self.members);
    }

    /// Remove all members. Tags are kept.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    // -----------------------------------------------------------------------
    // Tags
    // -----------------------------------------------------------------------

    /// Tags of this set.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Whether the set carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Whether the set carries every tag in `tags`.
    #[must_use]
    pub fn has_tags(&self, tags: &[Tag]) -> bool {
        tags.iter().all(|t| self.has_tag(t))
    }

    /// Add a tag unless present.
    pub fn add_tag(&mut self, tag: Tag) {
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
    }

    /// Remove a tag if present.
    pub fn remove_tag(&mut self, tag: &Tag) {
        self.tags.retain(|t| t != tag);
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = CandidateId;
    type IntoIter = core::iter::Copied<core::slice::Iter<'a, CandidateId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[usize]) -> Vec<CandidateId> {
        v.iter().map(|&i| CandidateId(i)).collect()
    }

    #[test]
    fn test_duplicates_and_removal() {
        let mut s = CandidateSet::new(vec![Tag::MainOptimization]);
        s.extend(ids(&[1, 2, 1, 3]));
        assert_eq!(s.len(), 4);
        assert_eq!(s.remove_candidate(CandidateId(1)), 2);
        assert_eq!(s.members(), ids(&[2, 3]).as_slice());
        assert_eq!(s.remove(5), None);
        assert_eq!(s.remove(0), Some(CandidateId(2)));
    }

    #[test]
    fn test_replace_and_range() {
        let mut s = CandidateSet::default();
        s.extend(ids(&[0, 1, 2, 3]));
        s.replace(1, CandidateId(9));
        assert_eq!(s.range(1..3), ids(&[9, 2]).as_slice());
        assert_eq!(s.range(3..10), ids(&[3]).as_slice());
        assert!(s.range(7..9).is_empty());
    }

    #[test]
    fn test_shuffle_keeps_members() {
        let mut s = CandidateSet::default();
        s.extend(ids(&[0, 1, 2, 3, 4, 5]));
        let mut rng = fastrand::Rng::with_seed(8);
        s.shuffle(&mut rng);
        let mut m = s.members().to_vec();
        m.sort();
        assert_eq!(m, ids(&[0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_tags() {
        let mut s = CandidateSet::new(vec![Tag::ForEvaluation, Tag::ForEvaluation]);
        assert_eq!(s.tags().len(), 1);
        s.add_tag(Tag::Fitness);
        assert!(s.has_tags(&[Tag::ForEvaluation, Tag::Fitness]));
        s.remove_tag(&Tag::ForEvaluation);
        assert!(!s.has_tag(&Tag::ForEvaluation));
        s.clear();
        assert!(s.is_empty());
        assert!(s.has_tag(&Tag::Fitness));
    }
}
