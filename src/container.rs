//! The top-level store shared by every operator of a graph.
//!
//! A [`Container`] owns the problem, an arena of candidates addressed by
//! [`CandidateId`] whose unreferenced slots are recycled by
//! [`release_unreferenced`](Container::release_unreferenced), and an ordered list of tagged [`CandidateSet`]s. It also
//! tracks process-wide derived quantities:
//!
//! | Quantity | Updated by |
//! |----------|------------|
//! | ideal | every [`observe`](Container::observe) (componentwise minimum) |
//! | anti-ideal | every `observe` (componentwise maximum) or [`define_reference_set`](Container::define_reference_set) |
//! | nadir | archive updates (maximum over the archive) or `define_reference_set` |
//! | archive | `observe`, only after [`define_keep_archive(true)`](Container::define_keep_archive) |
//! | direction | [`define_dir_vec`](Container::define_dir_vec), uniform by default |
//!
//! Mutation requires `&mut Container`, so there is exactly one writer at a
//! time.

use crate::candidate::Candidate;
use crate::error::{Error, Result};
use crate::problem::Problem;
use crate::set::{CandidateId, CandidateSet, SetId};
use crate::tag::Tag;

/// Outcome of offering a candidate to the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveUpdate {
    /// The archive did not change.
    Unchanged,
    /// The candidate was added and nothing was removed.
    Added,
    /// The candidate was added and displaced dominated members.
    Replaced,
}

#[track_caller]
fn slot(candidates: &[Option<Candidate>], id: CandidateId) -> &Candidate {
    match candidates.get(id.0) {
        Some(Some(c)) => c,
        _ => panic!("candidate {} is not live", id.0),
    }
}

#[track_caller]
fn slot_mut(candidates: &mut [Option<Candidate>], id: CandidateId) -> &mut Candidate {
    match candidates.get_mut(id.0) {
        Some(Some(c)) => c,
        _ => panic!("candidate {} is not live", id.0),
    }
}

/// Owner of candidates, sets and derived optimization state.
#[derive(Clone, Debug)]
pub struct Container {
    problem: Problem,
    candidates: Vec<Option<Candidate>>,
    free: Vec<usize>,
    sets: Vec<(SetId, CandidateSet)>,
    next_set: usize,
    ideal: Vec<f64>,
    anti_ideal: Vec<f64>,
    nadir: Vec<f64>,
    archive: Option<Vec<CandidateId>>,
    dir_vec: Vec<f64>,
    budget: Option<usize>,
    used_budget: usize,
    iteration: usize,
    max_iteration: Option<usize>,
}

impl Container {
    /// A container for `problem` with no candidates and no sets.
    #[must_use]
    pub fn new(problem: Problem) -> Self {
        let mut c = Self {
            problem,
            candidates: Vec::new(),
            free: Vec::new(),
            sets: Vec::new(),
            next_set: 0,
            ideal: Vec::new(),
            anti_ideal: Vec::new(),
            nadir: Vec::new(),
            archive: None,
            dir_vec: Vec::new(),
            budget: None,
            used_budget: 0,
            iteration: 0,
            max_iteration: None,
        };
        c.reset_reference_vectors();
        c
    }

    /// The problem definition.
    #[must_use]
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Mutable access to the problem. Call
    /// [`reset_reference_vectors`](Self::reset_reference_vectors) after
    /// changing the number of objectives.
    pub fn problem_mut(&mut self) -> &mut Problem {
        &mut self.problem
    }

    /// Reinitialize ideal, anti-ideal, nadir and direction from the problem.
    pub fn reset_reference_vectors(&mut self) {
        let m = self.problem.n_objectives();
        self.ideal = self
            .problem
            .ideal()
            .map_or_else(|| vec![f64::INFINITY; m], <[f64]>::to_vec);
        self.anti_ideal = self
            .problem
            .anti_ideal()
            .map_or_else(|| vec![f64::NEG_INFINITY; m], <[f64]>::to_vec);
        self.nadir = self
            .problem
            .nadir()
            .map_or_else(|| vec![f64::NEG_INFINITY; m], <[f64]>::to_vec);
        #[allow(clippy::cast_precision_loss)]
        let uniform = if m == 0 { Vec::new() } else { vec![1.0 / m as f64; m] };
        self.dir_vec = uniform;
    }

    // -----------------------------------------------------------------------
    // Candidates
    // -----------------------------------------------------------------------

    /// Store a candidate and return its handle. Released slots are reused
    /// first.
    pub fn insert(&mut self, candidate: Candidate) -> CandidateId {
        if let Some(i) = self.free.pop() {
            self.candidates[i] = Some(candidate);
            return CandidateId(i);
        }
        self.candidates.push(Some(candidate));
        CandidateId(self.candidates.len() - 1)
    }

    /// Create a candidate at the centre of the box.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProblemNotReady`] unless the problem is fully defined.
    pub fn create_candidate(&mut self) -> Result<CandidateId> {
        let c = Candidate::new(&self.problem)?;
        Ok(self.insert(c))
    }

    /// Create a uniformly random candidate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProblemNotReady`] unless the problem is fully defined.
    pub fn create_random_candidate(&mut self, rng: &mut fastrand::Rng) -> Result<CandidateId> {
        let c = Candidate::random(&self.problem, rng)?;
        Ok(self.insert(c))
    }

    /// Store a copy of candidate `id`.
    pub fn clone_candidate(&mut self, id: CandidateId) -> CandidateId {
        let c = self.candidate(id).clone();
        self.insert(c)
    }

    /// The candidate behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this container or has been
    /// released.
    #[must_use]
    #[track_caller]
    pub fn candidate(&self, id: CandidateId) -> &Candidate {
        slot(&self.candidates, id)
    }

    /// Mutable access to the candidate behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this container or has been
    /// released.
    #[track_caller]
    pub fn candidate_mut(&mut self, id: CandidateId) -> &mut Candidate {
        slot_mut(&mut self.candidates, id)
    }

    /// Number of live candidates.
    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.candidates.len() - self.free.len()
    }

    /// Whether `id` refers to a live candidate.
    #[must_use]
    pub fn contains(&self, id: CandidateId) -> bool {
        matches!(self.candidates.get(id.0), Some(Some(_)))
    }

    /// Free every candidate that no set and no archive entry references,
    /// and return how many were freed.
    ///
    /// Handles to freed candidates must not be used again: their slots are
    /// handed out by later insertions.
    pub fn release_unreferenced(&mut self) -> usize {
        let mut referenced = vec![false; self.candidates.len()];
        let held = self
            .sets
            .iter()
            .flat_map(|(_, set)| set.iter())
            .chain(self.archive().iter().copied());
        for id in held {
            if let Some(r) = referenced.get_mut(id.0) {
                *r = true;
            }
        }
        let mut released = 0;
        for (i, entry) in self.candidates.iter_mut().enumerate() {
            if !referenced[i] && entry.take().is_some() {
                self.free.push(i);
                released += 1;
            }
        }
        trace_debug!(released, live = self.n_candidates(), "candidates released");
        released
    }

    /// Evaluate candidate `id` against the problem.
    ///
    /// # Errors
    ///
    /// See [`Candidate::evaluate`].
    pub fn evaluate(&mut self, id: CandidateId, rng: &mut fastrand::Rng) -> Result<()> {
        slot_mut(&mut self.candidates, id).evaluate(&self.problem, rng)
    }

    /// Objective vectors of `ids`, in order.
    #[must_use]
    pub fn objective_vectors(&self, ids: &[CandidateId]) -> Vec<Vec<f64>> {
        ids.iter()
            .map(|&id| self.candidate(id).objectives().to_vec())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Sets
    // -----------------------------------------------------------------------

    /// Append an empty set with `tags` and return its handle.
    pub fn append_set(&mut self, tags: Vec<Tag>) -> SetId {
        self.append_set_with(Vec::new(), tags)
    }

    /// Append a set with members and tags.
    pub fn append_set_with(&mut self, members: Vec<CandidateId>, tags: Vec<Tag>) -> SetId {
        let id = SetId(self.next_set);
        self.next_set += 1;
        let mut set = CandidateSet::new(tags);
        set.define(members);
        self.sets.push((id, set));
        id
    }

    /// Remove a set. Its candidates stay in the arena until
    /// [`release_unreferenced`](Self::release_unreferenced).
    pub fn remove_set(&mut self, id: SetId) -> Option<CandidateSet> {
        let pos = self.sets.iter().position(|(s, _)| *s == id)?;
        Some(self.sets.remove(pos).1)
    }

    /// The set behind `id`.
    #[must_use]
    pub fn set(&self, id: SetId) -> Option<&CandidateSet> {
        self.sets.iter().find(|(s, _)| *s == id).map(|(_, set)| set)
    }

    /// Mutable access to the set behind `id`.
    pub fn set_mut(&mut self, id: SetId) -> Option<&mut CandidateSet> {
        self.sets
            .iter_mut()
            .find(|(s, _)| *s == id)
            .map(|(_, set)| set)
    }

    /// Members of set `id`, or nothing if it does not exist.
    #[must_use]
    pub fn members(&self, id: SetId) -> Vec<CandidateId> {
        self.set(id)
            .map(|s| s.members().to_vec())
            .unwrap_or_default()
    }

    /// Number of sets.
    #[must_use]
    pub fn n_sets(&self) -> usize {
        self.sets.len()
    }

    /// All set handles in insertion order.
    #[must_use]
    pub fn set_ids(&self) -> Vec<SetId> {
        self.sets.iter().map(|(id, _)| *id).collect()
    }

    /// Handle of the set at insertion position `index`.
    #[must_use]
    pub fn set_at(&self, index: usize) -> Option<SetId> {
        self.sets.get(index).map(|(id, _)| *id)
    }

    /// Sets carrying every tag in `tags`, in insertion order. An empty
    /// query matches nothing.
    #[must_use]
    pub fn sets_with_tags(&self, tags: &[Tag]) -> Vec<SetId> {
        if tags.is_empty() {
            return Vec::new();
        }
        self.sets
            .iter()
            .filter(|(_, s)| s.has_tags(tags))
            .map(|(id, _)| *id)
            .collect()
    }

    /// First set carrying `tag`.
    #[must_use]
    pub fn set_with_tag(&self, tag: &Tag) -> Option<SetId> {
        self.sets
            .iter()
            .find(|(_, s)| s.has_tag(tag))
            .map(|(id, _)| *id)
    }

    /// Whether any set carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.set_with_tag(tag).is_some()
    }

    /// Add `tag` to set `id`.
    pub fn tag_set(&mut self, id: SetId, tag: Tag) {
        if let Some(s) = self.set_mut(id) {
            s.add_tag(tag);
        }
    }

    /// Remove `tag` from set `id`.
    pub fn untag_set(&mut self, id: SetId, tag: &Tag) {
        if let Some(s) = self.set_mut(id) {
            s.remove_tag(tag);
        }
    }

    // -----------------------------------------------------------------------
    // Reference points
    // -----------------------------------------------------------------------

    /// Componentwise best observed objective values.
    #[must_use]
    pub fn ideal(&self) -> &[f64] {
        &self.ideal
    }

    /// Componentwise worst observed objective values.
    #[must_use]
    pub fn anti_ideal(&self) -> &[f64] {
        &self.anti_ideal
    }

    /// Componentwise worst values of the non-dominated set.
    #[must_use]
    pub fn nadir(&self) -> &[f64] {
        &self.nadir
    }

    /// Fold an evaluated candidate into ideal and anti-ideal, and into the
    /// archive and nadir when the archive is kept.
    pub fn observe(&mut self, id: CandidateId) -> ArchiveUpdate {
        let c = slot(&self.candidates, id);
        if !c.is_evaluated() || c.objectives().len() != self.ideal.len() {
            return ArchiveUpdate::Unchanged;
        }
        for ((lo, hi), &v) in self
            .ideal
            .iter_mut()
            .zip(self.anti_ideal.iter_mut())
            .zip(c.objectives())
        {
            *lo = lo.min(v);
            *hi = hi.max(v);
        }
        if self.archive.is_some() {
            self.update_archive(id)
        } else {
            ArchiveUpdate::Unchanged
        }
    }

    /// Define anti-ideal and nadir as the componentwise maximum of `ids`,
    /// and fold the same members into the ideal.
    pub fn define_reference_set(&mut self, ids: &[CandidateId]) {
        let m = self.ideal.len();
        let mut worst = vec![f64::NEG_INFINITY; m];
        for &id in ids {
            let c = slot(&self.candidates, id);
            if !c.is_evaluated() || c.objectives().len() != m {
                continue;
            }
            for (i, &v) in c.objectives().iter().enumerate() {
                worst[i] = worst[i].max(v);
                self.ideal[i] = self.ideal[i].min(v);
            }
        }
        self.anti_ideal.clone_from(&worst);
        self.nadir = worst;
    }

    // -----------------------------------------------------------------------
    // Archive
    // -----------------------------------------------------------------------

    /// Enable or disable the non-dominated archive. Disabling drops it.
    pub fn define_keep_archive(&mut self, keep: bool) {
        match (keep, self.archive.is_some()) {
            (true, false) => self.archive = Some(Vec::new()),
            (false, true) => self.archive = None,
            _ => {}
        }
    }

    /// Whether the archive is kept.
    #[must_use]
    pub fn keeps_archive(&self) -> bool {
        self.archive.is_some()
    }

    /// Archived candidates. Empty when the archive is not kept.
    #[must_use]
    pub fn archive(&self) -> &[CandidateId] {
        self.archive.as_deref().unwrap_or_default()
    }

    /// Offer a candidate to the archive.
    ///
    /// The archive stores its own snapshot so later in-place changes to the
    /// offered candidate do not leak into it.
    pub fn update_archive(&mut self, id: CandidateId) -> ArchiveUpdate {
        let Some(archive) = self.archive.as_ref() else {
            return ArchiveUpdate::Unchanged;
        };
        let offered = slot(&self.candidates, id);
        if !offered.is_evaluated() {
            return ArchiveUpdate::Unchanged;
        }
        let mut survivors = Vec::with_capacity(archive.len() + 1);
        for &a in archive {
            let member = slot(&self.candidates, a);
            if member.objectives() == offered.objectives()
                || member.weakly_dominates(offered).is_true()
            {
                return ArchiveUpdate::Unchanged;
            }
            if !offered.weakly_dominates(member).is_true() {
                survivors.push(a);
            }
        }
        let replaced = survivors.len() < archive.len();
        let snapshot = self.clone_candidate(id);
        survivors.push(snapshot);
        self.archive = Some(survivors);

        let status = if replaced {
            self.recompute_nadir();
            ArchiveUpdate::Replaced
        } else {
            let objectives = self.candidate(snapshot).objectives().to_vec();
            for (n, v) in self.nadir.iter_mut().zip(objectives) {
                *n = n.max(v);
            }
            ArchiveUpdate::Added
        };
        trace_debug!(?status, "archive updated");
        status
    }

    fn recompute_nadir(&mut self) {
        let mut nadir = vec![f64::NEG_INFINITY; self.nadir.len()];
        for &a in self.archive() {
            for (n, &v) in nadir.iter_mut().zip(slot(&self.candidates, a).objectives()) {
                *n = n.max(v);
            }
        }
        self.nadir = nadir;
    }

    // -----------------------------------------------------------------------
    // Direction
    // -----------------------------------------------------------------------

    /// The reference direction, non-negative and summing to 1.
    #[must_use]
    pub fn dir_vec(&self) -> &[f64] {
        &self.dir_vec
    }

    /// Set the reference direction. It is normalized to sum 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the length is not the number
    /// of objectives, or [`Error::InvalidParameter`] for a negative
    /// component or an all-zero vector.
    pub fn define_dir_vec(&mut self, dir: &[f64]) -> Result<()> {
        let m = self.problem.n_objectives();
        if dir.len() != m {
            return Err(Error::DimensionMismatch {
                expected: m,
                got: dir.len(),
            });
        }
        if dir.iter().any(|&d| d < 0.0) {
            return Err(Error::InvalidParameter {
                name: "dir_vec",
                reason: "components must be non-negative".into(),
            });
        }
        let sum: f64 = dir.iter().sum();
        if sum <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "dir_vec",
                reason: "at least one component must be positive".into(),
            });
        }
        self.dir_vec = dir.iter().map(|d| d / sum).collect();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Budget and iterations
    // -----------------------------------------------------------------------

    /// Limit the number of true-function evaluations.
    pub fn define_budget(&mut self, budget: usize) {
        self.budget = Some(budget);
    }

    /// The evaluation budget, if limited.
    #[must_use]
    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    /// Evaluations consumed so far.
    #[must_use]
    pub fn used_budget(&self) -> usize {
        self.used_budget
    }

    /// Evaluations left, or `None` when unlimited.
    #[must_use]
    pub fn remaining_budget(&self) -> Option<usize> {
        self.budget.map(|b| b.saturating_sub(self.used_budget))
    }

    /// Record `n` evaluations.
    pub fn decrement_budget(&mut self, n: usize) {
        self.used_budget += n;
        if let Some(b) = self.budget
            && self.used_budget >= b
        {
            trace_info!(used = self.used_budget, "evaluation budget exhausted");
        }
    }

    /// Limit the number of iterations.
    pub fn define_max_iteration(&mut self, max: usize) {
        self.max_iteration = Some(max);
    }

    /// The iteration counter.
    #[must_use]
    pub fn current_iteration(&self) -> usize {
        self.iteration
    }

    /// Advance the iteration counter.
    pub fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Whether the run should stop.
    ///
    /// With neither a budget nor an iteration limit the run is considered
    /// terminated, since nothing would ever stop it.
    #[must_use]
    pub fn is_terminate(&self) -> bool {
        match (self.budget, self.max_iteration) {
            (None, None) => true,
            (budget, max_iter) => {
                budget.is_some_and(|b| self.used_budget >= b)
                    || max_iter.is_some_and(|m| self.iteration >= m)
            }
        }
    }
}
