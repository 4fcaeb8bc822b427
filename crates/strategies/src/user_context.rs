//! Per-request user context.
//!
//! A [`UserContext`] gathers everything a strategy needs about one request
//! up front: the candidate batch, the explicit preferences sent by the client
//! and the set of species the user has already seen. Strategies read it; none
//! of them mutate it, so hybrid components can share one context.

use crate::types::{Candidate, UserLocation};
use interaction_store::{Interaction, InteractionKind, TaxonId, UserId};
use std::collections::HashSet;

/// Default number of history entries read per user
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: UserId,
    pub user_groups: HashSet<String>,
    pub user_families: HashSet<String>,
    pub seen_taxon_ids: HashSet<TaxonId>,
    pub user_location: Option<UserLocation>,
    /// Candidate batch in request order
    pub candidates: Vec<Candidate>,
    pub limit: usize,
}

impl UserContext {
    pub fn new(user_id: impl Into<UserId>, candidates: Vec<Candidate>, limit: usize) -> Self {
        Self {
            user_id: user_id.into(),
            user_groups: HashSet::new(),
            user_families: HashSet::new(),
            seen_taxon_ids: HashSet::new(),
            user_location: None,
            candidates,
            limit,
        }
    }

    pub fn with_user_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_families = families.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_seen<I, S>(mut self, seen: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaxonId>,
    {
        self.seen_taxon_ids = seen.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_location(mut self, location: Option<UserLocation>) -> Self {
        self.user_location = location;
        self
    }

    pub fn is_seen(&self, taxon_id: &str) -> bool {
        self.seen_taxon_ids.contains(taxon_id)
    }

    /// Candidates with a group, in request order
    pub fn eligible_candidates(&self) -> Vec<&Candidate> {
        self.candidates.iter().filter(|c| c.is_eligible()).collect()
    }

    /// True when the candidate's group or family was sent as an explicit preference
    pub fn matches_explicit_preference(&self, candidate: &Candidate) -> bool {
        candidate
            .group()
            .is_some_and(|group| self.user_groups.contains(group))
            || candidate
                .family()
                .is_some_and(|family| self.user_families.contains(family))
    }
}

/// Preferences inferred from stored history, for requests that carry none.
///
/// Used by batch mode: every species in the history counts as seen, and the
/// groups and families of favorited candidates count as explicit preferences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImplicitPreferences {
    /// Deduplicated, in first-seen (most recent first) order
    pub seen_taxon_ids: Vec<TaxonId>,
    pub user_groups: Vec<String>,
    pub user_families: Vec<String>,
}

impl ImplicitPreferences {
    pub fn from_history(history: &[Interaction], candidates: &[Candidate]) -> Self {
        let mut prefs = ImplicitPreferences::default();
        let mut seen = HashSet::new();
        let mut groups = HashSet::new();
        let mut families = HashSet::new();

        for interaction in history {
            if seen.insert(interaction.taxon_id.as_str()) {
                prefs.seen_taxon_ids.push(interaction.taxon_id.clone());
            }
            if interaction.kind != InteractionKind::Favorite {
                continue;
            }

            let Some(candidate) = candidates
                .iter()
                .find(|c| c.taxon_id == interaction.taxon_id)
            else {
                continue;
            };
            if let Some(group) = candidate.group() {
                if groups.insert(group) {
                    prefs.user_groups.push(group.to_string());
                }
            }
            if let Some(family) = candidate.family() {
                if families.insert(family) {
                    prefs.user_families.push(family.to_string());
                }
            }
        }

        prefs
    }
}
