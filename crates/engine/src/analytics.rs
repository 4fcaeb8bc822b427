//! Feedback and engagement analytics.
//!
//! Pure summaries over stored records; the engine fetches the records and
//! hands them here.

use interaction_store::{Feedback, FeedbackKind, Interaction, InteractionKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Round to a fixed number of decimal places for presentation
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// How users reacted to one algorithm's recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmPerformance {
    pub total_feedback: usize,
    /// liked / total
    pub satisfaction_rate: f64,
    /// (liked + already_known) / total
    pub relevance_rate: f64,
    pub feedback_breakdown: BTreeMap<FeedbackKind, usize>,
}

/// Per-algorithm performance, keyed by the algorithm name stored with the
/// feedback. Algorithms without feedback do not appear.
pub fn algorithm_performance(feedback: &[Feedback]) -> BTreeMap<String, AlgorithmPerformance> {
    let mut counts: BTreeMap<&str, BTreeMap<FeedbackKind, usize>> = BTreeMap::new();
    for record in feedback {
        *counts
            .entry(record.algorithm_used.as_str())
            .or_default()
            .entry(record.feedback_type)
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(algorithm, counts)| {
            let total: usize = counts.values().sum();
            let count = |kind: FeedbackKind| counts.get(&kind).copied().unwrap_or(0);
            let liked = count(FeedbackKind::Liked);
            let already_known = count(FeedbackKind::AlreadyKnown);

            let mut breakdown: BTreeMap<FeedbackKind, usize> = [
                FeedbackKind::Liked,
                FeedbackKind::Disliked,
                FeedbackKind::NotRelevant,
                FeedbackKind::AlreadyKnown,
            ]
            .into_iter()
            .map(|kind| (kind, 0))
            .collect();
            breakdown.extend(counts.iter().map(|(kind, n)| (*kind, *n)));

            let performance = AlgorithmPerformance {
                total_feedback: total,
                satisfaction_rate: round_to(liked as f64 / total as f64, 3),
                relevance_rate: round_to((liked + already_known) as f64 / total as f64, 3),
                feedback_breakdown: breakdown,
            };
            (algorithm.to_string(), performance)
        })
        .collect()
}

/// Engagement summary of one user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInsights {
    pub total_interactions: usize,
    /// (3 x favorite + 2 x identify + view) / total
    pub engagement_score: f64,
    pub interaction_breakdown: BTreeMap<InteractionKind, usize>,
}

/// Summarize a history; `None` when there is nothing to summarize
pub fn user_insights(history: &[Interaction]) -> Option<UserInsights> {
    if history.is_empty() {
        return None;
    }

    let mut breakdown: BTreeMap<InteractionKind, usize> = BTreeMap::new();
    for interaction in history {
        *breakdown.entry(interaction.kind).or_insert(0) += 1;
    }

    let count = |kind: InteractionKind| breakdown.get(&kind).copied().unwrap_or(0);
    let weighted = 3 * count(InteractionKind::Favorite)
        + 2 * count(InteractionKind::Identify)
        + count(InteractionKind::View);
    let total = history.len();

    Some(UserInsights {
        total_interactions: total,
        engagement_score: round_to(weighted as f64 / total as f64, 2),
        interaction_breakdown: breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.66666, 3), 0.667);
        assert_eq!(round_to(2.125, 2), 2.13);
        assert_eq!(round_to(1.0, 3), 1.0);
    }

    #[test]
    fn test_algorithm_performance() {
        let feedback = vec![
            Feedback::new("1", "10", FeedbackKind::Liked, "knn"),
            Feedback::new("2", "11", FeedbackKind::AlreadyKnown, "knn"),
            Feedback::new("3", "12", FeedbackKind::Disliked, "knn"),
            Feedback::new("1", "13", FeedbackKind::NotRelevant, "hybrid"),
        ];

        let report = algorithm_performance(&feedback);
        assert_eq!(report.len(), 2);

        let knn = &report["knn"];
        assert_eq!(knn.total_feedback, 3);
        assert_eq!(knn.satisfaction_rate, 0.333);
        assert_eq!(knn.relevance_rate, 0.667);
        assert_eq!(knn.feedback_breakdown[&FeedbackKind::NotRelevant], 0);
        assert_eq!(knn.feedback_breakdown.len(), 4);

        let hybrid = &report["hybrid"];
        assert_eq!(hybrid.satisfaction_rate, 0.0);
        assert_eq!(hybrid.relevance_rate, 0.0);
    }

    #[test]
    fn test_no_feedback_no_algorithms() {
        assert!(algorithm_performance(&[]).is_empty());
    }

    #[test]
    fn test_user_insights() {
        let history = vec![
            Interaction::new("1", "10", InteractionKind::Favorite),
            Interaction::new("1", "11", InteractionKind::Identify),
            Interaction::new("1", "12", InteractionKind::View),
            Interaction::new("1", "13", InteractionKind::Search),
        ];

        let insights = user_insights(&history).unwrap();
        assert_eq!(insights.total_interactions, 4);
        // (3 + 2 + 1) / 4
        assert_eq!(insights.engagement_score, 1.5);
        assert_eq!(insights.interaction_breakdown[&InteractionKind::Search], 1);
    }

    #[test]
    fn test_user_insights_empty_history() {
        assert!(user_insights(&[]).is_none());
    }
}
