//! Reward ledger records: immutable point transactions, the action catalog
//! and the level threshold table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ticket::TicketPriority;

/// Catalog of actions that can earn points. The numeric values live in
/// [`PointsCatalog`], not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    // User actions
    CreateTicket,
    Feedback,
    DetailedFeedback,
    MonthlyActive,
    // Worker actions
    ClaimTicket,
    ResolvedTicket,
    QuickResolution,
    PositiveFeedback,
    // Special achievements
    FirstResolution,
    FiveStarRating,
    FiveTicketsWeek,
    TenTicketsWeek,
    ZeroEscalation,
    PerfectFeedback,
    // Manual grant by an administrator; points come from the request
    AdminAward,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateTicket => "create_ticket",
            ActionType::Feedback => "feedback",
            ActionType::DetailedFeedback => "detailed_feedback",
            ActionType::MonthlyActive => "monthly_active",
            ActionType::ClaimTicket => "claim_ticket",
            ActionType::ResolvedTicket => "resolved_ticket",
            ActionType::QuickResolution => "quick_resolution",
            ActionType::PositiveFeedback => "positive_feedback",
            ActionType::FirstResolution => "first_resolution",
            ActionType::FiveStarRating => "five_star_rating",
            ActionType::FiveTicketsWeek => "five_tickets_week",
            ActionType::TenTicketsWeek => "ten_tickets_week",
            ActionType::ZeroEscalation => "zero_escalation",
            ActionType::PerfectFeedback => "perfect_feedback",
            ActionType::AdminAward => "admin_award",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create_ticket" => Some(ActionType::CreateTicket),
            "feedback" => Some(ActionType::Feedback),
            "detailed_feedback" => Some(ActionType::DetailedFeedback),
            "monthly_active" => Some(ActionType::MonthlyActive),
            "claim_ticket" => Some(ActionType::ClaimTicket),
            "resolved_ticket" => Some(ActionType::ResolvedTicket),
            "quick_resolution" => Some(ActionType::QuickResolution),
            "positive_feedback" => Some(ActionType::PositiveFeedback),
            "first_resolution" => Some(ActionType::FirstResolution),
            "five_star_rating" => Some(ActionType::FiveStarRating),
            "five_tickets_week" => Some(ActionType::FiveTicketsWeek),
            "ten_tickets_week" => Some(ActionType::TenTicketsWeek),
            "zero_escalation" => Some(ActionType::ZeroEscalation),
            "perfect_feedback" => Some(ActionType::PerfectFeedback),
            "admin_award" => Some(ActionType::AdminAward),
            _ => None,
        }
    }

    /// Display form used in transaction descriptions ("create ticket").
    pub fn display(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Actions whose award gets a secondary bonus from the ticket's priority.
    pub fn severity_eligible(&self) -> bool {
        matches!(self, ActionType::CreateTicket | ActionType::ResolvedTicket)
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point values per action. Policy constants, overridable at construction;
/// defaults match the production catalog.
#[derive(Debug, Clone)]
pub struct PointsCatalog {
    pub create_ticket: i64,
    pub feedback: i64,
    pub detailed_feedback: i64,
    pub monthly_active: i64,
    pub claim_ticket: i64,
    pub resolved_ticket: i64,
    pub quick_resolution: i64,
    pub positive_feedback: i64,
    pub first_resolution: i64,
    pub five_star_rating: i64,
    pub five_tickets_week: i64,
    pub ten_tickets_week: i64,
    pub zero_escalation: i64,
    pub perfect_feedback: i64,
    pub high_severity_bonus: i64,
    pub medium_severity_bonus: i64,
    pub low_severity_bonus: i64,
}

impl Default for PointsCatalog {
    fn default() -> Self {
        Self {
            create_ticket: 10,
            feedback: 5,
            detailed_feedback: 10,
            monthly_active: 15,
            claim_ticket: 5,
            resolved_ticket: 20,
            quick_resolution: 30,
            positive_feedback: 15,
            first_resolution: 50,
            five_star_rating: 25,
            five_tickets_week: 75,
            ten_tickets_week: 150,
            zero_escalation: 100,
            perfect_feedback: 200,
            high_severity_bonus: 15,
            medium_severity_bonus: 10,
            low_severity_bonus: 5,
        }
    }
}

impl PointsCatalog {
    /// Base points for an action. `AdminAward` has no fixed value; its
    /// points come with the request, so it yields `None` here.
    pub fn base_points(&self, action: ActionType) -> Option<i64> {
        match action {
            ActionType::CreateTicket => Some(self.create_ticket),
            ActionType::Feedback => Some(self.feedback),
            ActionType::DetailedFeedback => Some(self.detailed_feedback),
            ActionType::MonthlyActive => Some(self.monthly_active),
            ActionType::ClaimTicket => Some(self.claim_ticket),
            ActionType::ResolvedTicket => Some(self.resolved_ticket),
            ActionType::QuickResolution => Some(self.quick_resolution),
            ActionType::PositiveFeedback => Some(self.positive_feedback),
            ActionType::FirstResolution => Some(self.first_resolution),
            ActionType::FiveStarRating => Some(self.five_star_rating),
            ActionType::FiveTicketsWeek => Some(self.five_tickets_week),
            ActionType::TenTicketsWeek => Some(self.ten_tickets_week),
            ActionType::ZeroEscalation => Some(self.zero_escalation),
            ActionType::PerfectFeedback => Some(self.perfect_feedback),
            ActionType::AdminAward => None,
        }
    }

    pub fn severity_bonus(&self, priority: TicketPriority) -> i64 {
        match priority {
            TicketPriority::High => self.high_severity_bonus,
            TicketPriority::Medium => self.medium_severity_bonus,
            TicketPriority::Low => self.low_severity_bonus,
        }
    }
}

/// An immutable ledger entry. Never mutated or deleted; the user's cached
/// total is derived from the sum of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: i64,
    pub action_type: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awarded_by: Option<Uuid>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl RewardTransaction {
    pub fn new(
        user_id: Uuid,
        points: i64,
        action_type: ActionType,
        ticket_id: Option<Uuid>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            points,
            action_type,
            ticket_id,
            awarded_by: None,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One tier of the level table. `max_points: None` marks the unbounded top
/// tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardLevel {
    pub id: Uuid,
    #[serde(rename = "level")]
    pub name: String,
    pub min_points: i64,
    pub max_points: Option<i64>,
    pub benefits: Vec<String>,
    pub badge_color: String,
}

impl RewardLevel {
    pub fn contains(&self, total: i64) -> bool {
        total >= self.min_points && self.max_points.map_or(true, |max| total <= max)
    }
}

/// Built-in five-tier table, seeded into the store the first time the
/// service starts against an empty levels collection.
pub fn default_levels() -> Vec<RewardLevel> {
    let tier = |name: &str, min: i64, max: Option<i64>, benefits: &[&str], color: &str| RewardLevel {
        id: Uuid::new_v4(),
        name: name.to_string(),
        min_points: min,
        max_points: max,
        benefits: benefits.iter().map(|b| b.to_string()).collect(),
        badge_color: color.to_string(),
    };
    vec![
        tier(
            "Rookie Support Agent",
            0,
            Some(99),
            &["Basic support access", "Welcome badge"],
            "#95a5a6",
        ),
        tier(
            "Support Specialist",
            100,
            Some(299),
            &["Priority support", "Monthly training", "Specialist badge"],
            "#3498db",
        ),
        tier(
            "Senior Support Specialist",
            300,
            Some(599),
            &["Priority support", "Monthly training", "Exclusive webinars", "Senior badge"],
            "#9b59b6",
        ),
        tier(
            "Support Expert",
            600,
            Some(999),
            &[
                "VIP support",
                "Monthly training",
                "Exclusive webinars",
                "Early feature access",
                "Expert badge",
            ],
            "#e67e22",
        ),
        tier(
            "Support Master",
            1000,
            None,
            &[
                "VIP support",
                "Monthly training",
                "Exclusive webinars",
                "Early feature access",
                "Recognition program",
                "Master badge",
            ],
            "#f39c12",
        ),
    ]
}

/// The tier whose `[min_points, max_points]` range contains `total`.
/// Expects `levels` sorted ascending by `min_points`.
pub fn level_for_points(levels: &[RewardLevel], total: i64) -> Option<&RewardLevel> {
    levels.iter().find(|level| level.contains(total))
}

/// The tier after the one containing `total`, if any.
pub fn next_level(levels: &[RewardLevel], total: i64) -> Option<&RewardLevel> {
    let idx = levels.iter().position(|level| level.contains(total))?;
    levels.get(idx + 1)
}

/// Checks that the tiers partition the non-negative integers: the first
/// tier starts at 0, each tier starts exactly one point after the previous
/// one ends, and only the last tier is unbounded.
pub fn validate_level_table(levels: &[RewardLevel]) -> Result<(), String> {
    if levels.is_empty() {
        return Err("level table must contain at least one tier".to_string());
    }
    if levels[0].min_points != 0 {
        return Err(format!(
            "first tier '{}' must start at 0 points, starts at {}",
            levels[0].name, levels[0].min_points
        ));
    }
    for pair in levels.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        match prev.max_points {
            None => {
                return Err(format!(
                    "tier '{}' is unbounded but is not the last tier",
                    prev.name
                ));
            }
            Some(max) if next.min_points != max + 1 => {
                return Err(format!(
                    "gap or overlap between '{}' (max {}) and '{}' (min {})",
                    prev.name, max, next.name, next.min_points
                ));
            }
            Some(max) if max < prev.min_points => {
                return Err(format!("tier '{}' has max below min", prev.name));
            }
            _ => {}
        }
    }
    if levels[levels.len() - 1].max_points.is_some() {
        return Err("last tier must be unbounded (max_points null)".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_a_valid_partition() {
        assert_eq!(validate_level_table(&default_levels()), Ok(()));
    }

    #[test]
    fn level_lookup_is_monotonic() {
        let levels = default_levels();
        let mut last_idx = 0usize;
        for total in [0, 50, 99, 100, 299, 300, 599, 600, 999, 1000, 5000] {
            let level = level_for_points(&levels, total).expect("total must map to a tier");
            let idx = levels.iter().position(|l| l.name == level.name).unwrap();
            assert!(idx >= last_idx, "level order regressed at total={total}");
            last_idx = idx;
        }
    }

    #[test]
    fn boundary_totals_land_in_the_right_tier() {
        let levels = default_levels();
        assert_eq!(level_for_points(&levels, 99).unwrap().name, "Rookie Support Agent");
        assert_eq!(level_for_points(&levels, 100).unwrap().name, "Support Specialist");
        assert_eq!(level_for_points(&levels, 1000).unwrap().name, "Support Master");
        assert_eq!(level_for_points(&levels, i64::MAX).unwrap().name, "Support Master");
    }

    #[test]
    fn partition_validation_rejects_gaps_and_overlaps() {
        let mut gap = default_levels();
        gap[1].min_points = 150; // leaves 100..=149 uncovered
        assert!(validate_level_table(&gap).is_err());

        let mut overlap = default_levels();
        overlap[1].min_points = 90;
        assert!(validate_level_table(&overlap).is_err());

        let mut bounded_top = default_levels();
        bounded_top[4].max_points = Some(2000);
        assert!(validate_level_table(&bounded_top).is_err());
    }

    #[test]
    fn action_types_round_trip() {
        for action in [
            ActionType::CreateTicket,
            ActionType::ResolvedTicket,
            ActionType::FiveStarRating,
            ActionType::AdminAward,
        ] {
            assert_eq!(ActionType::parse(action.as_str()), Some(action));
        }
        assert_eq!(ActionType::parse("bogus_action"), None);
    }
}
