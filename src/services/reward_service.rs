//! Reward ledger: awards points for catalogued actions, keeps the cached
//! per-user total in step with the transaction log, and derives levels from
//! the threshold table.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    default_levels, level_for_points, next_level, ActionType, PointsCatalog, RewardLevel,
    RewardTransaction, User,
};
use crate::services::notification_service::{level_up_message, points_earned_message, Notifier};
use crate::store::{RewardStore, TicketStore};

/// Result of one award attempt. `awarded: false` with a message covers the
/// invalid-action no-op path; store errors surface as `AppError` instead.
#[derive(Debug, Clone, Serialize)]
pub struct AwardOutcome {
    pub awarded: bool,
    pub points: i64,
    pub total_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type: Option<ActionType>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub leveled_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_level: Option<String>,
}

impl AwardOutcome {
    fn not_awarded(message: impl Into<String>) -> Self {
        Self {
            awarded: false,
            points: 0,
            total_points: 0,
            action_type: None,
            message: message.into(),
            level: None,
            leveled_up: false,
            old_level: None,
            new_level: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelInfo {
    pub current_level: Option<RewardLevel>,
    pub next_level: Option<RewardLevel>,
    pub total_points: i64,
    pub points_to_next_level: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub id: Uuid,
    pub name: String,
    pub points: i64,
    pub level: String,
}

pub struct RewardService {
    tickets: Arc<dyn TicketStore>,
    rewards: Arc<dyn RewardStore>,
    notifier: Arc<dyn Notifier>,
    catalog: PointsCatalog,
}

impl RewardService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        rewards: Arc<dyn RewardStore>,
        notifier: Arc<dyn Notifier>,
        catalog: PointsCatalog,
    ) -> Self {
        Self {
            tickets,
            rewards,
            notifier,
            catalog,
        }
    }

    /// Seed the built-in level table into an empty store. Called once at
    /// startup; a populated table is left untouched.
    pub async fn ensure_default_levels(&self) -> Result<()> {
        if self.rewards.list_levels().await?.is_empty() {
            info!("Seeding default reward level table");
            for level in default_levels() {
                self.rewards.insert_level(&level).await?;
            }
        }
        Ok(())
    }

    /// Award points for a named action. Unknown actions are a no-op result,
    /// not an error; an unknown user is NotFound.
    pub async fn award(
        &self,
        user_id: Uuid,
        action: &str,
        ticket_id: Option<Uuid>,
    ) -> Result<AwardOutcome> {
        match ActionType::parse(action) {
            Some(ActionType::AdminAward) | None => {
                // admin_award carries its points in the request and goes
                // through award_manual, never this path.
                Ok(AwardOutcome::not_awarded("Invalid action type"))
            }
            Some(action) => self.award_typed(user_id, action, ticket_id).await,
        }
    }

    pub async fn award_typed(
        &self,
        user_id: Uuid,
        action: ActionType,
        ticket_id: Option<Uuid>,
    ) -> Result<AwardOutcome> {
        let Some(base_points) = self.catalog.base_points(action) else {
            return Ok(AwardOutcome::not_awarded("Invalid action type"));
        };

        let user = self
            .rewards
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

        let mut points = base_points;
        if action.severity_eligible() {
            if let Some(ticket_id) = ticket_id {
                // A missing or unreadable ticket downgrades to base points.
                match self.tickets.get_ticket(ticket_id).await {
                    Ok(Some(ticket)) => {
                        points += self.catalog.severity_bonus(ticket.priority);
                    }
                    Ok(None) => {
                        warn!(
                            "Severity lookup for award: ticket {} not found, using base points",
                            ticket_id
                        );
                    }
                    Err(e) => {
                        warn!(
                            "Severity lookup for award failed on ticket {}: {}, using base points",
                            ticket_id, e
                        );
                    }
                }
            }
        }

        let description = format!("Earned {points} points for {}", action.display());
        let entry = RewardTransaction::new(user_id, points, action, ticket_id, description);
        self.finish_award(user, entry).await
    }

    /// Manual grant by an administrator; the reason becomes the transaction
    /// description.
    pub async fn award_manual(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        points: i64,
        reason: &str,
        ticket_id: Option<Uuid>,
    ) -> Result<AwardOutcome> {
        if points == 0 {
            return Err(AppError::validation("points must be non-zero"));
        }
        let user = self
            .rewards
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

        let mut entry =
            RewardTransaction::new(user_id, points, ActionType::AdminAward, ticket_id, reason);
        entry.awarded_by = Some(admin_id);
        self.finish_award(user, entry).await
    }

    async fn finish_award(&self, user: User, entry: RewardTransaction) -> Result<AwardOutcome> {
        let levels = self.level_table().await?;
        let old_total = user.reward_points;
        let old_level = level_for_points(&levels, old_total).map(|l| l.name.clone());

        let new_total = self.rewards.apply_award(&entry).await?;

        let new_level = level_for_points(&levels, new_total).cloned();
        let new_level_name = new_level.as_ref().map(|l| l.name.clone());
        let leveled_up = old_level != new_level_name;

        info!(
            "Awarded {} points to user {} for {} (total {})",
            entry.points, user.id, entry.action_type, new_total
        );

        self.dispatch_award_notification(
            &user,
            &entry,
            new_total,
            old_level.as_deref(),
            new_level.as_ref(),
            leveled_up,
        );

        Ok(AwardOutcome {
            awarded: true,
            points: entry.points,
            total_points: new_total,
            action_type: Some(entry.action_type),
            message: entry.description.clone(),
            level: new_level_name.clone(),
            leveled_up,
            old_level: if leveled_up { old_level } else { None },
            new_level: if leveled_up { new_level_name } else { None },
        })
    }

    /// Fire-and-forget; a notifier failure is invisible to the award path.
    fn dispatch_award_notification(
        &self,
        user: &User,
        entry: &RewardTransaction,
        new_total: i64,
        old_level: Option<&str>,
        new_level: Option<&RewardLevel>,
        leveled_up: bool,
    ) {
        if user.email.is_empty() {
            return;
        }
        let (subject, body) = if leveled_up {
            match new_level {
                Some(level) => level_up_message(
                    &user.name,
                    old_level.unwrap_or("unranked"),
                    level,
                    new_total,
                ),
                None => return,
            }
        } else {
            points_earned_message(
                entry.points,
                new_total,
                &entry.action_type.display(),
                new_level.map(|l| l.name.as_str()).unwrap_or("unranked"),
            )
        };
        let notifier = Arc::clone(&self.notifier);
        let recipient = user.email.clone();
        tokio::spawn(async move {
            notifier.notify(&recipient, &subject, &body).await;
        });
    }

    async fn level_table(&self) -> Result<Vec<RewardLevel>> {
        let levels = self.rewards.list_levels().await?;
        if levels.is_empty() {
            // Store not seeded yet; fall back to the built-in table so an
            // award never fails on level derivation.
            Ok(default_levels())
        } else {
            Ok(levels)
        }
    }

    // ==================================================================
    // READ SIDE
    // ==================================================================

    pub async fn user_transactions(&self, user_id: Uuid) -> Result<(i64, Vec<RewardTransaction>)> {
        let user = self
            .rewards
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;
        let transactions = self.rewards.list_transactions(user_id).await?;
        Ok((user.reward_points, transactions))
    }

    pub async fn user_level(&self, user_id: Uuid) -> Result<LevelInfo> {
        let user = self
            .rewards
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;
        let levels = self.level_table().await?;
        let total = user.reward_points;

        let current = level_for_points(&levels, total).cloned();
        let next = next_level(&levels, total).cloned();
        let points_to_next = next
            .as_ref()
            .map(|n| (n.min_points - total).max(0))
            .unwrap_or(0);

        Ok(LevelInfo {
            current_level: current,
            next_level: next,
            total_points: total,
            points_to_next_level: points_to_next,
        })
    }

    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let levels = self.level_table().await?;
        let users = self.rewards.top_users(limit).await?;
        Ok(users
            .into_iter()
            .enumerate()
            .map(|(i, user)| {
                let level = level_for_points(&levels, user.reward_points)
                    .map(|l| l.name.clone())
                    .unwrap_or_else(|| "unranked".to_string());
                LeaderboardEntry {
                    rank: i + 1,
                    id: user.id,
                    name: user.name,
                    points: user.reward_points,
                    level,
                }
            })
            .collect())
    }

    pub async fn list_levels(&self) -> Result<Vec<RewardLevel>> {
        self.level_table().await
    }
}

/// Convenience wrapper for lifecycle handlers: an award failure must never
/// fail the operation that triggered it, so errors are logged and the
/// outcome dropped.
pub async fn try_award(
    service: &RewardService,
    user_id: Uuid,
    action: ActionType,
    ticket_id: Option<Uuid>,
) -> Option<AwardOutcome> {
    match service.award_typed(user_id, action, ticket_id).await {
        Ok(outcome) if outcome.awarded => Some(outcome),
        Ok(_) => None,
        Err(e) => {
            error!("Failed to award {} to user {}: {}", action, user_id, e);
            None
        }
    }
}
