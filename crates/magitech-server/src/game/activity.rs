use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tokio::sync::Mutex;

use crate::models::session_activity::{self, Entity as SessionActivity};

/// Kinds of events recorded in a session's activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    SessionCreated,
    PlayerJoined,
    PlayerLeft,
    HostChanged,
    PositionUpdate,
    Chat,
    CombatStart,
    CombatAction,
    EnemyAttack,
    TurnChange,
    CombatEnd,
    SessionClosed,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::SessionCreated => "session_created",
            ActivityKind::PlayerJoined => "player_joined",
            ActivityKind::PlayerLeft => "player_left",
            ActivityKind::HostChanged => "host_changed",
            ActivityKind::PositionUpdate => "position_update",
            ActivityKind::Chat => "chat",
            ActivityKind::CombatStart => "combat_start",
            ActivityKind::CombatAction => "combat_action",
            ActivityKind::EnemyAttack => "enemy_attack",
            ActivityKind::TurnChange => "turn_change",
            ActivityKind::CombatEnd => "combat_end",
            ActivityKind::SessionClosed => "session_closed",
        }
    }
}

/// Who caused an activity.
#[derive(Debug, Clone, Copy)]
pub enum Actor<'a> {
    User { id: i32, username: &'a str },
    Enemy { name: &'a str },
    System,
}

impl Actor<'_> {
    fn user_id(&self) -> Option<i32> {
        match self {
            Actor::User { id, .. } => Some(*id),
            Actor::Enemy { .. } | Actor::System => None,
        }
    }

    fn name(&self) -> &str {
        match self {
            Actor::User { username, .. } => username,
            Actor::Enemy { name } => name,
            Actor::System => "SYSTEM",
        }
    }
}

/// Append-only, per-session sequenced event log backed by
/// `session_activities`.
///
/// The sequence cache mutex is held across the insert, so rows are written
/// in sequence order and a reader never sees sequence `n + 1` committed
/// before `n`.
#[derive(Debug, Default)]
pub struct ActivityLog {
    sequences: Mutex<HashMap<i32, i64>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and return the stored row.
    pub async fn append(
        &self,
        db: &DatabaseConnection,
        session_id: i32,
        actor: Actor<'_>,
        kind: ActivityKind,
        data: serde_json::Value,
    ) -> Result<session_activity::Model, DbErr> {
        let mut sequences = self.sequences.lock().await;
        let current = match sequences.get(&session_id) {
            Some(seq) => *seq,
            None => max_sequence(db, session_id).await?,
        };
        let next = current + 1;

        let row = session_activity::ActiveModel {
            session_id: Set(session_id),
            user_id: Set(actor.user_id()),
            username: Set(actor.name().to_string()),
            activity_type: Set(kind.as_str().to_string()),
            data: Set(data),
            sequence: Set(next),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        sequences.insert(session_id, next);
        tracing::debug!(session_id, sequence = next, kind = kind.as_str(), "activity");
        Ok(row)
    }

    /// Activities with `sequence > after`, oldest first, at most `limit`.
    pub async fn since(
        &self,
        db: &DatabaseConnection,
        session_id: i32,
        after: i64,
        limit: u64,
    ) -> Result<Vec<session_activity::Model>, DbErr> {
        SessionActivity::find()
            .filter(session_activity::Column::SessionId.eq(session_id))
            .filter(session_activity::Column::Sequence.gt(after))
            .order_by_asc(session_activity::Column::Sequence)
            .limit(limit)
            .all(db)
            .await
    }

    /// Highest sequence number recorded for the session (0 when empty).
    pub async fn latest_sequence(
        &self,
        db: &DatabaseConnection,
        session_id: i32,
    ) -> Result<i64, DbErr> {
        if let Some(seq) = self.sequences.lock().await.get(&session_id) {
            return Ok(*seq);
        }
        max_sequence(db, session_id).await
    }

    /// Drop the cached counter for a closed session.
    pub async fn forget(&self, session_id: i32) {
        self.sequences.lock().await.remove(&session_id);
    }
}

async fn max_sequence(db: &DatabaseConnection, session_id: i32) -> Result<i64, DbErr> {
    let latest = SessionActivity::find()
        .filter(session_activity::Column::SessionId.eq(session_id))
        .order_by_desc(session_activity::Column::Sequence)
        .one(db)
        .await?;
    Ok(latest.map(|a| a.sequence).unwrap_or(0))
}
