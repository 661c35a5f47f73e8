use crate::db::models::{Campaign, CampaignMetric, FunnelDatum, Integration, Platform};
use crate::db::schema::SQLITE_INIT;
use crate::db::traits::SyncStore;
use crate::db::upsert::{
    CampaignMetricUpsert, CampaignUpsert, FunnelDatumUpsert, IntegrationUpsert, Upsert,
};
use crate::error::AdsyncError;
use async_trait::async_trait;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::{debug, info};

const INTEGRATION_COLUMNS: &str = "id, workspace_id, platform, access_token, refresh_token, \
    expires_at, platform_user_id, platform_user_name, is_active, settings, created_at, updated_at";

#[derive(Debug)]
pub enum DbActorMessage {
    /// List integrations with `is_active = 1` for one platform.
    ListActiveIntegrations(Platform, RpcReplyPort<Result<Vec<Integration>, AdsyncError>>),

    /// Upsert on (workspace_id, platform) and return the id.
    UpsertIntegration(IntegrationUpsert, RpcReplyPort<Result<i64, AdsyncError>>),

    /// Flip `is_active` off; replies whether a row matched.
    DeactivateIntegration(String, Platform, RpcReplyPort<Result<bool, AdsyncError>>),

    /// Upsert on (integration_id, external_id); replies `(external_id, id)` pairs.
    UpsertCampaigns(
        Vec<CampaignUpsert>,
        RpcReplyPort<Result<Vec<(String, i64)>, AdsyncError>>,
    ),

    /// Upsert on (campaign_id, date).
    UpsertCampaignMetrics(Vec<CampaignMetricUpsert>, RpcReplyPort<Result<usize, AdsyncError>>),

    /// Upsert on (user_id, date, period_type).
    UpsertFunnelData(Vec<FunnelDatumUpsert>, RpcReplyPort<Result<usize, AdsyncError>>),

    GetIntegration(i64, RpcReplyPort<Result<Integration, AdsyncError>>),
    ListCampaigns(i64, RpcReplyPort<Result<Vec<Campaign>, AdsyncError>>),
    ListCampaignMetrics(i64, RpcReplyPort<Result<Vec<CampaignMetric>, AdsyncError>>),
    ListFunnelData(String, RpcReplyPort<Result<Vec<FunnelDatum>, AdsyncError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

fn rpc_failed(op: &str, e: impl std::fmt::Display) -> AdsyncError {
    AdsyncError::RactorError(format!("DbActor {op} RPC failed: {e}"))
}

impl DbActorHandle {
    pub async fn get_integration(&self, id: i64) -> Result<Integration, AdsyncError> {
        ractor::call!(self.actor, DbActorMessage::GetIntegration, id)
            .map_err(|e| rpc_failed("GetIntegration", e))?
    }

    pub async fn list_campaigns(&self, integration_id: i64) -> Result<Vec<Campaign>, AdsyncError> {
        ractor::call!(self.actor, DbActorMessage::ListCampaigns, integration_id)
            .map_err(|e| rpc_failed("ListCampaigns", e))?
    }

    pub async fn list_campaign_metrics(
        &self,
        campaign_id: i64,
    ) -> Result<Vec<CampaignMetric>, AdsyncError> {
        ractor::call!(self.actor, DbActorMessage::ListCampaignMetrics, campaign_id)
            .map_err(|e| rpc_failed("ListCampaignMetrics", e))?
    }

    pub async fn list_funnel_data(&self, user_id: &str) -> Result<Vec<FunnelDatum>, AdsyncError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ListFunnelData,
            user_id.to_string()
        )
        .map_err(|e| rpc_failed("ListFunnelData", e))?
    }
}

#[async_trait]
impl SyncStore for DbActorHandle {
    async fn list_active_integrations(
        &self,
        platform: Platform,
    ) -> Result<Vec<Integration>, AdsyncError> {
        ractor::call!(self.actor, DbActorMessage::ListActiveIntegrations, platform)
            .map_err(|e| rpc_failed("ListActiveIntegrations", e))?
    }

    async fn upsert_integration(&self, row: IntegrationUpsert) -> Result<i64, AdsyncError> {
        ractor::call!(self.actor, DbActorMessage::UpsertIntegration, row)
            .map_err(|e| rpc_failed("UpsertIntegration", e))?
    }

    async fn deactivate_integration(
        &self,
        workspace_id: &str,
        platform: Platform,
    ) -> Result<bool, AdsyncError> {
        ractor::call!(
            self.actor,
            DbActorMessage::DeactivateIntegration,
            workspace_id.to_string(),
            platform
        )
        .map_err(|e| rpc_failed("DeactivateIntegration", e))?
    }

    async fn upsert_campaigns(
        &self,
        rows: Vec<CampaignUpsert>,
    ) -> Result<Vec<(String, i64)>, AdsyncError> {
        ractor::call!(self.actor, DbActorMessage::UpsertCampaigns, rows)
            .map_err(|e| rpc_failed("UpsertCampaigns", e))?
    }

    async fn upsert_campaign_metrics(
        &self,
        rows: Vec<CampaignMetricUpsert>,
    ) -> Result<usize, AdsyncError> {
        ractor::call!(self.actor, DbActorMessage::UpsertCampaignMetrics, rows)
            .map_err(|e| rpc_failed("UpsertCampaignMetrics", e))?
    }

    async fn upsert_funnel_data(&self, rows: Vec<FunnelDatumUpsert>) -> Result<usize, AdsyncError> {
        ractor::call!(self.actor, DbActorMessage::UpsertFunnelData, rows)
            .map_err(|e| rpc_failed("UpsertFunnelData", e))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            DbActorMessage::ListActiveIntegrations(platform, reply) => {
                let _ = reply.send(list_active_integrations(pool, platform).await);
            }
            DbActorMessage::UpsertIntegration(row, reply) => {
                let res = upsert_batch(pool, std::slice::from_ref(&row))
                    .await
                    .and_then(|ids| {
                        ids.first().copied().ok_or_else(|| {
                            AdsyncError::UnexpectedError("integration upsert returned no id".into())
                        })
                    });
                let _ = reply.send(res);
            }
            DbActorMessage::DeactivateIntegration(workspace_id, platform, reply) => {
                let _ = reply.send(deactivate_integration(pool, &workspace_id, platform).await);
            }
            DbActorMessage::UpsertCampaigns(rows, reply) => {
                let res = upsert_batch(pool, &rows).await.map(|ids| {
                    rows.into_iter()
                        .zip(ids)
                        .map(|(row, id)| (row.external_id, id))
                        .collect()
                });
                let _ = reply.send(res);
            }
            DbActorMessage::UpsertCampaignMetrics(rows, reply) => {
                let _ = reply.send(upsert_batch(pool, &rows).await.map(|ids| ids.len()));
            }
            DbActorMessage::UpsertFunnelData(rows, reply) => {
                let _ = reply.send(upsert_batch(pool, &rows).await.map(|ids| ids.len()));
            }
            DbActorMessage::GetIntegration(id, reply) => {
                let _ = reply.send(get_integration(pool, id).await);
            }
            DbActorMessage::ListCampaigns(integration_id, reply) => {
                let res = sqlx::query_as::<_, Campaign>(
                    "SELECT * FROM campaigns WHERE integration_id = ? ORDER BY id",
                )
                .bind(integration_id)
                .fetch_all(pool)
                .await
                .map_err(AdsyncError::from);
                let _ = reply.send(res);
            }
            DbActorMessage::ListCampaignMetrics(campaign_id, reply) => {
                let res = sqlx::query_as::<_, CampaignMetric>(
                    "SELECT * FROM campaign_metrics WHERE campaign_id = ? ORDER BY date",
                )
                .bind(campaign_id)
                .fetch_all(pool)
                .await
                .map_err(AdsyncError::from);
                let _ = reply.send(res);
            }
            DbActorMessage::ListFunnelData(user_id, reply) => {
                let res = sqlx::query_as::<_, FunnelDatum>(
                    "SELECT * FROM funnel_data WHERE user_id = ? ORDER BY date",
                )
                .bind(user_id)
                .fetch_all(pool)
                .await
                .map_err(AdsyncError::from);
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

/// Writes all rows in one transaction; ids come back in input order.
async fn upsert_batch<T: Upsert>(pool: &SqlitePool, rows: &[T]) -> Result<Vec<i64>, AdsyncError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let sql = T::upsert_sql();
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row
            .bind(sqlx::query_scalar(&sql))
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
        ids.push(id);
    }
    tx.commit().await?;

    debug!(table = T::TABLE, rows = ids.len(), "db upsert applied");
    Ok(ids)
}

async fn list_active_integrations(
    pool: &SqlitePool,
    platform: Platform,
) -> Result<Vec<Integration>, AdsyncError> {
    let rows = sqlx::query_as::<_, Integration>(&format!(
        "SELECT {INTEGRATION_COLUMNS} FROM integrations \
         WHERE platform = ? AND is_active = 1 ORDER BY id"
    ))
    .bind(platform)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

async fn get_integration(pool: &SqlitePool, id: i64) -> Result<Integration, AdsyncError> {
    sqlx::query_as::<_, Integration>(&format!(
        "SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AdsyncError::NotFound(format!("integration {id} not found")))
}

async fn deactivate_integration(
    pool: &SqlitePool,
    workspace_id: &str,
    platform: Platform,
) -> Result<bool, AdsyncError> {
    let res = sqlx::query(
        r#"
        UPDATE integrations
        SET is_active = 0, updated_at = ?
        WHERE workspace_id = ? AND platform = ?
        "#,
    )
    .bind(Utc::now())
    .bind(workspace_id)
    .bind(platform)
    .execute(pool)
    .await?;

    let affected = res.rows_affected();
    debug!(workspace_id, platform = %platform, affected, "integration deactivated");
    Ok(affected > 0)
}

/// Spawn the database actor and return a cloneable handle.
///
/// The actor is unnamed so several stores can coexist in one process.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, AdsyncError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| AdsyncError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), AdsyncError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
