use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    Collection, Database,
};

use crate::{error::RepoError, models::Alert};

/// Durable storage of alert records, as seen by the monitoring cycle.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Alerts with `active = true, fired = false`, with `user_email` resolved.
    async fn list_active_untriggered(&self) -> Result<Vec<Alert>, RepoError>;

    /// Moves an alert into its terminal state. Only succeeds while the alert is
    /// still active and unfired; returns `Ok(false)` when another writer got
    /// there first.
    async fn commit_trigger(
        &self,
        alert_id: ObjectId,
        current_price: f64,
        fired_at: i64,
    ) -> Result<bool, RepoError>;

    async fn mark_notified(&self, alert_id: ObjectId) -> Result<(), RepoError>;

    async fn delete_alert(&self, alert_id: ObjectId) -> Result<(), RepoError>;
}

#[derive(Clone)]
pub struct MongoAlertRepository {
    alerts: Collection<Alert>,
}

impl MongoAlertRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            alerts: db.collection::<Alert>("alerts"),
        }
    }

    fn watching_pipeline() -> Vec<Document> {
        vec![
            doc! { "$match": { "active": true, "fired": false } },
            doc! { "$lookup": {
                "from": "users",
                "localField": "user_id",
                "foreignField": "_id",
                "as": "owner",
            } },
            doc! { "$set": { "user_email": { "$first": "$owner.email" } } },
            doc! { "$project": { "owner": 0 } },
        ]
    }

    /// Matches only while the alert can still fire, so a second writer updates nothing.
    fn commit_filter(alert_id: ObjectId) -> Document {
        doc! { "_id": alert_id, "active": true, "fired": false }
    }

    fn commit_update(current_price: f64, fired_at: i64) -> Document {
        doc! { "$set": {
            "fired": true,
            "active": false,
            "fired_at": fired_at,
            "last_price": current_price,
        } }
    }
}

#[async_trait]
impl AlertRepository for MongoAlertRepository {
    async fn list_active_untriggered(&self) -> Result<Vec<Alert>, RepoError> {
        let mut cursor = self
            .alerts
            .aggregate(Self::watching_pipeline(), None)
            .await?;

        let mut items = Vec::new();
        while let Some(raw) = cursor.try_next().await? {
            match bson::from_document::<Alert>(raw) {
                Ok(a) => items.push(a),
                // one malformed row must not starve every other alert
                Err(e) => tracing::warn!(error = %e, "skipping undecodable alert document"),
            }
        }

        Ok(items)
    }

    async fn commit_trigger(
        &self,
        alert_id: ObjectId,
        current_price: f64,
        fired_at: i64,
    ) -> Result<bool, RepoError> {
        let res = self
            .alerts
            .update_one(
                Self::commit_filter(alert_id),
                Self::commit_update(current_price, fired_at),
                None,
            )
            .await?;

        Ok(res.modified_count == 1)
    }

    async fn mark_notified(&self, alert_id: ObjectId) -> Result<(), RepoError> {
        self.alerts
            .update_one(
                doc! { "_id": alert_id },
                doc! { "$set": { "notified": true } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn delete_alert(&self, alert_id: ObjectId) -> Result<(), RepoError> {
        self.alerts
            .delete_one(doc! { "_id": alert_id }, None)
            .await?;
        Ok(())
    }
}
