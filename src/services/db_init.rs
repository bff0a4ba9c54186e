use mongodb::{bson::doc, Database, IndexModel};

use crate::error::RepoError;

pub async fn ensure_indexes(db: &Database) -> Result<(), RepoError> {
    let col = db.collection::<mongodb::bson::Document>("alerts");

    // monitor scan: active + not yet fired
    let scan = IndexModel::builder()
        .keys(doc! { "active": 1, "fired": 1 })
        .build();
    col.create_index(scan, None).await?;

    // per-user listing, newest first
    let by_user = IndexModel::builder()
        .keys(doc! { "user_id": 1, "created_at": -1 })
        .build();
    col.create_index(by_user, None).await?;

    Ok(())
}
