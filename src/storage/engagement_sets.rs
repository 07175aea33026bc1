use std::collections::BTreeSet;

use super::schema::Database;
use crate::engagement::{PersistenceError, SetName, SetPersistence};
use crate::model::QuoteId;

impl Database {
    // ========================================================================
    // Engagement Set Operations
    // ========================================================================

    /// Load every quote id stored under `name`.
    pub async fn load_engagement_set(&self, name: SetName) -> Result<BTreeSet<QuoteId>, sqlx::Error> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT quote_id FROM engagement_sets WHERE set_name = ? ORDER BY quote_id")
                .bind(name.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Replace the contents of the given sets in one transaction.
    ///
    /// Readers never observe one set rewritten and the other not.
    pub async fn replace_engagement_sets(
        &self,
        sets: &[(SetName, &BTreeSet<QuoteId>)],
    ) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (name, ids) in sets {
            sqlx::query("DELETE FROM engagement_sets WHERE set_name = ?")
                .bind(name.as_str())
                .execute(&mut *tx)
                .await?;

            for id in ids.iter() {
                sqlx::query(
                    "INSERT INTO engagement_sets (set_name, quote_id, updated_at) VALUES (?, ?, ?)",
                )
                .bind(name.as_str())
                .bind(*id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

fn persistence_error(e: sqlx::Error) -> PersistenceError {
    PersistenceError::Database(e.to_string())
}

impl SetPersistence for Database {
    async fn load_set(&self, name: SetName) -> Result<BTreeSet<QuoteId>, PersistenceError> {
        self.load_engagement_set(name)
            .await
            .map_err(persistence_error)
    }

    async fn persist_set(
        &self,
        name: SetName,
        ids: &BTreeSet<QuoteId>,
    ) -> Result<(), PersistenceError> {
        self.replace_engagement_sets(&[(name, ids)])
            .await
            .map_err(persistence_error)
    }

    async fn persist_pair(
        &self,
        liked: &BTreeSet<QuoteId>,
        disliked: &BTreeSet<QuoteId>,
    ) -> Result<(), PersistenceError> {
        self.replace_engagement_sets(&[(SetName::Liked, liked), (SetName::Disliked, disliked)])
            .await
            .map_err(persistence_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_set_is_empty() {
        let db = test_db().await;
        assert!(db.load_set(SetName::Liked).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_pair_replaces_both() {
        let db = test_db().await;
        let liked: BTreeSet<QuoteId> = [1, 2, 3].into_iter().collect();
        let disliked: BTreeSet<QuoteId> = [9].into_iter().collect();
        db.persist_pair(&liked, &disliked).await.unwrap();

        let liked2: BTreeSet<QuoteId> = [2].into_iter().collect();
        let disliked2: BTreeSet<QuoteId> = [1, 9].into_iter().collect();
        db.persist_pair(&liked2, &disliked2).await.unwrap();

        assert_eq!(db.load_set(SetName::Liked).await.unwrap(), liked2);
        assert_eq!(db.load_set(SetName::Disliked).await.unwrap(), disliked2);
    }

    #[tokio::test]
    async fn test_persist_set_leaves_other_set_alone() {
        let db = test_db().await;
        db.persist_set(SetName::Disliked, &[5].into_iter().collect())
            .await
            .unwrap();
        db.persist_set(SetName::Liked, &[6].into_iter().collect())
            .await
            .unwrap();

        assert!(db.load_set(SetName::Disliked).await.unwrap().contains(&5));
        assert!(db.load_set(SetName::Liked).await.unwrap().contains(&6));
    }
}
