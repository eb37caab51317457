use crate::prelude::*;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub(crate) struct Announcement {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NewAnnouncement {
    pub(crate) title: String,
    pub(crate) body: String,
}

impl Announcement {
    pub(crate) async fn all(transaction: &mut Transaction<'_, Postgres>) -> Result<Vec<Self>, Error> {
        Ok(
            sqlx::query_as::<_, Self>("SELECT id, title, body, posted_at FROM announcements ORDER BY posted_at DESC, id DESC")
                .fetch_all(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn create(transaction: &mut Transaction<'_, Postgres>, new_announcement: &NewAnnouncement) -> Result<Self, Error> {
        Ok(
            sqlx::query_as::<_, Self>("INSERT INTO announcements (title, body, posted_at) VALUES ($1, $2, now()) RETURNING id, title, body, posted_at")
                .bind(&new_announcement.title)
                .bind(&new_announcement.body)
                .fetch_one(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn update(transaction: &mut Transaction<'_, Postgres>, id: i64, title: &str, body: &str) -> Result<bool, Error> {
        Ok(
            sqlx::query("UPDATE announcements SET title = $1, body = $2 WHERE id = $3")
                .bind(title)
                .bind(body)
                .bind(id)
                .execute(&mut **transaction)
                .await?
                .rows_affected() > 0
        )
    }

    pub(crate) async fn delete(transaction: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool, Error> {
        Ok(sqlx::query("DELETE FROM announcements WHERE id = $1").bind(id).execute(&mut **transaction).await?.rows_affected() > 0)
    }
}
