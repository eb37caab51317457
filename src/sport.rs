use crate::prelude::*;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error("a sport named {0:?} already exists")]
    Duplicate(String),
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub(crate) struct Sport {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) icon_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NewSport {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) icon_url: Option<String>,
}

impl Sport {
    pub(crate) async fn all(transaction: &mut Transaction<'_, Postgres>) -> Result<Vec<Self>, Error> {
        Ok(
            sqlx::query_as::<_, Self>("SELECT id, name, description, icon_url FROM sports ORDER BY name")
                .fetch_all(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn from_name(transaction: &mut Transaction<'_, Postgres>, name: &str) -> Result<Option<Self>, Error> {
        Ok(
            sqlx::query_as::<_, Self>("SELECT id, name, description, icon_url FROM sports WHERE name = $1")
                .bind(name)
                .fetch_optional(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn names(transaction: &mut Transaction<'_, Postgres>) -> Result<HashSet<String>, Error> {
        Ok(
            sqlx::query_scalar::<_, String>("SELECT name FROM sports")
                .fetch_all(&mut **transaction)
                .await?
                .into_iter()
                .collect()
        )
    }

    pub(crate) async fn create(transaction: &mut Transaction<'_, Postgres>, new_sport: &NewSport) -> Result<Self, Error> {
        if Self::from_name(transaction, &new_sport.name).await?.is_some() {
            return Err(Error::Duplicate(new_sport.name.clone()))
        }
        Ok(
            sqlx::query_as::<_, Self>("INSERT INTO sports (name, description, icon_url) VALUES ($1, $2, $3) RETURNING id, name, description, icon_url")
                .bind(&new_sport.name)
                .bind(&new_sport.description)
                .bind(&new_sport.icon_url)
                .fetch_one(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn update(transaction: &mut Transaction<'_, Postgres>, name: &str, description: Option<&str>, icon_url: Option<&str>) -> Result<bool, Error> {
        Ok(
            sqlx::query("UPDATE sports SET description = $1, icon_url = $2 WHERE name = $3")
                .bind(description)
                .bind(icon_url)
                .bind(name)
                .execute(&mut **transaction)
                .await?
                .rows_affected() > 0
        )
    }

    pub(crate) async fn delete(transaction: &mut Transaction<'_, Postgres>, name: &str) -> Result<bool, Error> {
        Ok(sqlx::query("DELETE FROM sports WHERE name = $1").bind(name).execute(&mut **transaction).await?.rows_affected() > 0)
    }
}
