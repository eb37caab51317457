use {
    std::cmp::Ordering,
    itertools::Itertools as _,
    lazy_regex::regex_is_match,
    crate::prelude::*,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error("clan names must start with a letter or digit and stay within 40 characters of letters, digits, spaces, or .'-")]
    InvalidName,
    #[error("a clan named {0:?} already exists")]
    Duplicate(String),
}

/// A participating team. `total_points` and the three medal columns are
/// derived from the match log and only ever written by the standings
/// recalculation; profile edits must leave them alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub(crate) struct Clan {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) logo_url: Option<String>,
    pub(crate) total_points: i32,
    pub(crate) gold_medals: i32,
    pub(crate) silver_medals: i32,
    pub(crate) bronze_medals: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NewClan {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) logo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClanProfile {
    pub(crate) description: Option<String>,
    pub(crate) logo_url: Option<String>,
}

/// Leaderboard order: total points, ties broken by gold, then silver, then
/// bronze count, then name for a stable listing.
pub(crate) fn standings_order(lhs: &Clan, rhs: &Clan) -> Ordering {
    rhs.total_points.cmp(&lhs.total_points)
        .then_with(|| rhs.gold_medals.cmp(&lhs.gold_medals))
        .then_with(|| rhs.silver_medals.cmp(&lhs.silver_medals))
        .then_with(|| rhs.bronze_medals.cmp(&lhs.bronze_medals))
        .then_with(|| lhs.name.cmp(&rhs.name))
}

impl Clan {
    pub(crate) async fn all(transaction: &mut Transaction<'_, Postgres>) -> Result<Vec<Self>, Error> {
        Ok(
            sqlx::query_as::<_, Self>("SELECT id, name, description, logo_url, total_points, gold_medals, silver_medals, bronze_medals FROM clans ORDER BY name")
                .fetch_all(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn from_name(transaction: &mut Transaction<'_, Postgres>, name: &str) -> Result<Option<Self>, Error> {
        Ok(
            sqlx::query_as::<_, Self>("SELECT id, name, description, logo_url, total_points, gold_medals, silver_medals, bronze_medals FROM clans WHERE name = $1")
                .bind(name)
                .fetch_optional(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn names(transaction: &mut Transaction<'_, Postgres>) -> Result<HashSet<String>, Error> {
        Ok(
            sqlx::query_scalar::<_, String>("SELECT name FROM clans")
                .fetch_all(&mut **transaction)
                .await?
                .into_iter()
                .collect()
        )
    }

    pub(crate) async fn leaderboard(transaction: &mut Transaction<'_, Postgres>) -> Result<Vec<Self>, Error> {
        Ok(Self::all(transaction).await?.into_iter().sorted_by(standings_order).collect())
    }

    pub(crate) async fn create(transaction: &mut Transaction<'_, Postgres>, new_clan: &NewClan) -> Result<Self, Error> {
        if !regex_is_match!(r"^[A-Za-z0-9][A-Za-z0-9 .'-]{0,39}$", &new_clan.name) {
            return Err(Error::InvalidName)
        }
        if Self::from_name(transaction, &new_clan.name).await?.is_some() {
            return Err(Error::Duplicate(new_clan.name.clone()))
        }
        Ok(
            sqlx::query_as::<_, Self>("INSERT INTO clans (name, description, logo_url) VALUES ($1, $2, $3) RETURNING id, name, description, logo_url, total_points, gold_medals, silver_medals, bronze_medals")
                .bind(&new_clan.name)
                .bind(&new_clan.description)
                .bind(&new_clan.logo_url)
                .fetch_one(&mut **transaction)
                .await?
        )
    }

    pub(crate) async fn update_profile(transaction: &mut Transaction<'_, Postgres>, name: &str, profile: &ClanProfile) -> Result<bool, Error> {
        Ok(
            sqlx::query("UPDATE clans SET description = $1, logo_url = $2 WHERE name = $3")
                .bind(&profile.description)
                .bind(&profile.logo_url)
                .bind(name)
                .execute(&mut **transaction)
                .await?
                .rows_affected() > 0
        )
    }

    pub(crate) async fn delete(transaction: &mut Transaction<'_, Postgres>, name: &str) -> Result<bool, Error> {
        Ok(sqlx::query("DELETE FROM clans WHERE name = $1").bind(name).execute(&mut **transaction).await?.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clan(name: &str, points: i32, gold: i32, silver: i32, bronze: i32) -> Clan {
        Clan {
            id: 0,
            name: name.to_owned(),
            description: None,
            logo_url: None,
            total_points: points,
            gold_medals: gold,
            silver_medals: silver,
            bronze_medals: bronze,
        }
    }

    #[test]
    fn leaderboard_orders_by_points_then_medals_then_name() {
        let mut clans = vec![
            clan("Falcons", 25, 1, 0, 0),
            clan("Sharks", 40, 1, 1, 0),
            clan("Wolves", 25, 0, 1, 1),
            clan("Eagles", 25, 1, 0, 0),
        ];
        clans.sort_by(standings_order);
        let names = clans.iter().map(|clan| &*clan.name).collect::<Vec<_>>();
        assert_eq!(names, ["Sharks", "Eagles", "Falcons", "Wolves"]);
    }

    #[test]
    fn zero_point_clans_order_alphabetically() {
        let mut clans = vec![clan("Thunder", 0, 0, 0, 0), clan("Phoenix", 0, 0, 0, 0)];
        clans.sort_by(standings_order);
        assert_eq!(clans[0].name, "Phoenix");
    }
}
