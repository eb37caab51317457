use {
    std::collections::BTreeMap,
    tokio::sync::Mutex,
    crate::{
        clan::{
            self,
            Clan,
        },
        prelude::*,
        schedule::{
            self,
            Match,
            MatchStatus,
            Stage,
        },
    },
};

pub(crate) const GOLD_POINTS: i32 = 25;
pub(crate) const SILVER_POINTS: i32 = 15;
pub(crate) const BRONZE_POINTS: i32 = 10;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Clan(#[from] clan::Error),
    #[error(transparent)] Schedule(#[from] schedule::Error),
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error("a standings recalculation is already running")]
    AlreadyRunning,
}

/// Medal counts for one clan, as derived from the match log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct MedalLine {
    pub(crate) gold: i32,
    pub(crate) silver: i32,
    pub(crate) bronze: i32,
}

impl MedalLine {
    pub(crate) fn total_points(&self) -> i32 {
        self.gold * GOLD_POINTS + self.silver * SILVER_POINTS + self.bronze * BRONZE_POINTS
    }
}

/// A match excluded from aggregation because its stored data is inconsistent.
/// Such rows are reported for operator visibility, never guessed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SkippedMatch {
    pub(crate) match_id: i64,
    pub(crate) reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum SkipReason {
    /// The stored winner string equals neither participant. Strict string
    /// equality; a trailing-whitespace or case mismatch lands here too.
    WinnerNotAParticipant {
        winner: String,
    },
    /// The aggregated name has no row in the clan store.
    UnknownClan {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tally {
    /// One entry per known clan, all-zero included.
    pub(crate) lines: BTreeMap<String, MedalLine>,
    pub(crate) skipped: Vec<SkippedMatch>,
}

/// Derives every clan's medal line from the match log. Pure aggregation:
/// only completed finals and third-place matches with a winner count, and
/// a clan absent from every such match ends up all-zero.
pub(crate) fn tally(clan_names: &HashSet<String>, matches: &[Match]) -> Tally {
    let mut lines = clan_names.iter()
        .map(|name| (name.clone(), MedalLine::default()))
        .collect::<BTreeMap<_, _>>();
    let mut skipped = Vec::default();
    for row in matches {
        if row.status != MatchStatus::Completed {
            continue
        }
        let Some(winner) = row.winner.as_deref().filter(|winner| !winner.is_empty()) else { continue };
        match row.stage {
            Stage::Final => {
                let loser = if winner == row.clan1 {
                    &row.clan2
                } else if winner == row.clan2 {
                    &row.clan1
                } else {
                    skipped.push(SkippedMatch {
                        match_id: row.id,
                        reason: SkipReason::WinnerNotAParticipant { winner: winner.to_owned() },
                    });
                    continue
                };
                if let Some(line) = lines.get_mut(winner) {
                    line.gold += 1;
                } else {
                    skipped.push(SkippedMatch {
                        match_id: row.id,
                        reason: SkipReason::UnknownClan { name: winner.to_owned() },
                    });
                }
                if let Some(line) = lines.get_mut(loser) {
                    line.silver += 1;
                } else {
                    skipped.push(SkippedMatch {
                        match_id: row.id,
                        reason: SkipReason::UnknownClan { name: loser.clone() },
                    });
                }
            }
            Stage::ThirdPlace => {
                if winner != row.clan1 && winner != row.clan2 {
                    skipped.push(SkippedMatch {
                        match_id: row.id,
                        reason: SkipReason::WinnerNotAParticipant { winner: winner.to_owned() },
                    });
                    continue
                }
                if let Some(line) = lines.get_mut(winner) {
                    line.bronze += 1;
                } else {
                    skipped.push(SkippedMatch {
                        match_id: row.id,
                        reason: SkipReason::UnknownClan { name: winner.to_owned() },
                    });
                }
            }
            Stage::League | Stage::Semifinal => {}
        }
    }
    Tally { lines, skipped }
}

#[derive(Debug, Serialize)]
pub(crate) struct Report {
    pub(crate) clans: usize,
    pub(crate) skipped: Vec<SkippedMatch>,
}

static RECALC_LOCK: Mutex<()> = Mutex::const_new(());

/// Rebuilds every clan's medal counts and total points from the match log.
///
/// The reset and the additive updates run in one transaction, so a failed run
/// leaves the previous standings in place. At most one recalculation runs at
/// a time; a concurrent invocation is rejected with `Error::AlreadyRunning`.
/// Invoking this twice against an unchanged match log is a no-op the second
/// time around.
pub(crate) async fn recalculate(db_pool: &PgPool) -> Result<Report, Error> {
    let Ok(_guard) = RECALC_LOCK.try_lock() else { return Err(Error::AlreadyRunning) };
    let mut transaction = db_pool.begin().await?;
    let clan_names = Clan::names(&mut transaction).await?;
    let matches = Match::completed_podium(&mut transaction).await?;
    let Tally { lines, skipped } = tally(&clan_names, &matches);
    for skip in &skipped {
        warn!("standings: skipping match {} ({:?})", skip.match_id, skip.reason);
    }
    sqlx::query("UPDATE clans SET total_points = 0, gold_medals = 0, silver_medals = 0, bronze_medals = 0")
        .execute(&mut *transaction)
        .await?;
    for (name, line) in &lines {
        if *line == MedalLine::default() {
            continue // already covered by the reset
        }
        sqlx::query("UPDATE clans SET gold_medals = $1, silver_medals = $2, bronze_medals = $3, total_points = $4 WHERE name = $5")
            .bind(line.gold)
            .bind(line.silver)
            .bind(line.bronze)
            .bind(line.total_points())
            .bind(name)
            .execute(&mut *transaction)
            .await?;
    }
    transaction.commit().await?;
    Ok(Report { clans: lines.len(), skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clans(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn fixture(id: i64, stage: Stage, status: MatchStatus, clan1: &str, clan2: &str, winner: Option<&str>) -> Match {
        Match {
            id,
            sport: "volleyball".to_owned(),
            stage,
            status,
            clan1: clan1.to_owned(),
            clan2: clan2.to_owned(),
            scheduled_for: Utc.with_ymd_and_hms(2024, 3, 15, 17, 0, 0).unwrap(),
            venue: None,
            clan1_score: None,
            clan2_score: None,
            winner: winner.map(str::to_owned),
        }
    }

    #[test]
    fn final_awards_gold_and_silver() {
        let tally = tally(&clans(&["Phoenix", "Thunder"]), &[
            fixture(1, Stage::Final, MatchStatus::Completed, "Phoenix", "Thunder", Some("Phoenix")),
        ]);
        assert!(tally.skipped.is_empty());
        assert_eq!(tally.lines["Phoenix"], MedalLine { gold: 1, silver: 0, bronze: 0 });
        assert_eq!(tally.lines["Phoenix"].total_points(), 25);
        assert_eq!(tally.lines["Thunder"], MedalLine { gold: 0, silver: 1, bronze: 0 });
        assert_eq!(tally.lines["Thunder"].total_points(), 15);
    }

    #[test]
    fn third_place_awards_bronze_without_touching_finalists() {
        let tally = tally(&clans(&["Phoenix", "Thunder", "Dragon", "Kraken"]), &[
            fixture(1, Stage::Final, MatchStatus::Completed, "Phoenix", "Thunder", Some("Phoenix")),
            fixture(2, Stage::ThirdPlace, MatchStatus::Completed, "Dragon", "Kraken", Some("Dragon")),
        ]);
        assert!(tally.skipped.is_empty());
        assert_eq!(tally.lines["Dragon"], MedalLine { gold: 0, silver: 0, bronze: 1 });
        assert_eq!(tally.lines["Dragon"].total_points(), 10);
        assert_eq!(tally.lines["Phoenix"].total_points(), 25);
        assert_eq!(tally.lines["Thunder"].total_points(), 15);
        assert_eq!(tally.lines["Kraken"], MedalLine::default());
    }

    #[test]
    fn upcoming_final_awards_nothing() {
        let tally = tally(&clans(&["Phoenix", "Thunder"]), &[
            fixture(1, Stage::Final, MatchStatus::Upcoming, "Phoenix", "Thunder", Some("Phoenix")),
        ]);
        assert!(tally.skipped.is_empty());
        assert!(tally.lines.values().all(|line| *line == MedalLine::default()));
    }

    #[test]
    fn final_without_winner_awards_nothing() {
        // a missing winner can be stored as null or as an empty string
        for winner in [None, Some("")] {
            let tally = tally(&clans(&["Phoenix", "Thunder"]), &[
                fixture(1, Stage::Final, MatchStatus::Completed, "Phoenix", "Thunder", winner),
            ]);
            assert!(tally.skipped.is_empty());
            assert!(tally.lines.values().all(|line| *line == MedalLine::default()));
        }
    }

    #[test]
    fn empty_match_log_zeroes_everything() {
        let tally = tally(&clans(&["Phoenix", "Thunder", "Dragon"]), &[]);
        assert!(tally.skipped.is_empty());
        assert_eq!(tally.lines.len(), 3);
        assert!(tally.lines.values().all(|line| *line == MedalLine::default()));
    }

    #[test]
    fn league_and_semifinal_matches_never_award_medals() {
        let tally = tally(&clans(&["Phoenix", "Thunder"]), &[
            fixture(1, Stage::League, MatchStatus::Completed, "Phoenix", "Thunder", Some("Phoenix")),
            fixture(2, Stage::Semifinal, MatchStatus::Completed, "Phoenix", "Thunder", Some("Thunder")),
        ]);
        assert!(tally.skipped.is_empty());
        assert!(tally.lines.values().all(|line| *line == MedalLine::default()));
    }

    #[test]
    fn repeated_finals_accumulate_per_winner() {
        let tally = tally(&clans(&["Phoenix", "Thunder"]), &[
            fixture(1, Stage::Final, MatchStatus::Completed, "Phoenix", "Thunder", Some("Phoenix")),
            fixture(2, Stage::Final, MatchStatus::Completed, "Thunder", "Phoenix", Some("Phoenix")),
            fixture(3, Stage::Final, MatchStatus::Completed, "Phoenix", "Thunder", Some("Thunder")),
        ]);
        assert_eq!(tally.lines["Phoenix"], MedalLine { gold: 2, silver: 1, bronze: 0 });
        assert_eq!(tally.lines["Phoenix"].total_points(), 2 * GOLD_POINTS + SILVER_POINTS);
        assert_eq!(tally.lines["Thunder"], MedalLine { gold: 1, silver: 2, bronze: 0 });
    }

    #[test]
    fn winner_matching_neither_participant_is_skipped() {
        // "Phoenix " with trailing whitespace must not be guessed at
        let tally = tally(&clans(&["Phoenix", "Thunder"]), &[
            fixture(1, Stage::Final, MatchStatus::Completed, "Phoenix", "Thunder", Some("Phoenix ")),
        ]);
        assert_eq!(tally.skipped, vec![SkippedMatch {
            match_id: 1,
            reason: SkipReason::WinnerNotAParticipant { winner: "Phoenix ".to_owned() },
        }]);
        assert!(tally.lines.values().all(|line| *line == MedalLine::default()));
    }

    #[test]
    fn winner_absent_from_clan_store_is_reported_but_does_not_abort() {
        let tally = tally(&clans(&["Phoenix"]), &[
            fixture(1, Stage::Final, MatchStatus::Completed, "Phoenix", "Ghosts", Some("Ghosts")),
            fixture(2, Stage::ThirdPlace, MatchStatus::Completed, "Phoenix", "Thunder", Some("Phoenix")),
        ]);
        // the dangling gold is reported, Phoenix still collects silver and bronze
        assert_eq!(tally.skipped, vec![SkippedMatch {
            match_id: 1,
            reason: SkipReason::UnknownClan { name: "Ghosts".to_owned() },
        }]);
        assert_eq!(tally.lines["Phoenix"], MedalLine { gold: 0, silver: 1, bronze: 1 });
    }

    #[test]
    fn tally_is_idempotent_for_a_fixed_match_log() {
        let names = clans(&["Phoenix", "Thunder", "Dragon"]);
        let matches = [
            fixture(1, Stage::Final, MatchStatus::Completed, "Phoenix", "Thunder", Some("Phoenix")),
            fixture(2, Stage::ThirdPlace, MatchStatus::Completed, "Dragon", "Thunder", Some("Dragon")),
        ];
        assert_eq!(tally(&names, &matches), tally(&names, &matches));
    }

    #[test]
    fn total_points_follow_the_medal_weights() {
        let tally = tally(&clans(&["Phoenix", "Thunder", "Dragon"]), &[
            fixture(1, Stage::Final, MatchStatus::Completed, "Phoenix", "Thunder", Some("Phoenix")),
            fixture(2, Stage::Final, MatchStatus::Completed, "Phoenix", "Dragon", Some("Dragon")),
            fixture(3, Stage::ThirdPlace, MatchStatus::Completed, "Thunder", "Dragon", Some("Thunder")),
        ]);
        for line in tally.lines.values() {
            assert_eq!(line.total_points(), line.gold * 25 + line.silver * 15 + line.bronze * 10);
        }
    }
}
