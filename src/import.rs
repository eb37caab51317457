use crate::{
    clan::{
        self,
        Clan,
    },
    prelude::*,
    schedule::{
        self,
        Match,
        NewMatch,
        Stage,
    },
    sport::{
        self,
        Sport,
    },
};

pub(crate) const EXPECTED_HEADERS: [&str; 6] = ["sport", "stage", "clan1", "clan2", "scheduled_for", "venue"];

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Clan(#[from] clan::Error),
    #[error(transparent)] Csv(#[from] csv::Error),
    #[error(transparent)] Schedule(#[from] schedule::Error),
    #[error(transparent)] Sport(#[from] sport::Error),
    #[error("CSV header must be exactly: {}", EXPECTED_HEADERS.join(", "))]
    Header,
    #[error("{} invalid row(s)", .0.len())]
    Rows(Vec<RowError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RowError {
    /// 1-based line in the uploaded file, the header being line 1.
    pub(crate) line: u64,
    pub(crate) problem: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.problem)
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    sport: String,
    stage: String,
    clan1: String,
    clan2: String,
    scheduled_for: String,
    venue: String,
}

/// Validates an uploaded schedule file against the clan and sport stores and
/// turns it into insertable fixtures. All-or-nothing: any invalid row fails
/// the whole batch, with one reported error per offending line.
pub(crate) fn parse_schedule(input: &str, known_clans: &HashSet<String>, known_sports: &HashSet<String>) -> Result<Vec<NewMatch>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());
    if reader.headers()?.iter().collect::<Vec<_>>() != EXPECTED_HEADERS {
        return Err(Error::Header)
    }
    let mut fixtures = Vec::default();
    let mut errors = Vec::default();
    for (idx, result) in reader.deserialize::<ScheduleRow>().enumerate() {
        let line = idx as u64 + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                errors.push(RowError { line, problem: e.to_string() });
                continue
            }
        };
        let mut problems = Vec::default();
        if !known_sports.contains(&row.sport) {
            problems.push(format!("unknown sport {:?}", row.sport));
        }
        let stage = match row.stage.parse::<Stage>() {
            Ok(stage) => Some(stage),
            Err(()) => {
                problems.push(format!("unknown stage {:?}", row.stage));
                None
            }
        };
        for clan in [&row.clan1, &row.clan2] {
            if !known_clans.contains(clan) {
                problems.push(format!("unknown clan {clan:?}"));
            }
        }
        if row.clan1 == row.clan2 {
            problems.push(format!("{:?} cannot play itself", row.clan1));
        }
        let scheduled_for = match DateTime::parse_from_rfc3339(&row.scheduled_for) {
            Ok(scheduled_for) => Some(scheduled_for.with_timezone(&Utc)),
            Err(e) => {
                problems.push(format!("scheduled_for is not an RFC 3339 timestamp: {e}"));
                None
            }
        };
        if problems.is_empty() {
            fixtures.push(NewMatch {
                sport: row.sport,
                stage: stage.unwrap_or(Stage::League),
                clan1: row.clan1,
                clan2: row.clan2,
                scheduled_for: scheduled_for.unwrap_or_else(Utc::now),
                venue: if row.venue.is_empty() { None } else { Some(row.venue) },
            });
        } else {
            errors.extend(problems.into_iter().map(|problem| RowError { line, problem }));
        }
    }
    if errors.is_empty() {
        Ok(fixtures)
    } else {
        Err(Error::Rows(errors))
    }
}

/// Parses and inserts an uploaded schedule in one transaction. Returns the
/// number of fixtures created; every imported match starts out `upcoming`.
pub(crate) async fn import_schedule(transaction: &mut Transaction<'_, Postgres>, input: &str) -> Result<usize, Error> {
    let known_clans = Clan::names(transaction).await?;
    let known_sports = Sport::names(transaction).await?;
    let fixtures = parse_schedule(input, &known_clans, &known_sports)?;
    for fixture in &fixtures {
        Match::create(transaction, fixture).await?;
    }
    Ok(fixtures.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known_clans() -> HashSet<String> {
        ["Phoenix", "Thunder", "Dragon"].into_iter().map(str::to_owned).collect()
    }

    fn known_sports() -> HashSet<String> {
        ["volleyball", "futsal"].into_iter().map(str::to_owned).collect()
    }

    #[test]
    fn valid_file_yields_one_fixture_per_row() {
        let fixtures = parse_schedule(
            "sport,stage,clan1,clan2,scheduled_for,venue\n\
            volleyball,league,Phoenix,Thunder,2024-03-15T17:00:00Z,Main Hall\n\
            futsal,final,Thunder,Dragon,2024-03-20T19:30:00+02:00,\n",
            &known_clans(),
            &known_sports(),
        ).unwrap();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].stage, Stage::League);
        assert_eq!(fixtures[0].venue.as_deref(), Some("Main Hall"));
        assert_eq!(fixtures[1].stage, Stage::Final);
        assert_eq!(fixtures[1].venue, None);
        assert_eq!(fixtures[1].scheduled_for, Utc.with_ymd_and_hms(2024, 3, 20, 17, 30, 0).unwrap());
    }

    #[test]
    fn header_mismatch_rejects_the_file() {
        let result = parse_schedule(
            "sport,stage,home,away,scheduled_for,venue\n\
            volleyball,league,Phoenix,Thunder,2024-03-15T17:00:00Z,\n",
            &known_clans(),
            &known_sports(),
        );
        assert!(matches!(result, Err(Error::Header)));
    }

    #[test]
    fn invalid_rows_fail_the_batch_with_line_numbers() {
        let Err(Error::Rows(errors)) = parse_schedule(
            "sport,stage,clan1,clan2,scheduled_for,venue\n\
            volleyball,league,Phoenix,Thunder,2024-03-15T17:00:00Z,\n\
            volleyball,quarterfinal,Phoenix,Dragon,2024-03-16T17:00:00Z,\n\
            chess,league,Phoenix,Thunder,not-a-timestamp,\n",
            &known_clans(),
            &known_sports(),
        ) else { panic!("expected row errors") };
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].line, 3);
        assert!(errors[0].problem.contains("quarterfinal"));
        assert_eq!(errors[1].line, 4);
        assert!(errors[1].problem.contains("unknown sport"));
        assert_eq!(errors[2].line, 4);
        assert!(errors[2].problem.contains("RFC 3339"));
    }

    #[test]
    fn a_clan_cannot_play_itself() {
        let Err(Error::Rows(errors)) = parse_schedule(
            "sport,stage,clan1,clan2,scheduled_for,venue\n\
            volleyball,semifinal,Phoenix,Phoenix,2024-03-15T17:00:00Z,\n",
            &known_clans(),
            &known_sports(),
        ) else { panic!("expected row errors") };
        assert_eq!(errors, vec![RowError { line: 2, problem: "\"Phoenix\" cannot play itself".to_owned() }]);
    }

    #[test]
    fn unknown_clans_are_rejected() {
        let Err(Error::Rows(errors)) = parse_schedule(
            "sport,stage,clan1,clan2,scheduled_for,venue\n\
            volleyball,league,Phoenix,Ghosts,2024-03-15T17:00:00Z,\n",
            &known_clans(),
            &known_sports(),
        ) else { panic!("expected row errors") };
        assert_eq!(errors, vec![RowError { line: 2, problem: "unknown clan \"Ghosts\"".to_owned() }]);
    }

    #[test]
    fn fields_are_trimmed_before_validation() {
        let fixtures = parse_schedule(
            "sport,stage,clan1,clan2,scheduled_for,venue\n\
            volleyball , league , Phoenix , Thunder , 2024-03-15T17:00:00Z ,\n",
            &known_clans(),
            &known_sports(),
        ).unwrap();
        assert_eq!(fixtures[0].clan1, "Phoenix");
    }
}
