use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// Exercise kinds the backend knows how to count reps for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Exercise {
    Squat,
    Pushup,
    Plank,
    Lunges,
}

impl Exercise {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exercise::Squat => "squat",
            Exercise::Pushup => "pushup",
            Exercise::Plank => "plank",
            Exercise::Lunges => "lunges",
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exercise {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "squat" => Ok(Exercise::Squat),
            "pushup" => Ok(Exercise::Pushup),
            "plank" => Ok(Exercise::Plank),
            "lunges" => Ok(Exercise::Lunges),
            other => bail!("unknown exercise: {other}"),
        }
    }
}

/// One bounded exercise-tracking interval. The id is issued by the
/// backend on start and is opaque to the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub exercise: Exercise,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exercise_round_trips_through_str() {
        for exercise in [
            Exercise::Squat,
            Exercise::Pushup,
            Exercise::Plank,
            Exercise::Lunges,
        ] {
            assert_eq!(exercise.as_str().parse::<Exercise>().unwrap(), exercise);
        }
        assert!("deadlift".parse::<Exercise>().is_err());
    }

    #[test]
    fn exercise_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Exercise::Squat).unwrap(),
            "\"squat\""
        );
    }
}
