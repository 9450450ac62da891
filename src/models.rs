use std::ops::RangeInclusive;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const TITLE_LEN: RangeInclusive<usize> = 2..=150;
pub const DESCRIPTION_LEN: RangeInclusive<usize> = 5..=500;
pub const RELEASE_YEARS: RangeInclusive<i32> = 1900..=2030;
pub const RATINGS: RangeInclusive<f32> = 0.0..=10.0;
pub const ACTOR_NAME_LEN: RangeInclusive<usize> = 3..=100;

/// A catalog entry as stored in the primary database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub release_year: i32,
    pub rating: f32,
}

/// Field values supplied by a caller when creating or replacing a film.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FilmInput {
    pub title: String,
    pub description: String,
    pub release_year: i32,
    pub rating: f32,
}

impl FilmInput {
    /// Trims the text fields and checks every field against its allowed range.
    pub fn validate(self) -> AppResult<Self> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();

        check_len("title", &title, TITLE_LEN)?;
        check_len("description", &description, DESCRIPTION_LEN)?;

        if !RELEASE_YEARS.contains(&self.release_year) {
            return Err(AppError::InvalidArgument(format!(
                "release_year must be between {} and {}",
                RELEASE_YEARS.start(),
                RELEASE_YEARS.end()
            )));
        }

        // NaN fails the range check as well.
        if !RATINGS.contains(&self.rating) {
            return Err(AppError::InvalidArgument(format!(
                "rating must be between {} and {}",
                RATINGS.start(),
                RATINGS.end()
            )));
        }

        Ok(Self { title, description, ..self })
    }
}

fn check_len(field: &str, value: &str, allowed: RangeInclusive<usize>) -> AppResult<()> {
    let len = value.chars().count();
    if allowed.contains(&len) {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "{field} must be between {} and {} characters, got {len}",
            allowed.start(),
            allowed.end()
        )))
    }
}

/// Optional search predicates. Absent fields do not take part in the query.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SearchFilters {
    pub title: Option<String>,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub rating: Option<f32>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.release_year.is_none()
            && self.rating.is_none()
    }

    /// Drops text filters that are blank after trimming.
    pub fn normalized(self) -> Self {
        fn non_blank(s: Option<String>) -> Option<String> {
            s.and_then(|s| {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            })
        }

        Self { title: non_blank(self.title), description: non_blank(self.description), ..self }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
    /// Documents dropped because their film no longer exists.
    pub removed: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub gender: Gender,
    pub birth_date: Date,
}

/// Actor fields as sent by a caller, before validation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ActorInput {
    pub name: String,
    pub gender: String,
    pub birth_date: String,
}

/// Validated actor fields, ready to store.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorFields {
    pub name: String,
    pub gender: Gender,
    pub birth_date: Date,
}

impl ActorInput {
    pub fn validate(self) -> AppResult<ActorFields> {
        let name = self.name.trim().to_string();
        check_len("name", &name, ACTOR_NAME_LEN)?;

        let gender = Gender::from_code(self.gender.trim()).ok_or_else(|| {
            AppError::InvalidArgument("gender must be 'M' or 'F'".to_string())
        })?;

        let birth_date = parse_birth_date(self.birth_date.trim())?;

        Ok(ActorFields { name, gender, birth_date })
    }
}

/// Accepts exactly `YYYY-MM-DD` naming a real calendar day.
fn parse_birth_date(raw: &str) -> AppResult<Date> {
    let invalid = || AppError::InvalidArgument("birth_date must be a YYYY-MM-DD date".to_string());
    if raw.len() != 10 {
        return Err(invalid());
    }
    jiff::fmt::strtime::parse("%Y-%m-%d", raw)
        .and_then(|tm| tm.to_date())
        .map_err(|_| invalid())
}
