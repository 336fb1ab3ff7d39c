use std::fmt;

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

const SURNAME_WIDTH: usize = 5;
const FILLER: char = '9';

/// Fixed length of a [`DerivedIdentifier`] in characters:
/// surname(5) + yymmdd(6) + initials(2) + suffix(3).
pub const IDENTIFIER_LEN: usize = 16;

/// Raw form values as submitted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantForm {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub address2: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// Validated per-request applicant data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantRecord {
    first_name: String,
    last_name: String,
    address1: String,
    address2: String,
    date_of_birth: NaiveDate,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("required field '{0}' is empty")]
    MissingField(&'static str),
    #[error("date of birth '{0}' is not a YYYY-MM-DD date")]
    InvalidDateOfBirth(String),
}

impl ApplicantRecord {
    /// Builds a record, enforcing the non-empty name contract the deriver relies on.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address1: impl Into<String>,
        address2: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Result<Self, IdentityError> {
        let first_name = first_name.into().trim().to_string();
        let last_name = last_name.into().trim().to_string();
        if first_name.is_empty() {
            return Err(IdentityError::MissingField("firstName"));
        }
        if last_name.is_empty() {
            return Err(IdentityError::MissingField("lastName"));
        }

        Ok(Self {
            first_name,
            last_name,
            address1: address1.into().trim().to_string(),
            address2: address2.into().trim().to_string(),
            date_of_birth,
        })
    }

    /// Uses the supplied date of birth when present, otherwise a synthetic one.
    pub fn from_form<R: Rng>(form: ApplicantForm, rng: &mut R) -> Result<Self, IdentityError> {
        let date_of_birth = match form
            .date_of_birth
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
        {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| IdentityError::InvalidDateOfBirth(raw.to_string()))?,
            None => random_date_of_birth(rng),
        };

        Self::new(
            form.first_name,
            form.last_name,
            form.address1,
            form.address2,
            date_of_birth,
        )
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn address1(&self) -> &str {
        &self.address1
    }

    pub fn address2(&self) -> &str {
        &self.address2
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }
}

/// Synthetic document number. Not unique: the numeric suffix is random.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DerivedIdentifier(String);

impl DerivedIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn surname_fragment(&self) -> &str {
        self.chars_between(0, SURNAME_WIDTH)
    }

    pub fn initials(&self) -> &str {
        self.chars_between(11, 13)
    }

    pub fn suffix(&self) -> u16 {
        self.chars_between(13, IDENTIFIER_LEN)
            .parse()
            .unwrap_or_default()
    }

    // Segment boundaries are character positions; names may be multi-byte.
    fn chars_between(&self, start: usize, end: usize) -> &str {
        let offset = |position: usize| {
            self.0
                .char_indices()
                .nth(position)
                .map_or(self.0.len(), |(index, _)| index)
        };
        &self.0[offset(start)..offset(end)]
    }
}

impl fmt::Display for DerivedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composes `SURNM` + `yymmdd` + initials + three random digits.
///
/// Both names must be non-empty; [`ApplicantRecord::new`] enforces that for
/// request-driven callers. Letters are uppercased character by character
/// (`García` gives `GARCÍ`), so the identifier is always sixteen characters
/// even when some of them take more than one byte.
pub fn derive_identifier<R: Rng>(
    first_name: &str,
    last_name: &str,
    date_of_birth: NaiveDate,
    rng: &mut R,
) -> DerivedIdentifier {
    let mut identifier = String::with_capacity(IDENTIFIER_LEN * 4);

    let mut surname = last_name.chars().take(SURNAME_WIDTH).map(normalize);
    for _ in 0..SURNAME_WIDTH {
        identifier.push(surname.next().unwrap_or(FILLER));
    }

    identifier.push_str(&format!(
        "{:02}{:02}{:02}",
        date_of_birth.year().rem_euclid(100),
        date_of_birth.month(),
        date_of_birth.day()
    ));

    let mut given = first_name.chars().map(normalize);
    identifier.push(given.next().unwrap_or(FILLER));
    identifier.push(given.next().unwrap_or(FILLER));

    let suffix: u16 = rng.gen_range(100..=999);
    identifier.push_str(&suffix.to_string());

    DerivedIdentifier(identifier)
}

// Keeps one char per input char: an expanding uppercase (`ß` -> `SS`) keeps its first.
fn normalize(c: char) -> char {
    if c.is_control() {
        FILLER
    } else {
        c.to_uppercase().next().unwrap_or(c)
    }
}

/// Uniform over 1980-01-01 ..= 1994-12-31.
pub fn random_date_of_birth<R: Rng>(rng: &mut R) -> NaiveDate {
    let (start, end) = date_of_birth_window();
    let span = (end - start).num_days();
    start + chrono::Duration::days(rng.gen_range(0..=span))
}

pub fn date_of_birth_window() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or(NaiveDate::MIN),
        NaiveDate::from_ymd_opt(1994, 12, 31).unwrap_or(NaiveDate::MIN),
    )
}

pub fn format_date_of_birth(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Text values placed into the template for one applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields {
    pub first_name: String,
    pub last_name: String,
    pub identifier: DerivedIdentifier,
    pub date_of_birth: String,
    pub address1: String,
    pub address2: String,
}

impl DocumentFields {
    pub fn derive<R: Rng>(record: &ApplicantRecord, rng: &mut R) -> Self {
        Self {
            first_name: record.first_name().to_string(),
            last_name: record.last_name().to_string(),
            identifier: derive_identifier(
                record.first_name(),
                record.last_name(),
                record.date_of_birth(),
                rng,
            ),
            date_of_birth: format_date_of_birth(record.date_of_birth()),
            address1: record.address1().to_string(),
            address2: record.address2().to_string(),
        }
    }
}
