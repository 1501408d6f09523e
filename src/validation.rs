//! Input validation for citizen identity fields and age-check requests.
//!
//! Everything the device is sent passes through these checks first. The
//! validated newtypes (`Pin`, `MinimumAge`, `CitizenIdentity`) can only be
//! built through them, so command construction downstream is infallible.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

static PIN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4,8}$").expect("valid PIN regex"));

/// Earliest accepted birth year.
pub const MIN_BIRTH_YEAR: i32 = 1900;

/// Accepted range for the minimum age of an HTTP age check.
pub const MIN_AGE_RANGE: std::ops::RangeInclusive<i64> = 13..=100;

/// A field failed validation. The message is safe to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid name. Must contain at least 2 letters.")]
    Name,
    #[error("Invalid National ID. Must contain only digits.")]
    NationalId,
    #[error("Invalid date format. Please use YYYY-MM-DD.")]
    DateOfBirth,
    #[error("Invalid sex. Please enter 'M' for Male or 'F' for Female.")]
    Sex,
    #[error("Invalid PIN format")]
    Pin,
    #[error("Invalid minimum age")]
    MinimumAge,
    #[error("Invalid command argument: {0}")]
    CommandArgument(String),
}

/// Names need two or more characters, letters only apart from spaces and hyphens.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let clean = name.trim();
    if clean.chars().count() < 2 {
        return Err(ValidationError::Name);
    }
    let letters: String = clean.chars().filter(|c| *c != ' ' && *c != '-').collect();
    if letters.is_empty() || !letters.chars().all(char::is_alphabetic) {
        return Err(ValidationError::Name);
    }
    Ok(clean.to_string())
}

pub fn validate_national_id(national_id: &str) -> Result<String, ValidationError> {
    let id = national_id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::NationalId);
    }
    Ok(id.to_string())
}

/// Parse a `YYYY-MM-DD` birth date whose year lies in `[1900, current_year]`.
pub fn validate_date_of_birth(
    date: &str,
    current_year: i32,
) -> Result<NaiveDate, ValidationError> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::DateOfBirth)?;
    if !(MIN_BIRTH_YEAR..=current_year).contains(&parsed.year()) {
        return Err(ValidationError::DateOfBirth);
    }
    Ok(parsed)
}

/// Sex as stored on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Self::Male),
            "F" => Ok(Self::Female),
            _ => Err(ValidationError::Sex),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device PIN: 4 to 8 ASCII digits and nothing else, surrounding
/// whitespace included.
///
/// `Debug` masks the digits so PINs never end up in logs by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if !PIN_PATTERN.is_match(input) {
            return Err(ValidationError::Pin);
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// One `*` per digit.
    pub fn masked(&self) -> String {
        "*".repeat(self.0.len())
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({})", self.masked())
    }
}

/// Minimum age for an age check, within [`MIN_AGE_RANGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumAge(u8);

impl MinimumAge {
    /// The threshold used by the post-provisioning self-test.
    pub const ADULT: MinimumAge = MinimumAge(18);

    pub fn new(age: i64) -> Result<Self, ValidationError> {
        if !MIN_AGE_RANGE.contains(&age) {
            return Err(ValidationError::MinimumAge);
        }
        Ok(Self(age as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for MinimumAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully validated citizen record, ready to be written to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitizenIdentity {
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
    national_id: String,
    sex: Sex,
    pin: Pin,
}

impl CitizenIdentity {
    /// Validate all six fields, using today's year as the birth-year ceiling.
    pub fn new(
        first_name: &str,
        last_name: &str,
        date_of_birth: &str,
        national_id: &str,
        sex: &str,
        pin: &str,
    ) -> Result<Self, ValidationError> {
        let current_year = chrono::Local::now().year();
        Ok(Self {
            first_name: validate_name(first_name)?,
            last_name: validate_name(last_name)?,
            date_of_birth: validate_date_of_birth(date_of_birth, current_year)?,
            national_id: validate_national_id(national_id)?,
            sex: Sex::parse(sex)?,
            pin: Pin::parse(pin)?,
        })
    }

    /// Assemble an identity from fields that were validated one by one.
    pub fn from_parts(
        first_name: String,
        last_name: String,
        date_of_birth: NaiveDate,
        national_id: String,
        sex: Sex,
        pin: Pin,
    ) -> Self {
        Self {
            first_name,
            last_name,
            date_of_birth,
            national_id,
            sex,
            pin,
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }

    /// Birth date in the wire format, `YYYY-MM-DD`.
    pub fn date_of_birth_text(&self) -> String {
        self.date_of_birth.format("%Y-%m-%d").to_string()
    }

    pub fn national_id(&self) -> &str {
        &self.national_id
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn pin(&self) -> &Pin {
        &self.pin
    }
}
