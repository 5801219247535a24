use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Month};

const WIRE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DISPLAY_FORMAT: &[FormatItem<'static>] = format_description!("[month]/[day]/[year]");
// Hand-typed dates may drop the leading zeros ("6/28/1947").
const DISPLAY_INPUT_FORMAT: &[FormatItem<'static>] =
    format_description!("[month padding:none]/[day padding:none]/[year]");

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("unrecognised date {input:?} (expected YYYY-MM-DD or MM/DD/YYYY)")]
    Unrecognised { input: String },
    #[error("{year:04}-{month:02}-{day:02} is not a calendar date")]
    OutOfRange { year: i32, month: u8, day: u8 },
}

/// Calendar date of a contact. Serialized in wire form (`YYYY-MM-DD`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct ContactDate(Date);

impl ContactDate {
    pub fn from_calendar(year: i32, month: u8, day: u8) -> Result<Self, DateError> {
        let out_of_range = || DateError::OutOfRange { year, month, day };
        let month_value = Month::try_from(month).map_err(|_| out_of_range())?;
        Date::from_calendar_date(year, month_value, day)
            .map(Self)
            .map_err(|_| out_of_range())
    }

    /// Accepts wire form (optionally followed by a `T...` time suffix, which is
    /// dropped) or display form.
    pub fn parse(input: &str) -> Result<Self, DateError> {
        let trimmed = input.trim();
        let unrecognised = || DateError::Unrecognised {
            input: input.to_owned(),
        };
        if trimmed.contains('/') {
            return Date::parse(trimmed, DISPLAY_INPUT_FORMAT)
                .map(Self)
                .map_err(|_| unrecognised());
        }
        let day_part = trimmed.split('T').next().unwrap_or(trimmed);
        Date::parse(day_part, WIRE_FORMAT)
            .map(Self)
            .map_err(|_| unrecognised())
    }

    /// Like [`ContactDate::parse`], but a blank input resolves to `fallback`.
    pub fn parse_or(input: &str, fallback: ContactDate) -> Result<Self, DateError> {
        if input.trim().is_empty() {
            Ok(fallback)
        } else {
            Self::parse(input)
        }
    }

    pub fn to_wire(&self) -> String {
        self.0
            .format(WIRE_FORMAT)
            .unwrap_or_else(|_| self.0.to_string())
    }

    pub fn to_display(&self) -> String {
        self.0.format(DISPLAY_FORMAT).unwrap_or_else(|_| {
            format!(
                "{:02}/{:02}/{:04}",
                u8::from(self.0.month()),
                self.0.day(),
                self.0.year()
            )
        })
    }
}

impl From<Date> for ContactDate {
    fn from(date: Date) -> Self {
        Self(date)
    }
}

impl fmt::Display for ContactDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for ContactDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `MM/DD/YYYY` to `YYYY-MM-DD`, as a form submission needs it.
pub fn display_to_wire(display: &str) -> Result<String, DateError> {
    ContactDate::parse(display).map(|date| date.to_wire())
}

/// `YYYY-MM-DD` (or a server timestamp) to `MM/DD/YYYY`.
pub fn wire_to_display(wire: &str) -> Result<String, DateError> {
    ContactDate::parse(wire).map(|date| date.to_display())
}
