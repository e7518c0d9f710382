use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The language a book is written in.
///
/// Serialized (and stored) as its short code, e.g. `"es"`. Ordering follows
/// the code, so sorted collections list languages alphabetically by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "es")]
    Spanish,
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ge")]
    German,
    #[serde(rename = "pt")]
    Portuguese,
    #[serde(rename = "other")]
    Other,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Spanish,
        Language::English,
        Language::French,
        Language::German,
        Language::Portuguese,
        Language::Other,
    ];

    /// The short code used on the wire and in the database.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
            Language::French => "fr",
            Language::German => "ge",
            Language::Portuguese => "pt",
            Language::Other => "other",
        }
    }

    /// The human readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Language::Spanish => "Spanish",
            Language::English => "English",
            Language::French => "French",
            Language::German => "German",
            Language::Portuguese => "Portuguese",
            Language::Other => "Other",
        }
    }
}

impl Ord for Language {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code().cmp(other.code())
    }
}

impl PartialOrd for Language {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|language| language.code() == code)
            .ok_or_else(|| CoreError::invalid("language", format!("unknown language code '{s}'")))
    }
}
