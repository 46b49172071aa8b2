// ********* Input data structures ***********

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether an observation comes from an official result or from a poll.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ObservationKind {
    #[serde(rename = "result")]
    Result,
    #[serde(rename = "poll")]
    Poll,
}

impl ObservationKind {
    pub fn parse(s: &str) -> Result<ObservationKind, SeriesError> {
        match s.trim().to_lowercase().as_str() {
            "result" | "resultat" | "résultat" => Ok(ObservationKind::Result),
            "poll" | "sondage" => Ok(ObservationKind::Poll),
            x => Err(SeriesError::invalid_query(format!(
                "unknown observation type {:?}",
                x
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Result => "result",
            ObservationKind::Poll => "poll",
        }
    }
}

/// The coarse left-right classification of a candidate (the "nuance").
///
/// The canonical labels are the French ones used by the datasets. They are
/// also the group keys when grouping by political family.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum PoliticalFamily {
    #[serde(rename = "Extreme gauche")]
    FarLeft,
    #[serde(rename = "Gauche")]
    Left,
    #[serde(rename = "Centre")]
    Centre,
    #[serde(rename = "Droite")]
    Right,
    #[serde(rename = "Extreme droite")]
    FarRight,
    #[serde(rename = "Autre")]
    Other,
}

impl PoliticalFamily {
    pub const ALL: [PoliticalFamily; 6] = [
        PoliticalFamily::FarLeft,
        PoliticalFamily::Left,
        PoliticalFamily::Centre,
        PoliticalFamily::Right,
        PoliticalFamily::FarRight,
        PoliticalFamily::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PoliticalFamily::FarLeft => "Extreme gauche",
            PoliticalFamily::Left => "Gauche",
            PoliticalFamily::Centre => "Centre",
            PoliticalFamily::Right => "Droite",
            PoliticalFamily::FarRight => "Extreme droite",
            PoliticalFamily::Other => "Autre",
        }
    }

    /// Accepts the French labels (with or without the accent) and the
    /// English kebab-case names, case-insensitively.
    pub fn parse(s: &str) -> Result<PoliticalFamily, SeriesError> {
        let normalized = s.trim().to_lowercase().replace('ê', "e").replace('_', "-");
        match normalized.as_str() {
            "extreme gauche" | "far-left" | "far left" => Ok(PoliticalFamily::FarLeft),
            "gauche" | "left" => Ok(PoliticalFamily::Left),
            "centre" | "center" => Ok(PoliticalFamily::Centre),
            "droite" | "right" => Ok(PoliticalFamily::Right),
            "extreme droite" | "far-right" | "far right" => Ok(PoliticalFamily::FarRight),
            "autre" | "other" | "divers" => Ok(PoliticalFamily::Other),
            _ => Err(SeriesError::invalid_query(format!(
                "unknown political family {:?}",
                s
            ))),
        }
    }
}

impl Display for PoliticalFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum GeographicLevel {
    #[serde(rename = "national")]
    National,
    #[serde(rename = "municipal")]
    Municipal,
}

impl GeographicLevel {
    pub fn parse(s: &str) -> Result<GeographicLevel, SeriesError> {
        match s.trim().to_lowercase().as_str() {
            "national" => Ok(GeographicLevel::National),
            "municipal" => Ok(GeographicLevel::Municipal),
            _ => Err(SeriesError::invalid_query(format!(
                "unknown geographic level {:?}",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeographicLevel::National => "national",
            GeographicLevel::Municipal => "municipal",
        }
    }
}

/// Identifies one roster tested inside one poll.
///
/// A poll may test several hypotheses at the same time. A poll without any
/// named hypothesis has `hypothesis == None`.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
pub struct PollContext {
    pub poll_id: String,
    pub hypothesis: Option<String>,
}

/// One candidate's share in one electoral context.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationKind,
    pub election_id: String,
    pub election_type: String,
    pub round: u8,
    pub date: NaiveDate,
    pub candidate_name: String,
    pub affiliated_parties: BTreeSet<String>,
    pub political_family: PoliticalFamily,
    pub geographic_level: GeographicLevel,
    #[serde(default)]
    pub city: String,
    pub percentage_of_expressed: f64,
    pub amount: u64,
    #[serde(default)]
    pub poll_context: Option<PollContext>,
}

impl Observation {
    /// The label of the party set: sorted and comma-joined.
    pub fn parties_label(&self) -> String {
        self.affiliated_parties
            .iter()
            .cloned()
            .collect::<Vec<String>>()
            .join(", ")
    }
}

// ******** Output data structures *********

/// The dimension used to build one series per category.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum GroupBy {
    PoliticalFamily,
    Party,
    CandidateName,
}

impl GroupBy {
    pub const DEFAULT: GroupBy = GroupBy::PoliticalFamily;

    pub fn parse(s: &str) -> Result<GroupBy, SeriesError> {
        match s.trim() {
            "politicalFamily" | "political_family" | "nuance" => Ok(GroupBy::PoliticalFamily),
            "party" => Ok(GroupBy::Party),
            "candidateName" | "candidate_name" | "candidate" => Ok(GroupBy::CandidateName),
            x => Err(SeriesError::invalid_query(format!(
                "cannot group by {:?}",
                x
            ))),
        }
    }

    pub fn group_key(&self, obs: &Observation) -> String {
        match self {
            GroupBy::PoliticalFamily => obs.political_family.label().to_string(),
            GroupBy::Party => obs.parties_label(),
            GroupBy::CandidateName => obs.candidate_name.clone(),
        }
    }
}

/// One reconciled point of a series.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub kind: ObservationKind,
    pub election_id: String,
    pub group_key: String,
    pub political_family: PoliticalFamily,
    pub value: f64,
    pub amount: f64,
    /// Number of distinct contexts (polls, hypotheses or results) averaged into this point.
    pub contexts: usize,
}

/// A group key that spans more than one political family on the same date.
///
/// The first family encountered is kept.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct DataInconsistency {
    pub date: NaiveDate,
    pub election_id: String,
    pub group_key: String,
    pub kept: PoliticalFamily,
    pub ignored: PoliticalFamily,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct Aggregation {
    pub points: Vec<SeriesPoint>,
    pub inconsistencies: Vec<DataInconsistency>,
}

/// Errors that prevent a search from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SeriesError {
    /// A malformed filter or grouping.
    InvalidQuery { reason: String },
    /// The observation store could not answer.
    StoreUnavailable { reason: String },
}

impl SeriesError {
    pub fn invalid_query(reason: impl Into<String>) -> SeriesError {
        SeriesError::InvalidQuery {
            reason: reason.into(),
        }
    }

    pub fn store_unavailable(reason: impl Into<String>) -> SeriesError {
        SeriesError::StoreUnavailable {
            reason: reason.into(),
        }
    }
}

impl Error for SeriesError {}

impl Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesError::InvalidQuery { reason } => write!(f, "InvalidQuery: {}", reason),
            SeriesError::StoreUnavailable { reason } => {
                write!(f, "StoreUnavailable: {}", reason)
            }
        }
    }
}
