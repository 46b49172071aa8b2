use serde::{Deserialize, Serialize};

use crate::dashboard::*;

/// Turnout of one round.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TourData {
    pub tour_number: u8,
    pub date: String,
    pub inscrits_amount: u64,
    pub abstentions_amount: u64,
    pub abstentions_pourcentage_inscrits: f64,
    pub votants_amount: u64,
    pub votants_pourcentage_inscrits: f64,
    pub blancs_amount: u64,
    pub blancs_pourcentage_inscrits: f64,
    pub blancs_pourcentage_votants: f64,
    pub nuls_amount: u64,
    pub nuls_pourcentage_inscrits: f64,
    pub nuls_pourcentage_votants: f64,
    pub exprimes_amount: u64,
    pub exprimes_pourcentage_inscrits: f64,
    pub exprimes_pourcentage_votants: f64,
}

fn default_level() -> String {
    "national".to_string()
}

fn default_source() -> String {
    "data.gouv.fr".to_string()
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub election_id: String,
    pub election_type: String,
    pub year: i32,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub location: String,
    pub tour_1: TourData,
    #[serde(default)]
    pub tour_2: Option<TourData>,
    #[serde(default = "default_source")]
    pub source: String,
}

pub fn read_elections(path: &str) -> DashboardResult<Vec<Election>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let elections: Vec<Election> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    for e in elections.iter() {
        if e.tour_1.tour_number != 1 {
            whatever!("{}: the first round of {} is numbered {}", path, e.election_id, e.tour_1.tour_number);
        }
    }
    info!("read_elections: {:?}: {} elections", path, elections.len());
    Ok(elections)
}

/// Most recent first.
pub fn sorted_by_year(elections: &[Election]) -> Vec<&Election> {
    let mut res: Vec<&Election> = elections.iter().collect();
    res.sort_by(|a, b| b.year.cmp(&a.year));
    res
}

pub fn find_election<'a>(elections: &'a [Election], id: &str) -> DashboardResult<&'a Election> {
    elections
        .iter()
        .find(|e| e.election_id == id)
        .context(ElectionNotFoundSnafu { id })
}
