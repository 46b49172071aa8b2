use crate::dashboard::*;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One file to load.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    /// csv, xlsx, json or polls
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// Used when the rows do not carry their own election id.
    #[serde(rename = "electionId", default)]
    pub election_id: Option<String>,
    #[serde(rename = "electionType", default)]
    pub election_type: Option<String>,
    #[serde(default)]
    pub round: Option<u8>,
    #[serde(rename = "excelWorksheetName", default)]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(rename = "dataSources", default)]
    pub data_sources: Vec<DataSource>,
    #[serde(rename = "electionsFile", default)]
    pub elections_file: Option<String>,
    /// Raw party label -> short party label.
    #[serde(rename = "partyMapping", default)]
    pub party_mapping: HashMap<String, String>,
    /// Raw candidate name -> political family.
    #[serde(rename = "nuanceMapping", default)]
    pub nuance_mapping: HashMap<String, String>,
    /// Raw candidate name -> name used in the series.
    #[serde(rename = "candidateNormalization", default)]
    pub candidate_normalization: HashMap<String, String>,
    #[serde(rename = "defaultQuery", default)]
    pub default_query: Option<SearchRequest>,
}

/// The label used when a candidate has no known party.
pub const UNKNOWN_PARTY: &str = "AUTRE";

impl DashboardConfig {
    pub fn candidate(&self, raw_name: &str) -> String {
        self.candidate_normalization
            .get(raw_name)
            .cloned()
            .unwrap_or_else(|| raw_name.to_string())
    }

    /// Maps the party labels, and falls back to AUTRE when none is left.
    pub fn parties(&self, raw_parties: &[String]) -> Vec<String> {
        let mapped: Vec<String> = raw_parties
            .iter()
            .map(|p| self.party_mapping.get(p).unwrap_or(p).trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if mapped.is_empty() {
            vec![UNKNOWN_PARTY.to_string()]
        } else {
            mapped
        }
    }

    /// The family configured for a raw candidate name.
    ///
    /// An unparseable label in the mapping is reported and ignored.
    pub fn nuance_of(&self, raw_name: &str) -> Option<PoliticalFamily> {
        let label = self.nuance_mapping.get(raw_name)?;
        match PoliticalFamily::parse(label) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("nuance_of: {}: {}", raw_name, e);
                None
            }
        }
    }
}

pub fn read_config(path: &str) -> DashboardResult<DashboardConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashboardConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    info!(
        "read_config: {:?}: {} data sources",
        path,
        config.data_sources.len()
    );
    Ok(config)
}
