//! Reads the aggregated poll files: one entry per poll, with the voting
//! intentions of every round and every hypothesis tested.

use chrono::{Datelike, NaiveDate};
use election_series::builder::ContextBuilder;
use serde::{Deserialize, Serialize};

use crate::dashboard::*;

#[derive(PartialEq, Debug, Clone, Deserialize)]
struct PollCandidate {
    #[serde(default)]
    candidat: Option<String>,
    #[serde(default)]
    parti: Option<Vec<String>>,
    #[serde(default)]
    intentions: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Deserialize)]
struct PollHypothesis {
    #[serde(default)]
    hypothese: Option<String>,
    #[serde(default)]
    candidats: Vec<PollCandidate>,
}

#[derive(PartialEq, Debug, Clone, Deserialize)]
struct PollTour {
    tour: String,
    #[serde(default)]
    hypotheses: Vec<PollHypothesis>,
}

#[derive(PartialEq, Debug, Clone, Deserialize)]
struct PollFileEntry {
    id: String,
    #[serde(default)]
    nom_institut: String,
    #[serde(default)]
    debut_enquete: Option<String>,
    fin_enquete: String,
    #[serde(default)]
    rolling: bool,
    #[serde(default)]
    media: bool,
    #[serde(default)]
    commanditaire: Option<String>,
    #[serde(default)]
    lien: Option<String>,
    echantillon: f64,
    #[serde(default)]
    population: Option<String>,
    #[serde(default)]
    tours: Vec<PollTour>,
}

/// The metadata of a poll, as listed by `--polls`.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct PollRecord {
    pub poll_id: String,
    pub nom_institut: String,
    pub debut_enquete: NaiveDate,
    pub fin_enquete: NaiveDate,
    pub rolling: bool,
    pub media: bool,
    pub commanditaire: String,
    pub lien: String,
    pub echantillon: u64,
    pub population: String,
    pub election_type: String,
    pub year: i32,
}

fn tour_number(tour: &str) -> u8 {
    if tour.trim() == "Premier tour" {
        1
    } else {
        2
    }
}

/// The number of respondents behind an intention.
fn respondents(echantillon: f64, intentions: f64) -> u64 {
    let x = (echantillon * intentions / 100.0).round();
    if x > 0.0 {
        x as u64
    } else {
        0
    }
}

fn read_poll_date(poll_id: &str, column: &str, s: &str) -> DashboardResult<NaiveDate> {
    parse_date(s).map_err(|_| DashboardError::InvalidCell {
        id: poll_id.to_string(),
        column: column.to_string(),
        content: s.to_string(),
    })
}

/// Each round is a distinct election: `{election}_t1`, `{election}_t2`.
fn round_election_id(election: &str, round: u8) -> String {
    format!("{}_t{}", election, round)
}

fn poll_observations(
    entry: &PollFileEntry,
    election: &str,
    election_type: &str,
    date: NaiveDate,
    config: &DashboardConfig,
) -> DashboardResult<Vec<Observation>> {
    let mut res: Vec<Observation> = Vec::new();
    for tour in entry.tours.iter() {
        let round = tour_number(&tour.tour);
        let election_id = round_election_id(election, round);
        for hyp in tour.hypotheses.iter() {
            let mut builder = ContextBuilder::poll(
                &election_id,
                election_type,
                round,
                date,
                &entry.id,
                hyp.hypothese.as_deref(),
            )
            .context(SeriesSnafu {})?;
            for cand in hyp.candidats.iter() {
                let intentions = match cand.intentions {
                    Some(x) => x,
                    None => continue,
                };
                let raw_name = match &cand.candidat {
                    Some(n) if !n.trim().is_empty() => n.trim(),
                    _ => {
                        warn!("poll_observations: missing candidate name in poll {}", entry.id);
                        continue;
                    }
                };
                let family = config.nuance_of(raw_name).unwrap_or(PoliticalFamily::Other);
                let parties = config.parties(cand.parti.as_deref().unwrap_or(&[]));
                builder = builder.add_candidate(
                    &config.candidate(raw_name),
                    &parties,
                    family,
                    intentions,
                    respondents(entry.echantillon, intentions),
                );
            }
            res.extend(builder.build());
        }
    }
    Ok(res)
}

/// Reads a poll file.
///
/// Returns the metadata of each poll and the observations of all the candidates
/// with a voting intention.
pub fn read_polls(
    path: &str,
    source: &DataSource,
    config: &DashboardConfig,
) -> DashboardResult<(Vec<PollRecord>, Vec<Observation>)> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let entries: Vec<PollFileEntry> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    info!("read_polls: {:?}: {} polls", path, entries.len());

    let election_type = source
        .election_type
        .clone()
        .context(MissingSourceSettingSnafu {
            path,
            setting: "electionType",
        })?;

    let mut records: Vec<PollRecord> = Vec::new();
    let mut observations: Vec<Observation> = Vec::new();
    for entry in entries.iter() {
        let fin_enquete = read_poll_date(&entry.id, "fin_enquete", &entry.fin_enquete)?;
        let debut_enquete = match &entry.debut_enquete {
            Some(s) => read_poll_date(&entry.id, "debut_enquete", s)?,
            None => fin_enquete,
        };
        let election = source
            .election_id
            .clone()
            .unwrap_or_else(|| format!("{}_{}", election_type, fin_enquete.year()));

        let obs = poll_observations(entry, &election, &election_type, fin_enquete, config)?;
        debug!("read_polls: poll {}: {} observations", entry.id, obs.len());
        observations.extend(obs);

        records.push(PollRecord {
            poll_id: entry.id.clone(),
            nom_institut: entry.nom_institut.clone(),
            debut_enquete,
            fin_enquete,
            rolling: entry.rolling,
            media: entry.media,
            commanditaire: entry.commanditaire.clone().unwrap_or_default(),
            lien: entry.lien.clone().unwrap_or_default(),
            echantillon: respondents(entry.echantillon, 100.0),
            population: entry.population.clone().unwrap_or_default(),
            election_type: election_type.clone(),
            year: fin_enquete.year(),
        });
    }
    Ok((records, observations))
}
