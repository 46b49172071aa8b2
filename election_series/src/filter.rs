use std::collections::HashSet;

use chrono::{DateTime, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::*;

/// A search request, as sent on the wire.
///
/// All the fields are optional. Absent or empty fields do not constrain the search.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default, alias = "electionTypes")]
    pub election_types: Option<Vec<String>>,
    #[serde(default)]
    pub rounds: Option<Vec<u8>>,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub parties: Option<Vec<String>>,
    #[serde(default, alias = "political_families", alias = "politicalFamilies")]
    pub nuances: Option<Vec<String>>,
    #[serde(default)]
    pub candidates: Option<Vec<String>>,
    #[serde(default, alias = "geographic_level", alias = "geographicLevel")]
    pub level: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, alias = "groupBy")]
    pub group_by: Option<String>,
}

/// A typed predicate over observations.
///
/// `None` means no constraint on that dimension.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ObservationFilter {
    pub election_types: Option<HashSet<String>>,
    pub rounds: Option<HashSet<u8>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub parties: Option<HashSet<String>>,
    pub political_families: Option<HashSet<PoliticalFamily>>,
    pub candidates: Option<HashSet<String>>,
    pub geographic_level: Option<GeographicLevel>,
    pub city: Option<String>,
}

impl SearchRequest {
    /// Turns the wire request into a predicate.
    ///
    /// Fails with `InvalidQuery` on unparseable dates, rounds other than 1 or 2,
    /// unknown political families or geographic levels.
    pub fn normalize(&self) -> Result<ObservationFilter, SeriesError> {
        let rounds = match non_empty(&self.rounds) {
            Some(rs) => {
                if let Some(r) = rs.iter().find(|r| **r != 1 && **r != 2) {
                    return Err(SeriesError::invalid_query(format!(
                        "round must be 1 or 2, got {}",
                        r
                    )));
                }
                Some(rs.iter().cloned().collect())
            }
            None => None,
        };

        let political_families = match non_empty(&self.nuances) {
            Some(ns) => Some(
                ns.iter()
                    .map(|n| PoliticalFamily::parse(n))
                    .collect::<Result<HashSet<PoliticalFamily>, SeriesError>>()?,
            ),
            None => None,
        };

        let geographic_level = match non_blank(&self.level) {
            Some(l) => Some(GeographicLevel::parse(l)?),
            None => None,
        };

        let filter = ObservationFilter {
            election_types: non_empty(&self.election_types).map(to_set),
            rounds,
            start_date: non_blank(&self.start_date).map(parse_date).transpose()?,
            end_date: non_blank(&self.end_date).map(parse_date).transpose()?,
            parties: non_empty(&self.parties).map(to_set),
            political_families,
            candidates: non_empty(&self.candidates).map(to_set),
            geographic_level,
            city: non_blank(&self.city).map(|s| s.to_string()),
        };
        debug!("normalize: {:?} -> {:?}", self, filter);
        Ok(filter)
    }

    pub fn group_by(&self) -> Result<GroupBy, SeriesError> {
        match non_blank(&self.group_by) {
            Some(g) => GroupBy::parse(g),
            None => Ok(GroupBy::DEFAULT),
        }
    }

    /// Fields set in `other` take precedence over the ones in `self`.
    pub fn overridden_by(&self, other: &SearchRequest) -> SearchRequest {
        SearchRequest {
            election_types: other.election_types.clone().or_else(|| self.election_types.clone()),
            rounds: other.rounds.clone().or_else(|| self.rounds.clone()),
            start_date: other.start_date.clone().or_else(|| self.start_date.clone()),
            end_date: other.end_date.clone().or_else(|| self.end_date.clone()),
            parties: other.parties.clone().or_else(|| self.parties.clone()),
            nuances: other.nuances.clone().or_else(|| self.nuances.clone()),
            candidates: other.candidates.clone().or_else(|| self.candidates.clone()),
            level: other.level.clone().or_else(|| self.level.clone()),
            city: other.city.clone().or_else(|| self.city.clone()),
            group_by: other.group_by.clone().or_else(|| self.group_by.clone()),
        }
    }
}

impl ObservationFilter {
    pub fn matches(&self, obs: &Observation) -> bool {
        if let Some(ets) = &self.election_types {
            if !ets.contains(&obs.election_type) {
                return false;
            }
        }
        if let Some(rs) = &self.rounds {
            if !rs.contains(&obs.round) {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if obs.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if obs.date > end {
                return false;
            }
        }
        // Any of the affiliated parties is enough.
        if let Some(ps) = &self.parties {
            if !obs.affiliated_parties.iter().any(|p| ps.contains(p)) {
                return false;
            }
        }
        if let Some(fs) = &self.political_families {
            if !fs.contains(&obs.political_family) {
                return false;
            }
        }
        if let Some(cs) = &self.candidates {
            if !cs.contains(&obs.candidate_name) {
                return false;
            }
        }
        if let Some(level) = self.geographic_level {
            if obs.geographic_level != level {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if obs.city != *city {
                return false;
            }
        }
        true
    }
}

/// Parses a calendar date, either `YYYY-MM-DD` or a RFC 3339 timestamp.
pub fn parse_date(s: &str) -> Result<NaiveDate, SeriesError> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc().date())
        .map_err(|e| SeriesError::invalid_query(format!("cannot parse date {:?}: {}", s, e)))
}

fn non_empty<T>(x: &Option<Vec<T>>) -> Option<&Vec<T>> {
    x.as_ref().filter(|v| !v.is_empty())
}

fn non_blank(x: &Option<String>) -> Option<&str> {
    x.as_deref().filter(|s| !s.trim().is_empty())
}

fn to_set(v: &Vec<String>) -> HashSet<String> {
    v.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ContextBuilder;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<Observation> {
        let mut obs = ContextBuilder::result("presidentielle_2022_t1", "presidentielle", 1, day(2022, 4, 10))
            .unwrap()
            .add_candidate("Emmanuel MACRON", &["RENAISSANCE"], PoliticalFamily::Centre, 27.85, 9_783_058)
            .add_candidate("Fabien ROUSSEL", &["PCF"], PoliticalFamily::Left, 2.28, 802_422)
            .build();
        obs.extend(
            ContextBuilder::result("europeenne_2019", "europeenne", 1, day(2019, 5, 26))
                .unwrap()
                .add_candidate("Jordan BARDELLA", &["RN"], PoliticalFamily::FarRight, 23.34, 5_286_939)
                .build(),
        );
        obs
    }

    #[test]
    fn empty_request_matches_everything() {
        let f = SearchRequest::default().normalize().unwrap();
        assert_eq!(f, ObservationFilter::default());
        assert!(sample().iter().all(|o| f.matches(o)));
    }

    #[test]
    fn empty_lists_are_pass_through() {
        let req = SearchRequest {
            election_types: Some(vec![]),
            parties: Some(vec![]),
            city: Some("".to_string()),
            ..Default::default()
        };
        let f = req.normalize().unwrap();
        assert_eq!(f, ObservationFilter::default());
    }

    #[test]
    fn election_types_exclude_others() {
        let req = SearchRequest {
            election_types: Some(vec!["presidentielle".to_string()]),
            ..Default::default()
        };
        let f = req.normalize().unwrap();
        let kept: Vec<Observation> = sample().into_iter().filter(|o| f.matches(o)).collect();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|o| o.election_type == "presidentielle"));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let req = SearchRequest {
            start_date: Some("2019-05-26".to_string()),
            end_date: Some("2022-04-10".to_string()),
            ..Default::default()
        };
        let f = req.normalize().unwrap();
        assert!(sample().iter().all(|o| f.matches(o)));

        let req = SearchRequest {
            end_date: Some("2022-04-09".to_string()),
            ..Default::default()
        };
        let f = req.normalize().unwrap();
        let kept: Vec<Observation> = sample().into_iter().filter(|o| f.matches(o)).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].election_id, "europeenne_2019");
    }

    #[test]
    fn rfc3339_dates_use_the_calendar_day() {
        assert_eq!(parse_date("2022-04-10T00:00:00.000Z").unwrap(), day(2022, 4, 10));
        assert_eq!(parse_date("2022-04-10").unwrap(), day(2022, 4, 10));
    }

    #[test]
    fn malformed_date_is_invalid_query() {
        let req = SearchRequest {
            start_date: Some("10/04/2022".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.normalize(),
            Err(SeriesError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn bad_round_is_invalid_query() {
        let req = SearchRequest {
            rounds: Some(vec![1, 3]),
            ..Default::default()
        };
        assert!(matches!(
            req.normalize(),
            Err(SeriesError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn parties_match_any_affiliation() {
        let obs = ContextBuilder::result("legislative_2022_t1", "legislative", 1, day(2022, 6, 12))
            .unwrap()
            .add_candidate("NUPES", &["LFI", "PS", "EELV", "PCF"], PoliticalFamily::Left, 25.66, 5_836_079)
            .build();
        let req = SearchRequest {
            parties: Some(vec!["PS".to_string()]),
            ..Default::default()
        };
        assert!(req.normalize().unwrap().matches(&obs[0]));
        let req = SearchRequest {
            parties: Some(vec!["LR".to_string()]),
            ..Default::default()
        };
        assert!(!req.normalize().unwrap().matches(&obs[0]));
    }

    #[test]
    fn nuances_accept_french_and_english_labels() {
        let req = SearchRequest {
            nuances: Some(vec!["Extrême droite".to_string(), "centre".to_string()]),
            ..Default::default()
        };
        let f = req.normalize().unwrap();
        let kept: Vec<String> = sample()
            .into_iter()
            .filter(|o| f.matches(o))
            .map(|o| o.candidate_name)
            .collect();
        assert_eq!(kept, vec!["Emmanuel MACRON", "Jordan BARDELLA"]);

        let req = SearchRequest {
            nuances: Some(vec!["Violet".to_string()]),
            ..Default::default()
        };
        assert!(req.normalize().is_err());
    }

    #[test]
    fn group_by_defaults_to_political_family() {
        assert_eq!(SearchRequest::default().group_by().unwrap(), GroupBy::PoliticalFamily);
        let req = SearchRequest {
            group_by: Some("colour".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.group_by(),
            Err(SeriesError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn wire_format_accepts_both_casings() {
        let js = r#"{"election_types": ["presidentielle"], "startDate": "2022-01-01", "groupBy": "party"}"#;
        let req: SearchRequest = serde_json::from_str(js).unwrap();
        assert_eq!(req.election_types, Some(vec!["presidentielle".to_string()]));
        assert_eq!(req.start_date, Some("2022-01-01".to_string()));
        assert_eq!(req.group_by().unwrap(), GroupBy::Party);
    }

    #[test]
    fn flags_override_defaults() {
        let base = SearchRequest {
            level: Some("national".to_string()),
            group_by: Some("party".to_string()),
            ..Default::default()
        };
        let flags = SearchRequest {
            group_by: Some("candidate".to_string()),
            ..Default::default()
        };
        let merged = base.overridden_by(&flags);
        assert_eq!(merged.level, Some("national".to_string()));
        assert_eq!(merged.group_by, Some("candidate".to_string()));
    }
}
