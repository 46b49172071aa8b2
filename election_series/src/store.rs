//! Access to the observations.
//!
//! The aggregation only needs a bulk projection query and a listing of
//! distinct values. Any backend can provide them; [`MemoryStore`] keeps
//! everything in memory.

use std::collections::BTreeSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{aggregate_detailed, Observation, ObservationFilter, SearchRequest, SeriesError, SeriesPoint};

/// The fields that can be listed with [`ObservationStore::distinct_values`].
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Field {
    Party,
    PoliticalFamily,
    CandidateName,
    City,
    ElectionType,
}

pub trait ObservationStore {
    /// All the observations matching the filter, in insertion order.
    fn find(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, SeriesError>;

    fn distinct_values(&self, field: Field) -> Result<BTreeSet<String>, SeriesError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    observations: Vec<Observation>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            observations: Vec::new(),
        }
    }

    pub fn insert_many(&mut self, observations: Vec<Observation>) {
        debug!("insert_many: {} observations", observations.len());
        self.observations.extend(observations);
    }

    pub fn clear(&mut self) {
        info!("clear: dropping {} observations", self.observations.len());
        self.observations.clear();
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}

impl ObservationStore for MemoryStore {
    fn find(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, SeriesError> {
        Ok(self
            .observations
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }

    fn distinct_values(&self, field: Field) -> Result<BTreeSet<String>, SeriesError> {
        let mut res: BTreeSet<String> = BTreeSet::new();
        for o in self.observations.iter() {
            match field {
                Field::Party => res.extend(o.affiliated_parties.iter().cloned()),
                Field::PoliticalFamily => {
                    res.insert(o.political_family.label().to_string());
                }
                Field::CandidateName => {
                    res.insert(o.candidate_name.clone());
                }
                Field::City => {
                    res.insert(o.city.clone());
                }
                Field::ElectionType => {
                    res.insert(o.election_type.clone());
                }
            }
        }
        Ok(res)
    }
}

/// The values available to build a search, each list sorted.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    pub parties: Vec<String>,
    pub nuances: Vec<String>,
    pub candidates: Vec<String>,
    pub cities: Vec<String>,
    pub election_types: Vec<String>,
}

pub fn filter_options(store: &dyn ObservationStore) -> Result<FilterOptions, SeriesError> {
    let sorted = |f: Field| -> Result<Vec<String>, SeriesError> {
        Ok(store.distinct_values(f)?.into_iter().collect())
    };
    Ok(FilterOptions {
        parties: sorted(Field::Party)?,
        nuances: sorted(Field::PoliticalFamily)?,
        candidates: sorted(Field::CandidateName)?,
        cities: sorted(Field::City)?
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect(),
        election_types: sorted(Field::ElectionType)?,
    })
}

/// Answers a search request: validates it, fetches the matching observations and
/// aggregates them.
///
/// Either the whole series is returned, or an error.
pub fn search(
    store: &dyn ObservationStore,
    request: &SearchRequest,
) -> Result<Vec<SeriesPoint>, SeriesError> {
    let filter = request.normalize()?;
    let group_by = request.group_by()?;
    let observations = store.find(&filter)?;
    info!(
        "search: {} observations fetched, grouping by {:?}",
        observations.len(),
        group_by
    );
    // The store already applied the filter, applying it again is a no-op.
    Ok(aggregate_detailed(&observations, &filter, group_by).points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ContextBuilder;
    use crate::PoliticalFamily;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_many(
            ContextBuilder::result("presidentielle_2022_t2", "presidentielle", 2, day(2022, 4, 24))
                .unwrap()
                .add_candidate("Emmanuel MACRON", &["RENAISSANCE"], PoliticalFamily::Centre, 58.55, 18_768_639)
                .add_candidate("Marine LE PEN", &["RN"], PoliticalFamily::FarRight, 41.45, 13_288_686)
                .build(),
        );
        store.insert_many(
            ContextBuilder::result("municipale_2020_paris", "municipale", 2, day(2020, 6, 28))
                .unwrap()
                .municipal("Paris")
                .add_candidate("Anne HIDALGO", &["PS", "PCF"], PoliticalFamily::Left, 48.49, 221_000)
                .build(),
        );
        store
    }

    struct Unavailable;

    impl ObservationStore for Unavailable {
        fn find(&self, _filter: &ObservationFilter) -> Result<Vec<Observation>, SeriesError> {
            Err(SeriesError::store_unavailable("connection refused"))
        }

        fn distinct_values(&self, _field: Field) -> Result<BTreeSet<String>, SeriesError> {
            Err(SeriesError::store_unavailable("connection refused"))
        }
    }

    #[test]
    fn filter_options_are_sorted_and_skip_empty_cities() {
        let opts = filter_options(&store()).unwrap();
        assert_eq!(opts.parties, vec!["PCF", "PS", "RENAISSANCE", "RN"]);
        assert_eq!(opts.nuances, vec!["Centre", "Extreme droite", "Gauche"]);
        assert_eq!(opts.cities, vec!["Paris"]);
        assert_eq!(opts.election_types, vec!["municipale", "presidentielle"]);
        assert_eq!(opts.candidates.len(), 3);
    }

    #[test]
    fn search_groups_by_family_by_default() {
        let req = SearchRequest {
            level: Some("national".to_string()),
            ..Default::default()
        };
        let points = search(&store(), &req).unwrap();
        let keys: Vec<&str> = points.iter().map(|p| p.group_key.as_str()).collect();
        assert_eq!(keys, vec!["Centre", "Extreme droite"]);
    }

    #[test]
    fn search_rejects_bad_requests_before_touching_the_store() {
        let req = SearchRequest {
            group_by: Some("age".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            search(&Unavailable, &req),
            Err(SeriesError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn store_failures_are_reported() {
        assert!(matches!(
            search(&Unavailable, &SearchRequest::default()),
            Err(SeriesError::StoreUnavailable { .. })
        ));
        assert!(filter_options(&Unavailable).is_err());
    }

    #[test]
    fn clear_drops_everything() {
        let mut s = store();
        assert_eq!(s.len(), 3);
        s.clear();
        assert!(s.is_empty());
        assert!(search(&s, &SearchRequest::default()).unwrap().is_empty());
    }
}
