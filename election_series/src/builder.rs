pub use crate::config::*;

use chrono::NaiveDate;

/// A builder for the observations of a single context: one official result
/// of one round, or one hypothesis of one poll.
///
/// All the candidates added share the metadata of the context.
///
/// ```
/// use chrono::NaiveDate;
/// use election_series::builder::ContextBuilder;
/// use election_series::{PoliticalFamily, SeriesError};
///
/// let date = NaiveDate::from_ymd_opt(2022, 4, 8).unwrap();
/// let observations = ContextBuilder::poll("presidentielle_2022", "presidentielle", 1, date, "ifop-0408", None)?
///     .add_candidate("Marine LE PEN", &["RN"], PoliticalFamily::FarRight, 23.5, 0)
///     .add_candidate("Emmanuel MACRON", &["RENAISSANCE"], PoliticalFamily::Centre, 26.0, 0)
///     .build();
///
/// assert_eq!(observations.len(), 2);
/// # Ok::<(), SeriesError>(())
/// ```
pub struct ContextBuilder {
    pub(crate) _template: Observation,
    pub(crate) _observations: Vec<Observation>,
}

impl ContextBuilder {
    /// Starts the observations of an official result.
    pub fn result(
        election_id: &str,
        election_type: &str,
        round: u8,
        date: NaiveDate,
    ) -> Result<ContextBuilder, SeriesError> {
        ContextBuilder::new(ObservationKind::Result, election_id, election_type, round, date, None)
    }

    /// Starts the observations of one hypothesis of a poll.
    pub fn poll(
        election_id: &str,
        election_type: &str,
        round: u8,
        date: NaiveDate,
        poll_id: &str,
        hypothesis: Option<&str>,
    ) -> Result<ContextBuilder, SeriesError> {
        let ctx = PollContext {
            poll_id: poll_id.to_string(),
            hypothesis: hypothesis.map(|h| h.to_string()),
        };
        ContextBuilder::new(
            ObservationKind::Poll,
            election_id,
            election_type,
            round,
            date,
            Some(ctx),
        )
    }

    fn new(
        kind: ObservationKind,
        election_id: &str,
        election_type: &str,
        round: u8,
        date: NaiveDate,
        poll_context: Option<PollContext>,
    ) -> Result<ContextBuilder, SeriesError> {
        if round != 1 && round != 2 {
            return Err(SeriesError::invalid_query(format!(
                "round must be 1 or 2, got {}",
                round
            )));
        }
        Ok(ContextBuilder {
            _template: Observation {
                kind,
                election_id: election_id.to_string(),
                election_type: election_type.to_string(),
                round,
                date,
                candidate_name: String::new(),
                affiliated_parties: Default::default(),
                political_family: PoliticalFamily::Other,
                geographic_level: GeographicLevel::National,
                city: String::new(),
                percentage_of_expressed: 0.0,
                amount: 0,
                poll_context,
            },
            _observations: Vec::new(),
        })
    }

    /// Moves the context to the municipal level of the given city.
    pub fn municipal(self, city: &str) -> ContextBuilder {
        let mut template = self._template;
        template.geographic_level = GeographicLevel::Municipal;
        template.city = city.to_string();
        ContextBuilder {
            _template: template,
            _observations: self._observations,
        }
    }

    /// Adds the share of one candidate.
    ///
    /// parties: the labels the candidate is affiliated with. Duplicates are
    /// merged and the order does not matter.
    pub fn add_candidate<S: AsRef<str>>(
        mut self,
        name: &str,
        parties: &[S],
        family: PoliticalFamily,
        percentage_of_expressed: f64,
        amount: u64,
    ) -> ContextBuilder {
        let mut obs = self._template.clone();
        obs.candidate_name = name.to_string();
        obs.affiliated_parties = parties.iter().map(|p| p.as_ref().to_string()).collect();
        obs.political_family = family;
        obs.percentage_of_expressed = percentage_of_expressed;
        obs.amount = amount;
        self._observations.push(obs);
        self
    }

    pub fn build(self) -> Vec<Observation> {
        self._observations
    }
}
