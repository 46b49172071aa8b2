pub mod builder;
mod config;
mod filter;
pub mod manual;
pub mod store;

use log::{debug, info, warn};

use std::{
    collections::{HashMap, HashSet},
    ops::AddAssign,
};

use chrono::NaiveDate;

pub use crate::config::*;
pub use crate::filter::*;

// **** Private structures ****

// One point of one series. The political family is not part of the key:
// it is fixed per key to the first family encountered.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
struct SeriesKey {
    date: NaiveDate,
    kind: ObservationKind,
    election_id: String,
    group_key: String,
}

// One series inside one context (a poll hypothesis, or a result).
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
struct ContextKey {
    series: SeriesKey,
    poll_id: Option<String>,
    hypothesis: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Copy, Default)]
struct Tally {
    percentage: f64,
    amount: u64,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Tally) {
        self.percentage += rhs.percentage;
        self.amount = self.amount.saturating_add(rhs.amount);
    }
}

// The running average of the stage 1 sums of one series point.
#[derive(PartialEq, Debug, Clone)]
struct Reconciled {
    key: SeriesKey,
    family: PoliticalFamily,
    percentage_sum: f64,
    amount_sum: f64,
    contexts: usize,
}

/// Aggregates the observations that match the filter into series points.
///
/// See [`aggregate_detailed`] for the algorithm.
pub fn aggregate(
    observations: &[Observation],
    filter: &ObservationFilter,
    group_by: GroupBy,
) -> Vec<SeriesPoint> {
    aggregate_detailed(observations, filter, group_by).points
}

/// Same as [`aggregate`], with the grouping given by its wire name.
pub fn aggregate_by(
    observations: &[Observation],
    filter: &ObservationFilter,
    group_by: &str,
) -> Result<Vec<SeriesPoint>, SeriesError> {
    let gb = GroupBy::parse(group_by)?;
    Ok(aggregate(observations, filter, gb))
}

/// Runs the two-stage grouping and reports the data inconsistencies found on the way.
///
/// Stage 1 collapses each context: the shares of all the candidates that fall in the
/// same group within the same poll hypothesis (or the same result) are summed.
/// They are mutually exclusive shares of one snapshot.
///
/// Stage 2 reconciles the contexts: all the stage 1 sums of the same group, on the same
/// day, for the same election and kind, are averaged. Two polls published on the same
/// day are two estimates of the same quantity.
///
/// The points are sorted by date. Points of the same date keep the order in which
/// their group first appeared in the input.
pub fn aggregate_detailed(
    observations: &[Observation],
    filter: &ObservationFilter,
    group_by: GroupBy,
) -> Aggregation {
    let matched: Vec<&Observation> = observations.iter().filter(|o| filter.matches(o)).collect();
    info!(
        "aggregate: {} observations, {} matching, grouped by {:?}",
        observations.len(),
        matched.len(),
        group_by
    );

    let mut families: HashMap<SeriesKey, PoliticalFamily> = HashMap::new();
    let mut inconsistencies: Vec<DataInconsistency> = Vec::new();
    let mut reported: HashSet<(SeriesKey, PoliticalFamily)> = HashSet::new();

    // Stage 1: sum within each context.
    let mut contexts: Vec<(ContextKey, Tally)> = Vec::new();
    let mut context_idxs: HashMap<ContextKey, usize> = HashMap::new();
    for obs in matched.iter() {
        let series = SeriesKey {
            date: obs.date,
            kind: obs.kind,
            election_id: obs.election_id.clone(),
            group_key: group_by.group_key(obs),
        };

        let kept = *families
            .entry(series.clone())
            .or_insert(obs.political_family);
        if kept != obs.political_family
            && reported.insert((series.clone(), obs.political_family))
        {
            warn!(
                "aggregate: group {:?} on {} ({}) spans families {} and {}, keeping {}",
                series.group_key, series.date, series.election_id, kept, obs.political_family, kept
            );
            inconsistencies.push(DataInconsistency {
                date: series.date,
                election_id: series.election_id.clone(),
                group_key: series.group_key.clone(),
                kept,
                ignored: obs.political_family,
            });
        }

        let (poll_id, hypothesis) = match &obs.poll_context {
            Some(pc) => (Some(pc.poll_id.clone()), pc.hypothesis.clone()),
            None => (None, None),
        };
        let key = ContextKey {
            series,
            poll_id,
            hypothesis,
        };
        let tally = Tally {
            percentage: obs.percentage_of_expressed,
            amount: obs.amount,
        };
        match context_idxs.get(&key) {
            Some(idx) => contexts[*idx].1 += tally,
            None => {
                context_idxs.insert(key.clone(), contexts.len());
                contexts.push((key, tally));
            }
        }
    }
    debug!("aggregate: stage 1 produced {} context sums", contexts.len());

    // Stage 2: average the context sums of each series point.
    let mut reconciled: Vec<Reconciled> = Vec::new();
    let mut series_idxs: HashMap<SeriesKey, usize> = HashMap::new();
    for (ckey, tally) in contexts.into_iter() {
        let idx = match series_idxs.get(&ckey.series) {
            Some(idx) => *idx,
            None => {
                let family = families
                    .get(&ckey.series)
                    .cloned()
                    .unwrap_or(PoliticalFamily::Other);
                series_idxs.insert(ckey.series.clone(), reconciled.len());
                reconciled.push(Reconciled {
                    key: ckey.series.clone(),
                    family,
                    percentage_sum: 0.0,
                    amount_sum: 0.0,
                    contexts: 0,
                });
                reconciled.len() - 1
            }
        };
        let r = &mut reconciled[idx];
        r.percentage_sum += tally.percentage;
        r.amount_sum += tally.amount as f64;
        r.contexts += 1;
    }

    let mut points: Vec<SeriesPoint> = reconciled
        .into_iter()
        .map(|r| {
            let n = r.contexts as f64;
            SeriesPoint {
                date: r.key.date,
                kind: r.key.kind,
                election_id: r.key.election_id,
                group_key: r.key.group_key,
                political_family: r.family,
                value: r.percentage_sum / n,
                amount: r.amount_sum / n,
                contexts: r.contexts,
            }
        })
        .collect();
    // Stable: equal dates keep the insertion order.
    points.sort_by_key(|p| p.date);

    for p in points.iter() {
        debug!(
            "aggregate: {} {} {} {:?} -> {:.2} ({} contexts)",
            p.date,
            p.kind.as_str(),
            p.election_id,
            p.group_key,
            p.value,
            p.contexts
        );
    }
    info!("aggregate: {} series points", points.len());

    Aggregation {
        points,
        inconsistencies,
    }
}

#[cfg(test)]
mod tests {
    use super::builder::ContextBuilder;
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn all() -> ObservationFilter {
        ObservationFilter::default()
    }

    fn poll(date: NaiveDate, poll_id: &str, hypothesis: Option<&str>) -> ContextBuilder {
        ContextBuilder::poll("presidentielle_2022", "presidentielle", 1, date, poll_id, hypothesis).unwrap()
    }

    #[test]
    fn empty_input() {
        init();
        let res = aggregate_detailed(&[], &all(), GroupBy::PoliticalFamily);
        assert!(res.points.is_empty());
        assert!(res.inconsistencies.is_empty());
    }

    #[test]
    fn two_polls_same_day_are_averaged_not_summed() {
        init();
        let d = day(2022, 3, 1);
        let mut obs = poll(d, "ifop", None)
            .add_candidate("Nathalie ARTHAUD", &["LO"], PoliticalFamily::FarLeft, 20.0, 200)
            .build();
        obs.extend(
            poll(d, "elabe", None)
                .add_candidate("Nathalie ARTHAUD", &["LO"], PoliticalFamily::FarLeft, 20.0, 300)
                .build(),
        );
        let points = aggregate(&obs, &all(), GroupBy::PoliticalFamily);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 20.0);
        assert_eq!(points[0].amount, 250.0);
        assert_eq!(points[0].contexts, 2);
        assert_eq!(points[0].group_key, "Extreme gauche");
    }

    #[test]
    fn candidates_of_one_family_are_summed_within_a_poll() {
        init();
        let obs = poll(day(2022, 3, 1), "ifop", None)
            .add_candidate("Philippe POUTOU", &["NPA"], PoliticalFamily::FarLeft, 15.0, 150)
            .add_candidate("Nathalie ARTHAUD", &["LO"], PoliticalFamily::FarLeft, 10.0, 100)
            .build();
        let points = aggregate(&obs, &all(), GroupBy::PoliticalFamily);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 25.0);
        assert_eq!(points[0].amount, 250.0);
        assert_eq!(points[0].contexts, 1);
    }

    #[test]
    fn sums_then_averages_across_polls() {
        init();
        let d = day(2022, 3, 1);
        let mut obs = poll(d, "ifop", None)
            .add_candidate("Philippe POUTOU", &["NPA"], PoliticalFamily::FarLeft, 15.0, 0)
            .add_candidate("Nathalie ARTHAUD", &["LO"], PoliticalFamily::FarLeft, 10.0, 0)
            .build();
        obs.extend(
            poll(d, "elabe", None)
                .add_candidate("Philippe POUTOU", &["NPA"], PoliticalFamily::FarLeft, 5.0, 0)
                .add_candidate("Nathalie ARTHAUD", &["LO"], PoliticalFamily::FarLeft, 10.0, 0)
                .build(),
        );
        let points = aggregate(&obs, &all(), GroupBy::PoliticalFamily);
        assert_eq!(points.len(), 1);
        // (25 + 15) / 2
        assert_eq!(points[0].value, 20.0);
    }

    #[test]
    fn hypotheses_of_one_poll_are_averaged() {
        init();
        let d = day(2022, 1, 15);
        let mut obs = poll(d, "harris", Some("Hypothèse Taubira"))
            .add_candidate("Christiane TAUBIRA", &["PRG"], PoliticalFamily::Left, 4.0, 0)
            .add_candidate("Anne HIDALGO", &["PS"], PoliticalFamily::Left, 4.0, 0)
            .build();
        obs.extend(
            poll(d, "harris", Some("Hypothèse sans Taubira"))
                .add_candidate("Anne HIDALGO", &["PS"], PoliticalFamily::Left, 6.0, 0)
                .build(),
        );
        let points = aggregate(&obs, &all(), GroupBy::PoliticalFamily);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 7.0);
        assert_eq!(points[0].contexts, 2);
    }

    #[test]
    fn single_result_passes_through() {
        init();
        let obs = ContextBuilder::result("presidentielle_2022_t1", "presidentielle", 1, day(2022, 4, 10))
            .unwrap()
            .add_candidate("Valérie PÉCRESSE", &["LR"], PoliticalFamily::Right, 4.78, 1_679_001)
            .build();
        let points = aggregate(&obs, &all(), GroupBy::CandidateName);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 4.78);
        assert_eq!(points[0].amount, 1_679_001.0);
        assert_eq!(points[0].kind, ObservationKind::Result);
        assert_eq!(points[0].political_family, PoliticalFamily::Right);
        assert_eq!(points[0].group_key, "Valérie PÉCRESSE");
    }

    #[test]
    fn results_and_polls_stay_apart() {
        init();
        let d = day(2022, 4, 10);
        let mut obs = poll(d, "ipsos", None)
            .add_candidate("Eric ZEMMOUR", &["REC"], PoliticalFamily::FarRight, 9.0, 0)
            .build();
        obs.extend(
            ContextBuilder::result("presidentielle_2022", "presidentielle", 1, d)
                .unwrap()
                .add_candidate("Eric ZEMMOUR", &["REC"], PoliticalFamily::FarRight, 7.07, 0)
                .build(),
        );
        let points = aggregate(&obs, &all(), GroupBy::CandidateName);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].kind, ObservationKind::Poll);
        assert_eq!(points[1].kind, ObservationKind::Result);
    }

    #[test]
    fn sorted_by_date_regardless_of_input_order() {
        init();
        let mut obs = poll(day(2022, 3, 20), "ifop", None)
            .add_candidate("Yannick JADOT", &["EELV"], PoliticalFamily::Left, 5.0, 0)
            .add_candidate("Fabien ROUSSEL", &["PCF"], PoliticalFamily::Left, 3.5, 0)
            .build();
        obs.extend(
            poll(day(2022, 1, 5), "ifop", None)
                .add_candidate("Yannick JADOT", &["EELV"], PoliticalFamily::Left, 7.0, 0)
                .build(),
        );
        obs.extend(
            poll(day(2022, 2, 10), "ifop", None)
                .add_candidate("Fabien ROUSSEL", &["PCF"], PoliticalFamily::Left, 4.0, 0)
                .build(),
        );
        let points = aggregate(&obs, &all(), GroupBy::CandidateName);
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![day(2022, 1, 5), day(2022, 2, 10), day(2022, 3, 20), day(2022, 3, 20)]
        );
        // Ties keep the order of first appearance.
        assert_eq!(points[2].group_key, "Yannick JADOT");
        assert_eq!(points[3].group_key, "Fabien ROUSSEL");
    }

    #[test]
    fn idempotent() {
        init();
        let mut obs = poll(day(2022, 3, 1), "ifop", None)
            .add_candidate("Marine LE PEN", &["RN"], PoliticalFamily::FarRight, 17.5, 0)
            .add_candidate("Eric ZEMMOUR", &["REC"], PoliticalFamily::FarRight, 13.0, 0)
            .build();
        obs.extend(
            poll(day(2022, 3, 1), "opinionway", Some("A"))
                .add_candidate("Marine LE PEN", &["RN"], PoliticalFamily::FarRight, 18.0, 0)
                .build(),
        );
        for gb in [GroupBy::PoliticalFamily, GroupBy::Party, GroupBy::CandidateName] {
            assert_eq!(aggregate(&obs, &all(), gb), aggregate(&obs, &all(), gb));
        }
    }

    #[test]
    fn party_groups_use_the_sorted_joined_set() {
        init();
        let obs = ContextBuilder::result("legislative_2022_t1", "legislative", 1, day(2022, 6, 12))
            .unwrap()
            .add_candidate("Candidat A", &["PS", "LFI"], PoliticalFamily::Left, 30.0, 0)
            .add_candidate("Candidat B", &["LFI", "PS"], PoliticalFamily::Left, 10.0, 0)
            .add_candidate("Candidat C", &["LFI"], PoliticalFamily::Left, 5.0, 0)
            .build();
        let points = aggregate(&obs, &all(), GroupBy::Party);
        let keys: Vec<(&str, f64)> = points.iter().map(|p| (p.group_key.as_str(), p.value)).collect();
        assert_eq!(keys, vec![("LFI, PS", 40.0), ("LFI", 5.0)]);
    }

    #[test]
    fn first_family_wins_on_inconsistency() {
        init();
        let obs = poll(day(2022, 2, 1), "ifop", None)
            .add_candidate("Jean LASSALLE", &["RES"], PoliticalFamily::Centre, 2.0, 0)
            .add_candidate("Alexandre X", &["RES"], PoliticalFamily::Right, 1.0, 0)
            .build();
        let res = aggregate_detailed(&obs, &all(), GroupBy::Party);
        assert_eq!(res.points.len(), 1);
        assert_eq!(res.points[0].political_family, PoliticalFamily::Centre);
        assert_eq!(res.points[0].value, 3.0);
        assert_eq!(res.inconsistencies.len(), 1);
        assert_eq!(res.inconsistencies[0].kept, PoliticalFamily::Centre);
        assert_eq!(res.inconsistencies[0].ignored, PoliticalFamily::Right);
    }

    #[test]
    fn values_are_not_clamped() {
        init();
        let obs = poll(day(2022, 2, 1), "broken", None)
            .add_candidate("A", &["X"], PoliticalFamily::Other, 70.0, 0)
            .add_candidate("B", &["Y"], PoliticalFamily::Other, 60.0, 0)
            .build();
        let points = aggregate(&obs, &all(), GroupBy::PoliticalFamily);
        assert_eq!(points[0].value, 130.0);
    }

    #[test]
    fn huge_amounts_saturate() {
        init();
        let obs = poll(day(2022, 2, 1), "broken", None)
            .add_candidate("A", &["X"], PoliticalFamily::Other, 1.0, u64::MAX)
            .add_candidate("B", &["Y"], PoliticalFamily::Other, 2.0, 10)
            .build();
        let points = aggregate(&obs, &all(), GroupBy::PoliticalFamily);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 3.0);
        assert_eq!(points[0].amount, u64::MAX as f64);
    }

    #[test]
    fn filter_is_applied_before_grouping() {
        init();
        let obs = poll(day(2022, 3, 1), "ifop", None)
            .add_candidate("Philippe POUTOU", &["NPA"], PoliticalFamily::FarLeft, 15.0, 0)
            .add_candidate("Nathalie ARTHAUD", &["LO"], PoliticalFamily::FarLeft, 10.0, 0)
            .build();
        let filter = SearchRequest {
            parties: Some(vec!["LO".to_string()]),
            ..Default::default()
        }
        .normalize()
        .unwrap();
        let points = aggregate(&obs, &filter, GroupBy::PoliticalFamily);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 10.0);
    }

    #[test]
    fn malformed_group_by() {
        init();
        assert!(matches!(
            aggregate_by(&[], &all(), "region"),
            Err(SeriesError::InvalidQuery { .. })
        ));
        assert_eq!(aggregate_by(&[], &all(), "nuance"), Ok(vec![]));
    }
}
