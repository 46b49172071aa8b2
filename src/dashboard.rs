use log::{debug, info, warn};

use election_series::store::{filter_options, search, MemoryStore};
use election_series::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
pub mod elections;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod io_json;
pub mod io_polls;

use crate::dashboard::config_reader::*;
use crate::dashboard::elections::*;
use crate::dashboard::io_common::*;
use crate::dashboard::io_polls::PollRecord;

#[derive(Debug, Snafu)]
pub enum DashboardError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the output"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no worksheet or no header"))]
    EmptyExcel { path: String },
    #[snafu(display("Excel file {path} has no worksheet named {name}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Unexpected cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Missing column {column} in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Invalid value for {column} in {id}: {content:?}"))]
    InvalidCell {
        id: String,
        column: String,
        content: String,
    },
    #[snafu(display("Data source {path} does not define {setting}"))]
    MissingSourceSetting { path: String, setting: String },
    #[snafu(display("Unknown data provider {provider}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Cannot find the directory of the configuration file"))]
    MissingParentDir {},
    #[snafu(display("{source}"))]
    Series { source: SeriesError },
    #[snafu(display("No election with id {id}"))]
    ElectionNotFound { id: String },
    #[snafu(display("Difference detected between the output and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashboardResult<T> = Result<T, DashboardError>;

/// A datapoint, as parsed by the readers.
/// This is before applying the mappings and the defaults of the data source.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ParsedDatapoint {
    pub id: String,
    pub lineno: usize,
    pub kind: Option<String>,
    pub election_id: Option<String>,
    pub election_type: Option<String>,
    pub round: Option<String>,
    pub date: Option<String>,
    pub candidate_name: Option<String>,
    pub parties: Vec<String>,
    pub nuance: Option<String>,
    pub level: Option<String>,
    pub city: Option<String>,
    pub percentage: Option<String>,
    pub amount: Option<String>,
    pub poll_id: Option<String>,
    pub hypothesis: Option<String>,
}

/// Everything that was read from the data sources.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub store: MemoryStore,
    pub elections: Vec<Election>,
    pub polls: Vec<PollRecord>,
    pub default_query: SearchRequest,
}

/// What the caller asks for.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum DashboardRequest {
    Search(SearchRequest),
    FilterOptions,
    Elections,
    Election(String),
    Polls,
}

fn invalid_cell(pd: &ParsedDatapoint, column: &str, content: &Option<String>) -> DashboardError {
    DashboardError::InvalidCell {
        id: pd.id.clone(),
        column: column.to_string(),
        content: content.clone().unwrap_or_default(),
    }
}

/// Applies the defaults of the source and the mappings of the configuration to the
/// parsed datapoints.
///
/// Datapoints without a percentage are skipped.
pub fn validate_datapoints(
    parsed: &[ParsedDatapoint],
    source: &DataSource,
    config: &DashboardConfig,
) -> DashboardResult<Vec<Observation>> {
    let mut res: Vec<Observation> = Vec::new();
    for pd in parsed.iter() {
        let percentage_of_expressed = match &pd.percentage {
            Some(s) => parse_number(s).ok_or_else(|| invalid_cell(pd, "result_pourcentage_exprime", &pd.percentage))?,
            None => {
                warn!("validate_datapoints: {}: no percentage, skipping", pd.id);
                continue;
            }
        };

        let raw_name = pd
            .candidate_name
            .clone()
            .ok_or_else(|| invalid_cell(pd, "candidate_name", &pd.candidate_name))?;
        let candidate_name = config.candidate(&raw_name);

        let kind = match &pd.kind {
            Some(k) => ObservationKind::parse(k).map_err(|_| invalid_cell(pd, "type", &pd.kind))?,
            None if pd.poll_id.is_some() => ObservationKind::Poll,
            None => ObservationKind::Result,
        };

        let election_id = pd
            .election_id
            .clone()
            .or_else(|| source.election_id.clone())
            .context(MissingSourceSettingSnafu {
                path: source.file_path.clone(),
                setting: "electionId",
            })?;
        let election_type = pd
            .election_type
            .clone()
            .or_else(|| source.election_type.clone())
            .context(MissingSourceSettingSnafu {
                path: source.file_path.clone(),
                setting: "electionType",
            })?;
        let round: u8 = match &pd.round {
            Some(r) => r
                .parse::<u8>()
                .ok()
                .filter(|r| *r == 1 || *r == 2)
                .ok_or_else(|| invalid_cell(pd, "election_tour", &pd.round))?,
            None => source.round.unwrap_or(1),
        };

        let date_s = pd.date.clone().ok_or_else(|| invalid_cell(pd, "date", &pd.date))?;
        let date = parse_date(&date_s).map_err(|_| invalid_cell(pd, "date", &pd.date))?;

        let political_family = match &pd.nuance {
            Some(n) => PoliticalFamily::parse(n).map_err(|_| invalid_cell(pd, "nuance", &pd.nuance))?,
            None => match config.nuance_of(&raw_name) {
                Some(f) => f,
                None => {
                    warn!(
                        "validate_datapoints: {}: no nuance for {}, using {}",
                        pd.id,
                        raw_name,
                        PoliticalFamily::Other
                    );
                    PoliticalFamily::Other
                }
            },
        };

        let geographic_level = match &pd.level {
            Some(l) => GeographicLevel::parse(l).map_err(|_| invalid_cell(pd, "level", &pd.level))?,
            None => GeographicLevel::National,
        };

        let amount: u64 = match &pd.amount {
            Some(a) => parse_number(a)
                .filter(|x| *x >= 0.0)
                .map(|x| x.round() as u64)
                .ok_or_else(|| invalid_cell(pd, "result_amount", &pd.amount))?,
            None => 0,
        };

        let poll_context = match kind {
            ObservationKind::Poll => Some(PollContext {
                poll_id: pd
                    .poll_id
                    .clone()
                    .ok_or_else(|| invalid_cell(pd, "poll_id", &pd.poll_id))?,
                hypothesis: pd.hypothesis.clone(),
            }),
            ObservationKind::Result => None,
        };

        let obs = Observation {
            kind,
            election_id,
            election_type,
            round,
            date,
            candidate_name,
            affiliated_parties: config.parties(&pd.parties).into_iter().collect(),
            political_family,
            geographic_level,
            city: pd.city.clone().unwrap_or_default(),
            percentage_of_expressed,
            amount,
            poll_context,
        };
        debug!("validate_datapoints: {}: {:?}", pd.id, obs);
        res.push(obs);
    }
    Ok(res)
}

fn read_data_source(
    root: &Path,
    source: &DataSource,
    config: &DashboardConfig,
    dashboard: &mut Dashboard,
) -> DashboardResult<()> {
    let path = resolve_path(root, &source.file_path);
    info!("Attempting to read data file {:?} ({})", path, source.provider);
    let observations = match source.provider.as_str() {
        "csv" => validate_datapoints(&io_csv::read_csv_datapoints(&path)?, source, config)?,
        "xlsx" => validate_datapoints(
            &io_excel::read_excel_datapoints(&path, source)?,
            source,
            config,
        )?,
        "json" => validate_datapoints(&io_json::read_json_datapoints(&path)?, source, config)?,
        "polls" => {
            let (records, observations) = io_polls::read_polls(&path, source, config)?;
            dashboard.polls.extend(records);
            observations
        }
        x => return UnknownProviderSnafu { provider: x }.fail(),
    };
    info!("Read {} observations from {:?}", observations.len(), path);
    dashboard.store.insert_many(observations);
    Ok(())
}

/// Reads all the data sources of the configuration.
///
/// root: the directory that relative paths are resolved against.
pub fn load_dashboard(config: &DashboardConfig, root: &Path) -> DashboardResult<Dashboard> {
    let mut dashboard = Dashboard {
        default_query: config.default_query.clone().unwrap_or_default(),
        ..Default::default()
    };
    for source in config.data_sources.iter() {
        read_data_source(root, source, config, &mut dashboard)?;
    }
    if let Some(elections_file) = &config.elections_file {
        dashboard.elections = read_elections(&resolve_path(root, elections_file))?;
    }
    info!(
        "Loaded {} observations, {} elections, {} polls",
        dashboard.store.len(),
        dashboard.elections.len(),
        dashboard.polls.len()
    );
    Ok(dashboard)
}

/// Answers a request with the `{ok, data}` envelope.
pub fn respond(dashboard: &Dashboard, request: &DashboardRequest) -> DashboardResult<JSValue> {
    let data: JSValue = match request {
        DashboardRequest::Search(req) => {
            let effective = dashboard.default_query.overridden_by(req);
            info!("Search request: {:?}", effective);
            let points = search(&dashboard.store, &effective).context(SeriesSnafu {})?;
            serde_json::to_value(points).context(SerializingJsonSnafu {})?
        }
        DashboardRequest::FilterOptions => {
            let options = filter_options(&dashboard.store).context(SeriesSnafu {})?;
            serde_json::to_value(options).context(SerializingJsonSnafu {})?
        }
        DashboardRequest::Elections => {
            serde_json::to_value(sorted_by_year(&dashboard.elections))
                .context(SerializingJsonSnafu {})?
        }
        DashboardRequest::Election(id) => {
            serde_json::to_value(find_election(&dashboard.elections, id)?)
                .context(SerializingJsonSnafu {})?
        }
        DashboardRequest::Polls => {
            let mut polls: Vec<&PollRecord> = dashboard.polls.iter().collect();
            polls.sort_by(|a, b| b.fin_enquete.cmp(&a.fin_enquete));
            serde_json::to_value(polls).context(SerializingJsonSnafu {})?
        }
    };
    Ok(json!({ "ok": true, "data": data }))
}

pub fn read_search_request(path: &str) -> DashboardResult<SearchRequest> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

fn request_from_args(args: &Args) -> DashboardResult<DashboardRequest> {
    if args.filters {
        return Ok(DashboardRequest::FilterOptions);
    }
    if args.elections {
        return Ok(DashboardRequest::Elections);
    }
    if let Some(id) = &args.election {
        return Ok(DashboardRequest::Election(id.clone()));
    }
    if args.polls {
        return Ok(DashboardRequest::Polls);
    }
    let from_file = match &args.query {
        Some(p) => read_search_request(p)?,
        None => SearchRequest::default(),
    };
    Ok(DashboardRequest::Search(
        from_file.overridden_by(&args.search_request()),
    ))
}

fn config_from_args(args: &Args) -> DashboardResult<(DashboardConfig, PathBuf)> {
    let (mut config, root) = match &args.config {
        Some(p) => {
            let config = read_config(p)?;
            let root = Path::new(p)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => (DashboardConfig::default(), PathBuf::from(".")),
    };
    if let Some(inputs) = &args.input {
        let cwd = std::env::current_dir().context(OpeningJsonSnafu { path: "." })?;
        for input in inputs.iter() {
            config.data_sources.push(DataSource {
                provider: args.input_type.clone().unwrap_or_else(|| "csv".to_string()),
                file_path: resolve_path(&cwd, input),
                election_id: args.election_id.clone(),
                election_type: args.election_type.clone(),
                round: args.round,
                excel_worksheet_name: args.excel_worksheet_name.clone(),
            });
        }
    }
    Ok((config, root))
}

fn write_output(contents: &str, out: Option<&str>) -> DashboardResult<()> {
    match out {
        None | Some("") | Some("stdout") => {
            println!("{}", contents);
            Ok(())
        }
        Some(path) => {
            info!("Writing output to {:?}", path);
            fs::write(path, contents).context(WritingOutputSnafu { path })
        }
    }
}

fn export_observations(dashboard: &Dashboard, path: &str) -> DashboardResult<()> {
    let js = serde_json::to_string_pretty(dashboard.store.observations())
        .context(SerializingJsonSnafu {})?;
    info!(
        "Exporting {} observations to {:?}",
        dashboard.store.len(),
        path
    );
    fs::write(path, js).context(WritingOutputSnafu { path })
}

fn check_reference(pretty_output: &str, reference_path: &str) -> DashboardResult<()> {
    let contents =
        fs::read_to_string(reference_path).context(OpeningJsonSnafu { path: reference_path })?;
    let reference: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: reference_path })?;
    let pretty_reference =
        serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
    if pretty_reference != pretty_output {
        warn!("Found differences with the reference {:?}", reference_path);
        print_diff(pretty_reference.as_str(), pretty_output, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("Output matches the reference {:?}", reference_path);
    Ok(())
}

pub fn run(args: &Args) -> DashboardResult<()> {
    let (config, root) = config_from_args(args)?;
    debug!("config: {:?}", config);
    let dashboard = load_dashboard(&config, &root)?;

    if let Some(path) = &args.export {
        export_observations(&dashboard, path)?;
    }

    let request = request_from_args(args)?;
    let response = respond(&dashboard, &request)?;
    let pretty = serde_json::to_string_pretty(&response).context(SerializingJsonSnafu {})?;
    write_output(&pretty, args.out.as_deref())?;

    if let Some(reference_path) = &args.reference {
        check_reference(&pretty, reference_path)?;
    }
    Ok(())
}
