use clap::Parser;

use election_series::SearchRequest;

/// This program builds time series of election results and opinion polls.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file describing the data sources, in JSON format.
    /// For more information about the file format, read the documentation of election_series::manual.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, repeatable) Data files to read in addition to the ones of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<Vec<String>>,

    /// (default csv) The type of the inputs passed with --input: csv, xlsx, json or polls.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (for --input) The election id of the rows that do not carry one. For polls, the
    /// round is appended: presidentielle_2022 gives presidentielle_2022_t1 and presidentielle_2022_t2.
    #[clap(long, value_parser)]
    pub election_id: Option<String>,

    /// (for --input) The election type of the rows that do not carry one. Required for polls.
    #[clap(long, value_parser)]
    pub election_type: Option<String>,

    /// (for --input, default 1) The round of the rows that do not carry one.
    #[clap(long, value_parser)]
    pub round: Option<u8>,

    /// (default: the first worksheet) When using an Excel file, the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) A search request in JSON format. The search flags below override its fields.
    #[clap(short, long, value_parser)]
    pub query: Option<String>,

    /// (repeatable) Only keep these election types (presidentielle, europeenne, ...).
    #[clap(long, value_parser)]
    pub election_types: Option<Vec<String>>,

    /// (repeatable, 1 or 2) Only keep these rounds.
    #[clap(long, value_parser)]
    pub rounds: Option<Vec<u8>>,

    /// (YYYY-MM-DD) First day to include.
    #[clap(long, value_parser)]
    pub start_date: Option<String>,

    /// (YYYY-MM-DD) Last day to include.
    #[clap(long, value_parser)]
    pub end_date: Option<String>,

    /// (repeatable) Only keep candidates affiliated with one of these parties.
    #[clap(long, value_parser)]
    pub parties: Option<Vec<String>>,

    /// (repeatable) Only keep these political families.
    #[clap(long, value_parser)]
    pub nuances: Option<Vec<String>>,

    /// (repeatable) Only keep these candidates.
    #[clap(long, value_parser)]
    pub candidates: Option<Vec<String>>,

    /// (national or municipal) Only keep this geographic level.
    #[clap(long, value_parser)]
    pub level: Option<String>,

    /// Only keep this city.
    #[clap(long, value_parser)]
    pub city: Option<String>,

    /// (default nuance) One series per nuance, party or candidate_name.
    #[clap(long, value_parser)]
    pub group_by: Option<String>,

    /// Print the values available for the search filters instead of searching.
    #[clap(long, takes_value = false)]
    pub filters: bool,

    /// Print the metadata of all the elections instead of searching.
    #[clap(long, takes_value = false)]
    pub elections: bool,

    /// (election id) Print the metadata of one election instead of searching.
    #[clap(long, value_parser)]
    pub election: Option<String>,

    /// Print the metadata of all the polls instead of searching.
    #[clap(long, takes_value = false)]
    pub polls: bool,

    /// (file path) Write all the observations read from the inputs to this file, in JSON format.
    #[clap(long, value_parser)]
    pub export: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the output, in JSON format.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected output in JSON format. If provided,
    /// the output is checked against it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

impl Args {
    /// The search fields set on the command line.
    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            election_types: self.election_types.clone(),
            rounds: self.rounds.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            parties: self.parties.clone(),
            nuances: self.nuances.clone(),
            candidates: self.candidates.clone(),
            level: self.level.clone(),
            city: self.city.clone(),
            group_by: self.group_by.clone(),
        }
    }
}
