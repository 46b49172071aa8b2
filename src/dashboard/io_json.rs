use crate::dashboard::io_common::{simplify_file_name, split_parties};
use crate::dashboard::*;

use serde_json::Map;

// Numbers and strings are both accepted, the validation happens later.
fn js_to_string(v: Option<&JSValue>) -> Option<String> {
    match v? {
        JSValue::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        JSValue::Number(n) => Some(n.to_string()),
        JSValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn js_parties(v: Option<&JSValue>) -> Vec<String> {
    match v {
        Some(JSValue::Array(xs)) => xs
            .iter()
            .filter_map(|x| js_to_string(Some(x)))
            .collect(),
        Some(JSValue::String(s)) => split_parties(s),
        _ => Vec::new(),
    }
}

fn datapoint_from_object(obj: &Map<String, JSValue>, id: String, lineno: usize) -> ParsedDatapoint {
    ParsedDatapoint {
        id,
        lineno,
        kind: js_to_string(obj.get("type")),
        election_id: js_to_string(obj.get("election_id")),
        election_type: js_to_string(obj.get("election_type")),
        round: js_to_string(obj.get("election_tour")),
        date: js_to_string(obj.get("date")),
        candidate_name: js_to_string(obj.get("candidate_name")),
        parties: js_parties(obj.get("party")),
        nuance: js_to_string(obj.get("nuance")),
        level: js_to_string(obj.get("level")),
        city: js_to_string(obj.get("city")),
        percentage: js_to_string(obj.get("result_pourcentage_exprime")),
        amount: js_to_string(obj.get("result_amount")),
        poll_id: js_to_string(obj.get("poll_id")),
        hypothesis: js_to_string(obj.get("hypothese")),
    }
}

/// Reads a JSON array of datapoint objects.
pub fn read_json_datapoints(path: &str) -> DashboardResult<Vec<ParsedDatapoint>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    let simplified_file_name = simplify_file_name(path);
    let entries = match js.as_array() {
        Some(xs) => xs,
        None => whatever!("{}: expected an array of datapoints", path),
    };
    let mut res: Vec<ParsedDatapoint> = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let lineno = idx + 1;
        let obj = match entry.as_object() {
            Some(obj) => obj,
            None => whatever!("{}: entry {} is not an object", path, lineno),
        };
        let pd = datapoint_from_object(obj, format!("{}-{:08}", simplified_file_name, lineno), lineno);
        debug!("read_json_datapoints: {:?}", pd);
        res.push(pd);
    }
    Ok(res)
}
