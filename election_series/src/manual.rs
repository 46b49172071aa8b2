/*!

This is the long-form manual for `election_series` and `electotrends`.

## Observations

An observation is the share of one candidate in one electoral context. A context is either:
* an official result (`type: result`) of one round of one election, or
* one hypothesis of one poll (`type: poll`). A polling institute often tests several rosters
  of candidates in the same poll; each roster is a hypothesis.

Each observation carries the candidate name, the set of parties the candidate is affiliated with,
and a political family (the "nuance"):

| label            | english     |
|------------------|-------------|
| `Extreme gauche` | `far-left`  |
| `Gauche`         | `left`      |
| `Centre`         | `centre`    |
| `Droite`         | `right`     |
| `Extreme droite` | `far-right` |
| `Autre`          | `other`     |

Both spellings are accepted in queries. The French label is used in the output.

## Searching

A search request is a JSON object. All the fields are optional:

```json
{
  "election_types": ["presidentielle"],
  "rounds": [1],
  "start_date": "2021-09-01",
  "end_date": "2022-04-10",
  "parties": ["RN", "REC"],
  "nuances": ["Extreme droite"],
  "candidates": ["Marine LE PEN"],
  "level": "national",
  "city": "",
  "group_by": "nuance"
}
```

Dates are inclusive. `group_by` is one of `nuance` (or `politicalFamily`, the default),
`party` or `candidate_name`. When grouping by party, the parties of a candidate are sorted
and joined with `", "`: a candidate supported by both `PS` and `PCF` is reported under `PCF, PS`.

## Aggregation

The output has one point per day, kind (`poll` or `result`), election and group. It is built in two stages:

1. Within one context, the shares of all the candidates in the same group are summed. When grouping
   by political family, the two far-left candidates of a poll at 15% and 10% count as 25%.
2. Across contexts, the sums are averaged. Three polls published on the same day with 20% each
   for the far-left give 20%, not 60%.

The output is sorted by date. The values are not clamped: a point above 100% means that the
input data is inconsistent.

When a group contains candidates of several political families on the same day (for example when
grouping by party), the first family encountered is kept and a warning is logged.

## Input formats

The `electotrends` program reads the following formats:
* `csv` datapoints in Comma Separated Values, one candidate per line
* `xlsx` the same datapoints in an Excel spreadsheet
* `json` the same datapoints as a JSON array
* `polls` a JSON file of polls, each with rounds, hypotheses and candidates

### `csv`

The first line is a header. The recognized columns are `type`, `election_id`, `election_type`,
`election_tour`, `date`, `candidate_name`, `party`, `nuance`, `level`, `city`,
`result_pourcentage_exprime`, `result_amount`, `poll_id` and `hypothese`. Several parties are
separated with `|` or `;`. The columns `election_id`, `election_type` and `election_tour` may be
omitted if the data source configuration provides them.

### `polls`

The format of the aggregated poll files: every poll has an `id`, the name of the institute, the
dates of the survey, the sample size (`echantillon`) and a list of `tours`. Every tour has a list of
`hypotheses`, every hypothesis a list of `candidats` with their `parti` and their `intentions`.
The observations are dated with the end of the survey (`fin_enquete`). Each round is its own
election: with `"electionId": "presidentielle_2022"`, the first round intentions belong to
`presidentielle_2022_t1` and the second round ones to `presidentielle_2022_t2`. The number of respondents of a
candidate is estimated from the sample size.

## Configuration

```json
{
  "dataSources": [
    { "provider": "csv", "filePath": "results_2022.csv", "electionId": "presidentielle_2022_t1",
      "electionType": "presidentielle", "round": 1 },
    { "provider": "polls", "filePath": "sondages_presidentielle_2022.json",
      "electionId": "presidentielle_2022", "electionType": "presidentielle" }
  ],
  "electionsFile": "elections.json",
  "partyMapping": { "Rassemblement national": "RN" },
  "nuanceMapping": { "Marine Le Pen": "Extreme droite" },
  "candidateNormalization": { "Marine Le Pen": "Marine LE PEN" },
  "defaultQuery": { "level": "national" }
}
```

The paths are relative to the configuration file.

*/
