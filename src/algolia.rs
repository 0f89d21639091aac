use crate::error::{Error, Result};
use crate::message::LogRecord;
use crate::util::most_common;

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Public, search-only credentials of the Ubuntu IRC log index.
pub const PUBLIC_APP_ID: &str = "PBF4ZR3KBT";
pub const PUBLIC_SEARCH_KEY: &str = "9188cd13a0dbf3d0af949802b0e31489";
pub const PUBLIC_INDEX: &str = "ubuntu_irc_logs";

/// Hits further than this from the queried datestamp are not the same minute.
const MAX_PROXIMITY_DISTANCE: u32 = 3;

pub type SearchParams = Map<String, Value>;

/// Parameters for queries that only need metadata (facets, hit counts)
pub fn restricted_search() -> SearchParams {
    let mut params = Map::new();
    params.insert("page".into(), json!(1));
    params.insert("hitsPerPage".into(), json!(1));
    params.insert("length".into(), json!(1));
    params
}

/// Parameters for queries that return log lines
pub fn general_search() -> SearchParams {
    let mut params = Map::new();
    params.insert("highlightPreTag".into(), json!(""));
    params.insert("highlightPostTag".into(), json!(""));
    params.insert("hitsPerPage".into(), json!(1000));
    params
}

/// `base` with every key of `criteria` set on top of it.
pub fn with_criteria(base: SearchParams, criteria: Value) -> SearchParams {
    let mut params = base;
    if let Value::Object(criteria) = criteria {
        params.extend(criteria);
    }
    params
}

#[derive(Debug, Default, Deserialize)]
pub struct RankingInfo {
    #[serde(rename = "proximityDistance", default)]
    pub proximity_distance: u32,
}

/// One search hit. Uploaded records are never validated, so any field may be absent.
#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(default)]
    pub datestamp: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "_rankingInfo", default)]
    pub ranking_info: Option<RankingInfo>,
}

fn required(value: &Option<String>, field: &'static str) -> Result<String> {
    value.clone().ok_or(Error::MissingField(field))
}

impl Hit {
    pub fn datestamp(&self) -> Result<String> {
        required(&self.datestamp, "datestamp")
    }

    /// The hit as a log line; fails when any of the four fields is missing.
    pub fn record(&self) -> Result<LogRecord> {
        Ok(LogRecord {
            datestamp: self.datestamp()?,
            channel: required(&self.channel, "channel")?,
            username: required(&self.username, "username")?,
            message: required(&self.message, "message")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Hit>,
    #[serde(rename = "nbHits", default)]
    pub nb_hits: u64,
    #[serde(default)]
    pub facets: HashMap<String, HashMap<String, u64>>,
}

impl SearchResponse {
    fn facet(&self, name: &str) -> Result<&HashMap<String, u64>> {
        self.facets.get(name).ok_or_else(|| Error::NoResults(format!("facet '{}'", name)))
    }
}

/// A hosted search index
pub trait SearchIndex {
    fn name(&self) -> &str;

    /// Inserts the whole batch with a single call.
    fn add_objects(&self, batch: &[Value]) -> Result<()>;

    fn search(&self, query: &str, params: SearchParams) -> Result<SearchResponse>;
}

/// Algolia REST API index
pub struct AlgoliaIndex {
    client: Client,
    app_id: String,
    api_key: String,
    index: String,
    write_host: String,
    read_host: String,
}

impl AlgoliaIndex {
    pub fn new(app_id: &str, api_key: &str, index: &str) -> Result<AlgoliaIndex> {
        AlgoliaIndex::with_hosts(
            app_id, api_key, index,
            format!("https://{}.algolia.net", app_id),
            format!("https://{}-dsn.algolia.net", app_id),
        )
    }

    /// Same host for reads and writes, e.g. a proxy or a local stand-in.
    pub fn with_host(app_id: &str, api_key: &str, index: &str, host: &str) -> Result<AlgoliaIndex> {
        let host = host.trim_end_matches('/').to_string();
        AlgoliaIndex::with_hosts(app_id, api_key, index, host.clone(), host)
    }

    fn with_hosts(
        app_id: &str, api_key: &str, index: &str, write_host: String, read_host: String,
    ) -> Result<AlgoliaIndex> {
        // no client-side timeout, a hung endpoint hangs the run
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(AlgoliaIndex {
            client,
            app_id: app_id.to_string(),
            api_key: api_key.to_string(),
            index: index.to_string(),
            write_host,
            read_host,
        })
    }

    fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self.client
            .post(url)
            .header("X-Algolia-Application-Id", self.app_id.as_str())
            .header("X-Algolia-API-Key", self.api_key.as_str())
            .json(body)
            .send()?
            .error_for_status()?
            .json::<Value>()?;
        Ok(response)
    }
}

/// Request body of the `batch` endpoint adding every element of `batch` in order.
pub fn batch_request(batch: &[Value]) -> Value {
    let requests = batch
        .iter()
        .map(|object| json!({ "action": "addObject", "body": object }))
        .collect::<Vec<_>>();
    json!({ "requests": requests })
}

impl SearchIndex for AlgoliaIndex {
    fn name(&self) -> &str {
        &self.index
    }

    fn add_objects(&self, batch: &[Value]) -> Result<()> {
        let url = format!("{}/1/indexes/{}/batch", self.write_host, self.index);
        let response = self.post(&url, &batch_request(batch))?;
        debug!(index = %self.index, task = %response["taskID"], objects = batch.len(), "batch accepted");
        Ok(())
    }

    fn search(&self, query: &str, params: SearchParams) -> Result<SearchResponse> {
        let url = format!("{}/1/indexes/{}/query", self.read_host, self.index);
        let mut body = params;
        body.insert("query".into(), json!(query));
        debug!(index = %self.index, query, "search");
        Ok(serde_json::from_value(self.post(&url, &Value::Object(body))?)?)
    }
}

/// Reads a whole JSON array of records. Elements are not validated in any way.
pub fn load_batch(path: &Path) -> Result<Vec<Value>> {
    let file_reader = io::BufReader::new(File::open(path)?);
    let result = serde_json::from_reader(file_reader)?;
    Ok(result)
}

pub fn upload(index: &dyn SearchIndex, path: &Path) -> Result<usize> {
    let batch = load_batch(path)?;
    index.add_objects(&batch)?;
    Ok(batch.len())
}

/// Channels present in the index, sorted by name.
pub fn get_channels(index: &dyn SearchIndex) -> Result<Vec<String>> {
    let results = index.search("", with_criteria(restricted_search(), json!({ "facets": "channel" })))?;
    let mut channels = results.facet("channel")?.keys().cloned().collect::<Vec<_>>();
    channels.sort();
    Ok(channels)
}

pub fn get_top_users(index: &dyn SearchIndex, top: usize) -> Result<Vec<(String, u64)>> {
    let results = index.search("", with_criteria(restricted_search(), json!({ "facets": "username" })))?;
    Ok(most_common(results.facet("username")?, top)
        .into_iter()
        .map(|(user, count)| (user.to_string(), count))
        .collect())
}

/// Lines of `channel` whose datestamp matches `timestamp` (e.g. `2017-05-16T13:07`).
///
/// Full text search also returns near misses, so hits are kept only when the ranking
/// info puts them close enough to the query.
pub fn get_irc_logs(index: &dyn SearchIndex, timestamp: &str, channel: &str) -> Result<Vec<LogRecord>> {
    let criteria = json!({
        "facetFilters": [format!("channel:{}", channel)],
        "getRankingInfo": 1,
    });
    let results = index.search(timestamp, with_criteria(general_search(), criteria))?;
    results.hits
        .iter()
        .filter(|hit| {
            hit.ranking_info.as_ref().map_or(false, |r| r.proximity_distance <= MAX_PROXIMITY_DISTANCE)
        })
        .map(Hit::record)
        .collect()
}

/// Free text search over every record, optionally limited to one channel.
pub fn search_logs(index: &dyn SearchIndex, query: &str, channel: Option<&str>) -> Result<Vec<LogRecord>> {
    let criteria = match channel {
        Some(channel) => json!({ "facetFilters": [format!("channel:{}", channel)] }),
        None => json!({}),
    };
    let results = index.search(query, with_criteria(general_search(), criteria))?;
    results.hits.iter().map(Hit::record).collect()
}

/// `[datestamp] (channel/username): message`
pub fn describe_hit(record: &LogRecord) -> String {
    format!("[{}] ({}/{}): {}", record.datestamp, record.channel, record.username, record.message)
}

/// Number of records in the index.
pub fn get_total_records(index: &dyn SearchIndex) -> Result<u64> {
    Ok(index.search("", Map::new())?.nb_hits)
}

/// Datestamp of the most recent line sent by `username`.
pub fn get_most_recent_user_stamp(index: &dyn SearchIndex, username: &str) -> Result<String> {
    let criteria = json!({
        "facetFilters": [format!("username:{}", username)],
        "getRankingInfo": 1,
    });
    let results = index.search("", with_criteria(general_search(), criteria))?;
    // datestamps come back ascending; past one page of hits the last returned one is the best we have
    results.hits
        .last()
        .ok_or_else(|| Error::NoResults(format!("user '{}'", username)))?
        .datestamp()
}

#[derive(Debug, PartialEq)]
pub struct UserInfo {
    pub channels: Vec<String>,
    pub messages: u64,
    pub first_seen: String,
}

impl UserInfo {
    pub fn describe(&self, username: &str) -> String {
        let mut line = format!(
            "{} was first seen on {}. Since then they have sent {} in the following channels: ",
            username, self.first_seen, self.messages
        );
        for channel in &self.channels {
            line.push_str(channel);
            line.push(' ');
        }
        line
    }
}

pub fn get_userinfo(index: &dyn SearchIndex, username: &str) -> Result<UserInfo> {
    let criteria = json!({ "getRankingInfo": 1, "facets": "*" });
    let results = index.search(username, with_criteria(restricted_search(), criteria))?;

    let mut channels = results.facet("channel")?.keys().cloned().collect::<Vec<_>>();
    channels.sort();
    let first_seen = results.hits
        .first()
        .ok_or_else(|| Error::NoResults(format!("user '{}'", username)))?
        .datestamp()?;

    Ok(UserInfo { channels, messages: results.nb_hits, first_seen })
}
