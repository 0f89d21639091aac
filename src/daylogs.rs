use crate::error::Result;
use crate::message::ubuntu::LineParser;
use crate::message::{datestamp, LogRecord, ParsedLine};
use crate::util::make_progress_bar;

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

pub const BASE_URL: &str = "https://irclogs.ubuntu.com";
pub const DEFAULT_CHANNELS: &str = "ubuntu,kubuntu,xubuntu";

/// Splits a comma separated channel list. Order, duplicates and empty names are kept.
pub fn split_channels(channels: &str) -> Vec<String> {
    channels.split(',').map(|c| c.to_string()).collect()
}

/// `<host>/<YYYY>/<MM>/<DD>/` for the given `YYYY-MM-DD` date.
///
/// The date is not validated: if it doesn't contain three dash separated numbers the
/// path components are left empty and the download that follows fails on its own.
pub fn day_url(host: &str, date: &str) -> Result<String> {
    let pattern = Regex::new(r"(\d+)-(\d+)-(\d+)")?;
    let parts = match pattern.captures(date) {
        Some(caps) => [1, 2, 3].iter()
            .map(|&i| caps.get(i).map_or("", |m| m.as_str()))
            .collect::<Vec<_>>(),
        None => {
            warn!(date, "date does not look like YYYY-MM-DD");
            vec![""; 3]
        }
    };
    Ok(format!("{}/{}/{}/{}/", host.trim_end_matches('/'), parts[0], parts[1], parts[2]))
}

/// Remote log file for a channel. The leading `#` of the channel name is percent-encoded.
pub fn channel_url(day_url: &str, channel: &str) -> String {
    format!("{}%23{}.txt", day_url, channel)
}

/// Where raw channel logs come from
pub trait LogSource {
    /// Streams the body found at `url` into `out`, returning the number of bytes written.
    fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<u64>;
}

/// Plain HTTP GET, no auth, no retries.
pub struct HttpLogSource {
    client: Client,
}

impl HttpLogSource {
    /// `None` waits for the server forever.
    pub fn new(timeout: Option<Duration>) -> Result<HttpLogSource> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpLogSource { client })
    }
}

impl LogSource for HttpLogSource {
    fn fetch(&self, url: &str, out: &mut dyn Write) -> Result<u64> {
        let mut res = self.client.get(url).send()?.error_for_status()?;
        Ok(res.copy_to(out)?)
    }
}

/// Converts one channel's log text.
///
/// `seq` is the sub-minute counter value for the first matched line; the returned
/// counter is the value to hand to the next channel. Unmatched lines don't advance it.
pub fn convert_channel(
    parser: &LineParser, date: &str, channel: &str, text: &str, seq: u32,
) -> (Vec<LogRecord>, u32) {
    let mut seq = seq;
    let records: Vec<LogRecord> = parser
        .parse_lines(text)
        .filter_map(|line| match line {
            ParsedLine::Matched { time, username, message } => {
                let record = LogRecord::new(datestamp(date, time, seq), channel, username, message);
                seq += 1;
                Some(record)
            }
            ParsedLine::Unmatched => None,
        })
        .collect();
    (records, seq)
}

/// A day of logs for a set of channels on irclogs.ubuntu.com, cached as `<channel>.txt`.
pub struct DayLogs<S: LogSource> {
    date: String,
    day_url: String,
    channels: Vec<String>,
    cache_dir: PathBuf,
    source: S,
}

impl<S: LogSource> DayLogs<S> {
    pub fn new(host: &str, date: &str, channels: Vec<String>, cache_dir: PathBuf, source: S) -> Result<DayLogs<S>> {
        Ok(DayLogs {
            date: date.to_string(),
            day_url: day_url(host, date)?,
            channels,
            cache_dir,
            source,
        })
    }

    pub fn day_url(&self) -> &str {
        &self.day_url
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn cache_path(&self, channel: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.txt", channel))
    }

    /// Downloads every channel, overwriting its cache file.
    ///
    /// Stops at the first failure; cache files written before it stay on disk.
    pub fn download(&self) -> Result<Vec<PathBuf>> {
        let bar = make_progress_bar(self.channels.len());
        let mut paths = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            println!("Processing: {}{}.txt", self.day_url, channel);
            bar.set_message(channel.clone());

            let url = channel_url(&self.day_url, channel);
            let path = self.cache_path(channel);
            let mut file = File::create(&path)?;
            let size = self.source.fetch(&url, &mut file)?;
            file.flush()?;
            debug!(%url, path = %path.display(), size, "cached channel log");

            paths.push(path);
            bar.inc(1);
        }

        bar.finish();
        Ok(paths)
    }

    /// Parses the cached files in channel order with one counter for the whole run.
    pub fn convert(&self) -> Result<Vec<LogRecord>> {
        let parser = LineParser::new()?;
        let mut records = Vec::new();
        let mut seq = 0;

        for channel in &self.channels {
            // older logs carry Latin-1 bytes
            let bytes = std::fs::read(self.cache_path(channel))?;
            let text = String::from_utf8_lossy(&bytes);
            let (converted, next) = convert_channel(&parser, &self.date, channel, &text, seq);
            info!(channel = %channel, records = converted.len(), "converted channel log");
            records.extend(converted);
            seq = next;
        }

        Ok(records)
    }

    /// Writes `<date>.json` into `output_dir`, replacing any previous file.
    pub fn save(&self, records: &[LogRecord], output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(format!("{}.json", self.date));
        let mut writer = io::BufWriter::new(File::create(&path)?);
        serde_json::to_writer(&mut writer, records)?;
        writer.flush()?;
        Ok(path)
    }

    /// Download, convert and save in two sequential passes.
    pub fn sync(&self, output_dir: &Path) -> Result<(PathBuf, usize)> {
        self.download()?;
        let records = self.convert()?;
        let path = self.save(&records, output_dir)?;
        Ok((path, records.len()))
    }
}

impl<S: LogSource> Display for DayLogs<S> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let (n_local_files, local_files_size) = self.channels
            .iter()
            .filter_map(|c| std::fs::metadata(self.cache_path(c)).ok())
            .fold((0u64, 0u64), |mut a, m| {
                a.0 += 1;
                a.1 += m.len();
                a
            });

        write!(
            f,
            "DayLogs {{ {date} @ {url} ; channels = {channels:?} ; cache_dir = {path:?} ; \
             Cached files = {local_count} ; Total size on disk = {size} }}",
            date = self.date,
            url = self.day_url,
            channels = self.channels,
            path = self.cache_dir,
            local_count = n_local_files,
            size = indicatif::HumanBytes(local_files_size)
        )
    }
}
