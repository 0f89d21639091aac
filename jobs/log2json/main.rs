extern crate irclogs;
extern crate structopt;
use structopt::StructOpt;

use irclogs::daylogs::{split_channels, DayLogs, HttpLogSource};
use irclogs::util;

use anyhow::Context;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

const MISSING_DATE: &str = "ERROR: Must specify datestamp. See --help";

#[derive(Debug, StructOpt)]
#[structopt(
    name = "log2json",
    about = "Convert a day's worth of Ubuntu IRC logs to JSON.",
    usage = "log2json --date YYYY-MM-DD [options]"
)]
struct Log2Json {
    /// REQUIRED: Datestamp
    #[structopt(value_name = "YYYY-MM-DD", short = "d", long = "date")]
    date: Option<String>,
    /// Channels to nab
    #[structopt(value_name = "CHANNEL[,CHANNEL]", short = "c", long = "channels", default_value = "ubuntu,kubuntu,xubuntu")]
    channels: String,
    /// Where the daily log directories live
    #[structopt(value_name = "URL", long = "base-url", default_value = "https://irclogs.ubuntu.com")]
    base_url: String,
    /// Directory for the downloaded <channel>.txt files
    #[structopt(value_name = "CACHE_DIR", long = "cache-dir", parse(from_os_str), default_value = ".")]
    cache_dir: PathBuf,
    /// Directory for <date>.json
    #[structopt(value_name = "OUTPUT_DIR", long = "output-dir", parse(from_os_str), default_value = ".")]
    output_dir: PathBuf,
    /// Give up on a download after this long, e.g. "30s". Waits forever by default
    #[structopt(value_name = "DURATION", long = "timeout", parse(try_from_str = humantime::parse_duration))]
    timeout: Option<Duration>,
    /// Show a progress bar while downloading
    #[structopt(long = "progress")]
    progress: bool,
}

fn parse_args() -> (Log2Json, String) {
    // help and usage errors both exit with 1
    let opt = match Log2Json::from_iter_safe(std::env::args_os()) {
        Ok(opt) => opt,
        Err(err) => {
            println!("{}", err.message);
            std::process::exit(1);
        }
    };
    match opt.date.clone() {
        Some(date) => (opt, date),
        None => {
            println!("{}", MISSING_DATE);
            std::process::exit(1);
        }
    }
}

fn run(opt: Log2Json, date: String) -> anyhow::Result<()> {
    util::progress_bar(opt.progress);

    let source = HttpLogSource::new(opt.timeout)?;
    let logs = DayLogs::new(&opt.base_url, &date, split_channels(&opt.channels), opt.cache_dir.clone(), source)?;

    let t = Instant::now();
    let (path, count) = logs
        .sync(&opt.output_dir)
        .with_context(|| format!("Could not convert logs for {}", date))?;

    info!("{}", logs);
    info!(
        records = count,
        output = %path.display(),
        elapsed = %humantime::format_duration(Duration::from_millis(t.elapsed().as_millis() as u64)),
        "logs converted"
    );
    Ok(())
}

fn main() {
    let (opt, date) = parse_args();
    util::init_logging("warn");

    if let Err(err) = run(opt, date) {
        eprintln!("ERROR: {:#}", err);
        std::process::exit(1);
    }
}
