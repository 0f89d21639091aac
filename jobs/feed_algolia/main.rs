extern crate irclogs;
extern crate structopt;
use structopt::StructOpt;

use irclogs::algolia::{self, AlgoliaIndex, SearchIndex};
use irclogs::util;
use irclogs::Error;

use anyhow::Context;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

const MISSING_ARGS: &str = "ERROR: Must specify id, key, index, and source. See --help";

#[derive(Debug, StructOpt)]
#[structopt(
    name = "feed-algolia",
    about = "Feed delicious JSON noms to Algolia.",
    usage = "feed-algolia --id ID --key KEY --index INDEX --source SOURCE"
)]
struct FeedAlgolia {
    /// Application ID
    #[structopt(value_name = "ID", long = "id", env = "ALGOLIA_APPLICATION_ID")]
    id: Option<String>,
    /// API Key (r/w)
    #[structopt(value_name = "KEY", long = "key", env = "ALGOLIA_API_KEY", hide_env_values = true)]
    key: Option<String>,
    /// Name of index
    #[structopt(value_name = "INDEX", long = "index", env = "ALGOLIA_INDEX")]
    index: Option<String>,
    /// File with the JSON in it
    #[structopt(value_name = "SOURCE", long = "source", parse(from_os_str))]
    source: Option<PathBuf>,
    /// API host to use instead of https://<ID>.algolia.net
    #[structopt(value_name = "HOST", long = "host")]
    host: Option<String>,
}

#[derive(Debug)]
struct Upload {
    id: String,
    key: String,
    index: String,
    source: PathBuf,
    host: Option<String>,
}

impl FeedAlgolia {
    /// Every one of id, key, index and source has to be present.
    fn into_upload(self) -> Result<Upload, Error> {
        match (self.id, self.key, self.index, self.source) {
            (Some(id), Some(key), Some(index), Some(source)) => {
                Ok(Upload { id, key, index, source, host: self.host })
            }
            _ => Err(Error::Usage(MISSING_ARGS.to_string())),
        }
    }
}

fn parse_args() -> Upload {
    // help and usage errors both exit with 1
    let opt = match FeedAlgolia::from_iter_safe(std::env::args_os()) {
        Ok(opt) => opt,
        Err(err) => {
            println!("{}", err.message);
            std::process::exit(1);
        }
    };
    match opt.into_upload() {
        Ok(upload) => upload,
        Err(err) => {
            println!("{}", err);
            std::process::exit(1);
        }
    }
}

fn run(upload: Upload) -> anyhow::Result<()> {
    let index = match &upload.host {
        Some(host) => AlgoliaIndex::with_host(&upload.id, &upload.key, &upload.index, host)?,
        None => AlgoliaIndex::new(&upload.id, &upload.key, &upload.index)?,
    };

    println!("Processing: {} to {}", upload.source.display(), index.name());

    let t = Instant::now();
    let count = algolia::upload(&index, &upload.source)
        .with_context(|| format!("Could not feed {} to {}", upload.source.display(), upload.index))?;

    info!(
        objects = count,
        elapsed = %humantime::format_duration(Duration::from_millis(t.elapsed().as_millis() as u64)),
        "batch uploaded"
    );
    Ok(())
}

fn main() {
    let upload = parse_args();
    util::init_logging("warn");

    if let Err(err) = run(upload) {
        eprintln!("ERROR: {:#}", err);
        std::process::exit(1);
    }
}
