extern crate irclogs;
extern crate structopt;
use structopt::StructOpt;

use irclogs::algolia::{self, AlgoliaIndex};
use irclogs::util;

use chrono::Local;

#[derive(Debug, StructOpt)]
#[structopt(name = "ubunolia", about = "Search the Ubuntu IRC logs held in Algolia")]
struct Ubunolia {
    /// Application ID
    #[structopt(long = "id", env = "ALGOLIA_APPLICATION_ID", default_value = "PBF4ZR3KBT")]
    id: String,
    /// Search-only API key
    #[structopt(long = "key", env = "ALGOLIA_SEARCH_KEY", default_value = "9188cd13a0dbf3d0af949802b0e31489", hide_env_values = true)]
    key: String,
    /// Name of index
    #[structopt(long = "index", env = "ALGOLIA_INDEX", default_value = "ubuntu_irc_logs")]
    index: String,
    /// API host to use instead of https://<ID>-dsn.algolia.net
    #[structopt(long = "host")]
    host: Option<String>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// List the indexed channels
    Channels,
    /// List the most active users
    TopUsers {
        #[structopt(long = "count", default_value = "10")]
        count: usize,
    },
    /// Print the lines of one channel sent during one minute
    Replay {
        #[structopt(long = "date")]
        date: String,
        #[structopt(long = "channel")]
        channel: String,
        /// HH:MM, defaults to the current local time
        #[structopt(long = "at")]
        at: Option<String>,
    },
    /// Free text search, e.g. for a username
    Search {
        query: String,
        #[structopt(long = "channel")]
        channel: Option<String>,
    },
    /// Number of records in the index
    Count,
    /// When a user was last seen
    Seen { username: String },
    /// What is known about a user
    Whois { username: String },
}

fn run(opt: Ubunolia) -> anyhow::Result<()> {
    let index = match &opt.host {
        Some(host) => AlgoliaIndex::with_host(&opt.id, &opt.key, &opt.index, host)?,
        None => AlgoliaIndex::new(&opt.id, &opt.key, &opt.index)?,
    };

    match opt.command {
        Command::Channels => {
            for channel in algolia::get_channels(&index)? {
                println!("{}", channel);
            }
        }
        Command::TopUsers { count } => {
            for (user, n) in algolia::get_top_users(&index, count)? {
                println!("{} {}", user, n);
            }
        }
        Command::Replay { date, channel, at } => {
            let at = at.unwrap_or_else(|| Local::now().format("%H:%M").to_string());
            let timestamp = format!("{}T{}", date, at);
            for line in algolia::get_irc_logs(&index, &timestamp, &channel)? {
                println!("{}", line);
            }
        }
        Command::Search { query, channel } => {
            for record in algolia::search_logs(&index, &query, channel.as_deref())? {
                println!("{}", algolia::describe_hit(&record));
            }
        }
        Command::Count => {
            println!("{}", algolia::get_total_records(&index)?);
        }
        Command::Seen { username } => {
            println!("{}", algolia::get_most_recent_user_stamp(&index, &username)?);
        }
        Command::Whois { username } => {
            println!("{}", algolia::get_userinfo(&index, &username)?.describe(&username));
        }
    }
    Ok(())
}

fn main() {
    let opt = Ubunolia::from_args();
    util::init_logging("warn");

    if let Err(err) = run(opt) {
        eprintln!("ERROR: {:#}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irclogs::algolia::{PUBLIC_APP_ID, PUBLIC_INDEX, PUBLIC_SEARCH_KEY};

    #[test]
    fn test_public_defaults() {
        if std::env::var_os("ALGOLIA_APPLICATION_ID").is_some()
            || std::env::var_os("ALGOLIA_SEARCH_KEY").is_some()
            || std::env::var_os("ALGOLIA_INDEX").is_some()
        {
            return;
        }
        let opt = Ubunolia::from_iter_safe(&["ubunolia", "channels"]).unwrap();
        assert_eq!(opt.id, PUBLIC_APP_ID);
        assert_eq!(opt.key, PUBLIC_SEARCH_KEY);
        assert_eq!(opt.index, PUBLIC_INDEX);
        assert_eq!(opt.host, None);
    }

    #[test]
    fn test_subcommands() {
        let opt = Ubunolia::from_iter_safe(&["ubunolia", "top-users", "--count", "3"]).unwrap();
        match opt.command {
            Command::TopUsers { count } => assert_eq!(count, 3),
            other => assert!(false, "unexpected command {:?}", other),
        }

        let opt = Ubunolia::from_iter_safe(&[
            "ubunolia", "replay", "--date", "2017-05-16", "--channel", "ubuntu", "--at", "13:07",
        ]).unwrap();
        match opt.command {
            Command::Replay { date, channel, at } => {
                assert_eq!(date, "2017-05-16");
                assert_eq!(channel, "ubuntu");
                assert_eq!(at.as_deref(), Some("13:07"));
            }
            other => assert!(false, "unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_search_and_count() {
        let opt = Ubunolia::from_iter_safe(&["ubunolia", "search", "alice", "--channel", "kubuntu"]).unwrap();
        match opt.command {
            Command::Search { query, channel } => {
                assert_eq!(query, "alice");
                assert_eq!(channel.as_deref(), Some("kubuntu"));
            }
            other => assert!(false, "unexpected command {:?}", other),
        }

        let opt = Ubunolia::from_iter_safe(&["ubunolia", "count"]).unwrap();
        assert!(matches!(opt.command, Command::Count));
    }

    #[test]
    fn test_whois_needs_a_user() {
        assert!(Ubunolia::from_iter_safe(&["ubunolia", "whois"]).is_err());
    }
}
