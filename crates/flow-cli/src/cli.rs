use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use flow_sdk::SortOrder;

#[derive(Parser)]
#[command(
    name = "flowdb",
    about = "FlowDB: schema-validated document streams with search",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file; overrides `storage` from the configuration
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Replace the stream configuration from a JSON file
    Configure(ConfigureArgs),
    /// List the configured streams
    Streams,
    /// Show a stream's schema
    Schema(StreamArgs),
    /// Append documents from a JSON file or stdin
    Append(AppendArgs),
    /// Show one document
    Get(GetArgs),
    /// Show the most recent documents of a stream
    Recent(RecentArgs),
    /// Search a stream
    Search(SearchArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
    /// Largest accepted request body in bytes
    #[arg(long)]
    pub max_body_bytes: Option<usize>,
    /// Allow cross-origin requests from any origin
    #[arg(long)]
    pub cors: bool,
}

#[derive(Args)]
pub struct ConfigureArgs {
    /// JSON file with `{"dataStreams": [...]}` or a bare array of streams
    pub file: PathBuf,
}

#[derive(Args)]
pub struct StreamArgs {
    pub stream: String,
}

#[derive(Args)]
pub struct AppendArgs {
    pub stream: String,
    /// JSON object or array of objects; `-` reads stdin
    #[arg(default_value = "-")]
    pub input: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub stream: String,
    pub id: u64,
}

#[derive(Args)]
pub struct RecentArgs {
    pub stream: String,
    #[arg(short, long, default_value = "DESC")]
    pub order: SortOrder,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct SearchArgs {
    pub stream: String,
    pub query: String,
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,
    #[arg(short, long, default_value = "DESC")]
    pub order: SortOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["flowdb", "serve", "--bind", "0.0.0.0:9000", "--cors"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
            assert!(args.cors);
            assert_eq!(args.max_body_bytes, None);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["flowdb", "streams", "--data", "db.redb", "-vv"]).unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("db.redb")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Streams));
    }

    #[test]
    fn parse_append_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["flowdb", "append", "orders"]).unwrap();
        if let Command::Append(args) = cli.command {
            assert_eq!(args.stream, "orders");
            assert_eq!(args.input, "-");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_recent_order_any_case() {
        let cli = Cli::try_parse_from(["flowdb", "recent", "orders", "--order", "asc", "-n", "5"]).unwrap();
        if let Command::Recent(args) = cli.command {
            assert_eq!(args.order, SortOrder::Ascending);
            assert_eq!(args.limit, Some(5));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_search() {
        let cli = Cli::try_parse_from(["flowdb", "search", "orders", "sku = 'a'", "--max-results", "3"]).unwrap();
        if let Command::Search(args) = cli.command {
            assert_eq!(args.query, "sku = 'a'");
            assert_eq!(args.max_results, Some(3));
            assert_eq!(args.order, SortOrder::Descending);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_get_rejects_non_numeric_id() {
        assert!(Cli::try_parse_from(["flowdb", "get", "orders", "abc"]).is_err());
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["flowdb", "--format", "json", "streams"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
