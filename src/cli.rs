//! Command-line argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Query an Athena-style warehouse through the assistant tool interface.
#[derive(Parser, Debug)]
#[command(name = "insights")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", env = "INSIGHTS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Use the in-memory mock warehouse instead of the remote service
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a SQL query, capped at the configured row limit
    Query {
        /// SQL text
        sql: String,

        /// Maximum number of rows to return
        #[arg(long, value_name = "N")]
        max_rows: Option<i64>,
    },

    /// List tables in a database
    Tables {
        /// Database name (defaults to the configured database)
        #[arg(short = 'd', long, value_name = "DB")]
        database: Option<String>,
    },

    /// Show a table's columns and types
    Describe {
        /// Table name, `table` or `database.table`
        table: String,

        /// Include comments and partition columns
        #[arg(long)]
        full: bool,
    },

    /// Show the CREATE TABLE statement for a table
    Ddl {
        /// Table name, `table` or `database.table`
        table: String,
    },

    /// Show sample rows from a table
    Sample {
        /// Table name, `table` or `database.table`
        table: String,

        /// Number of rows
        #[arg(short = 'n', long, value_name = "N")]
        limit: Option<i64>,
    },

    /// Print a documentation resource
    Resource {
        /// Resource URI, e.g. insights://knowledge/catalog
        uri: String,
    },

    /// Print the tool definitions as JSON
    Tools,

    /// List the documentation resources
    Resources,

    /// Regenerate catalog.txt and examples.txt from the SQL templates
    Generate {
        /// Row cap for each template run
        #[arg(long, value_name = "N", default_value_t = 100)]
        row_limit: usize,

        /// Rows shown per template in examples.txt
        #[arg(long, value_name = "N", default_value_t = 20)]
        preview_rows: usize,

        /// Include SHOW CREATE TABLE output in the catalog
        #[arg(long)]
        ddl: bool,
    },
}

impl Command {
    /// Returns the tool name and JSON arguments when the command maps to a tool call.
    pub fn tool_call(&self) -> Option<(&'static str, serde_json::Value)> {
        let call = match self {
            Self::Query { sql, max_rows } => (
                "run_query",
                serde_json::json!({ "query": sql, "max_rows": max_rows }),
            ),
            Self::Tables { database } => {
                ("list_tables", serde_json::json!({ "database": database }))
            }
            Self::Describe { table, full: false } => {
                ("describe_table", serde_json::json!({ "table": table }))
            }
            Self::Ddl { table } => ("show_create_table", serde_json::json!({ "table": table })),
            Self::Sample { table, limit } => (
                "get_sample_data",
                serde_json::json!({ "table": table, "limit": limit }),
            ),
            _ => return None,
        };
        Some(call)
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}
