//! hana-sql — render HANA dialect SQL without a connection.
//!
//! # Usage
//!
//! ```bash
//! hana-sql quote users
//! hana-sql type decimal --precision 50 --scale 2
//! hana-sql create-table users --column email:string:120 --column age:integer --kind row
//! hana-sql sequence users
//! hana-sql procedure get_users --body 'SELECT * FROM "USERS"'
//! hana-sql call sum_orders 23 x --out 1
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use hana_bridge::parser::bind_placeholders;
use hana_bridge::prelude::*;
use hana_bridge::procedure::{call_statement, create_procedure_sql};
use hana_bridge::transpiler;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hana-sql")]
#[command(version)]
#[command(about = "Render HANA dialect SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    hana-sql create-table users --column email:string:120 --kind row
    hana-sql procedure get_users --body 'SELECT * FROM \"USERS\"'
    hana-sql call sum_orders 23 --out 1")]
struct Cli {
    /// Connection config; only dialect defaults are read from it
    #[arg(short, long, env = "HANA_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote an identifier
    Quote {
        ident: String,
    },
    /// Map a logical type to its native SQL type
    Type {
        logical: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        precision: Option<u32>,
        #[arg(long)]
        scale: Option<u32>,
    },
    /// Render CREATE TABLE with its sequence
    CreateTable {
        name: String,
        /// name:type[:limit]
        #[arg(long = "column")]
        columns: Vec<String>,
        /// row, column, history_column, global_temporary, local_temporary
        #[arg(long)]
        kind: Option<String>,
        /// Skip the auto-assigned primary key
        #[arg(long)]
        no_id: bool,
    },
    /// Render the sequence statements for a table
    Sequence {
        table: String,
    },
    /// Render CREATE PROCEDURE
    Procedure {
        name: String,
        #[arg(long, conflicts_with = "file")]
        body: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Omit READS SQL DATA
        #[arg(long)]
        writable: bool,
    },
    /// Render a CALL with inline IN arguments
    Call {
        name: String,
        args: Vec<String>,
        /// Number of output parameters to append
        #[arg(long, default_value_t = 0)]
        out: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "hana_bridge=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConnectionConfig::load(path)?,
        None => ConnectionConfig::discover().unwrap_or_default(),
    };
    let quoting = Quoting::new(config.default_timezone);

    match &cli.command {
        Commands::Quote { ident } => println!("{}", quote_table_name(ident)),
        Commands::Type {
            logical,
            limit,
            precision,
            scale,
        } => {
            let ty: LogicalType = logical.parse()?;
            println!("{}", transpiler::type_to_sql(ty, *limit, *precision, *scale)?);
        }
        Commands::CreateTable {
            name,
            columns,
            kind,
            no_id,
        } => {
            let specs = columns.iter().map(|c| parse_column(c)).collect::<Result<Vec<_>>>()?;
            let mut options = TableOptions::default();
            if let Some(kind) = kind {
                options = options.kind(kind.parse()?);
            }
            if *no_id {
                options = options.without_id();
            }
            let sequence = Sequence::for_table(name);
            print_sql(&transpiler::create_sequence_sql(&sequence));
            print_sql(&transpiler::create_table_sql(
                name,
                &specs,
                &options,
                &config.primary_key,
                config.default_table_type,
                &quoting,
            )?);
            if options.id {
                print_sql(&transpiler::reset_sequence_sql(&sequence, &config.primary_key));
            }
        }
        Commands::Sequence { table } => {
            let sequence = Sequence::for_table(table);
            print_sql(&transpiler::create_sequence_sql(&sequence));
            print_sql(&transpiler::reset_sequence_sql(&sequence, &config.primary_key));
            print_sql(&transpiler::next_value_sql(&sequence));
        }
        Commands::Procedure {
            name,
            body,
            file,
            writable,
        } => {
            let definition = match (body, file) {
                (Some(body), _) => body.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("pass --body or --file"),
            };
            let options = if *writable {
                ProcedureOptions::writable()
            } else {
                ProcedureOptions::default()
            };
            print!("{}", create_procedure_sql(name, &definition, &options)?.white());
        }
        Commands::Call { name, args, out } => {
            print_sql(&render_call(name, args, *out, &quoting)?);
            if *out > 0 {
                println!("{} {} output slot(s) left unbound", "→".dimmed(), out);
            }
        }
    }
    Ok(())
}

/// Raw arguments are quoted here; callers pass `x`, not `'x'`.
fn render_call(name: &str, args: &[String], out: usize, quoting: &Quoting) -> Result<String> {
    let mut literals: Vec<Option<String>> = args
        .iter()
        .map(|arg| Some(quoting.quote(&parse_argument(arg), None)))
        .collect();
    literals.extend(std::iter::repeat_n(None, out));
    Ok(bind_placeholders(&call_statement(name, literals.len()), &literals)?)
}

fn print_sql(sql: &str) {
    println!("{}", sql.white());
}

fn parse_column(raw: &str) -> Result<ColumnSpec> {
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.as_slice() {
        [name, ty] => Ok(ColumnSpec::new(*name, ty.parse()?)),
        [name, ty, limit] => {
            let limit = limit.parse().with_context(|| format!("bad limit in '{}'", raw))?;
            Ok(ColumnSpec::new(*name, ty.parse()?).limit(limit))
        }
        _ => bail!("column must be name:type[:limit], got '{}'", raw),
    }
}

/// Integers and floats stay numeric; everything else is a string.
fn parse_argument(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Float(f)
    } else {
        Value::String(raw.to_string())
    }
}
