mod identify;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use magicscope_core::{DatabaseList, Magic, MagicConfig, Param};

use identify::{FlagSwitches, Input};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "magicscope",
    about = "Identify file contents with libmagic",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting MAGICSCOPE_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe the contents of files (`-` reads stdin).
    Identify(IdentifyArgs),

    /// Validate magic database files (default database if omitted).
    Check { database: Option<String> },

    /// Compile magic files to `<name>.mgc` in the current directory.
    Compile { database: String },

    /// Dump magic entries, binary tests first, then text tests.
    List { database: Option<String> },

    /// Inspect or persist libmagic limits.
    Param {
        #[command(subcommand)]
        action: ParamAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information.
    Version,
}

#[derive(Args)]
struct IdentifyArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Print MIME type and encoding.
    #[arg(short = 'i', long)]
    mime: bool,
    #[arg(long)]
    mime_type: bool,
    #[arg(long)]
    mime_encoding: bool,
    /// Print valid extensions for the file type.
    #[arg(long)]
    extension: bool,
    /// Print the Apple creator/type.
    #[arg(long)]
    apple: bool,
    /// Keep going after the first match.
    #[arg(short = 'k', long)]
    keep_going: bool,
    /// Follow symlinks.
    #[arg(short = 'L', long)]
    dereference: bool,
    /// Look inside compressed files.
    #[arg(short = 'z', long)]
    uncompress: bool,
    /// Don't translate unprintable characters.
    #[arg(short = 'r', long)]
    raw: bool,

    /// Colon-separated magic files to use instead of the configured ones.
    #[arg(short = 'm', long = "magic-file")]
    magic_file: Option<String>,

    /// Don't prefix output lines with file names.
    #[arg(short = 'b', long)]
    brief: bool,

    /// Classify on this many threads, one libmagic handle each.
    #[arg(short = 'j', long, default_value = "1")]
    jobs: usize,
}

impl IdentifyArgs {
    fn switches(&self) -> FlagSwitches {
        FlagSwitches {
            mime: self.mime,
            mime_type: self.mime_type,
            mime_encoding: self.mime_encoding,
            extension: self.extension,
            apple: self.apple,
            keep_going: self.keep_going,
            dereference: self.dereference,
            uncompress: self.uncompress,
            raw: self.raw,
        }
    }
}

// ─── Param Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ParamAction {
    /// Show every limit as libmagic reports it.
    List,
    /// Show one limit.
    Get { name: String },
    /// Validate a limit against libmagic and save it to the config file.
    Set { name: String, value: usize },
    /// Remove a limit from the config file.
    Unset { name: String },
}

// ─── Config Actions ─────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Show the config file path.
    Path,
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    let json_output = cli.json || std::env::var("MAGICSCOPE_JSON").as_deref() == Ok("1");

    let config = if needs_config(&cli.command) {
        MagicConfig::load()?
    } else {
        MagicConfig::default()
    };
    init_logging(&config.log.level);

    match cli.command {
        // ── Identify ───────────────────────────────────────────────────────
        Commands::Identify(args) => {
            let effective = identify::effective_config(
                &config,
                args.switches().flags(),
                args.magic_file.as_deref(),
            )?;
            let inputs = args
                .paths
                .iter()
                .map(|p| Input::from_arg(p))
                .collect::<Result<Vec<_>>>()?;

            let outcomes = if args.jobs > 1 && inputs.len() > 1 {
                identify::run_parallel(&effective, &inputs, args.jobs)?
            } else {
                identify::run_sequential(&effective, &inputs)?
            };
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            let dur = start.elapsed().as_millis();

            if json_output {
                let items: Vec<serde_json::Value> = outcomes
                    .iter()
                    .map(|o| match &o.result {
                        Ok(desc) => serde_json::json!({"path": o.label, "description": desc}),
                        Err(e) => serde_json::json!({
                            "path": o.label,
                            "error": e.message(),
                            "errno": e.errno(),
                        }),
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "status": if failed == 0 { "ok" } else { "error" },
                    "data": { "items": items, "flags": effective.parsed_flags()?.to_string() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                for outcome in &outcomes {
                    let line = identify::render_line(outcome, args.brief);
                    if outcome.result.is_ok() {
                        println!("{line}");
                    } else {
                        eprintln!("{line}");
                    }
                }
            }

            if failed > 0 {
                std::process::exit(1);
            }
        }

        // ── Databases ──────────────────────────────────────────────────────
        Commands::Check { database } => {
            let list = DatabaseList::parse(database.as_deref().unwrap_or(""));
            let mut magic = config.open_magic()?;
            let result = magic.check(&list);
            report_database_op(json_output, "check", &list, result.map(|_| serde_json::Value::Null))?;
        }

        Commands::Compile { database } => {
            let list = DatabaseList::parse(&database);
            let mut magic = config.open_magic()?;
            let result = magic.compile(&list).map(|outputs| {
                serde_json::json!(outputs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>())
            });
            report_database_op(json_output, "compile", &list, result)?;
        }

        Commands::List { database } => {
            let list = DatabaseList::parse(database.as_deref().unwrap_or(""));
            let mut magic = config.open_magic()?;
            let result = magic.list(&list);
            report_database_op(json_output, "list", &list, result.map(|_| serde_json::Value::Null))?;
        }

        // ── Params ─────────────────────────────────────────────────────────
        Commands::Param { action } => match action {
            ParamAction::List => {
                let magic = config.open_magic()?;
                let mut values = serde_json::Map::new();
                for param in Param::ALL {
                    match magic.param(param) {
                        Ok(v) => {
                            values.insert(param.name().to_string(), v.into());
                            if !json_output {
                                println!("{:<14} {v}", param.name());
                            }
                        }
                        Err(e) => {
                            values.insert(param.name().to_string(), serde_json::Value::Null);
                            if !json_output {
                                println!("{:<14} unsupported ({})", param.name(), e.message());
                            }
                        }
                    }
                }
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":values}))?;
                }
            }

            ParamAction::Get { name } => {
                let param: Param = name.parse()?;
                let value = config.open_magic()?.param(param)?;
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"name":param.name(),"value":value}}))?;
                } else {
                    println!("{value}");
                }
            }

            ParamAction::Set { name, value } => {
                let param: Param = name.parse()?;
                let mut magic = Magic::open(config.parsed_flags()?)?;
                magic.set_param(param, value)?;
                let applied = magic.param(param)?;

                let mut updated = config.clone();
                updated.params.set(param, Some(applied));
                let path = MagicConfig::config_path();
                updated.save_to(&path)?;

                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"name":param.name(),"value":applied}}))?;
                } else {
                    println!("{} = {applied} (saved to {})", param.name(), path.display());
                }
            }

            ParamAction::Unset { name } => {
                let param: Param = name.parse()?;
                let mut updated = config.clone();
                updated.params.set(param, None);
                updated.save_to(&MagicConfig::config_path())?;
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"name":param.name(),"value":null}}))?;
                } else {
                    println!("{} unset", param.name());
                }
            }
        },

        // ── Config ─────────────────────────────────────────────────────────
        Commands::Config { action } => match action {
            ConfigAction::List => {
                let flags = config.parsed_flags()?;
                if json_output {
                    let params: serde_json::Map<String, serde_json::Value> = config
                        .params
                        .entries()
                        .into_iter()
                        .map(|(p, v)| (p.name().to_string(), v.into()))
                        .collect();
                    print_json(&serde_json::json!({
                        "status":"ok",
                        "data":{
                            "path": MagicConfig::config_path().display().to_string(),
                            "flags": flags.to_string(),
                            "database": config.database_list().describe(),
                            "params": params,
                            "log_level": config.log.level,
                        }
                    }))?;
                } else {
                    println!("path      = {}", MagicConfig::config_path().display());
                    println!("flags     = {flags}");
                    println!("database  = {}", config.database_list().describe());
                    for (param, value) in config.params.entries() {
                        println!("{:<9} = {value}", param.name());
                    }
                    println!("log.level = {}", config.log.level);
                }
            }
            ConfigAction::Path => {
                println!("{}", MagicConfig::config_path().display());
            }
        },

        // ── Version ────────────────────────────────────────────────────────
        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            let libmagic = Magic::version_string();
            let default_db = Magic::default_database_path().unwrap_or_default();
            if json_output {
                print_json(&serde_json::json!({
                    "status":"ok",
                    "data":{"version":version,"libmagic":libmagic,"default_database":default_db}
                }))?;
            } else {
                println!("magicscope v{version}");
                println!("libmagic {libmagic}");
                if !default_db.is_empty() {
                    println!("default database: {default_db}");
                }
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// `config path` and `version` must work even when the config file is broken.
fn needs_config(command: &Commands) -> bool {
    !matches!(
        command,
        Commands::Version | Commands::Config { action: ConfigAction::Path }
    )
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("MAGICSCOPE_LOG")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn report_database_op(
    json_output: bool,
    op: &str,
    list: &DatabaseList,
    result: magicscope_core::Result<serde_json::Value>,
) -> Result<()> {
    match result {
        Ok(data) => {
            if json_output {
                print_json(&serde_json::json!({
                    "status":"ok",
                    "data":{"operation":op,"database":list.describe(),"outputs":data}
                }))?;
            } else if let Some(outputs) = data.as_array() {
                for output in outputs.iter().filter_map(|o| o.as_str()) {
                    println!("wrote {output}");
                }
            } else if op == "check" {
                println!("{}: ok", list.describe());
            }
            Ok(())
        }
        Err(e) => {
            if json_output {
                print_json(&serde_json::json!({
                    "status":"error",
                    "error": op,
                    "message": e.message(),
                    "errno": e.errno(),
                }))?;
            } else {
                eprintln!("{e}");
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("magicscope").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_path_and_version_skip_config() {
        assert!(!needs_config(&command(&["config", "path"])));
        assert!(!needs_config(&command(&["version"])));
        assert!(!needs_config(&command(&["--json", "version"])));
    }

    #[test]
    fn test_other_commands_load_config() {
        assert!(needs_config(&command(&["config", "list"])));
        assert!(needs_config(&command(&["identify", "a.txt"])));
        assert!(needs_config(&command(&["param", "list"])));
        assert!(needs_config(&command(&["check"])));
    }

    #[test]
    fn test_malformed_config_does_not_reach_skipped_commands() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "flags = [unterminated").unwrap();
        assert!(MagicConfig::load_from(&path).is_err());

        // The skipped commands run on defaults instead.
        assert!(!needs_config(&command(&["config", "path"])));
        assert_eq!(MagicConfig::default().log.level, "warn");
    }
}
