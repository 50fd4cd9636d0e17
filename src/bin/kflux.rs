//! kflux CLI - Command-line interface for Keystroke Flux
//!
//! Commands:
//! - replay: Replay recorded keyboard events into session records
//! - validate: Validate keyboard event schema
//! - doctor: Diagnose configuration and environment
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use keystroke_flux::config::ENV_PREFIX;
use keystroke_flux::schema::{EventAdapter, TimedEvent, SCHEMA_VERSION};
use keystroke_flux::sink::EmittedRecord;
use keystroke_flux::{replay_events, EngineConfig, EngineError, UserIdentity};
use keystroke_flux::{ENGINE_VERSION, PRODUCER_NAME};

/// kflux - On-device keystroke-dynamics session engine
#[derive(Parser)]
#[command(name = "kflux")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Turn keyboard events into typing session records", long_about = None)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded keyboard events into session records
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// User id the records are attributed to
        #[arg(long, default_value = "anonymous")]
        user: String,

        /// TOML config file (KFLUX_* environment variables still apply)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the full replay report (outcomes and counts) instead of records
        #[arg(long)]
        report: bool,
    },

    /// Validate keyboard event schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// TOML config file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (keyboard.event.v1)
    Input,
    /// Output schema (typing session record)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), KfluxCliError> {
    match command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            user,
            config,
            report,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            output_format,
            &user,
            config.as_deref(),
            report,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    user: &str,
    config: Option<&Path>,
    report: bool,
) -> Result<(), KfluxCliError> {
    let config = EngineConfig::load_from(config)?;
    tracing::debug!(?config, "loaded configuration");

    let events = read_events(input, &input_format)?;
    if events.is_empty() {
        return Err(KfluxCliError::NoEvents);
    }

    let replay = replay_events(&events, UserIdentity::new(user), config)?;

    let output_data = if report {
        match output_format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&replay)? + "\n",
            _ => serde_json::to_string(&replay)? + "\n",
        }
    } else {
        format_output(&replay.records, &output_format)?
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), KfluxCliError> {
    let events = read_events(input, &input_format)?;

    let results = EventAdapter::validate_events(&events);
    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                event_type: r.event_type.to_string(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);
        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} (index {}): {}", err.event_type, err.index, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(KfluxCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), KfluxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Keystroke Flux version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    // Resolved configuration, including any KFLUX_* overrides
    match EngineConfig::load_from(config) {
        Ok(resolved) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "gate: {} words, {} characters, {}s; overlap policy: {:?}",
                resolved.gate.min_words,
                resolved.gate.min_characters,
                resolved.gate.min_duration_secs,
                resolved.timers.overlap_policy
            ),
        }),
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let overrides: Vec<String> = std::env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with(ENV_PREFIX))
        .collect();
    if !overrides.is_empty() {
        checks.push(DoctorCheck {
            name: "env_overrides".to_string(),
            status: CheckStatus::Warning,
            message: format!("Environment overrides active: {}", overrides.join(", ")),
        });
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay from stdin ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("kflux Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(KfluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), KfluxCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One JSON object per keyboard callback:");
                println!("  {{\"at\": <RFC 3339 timestamp>, \"type\": <event type>, ...}}");
                println!();
                println!("Event types:");
                println!("  focus_in, focus_out         - text field focus changes");
                println!("  key_down, key_up            - key press and release");
                println!("  character_typed             - a character was inserted");
                println!("  word_boundary               - space or punctuation ended a word");
                println!("  backspace                   - a single backspace");
                println!("  burst_detected {{length}}     - a run of >= 2 backspaces ended");
                println!("  pressure_sample {{value}}     - touch pressure reading (>= 0)");
                println!("  pressure_removed {{value}}    - pressure reading withdrawn (>= 0)");
                println!("  word_or_sentence_deleted    - word/sentence deletion gesture");
                println!("  character_deleted           - a character was removed");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: typing session record");
                println!();
                println!("One record per typing session that passes the usability gate:");
                println!();
                println!("- dateCreated, startTime, endTime, duration (whole seconds)");
                println!("- wordsTyped, charactersTyped, totalWPS, totalCPS");
                println!("- avgPauseWtWDuration, maxPauseWtWDuration, pauseWtWListSize");
                println!("- avgPauseCtCDuration, maxPauseCtCDuration, pauseCtCListSize");
                println!("- meanIKI, stdDevIKI, ikiListSize (-1 when no interval was measured)");
                println!("- totalBackspaces, totalWordOrSentenceDeletions");
                println!("- totalBackspaceBurstCount, maxBackspaceBurstCount, totalCharactersDeleted");
                println!("- totalPressureByTimesCounter");
            }
        }
    }
    Ok(())
}

// Helper functions

fn read_events(input: &Path, input_format: &InputFormat) -> Result<Vec<TimedEvent>, KfluxCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let events = match input_format {
        InputFormat::Ndjson => EventAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => EventAdapter::parse_array(&input_data)?,
    };
    Ok(events)
}

fn format_output(records: &[EmittedRecord], format: &OutputFormat) -> Result<String, KfluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut output = String::new();
            for record in records {
                output.push_str(&serde_json::to_string(record)?);
                output.push('\n');
            }
            Ok(output)
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Keyboard callback event",
        "type": "object",
        "required": ["at", "type"],
        "properties": {
            "schema_version": { "type": "string", "const": SCHEMA_VERSION },
            "at": { "type": "string", "format": "date-time" },
            "type": {
                "type": "string",
                "enum": [
                    "focus_in", "focus_out", "word_boundary", "character_typed",
                    "key_down", "key_up", "backspace", "burst_detected",
                    "pressure_sample", "pressure_removed",
                    "word_or_sentence_deleted", "character_deleted"
                ]
            },
            "length": { "type": "integer", "minimum": 2 },
            "value": { "type": "integer", "minimum": 0 }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let number = serde_json::json!({ "type": "number" });
    let count = serde_json::json!({ "type": "integer", "minimum": 0 });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "typing_session_data",
        "description": "Keystroke Flux typing session record",
        "type": "object",
        "properties": {
            "user": {
                "type": "object",
                "required": ["uid"],
                "properties": { "uid": { "type": "string" } }
            },
            "record": {
                "type": "object",
                "properties": {
                    "dateCreated": { "type": "string", "format": "date-time" },
                    "startTime": { "type": "string" },
                    "endTime": { "type": "string" },
                    "duration": { "type": "integer" },
                    "totalPressureByTimesCounter": { "type": "integer" },
                    "wordsTyped": count,
                    "charactersTyped": count,
                    "totalWPS": number,
                    "totalCPS": number,
                    "avgPauseWtWDuration": number,
                    "maxPauseWtWDuration": number,
                    "pauseWtWListSize": count,
                    "avgPauseCtCDuration": number,
                    "maxPauseCtCDuration": number,
                    "pauseCtCListSize": count,
                    "meanIKI": number,
                    "stdDevIKI": number,
                    "ikiListSize": count,
                    "totalBackspaces": count,
                    "totalWordOrSentenceDeletions": count,
                    "totalBackspaceBurstCount": count,
                    "maxBackspaceBurstCount": count,
                    "totalCharactersDeleted": count
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum KfluxCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for KfluxCliError {
    fn from(e: io::Error) -> Self {
        KfluxCliError::Io(e)
    }
}

impl From<EngineError> for KfluxCliError {
    fn from(e: EngineError) -> Self {
        KfluxCliError::Engine(e)
    }
}

impl From<serde_json::Error> for KfluxCliError {
    fn from(e: serde_json::Error) -> Self {
        KfluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<KfluxCliError> for CliError {
    fn from(e: KfluxCliError) -> Self {
        match e {
            KfluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            KfluxCliError::Engine(e @ EngineError::Config(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'kflux doctor --config <file>' to inspect the configuration".to_string()),
            },
            KfluxCliError::Engine(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            KfluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            KfluxCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            KfluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            KfluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    event_type: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
