//! OpenAPI Schema Engine CLI
//!
//! Command-line interface for validating payloads, generating examples,
//! diffing responses, assembling requests and linting OpenAPI documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use oas_engine::{
    assemble, diff, lint, load_spec, synthesize_with, validate_json_text, validate_parameter,
    ApiKeyLocation, AuthConfig, FileStatus, Method, Schema, Severity, SpecDocument,
    SynthesisOptions, DEFAULT_MAX_DEPTH,
};

#[derive(Parser)]
#[command(name = "oas-engine")]
#[command(about = "Validate, synthesize and diff values against OpenAPI schemas")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a JSON payload against a named schema
    Validate {
        /// OpenAPI document: file path or URL (http:// or https://)
        spec: String,

        /// Schema name (e.g. Pet) or reference (#/components/schemas/Pet)
        #[arg(long)]
        schema: String,

        /// Payload file to validate
        payload: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Generate an example value for a named schema
    Example {
        /// OpenAPI document: file path or URL
        spec: String,

        /// Schema name or reference
        #[arg(long)]
        schema: String,

        /// Depth at which nested arrays and objects are truncated
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Compare an observed response against a named schema
    Diff {
        /// OpenAPI document: file path or URL
        spec: String,

        /// Schema name or reference
        #[arg(long)]
        schema: String,

        /// Response body file (JSON)
        response: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Assemble a request descriptor for an operation
    #[command(group(ArgGroup::new("auth").args(["bearer", "basic", "api_key", "oauth2"])))]
    Request {
        /// OpenAPI document: file path or URL
        spec: String,

        /// HTTP method (GET, POST, ...)
        #[arg(long, short)]
        method: String,

        /// Path template as declared in the document (e.g. /pets/{id})
        #[arg(long, short)]
        path: String,

        /// Base URL (default: first server declared in the document)
        #[arg(long)]
        base_url: Option<String>,

        /// Parameter value as name=value (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,

        /// Request body file
        #[arg(long)]
        body: Option<PathBuf>,

        /// Content type of the body
        #[arg(long, default_value = "application/json")]
        content_type: String,

        /// Bearer token
        #[arg(long)]
        bearer: Option<String>,

        /// Basic credentials as user:password
        #[arg(long)]
        basic: Option<String>,

        /// API key as NAME=VALUE
        #[arg(long)]
        api_key: Option<String>,

        /// Where the API key is sent
        #[arg(long, value_enum, default_value_t = KeyLocation::Header)]
        api_key_in: KeyLocation,

        /// OAuth2 access token
        #[arg(long)]
        oauth2: Option<String>,

        /// Assemble even when parameters or body fail validation
        #[arg(long)]
        skip_validation: bool,
    },

    /// Lint OpenAPI documents (syntax, broken refs, patterns, cycles)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyLocation {
    Header,
    Query,
}

impl From<KeyLocation> for ApiKeyLocation {
    fn from(location: KeyLocation) -> Self {
        match location {
            KeyLocation::Header => ApiKeyLocation::Header,
            KeyLocation::Query => ApiKeyLocation::Query,
        }
    }
}

fn init_tracing(verbose: u8) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            // Malformed patterns and similar warnings are always shown
            0 => "warn".to_string(),
            1 => "warn,oas_engine=info".to_string(),
            2 => "info,oas_engine=debug".to_string(),
            _ => "debug,oas_engine=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose > 0)
                .with_level(true)
                .with_file(verbose >= 4)
                .with_line_number(verbose >= 4)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            spec,
            schema,
            payload,
            json,
        } => run_validate(&spec, &schema, &payload, json),

        Commands::Example {
            spec,
            schema,
            max_depth,
            pretty,
        } => run_example(&spec, &schema, max_depth, pretty),

        Commands::Diff {
            spec,
            schema,
            response,
            json,
        } => run_diff(&spec, &schema, &response, json),

        Commands::Request {
            spec,
            method,
            path,
            base_url,
            params,
            body,
            content_type,
            bearer,
            basic,
            api_key,
            api_key_in,
            oauth2,
            skip_validation,
        } => run_request(RequestArgs {
            spec,
            method,
            path,
            base_url,
            params,
            body,
            content_type,
            bearer,
            basic,
            api_key,
            api_key_in,
            oauth2,
            skip_validation,
        }),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Load the document and look up a named schema.
fn load_schema(source: &str, name: &str, json_output: bool) -> Result<(SpecDocument, Schema), u8> {
    tracing::info!(source, "loading document");
    let doc = load_spec(source).map_err(|e| {
        report_error(json_output, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;
    let schema = doc.schema(name).cloned().map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;
    Ok((doc, schema))
}

fn read_file(path: &Path, json_output: bool) -> Result<String, u8> {
    std::fs::read_to_string(path).map_err(|e| {
        report_error(json_output, &format!("reading {}: {}", path.display(), e));
        3u8
    })
}

fn run_validate(spec: &str, name: &str, payload: &Path, json_output: bool) -> Result<(), u8> {
    let (doc, schema) = load_schema(spec, name, json_output)?;
    let text = read_file(payload, json_output)?;

    let errors = validate_json_text(&text, &schema, &doc.registry);
    if errors.is_empty() {
        if json_output {
            println!(r#"{{"valid":true}}"#);
        } else {
            println!("Valid");
        }
        return Ok(());
    }

    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "errors": errors
        });
        println!("{}", output);
    } else {
        eprintln!("Validation failed:");
        for error in errors {
            eprintln!("  {}", error);
        }
    }
    Err(1)
}

fn run_example(spec: &str, name: &str, max_depth: usize, pretty: bool) -> Result<(), u8> {
    let (doc, schema) = load_schema(spec, name, false)?;

    let options = SynthesisOptions::new().max_depth(max_depth);
    let Some(example) = synthesize_with(&schema, &doc.registry, &options) else {
        report_error(false, &format!("schema {} does not resolve", name));
        return Err(2);
    };

    let output = if pretty {
        serde_json::to_string_pretty(&example)
    } else {
        serde_json::to_string(&example)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_diff(spec: &str, name: &str, response: &Path, json_output: bool) -> Result<(), u8> {
    let (doc, schema) = load_schema(spec, name, json_output)?;
    let text = read_file(response, json_output)?;
    let observed: Value = serde_json::from_str(&text).map_err(|e| {
        report_error(json_output, &format!("invalid JSON in {}: {}", response.display(), e));
        2u8
    })?;

    let result = diff(&observed, &schema, &doc.registry);

    if json_output {
        let output = serde_json::to_string(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        for field in &result.matching_fields {
            println!("  = {}", field.path);
        }
        for field in &result.extra_fields {
            println!("  + {}", field.path);
        }
        for field in &result.missing_fields {
            println!("  - {}", field.path);
        }
        for error in &result.errors {
            println!("  ! {}: {}", error.field, error.message);
        }
        println!(
            "{} matching, {} extra, {} missing, {} errors",
            result.matching_fields.len(),
            result.extra_fields.len(),
            result.missing_fields.len(),
            result.errors.len()
        );
    }

    if result.valid {
        Ok(())
    } else {
        Err(1)
    }
}

struct RequestArgs {
    spec: String,
    method: String,
    path: String,
    base_url: Option<String>,
    params: Vec<String>,
    body: Option<PathBuf>,
    content_type: String,
    bearer: Option<String>,
    basic: Option<String>,
    api_key: Option<String>,
    api_key_in: KeyLocation,
    oauth2: Option<String>,
    skip_validation: bool,
}

fn run_request(args: RequestArgs) -> Result<(), u8> {
    tracing::info!(source = %args.spec, "loading document");
    let doc = load_spec(&args.spec).map_err(|e| {
        report_error(false, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;

    let Some(method) = Method::parse(&args.method) else {
        report_error(false, &format!("unknown method: {}", args.method));
        return Err(2);
    };
    let Some(endpoint) = doc.endpoint(method, &args.path) else {
        report_error(false, &format!("no operation {} {}", method, args.path));
        return Err(2);
    };

    let mut values = Map::new();
    for param in &args.params {
        let Some((name, raw)) = param.split_once('=') else {
            report_error(false, &format!("expected name=value, got {}", param));
            return Err(2);
        };
        let value = match endpoint.parameter(name) {
            Some(declared) => declared.coerce(raw),
            None => Value::String(raw.to_string()),
        };
        values.insert(name.to_string(), value);
    }

    let body = match &args.body {
        Some(path) => Some(read_file(path, false)?),
        None => None,
    };

    if !args.skip_validation {
        let mut failures = Vec::new();
        for parameter in &endpoint.parameters {
            let check = validate_parameter(parameter, values.get(&parameter.name));
            if let Some(error) = check.error {
                failures.push(error);
            }
        }

        if let Some(request_body) = &endpoint.request_body {
            match (&body, request_body.schema_for(Some(&args.content_type))) {
                (Some(text), Some(schema)) => {
                    for error in validate_json_text(text, schema, &doc.registry) {
                        failures.push(format!("body: {}", error));
                    }
                }
                (None, _) if request_body.required => {
                    failures.push("request body is required".to_string());
                }
                _ => {}
            }
        }

        if !failures.is_empty() {
            eprintln!("Validation failed:");
            for failure in failures {
                eprintln!("  {}", failure);
            }
            return Err(1);
        }
    }

    let auth = auth_config(&args)?;

    let Some(base_url) = args.base_url.as_deref().or(doc.base_url.as_deref()) else {
        report_error(false, "no base URL: pass --base-url or declare a server");
        return Err(2);
    };

    let descriptor = assemble(
        endpoint,
        base_url,
        &values,
        body.as_deref(),
        &args.content_type,
        &auth,
    );

    let output = serde_json::to_string_pretty(&descriptor).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn auth_config(args: &RequestArgs) -> Result<AuthConfig, u8> {
    if let Some(token) = &args.bearer {
        return Ok(AuthConfig::Bearer {
            token: token.clone(),
        });
    }
    if let Some(token) = &args.oauth2 {
        return Ok(AuthConfig::OAuth2 {
            token: token.clone(),
        });
    }
    if let Some(credentials) = &args.basic {
        let Some((username, password)) = credentials.split_once(':') else {
            report_error(false, "expected --basic user:password");
            return Err(2);
        };
        return Ok(AuthConfig::Basic {
            username: username.to_string(),
            password: password.to_string(),
        });
    }
    if let Some(key) = &args.api_key {
        let Some((name, value)) = key.split_once('=') else {
            report_error(false, "expected --api-key NAME=VALUE");
            return Err(2);
        };
        return Ok(AuthConfig::ApiKey {
            location: args.api_key_in.into(),
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    Ok(AuthConfig::None)
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed \
                 ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
