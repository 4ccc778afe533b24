//! Sealed Guardian CLI - Command-line interface for inheritance-scope enforcement
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like file I/O, process exit codes, and terminal output
//! - Provides clean separation between user interface and classification logic

use clap::{Parser, Subcommand, ValueEnum};
use sealed_guardian::domain::classification::{
    MARKER_ON_CLOSED_CLASS_RULE, MISSING_MARKER_RULE, RULE_ID,
};
use sealed_guardian::paths::is_source_file;
use sealed_guardian::{
    AnalysisOptions, FixKind, FixOptions, GuardianConfig, GuardianError, GuardianResult,
    GuardianValidator, OutputFormat, ReportOptions, Severity, ValidationOptions,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Sealed Guardian - inheritance-scope enforcement for C#
#[derive(Parser)]
#[command(name = "sealed-guardian")]
#[command(version = "0.1.0")]
#[command(about = "Every C# class must be abstract, sealed or static, or be marked [DesignedForInheritance]")]
#[command(long_about = "Sealed Guardian analyzes C# sources for classes that are open to inheritance without saying so, and can fix them by sealing the class or adding the [DesignedForInheritance] attribute. Designed for autonomous agent workflows and CI/CD integration.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check C# files for classes that are open to inheritance
    Check {
        /// Paths to analyze (files or directories)
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormatArg,

        /// Minimum severity level to report
        #[arg(short, long, value_enum)]
        severity: Option<SeverityArg>,

        /// Maximum number of violations to report
        #[arg(long)]
        max_violations: Option<usize>,

        /// Additional exclude patterns
        #[arg(long, action = clap::ArgAction::Append)]
        exclude: Vec<String>,

        /// Ignore .sealedignore files
        #[arg(long)]
        no_ignore: bool,

        /// Disable parallel processing
        #[arg(long)]
        no_parallel: bool,

        /// Fail on first unreadable file
        #[arg(long)]
        fail_fast: bool,

        /// Project directory whose sources are indexed for name binding (detected when omitted)
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Bind names using only the requested files
        #[arg(long, conflicts_with = "project_root")]
        no_project_context: bool,

        /// Exit non-zero on any violation, not only errors
        #[arg(long)]
        strict: bool,
    },

    /// Seal or mark every class that is open to inheritance
    Fix {
        /// Paths to fix (files or directories)
        paths: Vec<PathBuf>,

        /// List the fixes without writing files
        #[arg(long)]
        dry_run: bool,

        /// Apply only one kind of fix
        #[arg(long, value_enum)]
        only: Option<FixKindArg>,

        /// Additional exclude patterns
        #[arg(long, action = clap::ArgAction::Append)]
        exclude: Vec<String>,

        /// Disable parallel processing
        #[arg(long)]
        no_parallel: bool,

        /// Project directory whose sources are indexed for name binding (detected when omitted)
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Bind names using only the requested files
        #[arg(long, conflicts_with = "project_root")]
        no_project_context: bool,
    },

    /// Watch for file changes and run checks automatically
    Watch {
        /// Path to watch (defaults to current directory)
        path: Option<PathBuf>,

        /// File patterns to watch (glob patterns)
        #[arg(short, long, action = clap::ArgAction::Append)]
        pattern: Vec<String>,

        /// Debounce delay in milliseconds
        #[arg(long, default_value = "500")]
        delay: u64,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// Explain what a specific rule does
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
    Junit,
    Sarif,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Junit => OutputFormat::Junit,
            OutputFormatArg::Sarif => OutputFormat::Sarif,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum FixKindArg {
    Seal,
    AddMarker,
}

impl From<FixKindArg> for FixKind {
    fn from(arg: FixKindArg) -> Self {
        match arg {
            FixKindArg::Seal => FixKind::Seal,
            FixKindArg::AddMarker => FixKind::AddMarker,
        }
    }
}

/// Settings for one `check` run
struct CheckSettings {
    config_path: Option<PathBuf>,
    paths: Vec<PathBuf>,
    format: OutputFormatArg,
    min_severity: Option<Severity>,
    max_violations: Option<usize>,
    exclude_patterns: Vec<String>,
    no_ignore: bool,
    parallel: bool,
    fail_fast: bool,
    project_root: Option<PathBuf>,
    project_context: bool,
    strict: bool,
    use_colors: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    match run_command(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}

async fn run_command(cli: Cli) -> GuardianResult<i32> {
    match cli.command {
        Commands::Check {
            paths,
            format,
            severity,
            max_violations,
            exclude,
            no_ignore,
            no_parallel,
            fail_fast,
            project_root,
            no_project_context,
            strict,
        } => {
            run_check(CheckSettings {
                config_path: cli.config,
                paths,
                format,
                min_severity: severity.map(Into::into),
                max_violations,
                exclude_patterns: exclude,
                no_ignore,
                parallel: !no_parallel,
                fail_fast,
                project_root,
                project_context: !no_project_context,
                strict,
                use_colors: !cli.no_color,
            })
            .await
        }
        Commands::Fix {
            paths,
            dry_run,
            only,
            exclude,
            no_parallel,
            project_root,
            no_project_context,
        } => {
            let options = FixOptions {
                dry_run,
                only: only.map(Into::into),
                analysis_options: AnalysisOptions {
                    parallel: !no_parallel,
                    exclude_patterns: exclude,
                    project_context: !no_project_context,
                    project_root,
                    ..Default::default()
                },
            };
            run_fix(cli.config, paths, &options).await
        }
        Commands::Watch {
            path,
            pattern,
            delay,
        } => run_watch(cli.config, path, pattern, delay).await,
        Commands::ValidateConfig { config_file } => {
            run_validate_config(config_file.or(cli.config))
        }
        Commands::Explain { rule_id } => run_explain(&rule_id),
    }
}

/// Explicit config, else the first config file found in the working directory, else defaults
fn load_config(config_path: Option<&Path>) -> GuardianResult<GuardianConfig> {
    if let Some(path) = config_path {
        return GuardianConfig::load_from_file(path);
    }

    match GuardianConfig::discover(".") {
        Some(found) => {
            tracing::debug!("Using configuration {}", found.display());
            GuardianConfig::load_from_file(found)
        }
        None => Ok(GuardianConfig::default()),
    }
}

fn default_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    }
}

async fn run_check(settings: CheckSettings) -> GuardianResult<i32> {
    let config = load_config(settings.config_path.as_deref())?;
    let validator = GuardianValidator::new_with_config(config)?;
    let paths = default_paths(settings.paths);

    let validation_options = ValidationOptions {
        output_format: settings.format.into(),
        report_options: ReportOptions {
            use_colors: settings.use_colors,
            max_violations: settings.max_violations,
            min_severity: settings.min_severity,
            ..Default::default()
        },
        analysis_options: AnalysisOptions {
            parallel: settings.parallel,
            fail_fast: settings.fail_fast,
            exclude_patterns: settings.exclude_patterns,
            ignore_ignore_files: settings.no_ignore,
            project_context: settings.project_context,
            project_root: settings.project_root,
            ..Default::default()
        },
    };

    let report = validator
        .validate_with_options(paths, &validation_options)
        .await?;

    let validator = validator.with_report_formatter(sealed_guardian::ReportFormatter::new(
        validation_options.report_options.clone(),
    ));
    let formatted = validator.format_report(&report, validation_options.output_format)?;
    println!("{formatted}");

    let failed = if settings.strict {
        report.has_violations()
    } else {
        report.has_errors()
    };
    Ok(if failed { 1 } else { 0 })
}

async fn run_fix(
    config_path: Option<PathBuf>,
    paths: Vec<PathBuf>,
    options: &FixOptions,
) -> GuardianResult<i32> {
    let config = load_config(config_path.as_deref())?;
    let validator = GuardianValidator::new_with_config(config)?;
    let paths = default_paths(paths);

    let summary = validator.fix_paths(&paths, options).await?;

    let verb = if summary.dry_run { "Would fix" } else { "Fixed" };
    for file in &summary.files {
        println!("📝 {} {}", verb, file.path.display());
        for (class_name, kind) in &file.fixes {
            println!("   {} -> {}", class_name, kind.title());
        }
    }

    let total = summary.total_fixes();
    println!(
        "\n📊 {} {} class{} in {} file{}",
        verb,
        total,
        if total == 1 { "" } else { "es" },
        summary.files.len(),
        if summary.files.len() == 1 { "" } else { "s" }
    );
    if summary.skipped > 0 {
        println!(
            "⚠️  {} violation{} need{} a manual fix (run `check` for details)",
            summary.skipped,
            if summary.skipped == 1 { "" } else { "s" },
            if summary.skipped == 1 { "s" } else { "" }
        );
    }

    Ok(0)
}

async fn run_watch(
    config_path: Option<PathBuf>,
    path: Option<PathBuf>,
    patterns: Vec<String>,
    delay_ms: u64,
) -> GuardianResult<i32> {
    use notify::{Event, RecursiveMode, Result as NotifyResult, Watcher};
    use std::io::{self, Write};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    let watch_path = path.unwrap_or_else(|| PathBuf::from("."));

    println!("🔍 Starting Sealed Guardian watch mode...");
    println!("📂 Watching: {}", watch_path.display());

    let watch_patterns = if patterns.is_empty() {
        vec!["**/*.cs".to_string()]
    } else {
        patterns
    };
    let watch_globs = watch_patterns
        .iter()
        .map(|pattern| {
            glob::Pattern::new(pattern)
                .map_err(|e| GuardianError::pattern(format!("Invalid pattern '{pattern}': {e}")))
        })
        .collect::<GuardianResult<Vec<_>>>()?;

    println!("🎯 Patterns: {}", watch_patterns.join(", "));
    println!("⏱️  Debounce delay: {delay_ms}ms");
    println!("Press Ctrl+C to stop watching\n");

    let (tx, rx) = mpsc::channel();

    let mut watcher = notify::recommended_watcher(move |res: NotifyResult<Event>| match res {
        Ok(event) => {
            if let Err(e) = tx.send(event) {
                tracing::warn!("Error sending event: {}", e);
            }
        }
        Err(e) => tracing::warn!("Watch error: {}", e),
    })
    .map_err(|e| GuardianError::config(format!("Failed to create file watcher: {e}")))?;

    watcher
        .watch(&watch_path, RecursiveMode::Recursive)
        .map_err(|e| {
            GuardianError::config(format!(
                "Failed to watch path '{}': {}",
                watch_path.display(),
                e
            ))
        })?;

    let debounce_duration = Duration::from_millis(delay_ms);
    let mut config_path = config_path;
    let mut last_run = Instant::now();

    println!("🚀 Running initial analysis...");
    run_watch_analysis(&watch_path, config_path.as_deref()).await;

    loop {
        let event = match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                eprintln!("File watcher disconnected");
                break;
            }
        };

        let reload = is_config_change(&event);
        if reload.is_none() && !should_trigger_analysis(&event, &watch_globs) {
            continue;
        }

        let now = Instant::now();
        if reload.is_none() && now.duration_since(last_run) < debounce_duration {
            continue;
        }

        // Clear screen and move cursor to top
        print!("\x1B[2J\x1B[H");
        let _ = io::stdout().flush();

        if let Some(changed) = reload {
            println!("🔄 Configuration file changed: {}", changed.display());
            config_path = Some(changed);
        } else {
            println!("📝 File changes detected, running analysis...");
        }

        // Let the burst of events from one save settle
        tokio::time::sleep(Duration::from_millis(50)).await;
        while rx.try_recv().is_ok() {}

        run_watch_analysis(&watch_path, config_path.as_deref()).await;
        last_run = Instant::now();
    }

    Ok(0)
}

fn is_relevant_change(event: &notify::Event) -> bool {
    use notify::EventKind;

    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Check if an event touches a watched C# source
fn should_trigger_analysis(event: &notify::Event, patterns: &[glob::Pattern]) -> bool {
    if !is_relevant_change(event) {
        return false;
    }

    event.paths.iter().any(|path| {
        let path_str = path.to_string_lossy();
        is_source_file(path) && patterns.iter().any(|pattern| pattern.matches(&path_str))
    })
}

/// Check if an event indicates a config file change
fn is_config_change(event: &notify::Event) -> Option<PathBuf> {
    if !is_relevant_change(event) {
        return None;
    }

    event
        .paths
        .iter()
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| sealed_guardian::config::CONFIG_FILE_NAMES.contains(&name))
        })
        .cloned()
}

async fn run_watch_analysis(watch_path: &Path, config_path: Option<&Path>) {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("⚠️  Failed to load configuration: {e}");
            eprintln!("   Using default configuration instead...");
            GuardianConfig::default()
        }
    };

    let validator = match GuardianValidator::new_with_config(config) {
        Ok(validator) => validator,
        Err(e) => {
            eprintln!("❌ Analysis error: {e}");
            return;
        }
    };

    let options = ValidationOptions::default();
    match validator
        .validate_with_options(vec![watch_path], &options)
        .await
    {
        Ok(report) => {
            match validator.format_report(&report, OutputFormat::Human) {
                Ok(formatted) => println!("{formatted}"),
                Err(e) => eprintln!("❌ Failed to format report: {e}"),
            }
            println!("⌚ Watching for changes... (Press Ctrl+C to stop)\n");
        }
        Err(e) => eprintln!("❌ Analysis error: {e}"),
    }
}

fn run_validate_config(config_path: Option<PathBuf>) -> GuardianResult<i32> {
    let config_path = config_path
        .or_else(|| GuardianConfig::discover("."))
        .unwrap_or_else(|| PathBuf::from("sealed_guardian.yaml"));

    println!("Validating configuration: {}", config_path.display());

    match GuardianConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid");
            println!("📊 Configuration summary:");
            println!(
                "  Rule: {} ({})",
                if config.rule.enabled { "enabled" } else { "disabled" },
                config.rule.severity.as_str()
            );
            println!(
                "  Marker on closed class: {}",
                config
                    .severity_for(sealed_guardian::ClassificationKind::MarkerOnClosedClass)
                    .as_str()
            );
            println!("  Path patterns: {}", config.paths.patterns.len());
            println!("  Metadata references: {}", config.metadata_references.len());
            Ok(0)
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            Ok(1)
        }
    }
}

fn run_explain(rule_id: &str) -> GuardianResult<i32> {
    if !rule_id.eq_ignore_ascii_case(RULE_ID) {
        eprintln!("❌ Rule '{rule_id}' not found");
        println!();
        println!("Available rules:");
        println!("    - {RULE_ID}");
        return Ok(1);
    }

    println!("📖 Rule: {}", MISSING_MARKER_RULE.id);
    println!("📂 Category: {}", MISSING_MARKER_RULE.category);
    println!(
        "⚠️ Default severity: {}",
        MISSING_MARKER_RULE.default_severity.as_str()
    );
    for descriptor in [&MISSING_MARKER_RULE, &MARKER_ON_CLOSED_CLASS_RULE] {
        println!();
        println!("📝 {}", descriptor.title);
        println!("   {}", descriptor.message_format);
        println!("   Remedy: {}", descriptor.remedy);
    }
    println!();
    println!("🔧 Automated fixes:");
    println!(
        "   {}: for classes with no virtual members",
        FixKind::Seal.title()
    );
    println!(
        "   {}: for classes declaring virtual members",
        FixKind::AddMarker.title()
    );

    Ok(0)
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
