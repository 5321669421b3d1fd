use clap::{Parser as ClapParser, Subcommand};
use log::LevelFilter;
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};
use vero_lang::{
    cli::{self, CheckOptions, CliError, CompileOptions},
    lexer, CompileOutcome, CompileResponse,
};

#[derive(ClapParser)]
#[command(name = "vero")]
#[command(about = "Vero - A plain-language DSL for UI test scenarios, compiled to Playwright")]
#[command(version)]
struct Cli {
    /// Log stage details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a script
    Tokens {
        /// Script file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },

    /// Lex, parse and validate a script
    Check {
        /// Script file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Sibling script whose pages and libraries are in scope
        #[arg(short, long)]
        context: Vec<PathBuf>,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile a script to a Playwright test file
    Compile {
        /// Script file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Sibling script whose pages and libraries are in scope
        #[arg(short, long)]
        context: Vec<PathBuf>,

        /// Only the scenario with exactly this name
        #[arg(long)]
        scenario: Option<String>,

        /// Only scenarios with this tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Skip scenarios with this tag (repeatable)
        #[arg(long = "exclude-tag")]
        exclude_tags: Vec<String>,

        /// How --tag values combine: any or all
        #[arg(long)]
        tag_mode: Option<String>,

        /// Only scenarios whose name contains this text, or matches /regex/
        #[arg(long)]
        grep: Vec<String>,

        /// JSON file of parameter combinations
        #[arg(long)]
        params: Option<PathBuf>,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the CompileResponse JSON envelope
        #[arg(long)]
        json: bool,
    },

    /// Explain an error code, or list every code
    Explain {
        /// Code such as VERO-201 or 201
        code: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Tokens { file } => run_tokens(file),
        Commands::Check {
            file,
            context,
            json,
        } => run_check(file, context, json),
        Commands::Compile {
            file,
            context,
            scenario,
            tags,
            exclude_tags,
            tag_mode,
            grep,
            params,
            output,
            json,
        } => read_source(file).and_then(|source| {
            let options = CompileOptions {
                source,
                context: read_files(&context)?,
                scenario,
                tags,
                exclude_tags,
                tag_mode,
                grep,
                params: params.map(fs::read_to_string).transpose()?,
            };
            run_compile(&options, output, json)
        }),
        Commands::Explain { code } => match code {
            Some(code) => cli::explain_code(&code).map(|text| print!("{}", text)),
            None => {
                print!("{}", cli::explain_overview());
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_source(file: Option<PathBuf>) -> Result<String, CliError> {
    match file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<String>, CliError> {
    paths
        .iter()
        .map(|path| fs::read_to_string(path).map_err(CliError::Io))
        .collect()
}

fn run_tokens(file: Option<PathBuf>) -> Result<(), CliError> {
    let output = lexer::tokenize(&read_source(file)?);
    for token in &output.tokens {
        println!(
            "{}:{}\t{:?}\t{:?}",
            token.line, token.column, token.kind, token.value
        );
    }
    for error in &output.errors {
        eprintln!("{}", error.to_diagnostic());
    }
    if output.errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::Failed(output.errors.len()))
    }
}

fn run_check(file: Option<PathBuf>, context: Vec<PathBuf>, json: bool) -> Result<(), CliError> {
    let options = CheckOptions {
        source: read_source(file)?,
        context: read_files(&context)?,
    };
    let result = cli::execute_check(&options);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.errors.is_empty() && result.warnings.is_empty() {
        println!("No problems found");
    } else {
        eprintln!("{}", cli::render_diagnostics(&result.errors, &result.warnings));
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::Failed(result.errors.len()))
    }
}

fn run_compile(
    options: &CompileOptions,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let outcome = cli::execute_compile(options)?;
    let failed = match &outcome {
        CompileOutcome::Success(_) => None,
        CompileOutcome::Failure { errors, .. } => Some(errors.len()),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&CompileResponse::from(outcome))?
        );
    } else {
        match outcome {
            CompileOutcome::Success(result) => {
                if !result.warnings.is_empty() {
                    eprintln!("{}", cli::render_diagnostics(&[], &result.warnings));
                }
                match output {
                    Some(path) => fs::write(path, &result.code)?,
                    None => print!("{}", result.code),
                }
                eprintln!(
                    "Generated {} test(s) from {} of {} scenario(s)",
                    result.cases.len(),
                    result.selected_scenarios,
                    result.total_scenarios
                );
            }
            CompileOutcome::Failure { errors, warnings } => {
                eprintln!("{}", cli::render_diagnostics(&errors, &warnings));
            }
        }
    }

    match failed {
        Some(count) => Err(CliError::Failed(count)),
        None => Ok(()),
    }
}
