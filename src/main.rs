use anyhow::{Context, Result, anyhow};
use blueman::blueprint::InputFormat;
use blueman::convert::{
    self, ConvertConfig, DEFAULT_HOST, DEFAULT_OUTPUT_FILENAME, DEFAULT_TESTS_FILENAME, RandomIds,
};
use blueman::uri::ParamEncoding;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::env;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = build_cli().get_matches();
    init_tracing(&matches);

    if let Some(matches) = matches.subcommand_matches("convert") {
        return handle_convert(matches);
    }

    Err(anyhow!("command required"))
}

fn build_cli() -> Command {
    Command::new("blueman")
        .about("Convert API Blueprint ASTs into Postman collections")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity (repeatable)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only log errors"),
        )
        .subcommand(
            Command::new("convert")
                .about("Converts an API Blueprint JSON file into a Postman collection")
                .arg(
                    Arg::new("input-file")
                        .required(true)
                        .help("The JSON file to convert"),
                )
                .arg(
                    Arg::new("path")
                        .long("path")
                        .value_name("DIR")
                        .help("Directory holding the input file. Defaults to the current directory"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("FILE")
                        .help("Where to write the collection. Defaults to ./collection.json"),
                )
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("URL")
                        .help("Base host of your API (e.g. https://api.example.com/v1)"),
                )
                .arg(
                    Arg::new("tests-include")
                        .long("tests-include")
                        .action(ArgAction::SetTrue)
                        .help("Attach tests from the tests file"),
                )
                .arg(
                    Arg::new("tests-filename")
                        .long("tests-filename")
                        .value_name("FILE")
                        .default_value(DEFAULT_TESTS_FILENAME)
                        .help("Markdown file with test scripts, relative to --path"),
                )
                .arg(
                    Arg::new("legacy")
                        .long("legacy")
                        .action(ArgAction::SetTrue)
                        .help("Accept flat documents carrying _version instead of an ast wrapper"),
                )
                .arg(
                    Arg::new("encode-params")
                        .long("encode-params")
                        .action(ArgAction::SetTrue)
                        .help("Percent-encode example values substituted into URIs"),
                )
                .arg(
                    Arg::new("pretty")
                        .long("pretty")
                        .action(ArgAction::SetTrue)
                        .help("Pretty-print JSON output"),
                ),
        )
}

fn init_tracing(matches: &ArgMatches) {
    let level = if matches.get_flag("quiet") {
        LevelFilter::ERROR
    } else {
        match matches.get_count("verbose") {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var("BLUEMAN_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_convert(matches: &ArgMatches) -> Result<()> {
    let cwd = env::current_dir().context("resolve current directory")?;
    let base = matches
        .get_one::<String>("path")
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.clone());

    let input_file = matches
        .get_one::<String>("input-file")
        .ok_or_else(|| anyhow!("input file required"))?;
    let output = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join(DEFAULT_OUTPUT_FILENAME));

    let host = matches
        .get_one::<String>("host")
        .cloned()
        .or_else(|| env::var("BLUEMAN_HOST").ok());

    let tests_file = if matches.get_flag("tests-include") {
        let name = matches
            .get_one::<String>("tests-filename")
            .map(String::as_str)
            .unwrap_or(DEFAULT_TESTS_FILENAME);
        Some(base.join(name))
    } else {
        None
    };

    let config = ConvertConfig {
        input: base.join(input_file),
        output,
        format: if matches.get_flag("legacy") {
            InputFormat::Legacy
        } else {
            InputFormat::Ast
        },
        host,
        tests_file,
        encoding: if matches.get_flag("encode-params") {
            ParamEncoding::Percent
        } else {
            ParamEncoding::Raw
        },
        pretty: matches.get_flag("pretty"),
    };

    let outcome = convert::run(&config, RandomIds, prompt_host)?;
    if let Some(path) = &outcome.tests_skipped {
        write_stdout_line(&format!(
            "No tests file found at {}, no tests attached",
            path.display()
        ))?;
    }
    write_stdout_line(&format!(
        "Done. Collection written to {}",
        config.output.display()
    ))?;
    Ok(())
}

fn prompt_host() -> String {
    if !std::io::stdin().is_terminal() {
        return DEFAULT_HOST.to_string();
    }

    match read_host() {
        Ok(host) if !host.is_empty() => host,
        Ok(_) => DEFAULT_HOST.to_string(),
        Err(err) => {
            warn!("could not read host, using {DEFAULT_HOST}: {err}");
            DEFAULT_HOST.to_string()
        }
    }
}

fn read_host() -> Result<String> {
    {
        let mut stdout = std::io::stdout().lock();
        write!(
            stdout,
            "Please enter the base uri of your API [{DEFAULT_HOST}]: "
        )?;
        stdout.flush()?;
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read host from stdin")?;
    Ok(line.trim().to_string())
}

fn write_stdout_line(line: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(line.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}
