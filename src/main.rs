use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use forms::{FormEvent, FormValidation, Options};
use html::{Node, Selector, find_one, to_html};
use sanitizer::{Allowlist, sanitize};
use serde_json::Value;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const OUTLINE_CAP: usize = 400;

fn cli() -> Command {
    Command::new("formkit")
        .about("Sanitize untrusted markup and run form validation on HTML files")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Log more; repeat for trace output."),
        )
        .subcommand(
            Command::new("sanitize")
                .about("Print the sanitized form of an HTML fragment")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_name("FILE")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Fragment to sanitize."),
                )
                .arg(
                    Arg::new("allowlist")
                        .long("allowlist")
                        .short('a')
                        .value_name("TOML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Allowlist file; the built-in allowlist is used otherwise."),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate the first form of a document and print it with its feedback")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_name("FILE")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Document containing the form."),
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .short('s')
                        .action(ArgAction::Append)
                        .value_name("KEY=VALUE")
                        .value_parser(parse_assignment)
                        .help("Set a control's value before validating."),
                )
                .arg(
                    Arg::new("check")
                        .long("check")
                        .short('c')
                        .action(ArgAction::Append)
                        .value_name("KEY")
                        .help("Check a checkbox or radio before validating."),
                )
                .arg(
                    Arg::new("feedback")
                        .long("feedback")
                        .value_name("TYPE")
                        .value_parser(["feedback", "tooltip"])
                        .help("Feedback flavour; overrides data-bs-type."),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .action(ArgAction::SetTrue)
                        .help("Print the validated form as markup instead of an outline."),
                ),
        )
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn read_input(matches: &ArgMatches) -> Result<String> {
    let Some(path) = matches.get_one::<PathBuf>("input") else {
        bail!("missing input file");
    };
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn run_sanitize(matches: &ArgMatches) -> Result<ExitCode> {
    let markup = read_input(matches)?;
    let allowlist = match matches.get_one::<PathBuf>("allowlist") {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read allowlist {}", path.display()))?;
            Allowlist::from_toml(&source)
                .with_context(|| format!("Failed to load allowlist {}", path.display()))?
        }
        None => Allowlist::default(),
    };
    println!("{}", sanitize(&markup, &allowlist, None));
    Ok(ExitCode::SUCCESS)
}

fn first_form(document: &Node) -> Result<Node> {
    let selector = Selector::parse("form").context("form selector")?;
    find_one(document, &selector)
        .cloned()
        .context("document contains no <form> element")
}

fn run_validate(matches: &ArgMatches) -> Result<ExitCode> {
    let mut document = html::parse_document(&read_input(matches)?);
    let opted_in = FormValidation::on_ready(&mut document);
    log::info!(target: "formkit", "{opted_in} form(s) opted in to validation");

    let mut options = Options::new();
    if let Some(feedback) = matches.get_one::<String>("feedback") {
        options.insert("type".to_string(), Value::String(feedback.clone()));
    }
    let mut validation = FormValidation::new(first_form(&document)?, &options)?;

    for (key, value) in matches
        .get_many::<(String, String)>("set")
        .into_iter()
        .flatten()
    {
        if !validation.set_value(key, value)? {
            log::warn!(target: "formkit", "no field named {key}");
        }
    }
    for key in matches.get_many::<String>("check").into_iter().flatten() {
        if !validation.set_checked(key, true)? {
            log::warn!(target: "formkit", "no checkable field named {key}");
        }
    }

    let outcome = validation.handle_event(FormEvent::Submit)?;
    let form = validation.form();
    if matches.get_flag("html") {
        println!("{}", to_html(form));
    } else {
        for line in html::debug::outline_from_dom(form, OUTLINE_CAP) {
            println!("{line}");
        }
    }

    for (key, field) in validation.get_fields()? {
        let errors = field.error_messages().get_all_as_text_array()?;
        if !errors.is_empty() {
            eprintln!("{key}: {}", errors.join("; "));
        }
    }

    Ok(if outcome.prevent_default {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();
    let verbosity = matches.get_count("verbose");
    if let Err(err) = TermLogger::init(
        level_for(verbosity),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("logger already initialised: {err}");
    }

    match matches.subcommand() {
        Some(("sanitize", sub)) => run_sanitize(sub),
        Some(("validate", sub)) => run_validate(sub),
        Some((other, _)) => bail!("unknown subcommand {other}"),
        None => bail!("a subcommand is required"),
    }
}
