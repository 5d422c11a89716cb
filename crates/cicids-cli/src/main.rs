use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use cicids_cli::dataset::{run_prepare, run_stats};
use cicids_cli::predict::{run_predict, PredictArgs};
use cicids_cli::train::input::TrainConfig;
use cicids_cli::train::trainer;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("CICIDS_LOG", "error,cicids=info"))
        .init();

    let matches = Command::new("cicids")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Train, evaluate and apply intrusion classifiers on CIC-IDS-2017 flow features")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Run the multi-round training and evaluation pipeline")
                .arg(
                    Arg::new("config")
                        .help("Path to the training configuration file. Prints a template when omitted.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("dataset")
                        .short('d')
                        .long("dataset")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the binarised flow CSV. Overrides the dataset \
                             specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("artifacts")
                        .short('a')
                        .long("artifacts")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Directory holding the scaler and classifier artifacts.")
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Directory the result tables and run manifest are written to.")
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("rounds")
                        .short('r')
                        .long("rounds")
                        .value_parser(clap::value_parser!(usize))
                        .help("Number of evaluation rounds."),
                )
                .arg(
                    Arg::new("no_tune")
                        .long("no-tune")
                        .help("Skip the hyper-parameter grid search.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Score feature vectors with a persisted classifier")
                .arg(
                    Arg::new("code")
                        .help("Classifier code: svc, ab, dt, rf, bnb or gnb")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("Whitespace-separated feature vectors, one per line. Defaults to stdin.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("File the predicted labels are written to. Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("artifacts")
                        .short('a')
                        .long("artifacts")
                        .help("Directory holding the scaler and classifier artifacts.")
                        .default_value("models")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                ),
        )
        .subcommand(
            Command::new("prepare")
                .about("Concatenate raw CIC-IDS-2017 CSVs and binarise their labels")
                .arg(
                    Arg::new("inputs")
                        .help("Raw daily CSV files")
                        .required(true)
                        .num_args(1..)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .help("Path of the binarised CSV")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Count raw labels across CIC-IDS-2017 CSVs")
                .arg(
                    Arg::new("inputs")
                        .help("Raw daily CSV files")
                        .required(true)
                        .num_args(1..)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Report file. Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("prepare", sub_m)) => handle_prepare(sub_m),
        Some(("stats", sub_m)) => handle_stats(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let Some(config_path) = matches.get_one::<PathBuf>("config") else {
        eprintln!("[cicids::train] No config file provided; printing a template.");
        println!("{}", serde_json::to_string_pretty(&TrainConfig::default())?);
        return Ok(());
    };
    log::info!("[cicids::train] Training from config: {:?}", config_path);

    let params = match TrainConfig::from_arguments(config_path, matches) {
        Ok(params) => params,
        Err(e) => {
            log::error!("Invalid training configuration: {:#}", e);
            std::process::exit(1)
        }
    };

    match trainer::run_training(&params) {
        Ok(report) => {
            for s in &report.summaries {
                println!(
                    "{}\t{:.5}\t{:.5}\t{}/{}",
                    s.classifier.code(),
                    s.mean_accuracy,
                    s.std_accuracy,
                    s.rounds_scored,
                    s.rounds_scored + s.rounds_failed
                );
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let args = PredictArgs {
        code: matches
            .get_one::<String>("code")
            .cloned()
            .unwrap_or_default(),
        input: matches.get_one::<PathBuf>("input").cloned(),
        output: matches.get_one::<PathBuf>("output").cloned(),
        artifacts_dir: matches
            .get_one::<PathBuf>("artifacts")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("models")),
    };

    match run_predict(&args) {
        Ok(secs) => {
            println!("#{}", secs);
            Ok(())
        }
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn input_paths(matches: &ArgMatches) -> Vec<PathBuf> {
    matches
        .get_many::<PathBuf>("inputs")
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

fn handle_prepare(matches: &ArgMatches) -> Result<()> {
    let inputs = input_paths(matches);
    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("CIC-IDS-2017.csv"));

    if let Err(e) = run_prepare(&inputs, &output) {
        log::error!("Preparation failed: {:#}", e);
        std::process::exit(1)
    }
    Ok(())
}

fn handle_stats(matches: &ArgMatches) -> Result<()> {
    let inputs = input_paths(matches);
    let output = matches.get_one::<PathBuf>("output");

    if let Err(e) = run_stats(&inputs, output.map(PathBuf::as_path)) {
        log::error!("Label statistics failed: {:#}", e);
        std::process::exit(1)
    }
    Ok(())
}
