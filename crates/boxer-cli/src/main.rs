use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;

use boxer_cli::commands::full_report;
use boxer_cli::commands::learn::run_learn;
use boxer_cli::commands::score::run_score;
use boxer_cli::commands::sweep::{run_sweep, write_sweep_table};
use boxer_cli::commands::train::run_train;
use boxer_cli::run_config::RunConfig;
use boxer_cli::util::open_output;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help("Path to a JSON run configuration. Missing fields take their defaults.")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn data_arg(id: &'static str, long: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(id)
        .short(short)
        .long(long)
        .help(help)
        .required(true)
        .action(ArgAction::Append)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn train_data_arg() -> Arg {
    data_arg(
        "train_data",
        "train",
        'd',
        "Training example file (name<TAB>labels<TAB>features). May be repeated.",
    )
}

fn test_data_arg() -> Arg {
    data_arg(
        "test_data",
        "test",
        't',
        "Test example file (name<TAB>labels<TAB>features). May be repeated.",
    )
}

fn labels_arg() -> Arg {
    Arg::new("labels")
        .short('l')
        .long("labels")
        .help("Separate label file (name<TAB>discrimination<TAB>class) joined on point names")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn predictions_arg() -> Arg {
    Arg::new("predictions")
        .short('o')
        .long("predictions")
        .help("Write per-point predictions (TSV) to this file")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn learner_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("learner")
            .long("learner")
            .help("Override the learner type from the JSON config.")
            .value_parser(["tg", "eg", "trivial"])
            .value_hint(ValueHint::Other),
    )
    .arg(
        Arg::new("learning_rate")
            .long("learning-rate")
            .help("Override the learning rate from the JSON config.")
            .value_parser(clap::value_parser!(f64)),
    )
    .arg(
        Arg::new("gravity")
            .long("gravity")
            .help("Override the truncated gradient gravity from the JSON config.")
            .value_parser(clap::value_parser!(f64)),
    )
    .arg(
        Arg::new("normalize")
            .long("normalize")
            .help("Scale every point to unit L2 norm.")
            .action(ArgAction::SetTrue),
    )
}

fn paths(matches: &ArgMatches, id: &str) -> Vec<PathBuf> {
    matches
        .get_many::<PathBuf>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("BOXER_LOG", "error,boxer=info"))
        .init();

    let matches = Command::new("boxer")
        .version(clap::crate_version!())
        .about("Online multi-class linear classifiers over sparse features")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            learner_args(
                Command::new("train")
                    .about("Train a model and save it as a JSON document")
                    .arg(config_arg())
                    .arg(train_data_arg())
                    .arg(labels_arg())
                    .arg(
                        Arg::new("model")
                            .short('m')
                            .long("model")
                            .help("Path the trained model will be written to")
                            .required(true)
                            .value_parser(clap::value_parser!(PathBuf))
                            .value_hint(ValueHint::FilePath),
                    ),
            ),
        )
        .subcommand(
            Command::new("score")
                .about("Score test data with a saved model and print the evaluation report")
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .help("Path to a model written by `boxer train`")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(test_data_arg())
                .arg(labels_arg())
                .arg(predictions_arg())
                .arg(
                    Arg::new("normalize")
                        .long("normalize")
                        .help("Require a model trained with --normalize. Such models always normalize test points.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(learner_args(
            Command::new("learn")
                .about("Train and score in one session without saving a model")
                .arg(config_arg())
                .arg(train_data_arg())
                .arg(test_data_arg())
                .arg(labels_arg())
                .arg(predictions_arg()),
        ))
        .subcommand(learner_args(
            Command::new("sweep")
                .about("Evaluate a grid of learning rates and gravities in parallel")
                .arg(config_arg())
                .arg(train_data_arg())
                .arg(test_data_arg())
                .arg(labels_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Write the sweep table to this file. Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        ))
        .subcommand(Command::new("config").about("Print the default run configuration as JSON"))
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("score", sub_m)) => handle_score(sub_m),
        Some(("learn", sub_m)) => handle_learn(sub_m),
        Some(("sweep", sub_m)) => handle_sweep(sub_m),
        Some(("config", _)) => handle_config(),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1)
    }
    Ok(())
}

fn run_config(matches: &ArgMatches) -> Result<RunConfig> {
    let config_path = matches.get_one::<PathBuf>("config");
    if let Some(path) = config_path {
        log::info!("[boxer] Using config: {:?}", path);
    }
    RunConfig::from_arguments(config_path.map(PathBuf::as_path), matches)
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config = run_config(matches)?;
    let train = paths(matches, "train_data");
    let labels = matches.get_one::<PathBuf>("labels");
    let model: &PathBuf = matches
        .get_one("model")
        .ok_or_else(|| anyhow::anyhow!("--model is required"))?;
    let summary = run_train(&config, &train, labels.map(PathBuf::as_path), model)?;
    eprintln!(
        "[boxer] Trained on {} point(s) ({} presentation(s)), model written to {}",
        summary.points,
        summary.presented,
        model.display()
    );
    Ok(())
}

fn handle_score(matches: &ArgMatches) -> Result<()> {
    let model: &PathBuf = matches
        .get_one("model")
        .ok_or_else(|| anyhow::anyhow!("--model is required"))?;
    let test = paths(matches, "test_data");
    let session = run_score(
        model,
        &test,
        matches.get_one::<PathBuf>("labels").map(PathBuf::as_path),
        matches.get_one::<PathBuf>("predictions").map(PathBuf::as_path),
        matches.get_flag("normalize"),
    )?;
    print!("{}", full_report(&session));
    Ok(())
}

fn handle_learn(matches: &ArgMatches) -> Result<()> {
    let config = run_config(matches)?;
    let session = run_learn(
        &config,
        &paths(matches, "train_data"),
        &paths(matches, "test_data"),
        matches.get_one::<PathBuf>("labels").map(PathBuf::as_path),
        matches.get_one::<PathBuf>("predictions").map(PathBuf::as_path),
    )?;
    print!("{}", full_report(&session));
    Ok(())
}

fn handle_sweep(matches: &ArgMatches) -> Result<()> {
    let config = run_config(matches)?;
    let cells = run_sweep(
        &config,
        &paths(matches, "train_data"),
        &paths(matches, "test_data"),
        matches.get_one::<PathBuf>("labels").map(PathBuf::as_path),
    )?;
    let mut output = open_output(matches.get_one::<PathBuf>("output").map(PathBuf::as_path))?;
    write_sweep_table(&mut output, &cells)?;
    output.flush()?;
    Ok(())
}

fn handle_config() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&RunConfig::default())?);
    Ok(())
}
