use classweave::process::AnnotationProcessorBuilder;

use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::init();

    let matches = Command::new("classweave")
        .version(crate_version!())
        .about("Instrument compiled classes according to the annotations they carry")
        .arg(
            Arg::new("input")
                .long("input")
                .value_name("PATH")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Class file, jar, or directory to transform"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("PATH")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Where to write the transformed input (may be the input itself)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directive file selecting and configuring the injectors"),
        )
        .arg(
            Arg::new("classpath")
                .long("classpath")
                .value_name("PATHS")
                .action(ArgAction::Append)
                .help("Jars and directories needed to resolve classes, separated like PATH"),
        )
        .get_matches();

    if let Err(err) = run(&matches) {
        log::error!("{}", err);
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = required_path(matches, "input")?;
    let output = required_path(matches, "output")?;
    let config = required_path(matches, "config")?;

    // The input's own classes have to resolve too
    let mut classpath: Vec<PathBuf> = matches
        .get_many::<String>("classpath")
        .into_iter()
        .flatten()
        .flat_map(std::env::split_paths)
        .collect();
    classpath.push(input.clone());

    log::info!("Transforming '{}' into '{}'", input.display(), output.display());
    let mut processor = AnnotationProcessorBuilder::new()
        .configuration_file(config)
        .add_input_output_map(input, output)
        .add_classpath_elements(classpath)
        .build()?;
    processor.process()?;
    Ok(())
}

fn required_path(matches: &ArgMatches, name: &str) -> Result<PathBuf, Box<dyn Error>> {
    matches
        .get_one::<PathBuf>(name)
        .cloned()
        .ok_or_else(|| format!("'{}' argument not specified", name).into())
}
