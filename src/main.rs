use std::env;
use std::fs;
use std::process;

use ceol::document::music_body;
use ceol::repetition::target_licks;
use ceol::settings::compare_settings;
use ceol::transpose::parse_octave_shift;
use ceol::variation::{generate_variation_ideas, variation_ideas_for_tune, vary_tune};
use ceol::{
    average_pitch, detect_repetition, shift_octave, transpose_document, AbcDocument, CeolError,
    Config,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

const USAGE: &str = "Usage: ceol [--config <file.yaml>] <command> [args]

Commands:
  transpose <tune.abc> <key>        transpose to another key
  shift <tune.abc> <octaves>        move every note by whole octaves (-10 to 10)
  correct <original.abc> <candidate.abc>
                                    repair octave drift in a transposed tune
  repeats <tune.abc>                report repeated measures and phrases
  licks <tune.abc>                  list the repeated licks worth varying
  ideas <tune.abc> [lick]           variation ideas for a lick (or every target lick)
  vary <tune.abc>                   apply variation ideas to the repeated phrases
  compare <a.abc> <b.abc>...        compare settings of one tune
  pitch <tune.abc>                  average pitch of the notes";

fn usage() -> ! {
    eprintln!("{}", USAGE);
    process::exit(1);
}

fn read(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String, CeolError> {
    Ok(serde_yaml::to_string(value)?)
}

fn rng_for(config: &Config) -> ChaCha8Rng {
    match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    }
}

fn run(command: &str, args: &[String], config: &Config) -> Result<String, CeolError> {
    match (command, args) {
        ("transpose", [file, key]) => Ok(transpose_document(&read(file), key)),
        ("shift", [file, octaves]) => {
            let octaves = parse_octave_shift(octaves)?;
            let abc = read(file);
            Ok(match AbcDocument::parse(&abc) {
                Ok(mut doc) => {
                    doc.body = shift_octave(&doc.body, octaves);
                    doc.rebuild()
                }
                Err(_) => shift_octave(&abc, octaves),
            })
        }
        ("correct", [original, candidate]) => {
            Ok(config.corrector().correct(&read(original), &read(candidate)))
        }
        ("repeats", [file]) => to_yaml(&detect_repetition(&read(file))),
        ("licks", [file]) => Ok(target_licks(&read(file)).join("\n")),
        ("ideas", [file]) => {
            let groups = variation_ideas_for_tune(&read(file), &config.variation, &mut rng_for(config));
            to_yaml(&groups)
        }
        ("ideas", [_, lick]) => {
            let ideas = generate_variation_ideas(lick, &config.variation, &mut rng_for(config));
            to_yaml(&ideas)
        }
        ("vary", [file]) => {
            let applied = vary_tune(&read(file), &config.variation, &mut rng_for(config));
            for (bar, text) in &applied.variation_mapping {
                eprintln!("Bar {}: {}", bar, text);
            }
            Ok(applied.abc)
        }
        ("compare", files) if files.len() >= 2 => {
            let settings: Vec<String> = files.iter().map(|f| read(f)).collect();
            to_yaml(&compare_settings(settings.as_slice()))
        }
        ("pitch", [file]) => Ok(format!("{:.2}", average_pitch(&music_body(&read(file))))),
        _ => usage(),
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    // Parse flags
    let (config, rest) = if args[0] == "--config" {
        let Some(path) = args.get(1) else {
            usage();
        };
        let config = match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path, e);
                process::exit(1);
            }
        };
        (config, &args[2..])
    } else {
        (Config::default(), &args[..])
    };

    let Some((command, command_args)) = rest.split_first() else {
        usage();
    };

    match run(command, command_args, &config) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
