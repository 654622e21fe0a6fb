use model::base_types::InspectorCount;

use std::fs;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 6 {
        println!(
            "Usage: {} <arcs_file> <inspectors_file> <max_inspectors> <delta> <output_file> [--load-od <od_file>]",
            args[0]
        );
        std::process::exit(1)
    }

    let max_inspectors = parse_count(&args[3], "max_inspectors");
    let delta = parse_count(&args[4], "delta");
    let output_path = &args[5];

    let od_cache = match args.iter().position(|a| a == "--load-od") {
        Some(i) => match args.get(i + 1) {
            Some(path) => {
                let contents = match fs::read_to_string(path) {
                    Ok(contents) => contents,
                    Err(error) => {
                        println!("Error reading od cache {}: {}", path, error);
                        std::process::exit(1)
                    }
                };
                match serde_json::from_str(&contents) {
                    Ok(value) => Some(value),
                    Err(error) => {
                        println!("Error parsing od cache {}: {}", path, error);
                        std::process::exit(1)
                    }
                }
            }
            None => {
                println!("Error: --load-od needs a file argument");
                std::process::exit(1)
            }
        },
        None => None,
    };

    println!("\n---------- RUN: {} ----------", &args[1]);
    let output = match internal::run(&args[1], &args[2], max_inspectors, delta, od_cache) {
        Ok(output) => output,
        Err(error) => {
            println!("Error: {}", error);
            std::process::exit(1)
        }
    };

    let file = fs::File::create(output_path).expect("Error creating file");
    serde_json::to_writer_pretty(file, &output).expect("Error writing JSON");

    std::process::exit(0)
}

fn parse_count(value: &str, name: &str) -> InspectorCount {
    match value.parse() {
        Ok(count) => count,
        Err(_) => {
            println!(
                "Error: {} must be a non-negative integer, got '{}'",
                name, value
            );
            std::process::exit(1)
        }
    }
}
