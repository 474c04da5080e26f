use std::fs;

use anyhow::Context;
use attomath_transforms::{
    serialization::{format_step, load_library, load_worksheet},
    transforms::{Engine, TransformConfig},
    worksheet::Justification,
};

const USAGE: &str = "usage: attomath-transforms [--no-prefix] [--debug] <library> <worksheet>";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = pico_args::Arguments::from_env();
    let config = TransformConfig {
        support_implication_prefix: !args.contains("--no-prefix"),
        debug: args.contains("--debug"),
    };
    let library_path: String = args.free_from_str().context(USAGE)?;
    let worksheet_path: String = args.free_from_str().context(USAGE)?;

    let library = fs::read_to_string(&library_path)
        .with_context(|| format!("cannot read {}", library_path))?;
    let database = load_library(&library).with_context(|| format!("in {}", library_path))?;
    let input = fs::read_to_string(&worksheet_path)
        .with_context(|| format!("cannot read {}", worksheet_path))?;
    let mut worksheet =
        load_worksheet(&database, &input).with_context(|| format!("in {}", worksheet_path))?;
    log::info!(
        "loaded {} assertions and {} steps",
        database.len(),
        worksheet.len()
    );

    let engine = Engine::new(&database, config);
    let goals: Vec<_> = worksheet
        .steps()
        .filter(|(_, step)| step.justification() == Justification::Pending)
        .map(|(id, _)| id)
        .collect();
    let mut s = String::new();
    for goal in goals {
        match engine.try_to_find_transformations(&mut worksheet, goal) {
            Some(steps) => {
                for step in steps {
                    s.clear();
                    format_step(&mut s, &database, &worksheet, step);
                    println!("{}", s);
                }
            }
            None => println!("{} no transformation found", worksheet.position(goal) + 1),
        }
    }
    Ok(())
}
