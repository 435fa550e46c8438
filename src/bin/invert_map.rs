use deform_map::config::invert;
use deform_map::invert::invert_map_with_diagnostics;
use deform_map::io::{read_map_json, write_json_file, write_map_json};
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn usage() -> String {
    "Usage: invert_map <config.json>".to_string()
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = invert::load_config(Path::new(&config_path))?;

    let map = read_map_json(&config.input)?;
    let (inverse, report) = invert_map_with_diagnostics(&map, config.level, config.options)
        .map_err(|e| format!("Inversion failed: {e}"))?;

    write_map_json(&config.output, &inverse)?;
    println!(
        "Inverse map {}x{} at level {} (origin {}, {}), {} of {} nodes inverted",
        report.width,
        report.height,
        report.level,
        report.origin.0,
        report.origin.1,
        report.inverted,
        report.width * report.height
    );
    println!("Written to {}", config.output.display());

    if let Some(path) = &config.report_json {
        write_json_file(path, &report)?;
        println!("JSON report written to {}", path.display());
    }
    Ok(())
}
