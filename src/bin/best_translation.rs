use deform_map::config::translation;
use deform_map::io::{read_map_json, write_map_json};
use deform_map::translation::{best_translation, TranslationFit};
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
    "Usage: best_translation <config.json>".to_string()
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = translation::load_config(Path::new(&config_path))?;

    let map = read_map_json(&config.input)?;
    let fit = best_translation(&map).map_err(|e| format!("Translation fit failed: {e}"))?;
    println!(
        "translation: ({:.3}, {:.3}) over {} nodes",
        fit.tx, fit.ty, fit.valid_nodes
    );

    if let Some(path) = &config.output {
        let out = fit.to_map(&map).map_err(|e| e.to_string())?;
        write_map_json(path, &out)?;
        println!(
            "Translation map (level {}) written to {}",
            TranslationFit::covering_level(&map),
            path.display()
        );
    }
    Ok(())
}
