use deform_map::config::compose;
use deform_map::diagnostics::ComposeReport;
use deform_map::io::{read_map_json, save_confidence_png, write_json_file, write_map_json};
use deform_map::Compositor;
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
    "Usage: compose_maps <config.json>".to_string()
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = compose::load_config(Path::new(&config_path))?;

    let map1 = read_map_json(&config.map1)?;
    let map2 = read_map_json(&config.map2)?;

    let compositor = Compositor::new(config.resolved_params());
    let (out, report) = compositor
        .compose_with_diagnostics(&map1, &map2)
        .map_err(|e| format!("Composition failed: {e}"))?;

    write_map_json(&config.output.map, &out)?;
    print_summary(&report);
    println!("Composed map written to {}", config.output.map.display());

    if let Some(dir) = &config.output.debug_dir {
        save_confidence_png(&out, &dir.join("confidence.png"))?;
        write_json_file(&dir.join("report.json"), &report)?;
        println!("Debug artifacts written to {}", dir.display());
    }
    Ok(())
}

fn print_summary(report: &ComposeReport) {
    let c = &report.counts;
    println!("Composition summary ({:?})", report.mode);
    println!("  output: {}x{}", report.width, report.height);
    println!("  mapped: {} / {}", report.valid_nodes, c.total());
    println!(
        "  direct={} extrapolated={} inverted={} missed={} skipped={}",
        c.direct, c.extrapolated, c.inverted, c.missed, c.skipped
    );
    if let Some(index) = &report.index {
        println!(
            "  index: quads={} buckets={} cell={:.3} max_bucket={}",
            index.quads, index.buckets, index.cell_size, index.max_bucket_len
        );
    }
    println!("  total_ms: {:.3}", report.timing.total_ms);
}
