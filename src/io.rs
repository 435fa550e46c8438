//! I/O helpers for maps and reports.
//!
//! - `read_map_json` / `write_map_json`: JSON interchange of a [`DeformationMap`].
//! - `write_json_file`: pretty-print any serializable report to disk.
//! - `save_confidence_png`: grayscale rendering of node confidences, one
//!   pixel per node, for visual inspection.
use crate::map::DeformationMap;
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load and validate a map from a JSON file.
pub fn read_map_json(path: &Path) -> Result<DeformationMap, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read map {}: {e}", path.display()))?;
    serde_json::from_str(&data).map_err(|e| format!("Failed to parse map {}: {e}", path.display()))
}

pub fn write_map_json(path: &Path, map: &DeformationMap) -> Result<(), String> {
    write_json_file(path, map)
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

/// Save node confidences as an 8-bit grayscale PNG (0 → black, 1 → white).
pub fn save_confidence_png(map: &DeformationMap, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let w = u32::try_from(map.width())
        .map_err(|_| format!("Map too wide to render: {}", map.width()))?;
    let h = u32::try_from(map.height())
        .map_err(|_| format!("Map too tall to render: {}", map.height()))?;
    let mut out = GrayImage::new(w, h);
    for (i, node) in map.nodes().iter().enumerate() {
        let v = (node.c * 255.0).round().clamp(0.0, 255.0);
        out.put_pixel((i % map.width()) as u32, (i / map.width()) as u32, Luma([v as u8]));
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MapNode;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("deform_map_io_{name}_{}", std::process::id()))
    }

    #[test]
    fn map_json_round_trip_preserves_header() {
        let dir = scratch_dir("json");
        let path = dir.join("nested").join("m.json");
        let map = DeformationMap::new(
            3,
            2,
            1,
            (-4, 7),
            vec![MapNode::new(1.5, 2.5, 0.75), MapNode::INVALID],
        )
        .unwrap()
        .with_labels("img", "ref");
        write_map_json(&path, &map).unwrap();
        let back = read_map_json(&path).unwrap();
        assert_eq!(back, map);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn confidence_png_has_one_pixel_per_node() {
        let dir = scratch_dir("png");
        let path = dir.join("c.png");
        let map = DeformationMap::new(
            0,
            2,
            1,
            (0, 0),
            vec![MapNode::new(0.0, 0.0, 1.0), MapNode::INVALID],
        )
        .unwrap();
        save_confidence_png(&map, &path).unwrap();
        let img = image::open(&path).unwrap().into_luma8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(1, 0)[0], 0);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_map_json(Path::new("/nonexistent/deform_map/x.json")).unwrap_err();
        assert!(err.contains("/nonexistent/deform_map/x.json"));
    }
}
