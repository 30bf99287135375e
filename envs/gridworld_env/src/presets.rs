use std::collections::HashMap;

use gridworld_rs::Level;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct PresetRow {
    name: String,
    rows: Vec<String>,
}

static PRESETS: OnceCell<HashMap<String, Level>> = OnceCell::new();

fn load_presets() -> HashMap<String, Level> {
    let mut map = HashMap::new();
    let data = include_str!("../data/presets.jsonl");
    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: PresetRow = match serde_json::from_str(line) {
            Ok(row) => row,
            Err(err) => {
                warn!(line = lineno + 1, %err, "skipping malformed preset row");
                continue;
            }
        };
        let level = Level { rows: row.rows };
        if let Err(err) = level.to_world() {
            warn!(preset = %row.name, %err, "skipping unbuildable preset");
            continue;
        }
        map.insert(row.name, level);
    }
    map
}

/// Named layout from the embedded preset table.
pub fn preset_level(name: &str) -> Option<Level> {
    PRESETS.get_or_init(load_presets).get(name).cloned()
}

/// Names of all embedded presets, sorted.
pub fn preset_names() -> Vec<String> {
    let mut names: Vec<String> = PRESETS.get_or_init(load_presets).keys().cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_embedded_preset_builds() {
        let names = preset_names();
        assert_eq!(names.len(), include_str!("../data/presets.jsonl").lines().filter(|l| !l.trim().is_empty()).count());
        for name in names {
            preset_level(&name).unwrap().to_world().unwrap();
        }
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(preset_level("nowhere").is_none());
    }
}
