use serde_json::{Map, Value};

/// Sections of a config module merged entry by entry.
const ENTRY_SECTIONS: [&str; 5] = ["tags", "nodes", "functions", "variables", "partials"];

/// Merge `overlay` into `base`. Objects merge key by key; any other overlay
/// value, arrays included, replaces what is in `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Merge a `config` or root module over the accumulated schema. Every entry
/// it names in a definition section replaces the accumulated entry whole;
/// other top-level keys replace the accumulated value.
pub fn merge_config(acc: &mut Value, config: Value) {
    let Value::Object(config) = config else {
        return;
    };
    if !acc.is_object() {
        *acc = Value::Object(Map::new());
    }
    let Some(acc_map) = acc.as_object_mut() else {
        return;
    };

    for (key, value) in config {
        match value {
            Value::Object(entries) if ENTRY_SECTIONS.contains(&key.as_str()) => {
                let section = acc_map.entry(key).or_insert_with(|| Value::Object(Map::new()));
                if !section.is_object() {
                    *section = Value::Object(Map::new());
                }
                if let Some(section) = section.as_object_mut() {
                    section.extend(entries);
                }
            }
            value => {
                acc_map.insert(key, value);
            }
        }
    }
}
