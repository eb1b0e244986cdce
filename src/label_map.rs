use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Class-name to label-id mapping loaded from a pbtxt label map file.
///
/// The mapping is injective: every name has exactly one positive id and no
/// two names share an id. Entries keep file order.
#[derive(Debug, Clone)]
pub struct LabelMap {
    path: PathBuf,
    entries: IndexMap<String, i64>,
}

impl LabelMap {
    /// Load and parse a label map from a pbtxt file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::LabelMap {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let entries = parse_pbtxt(&content).map_err(|reason| Error::LabelMap {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Resolve a class name to its integer label id.
    ///
    /// A class absent from the map is a fatal error; a silently skipped label
    /// would corrupt the training data downstream.
    pub fn resolve(&self, class: &str) -> Result<i64> {
        self.entries
            .get(class)
            .copied()
            .ok_or_else(|| Error::UnknownClass {
                class: class.to_string(),
                label_map: self.path.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Parses the protobuf text-format subset used by label maps:
//
//   item {
//     id: 1
//     name: "cat"
//   }
//
// `name`/`id` may appear in either order, quoted with " or ', and `#` starts
// a comment. `display_name` is accepted and ignored; anything else is a
// parse error.
fn parse_pbtxt(content: &str) -> std::result::Result<IndexMap<String, i64>, String> {
    let mut entries: IndexMap<String, i64> = IndexMap::new();
    let mut in_item = false;
    let mut awaiting_brace = false;
    let mut name: Option<String> = None;
    let mut id: Option<i64> = None;

    for (index, raw) in content.lines().enumerate() {
        let lineno = index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        if awaiting_brace {
            if line == "{" {
                awaiting_brace = false;
                in_item = true;
                continue;
            }
            return Err(format!("expected '{{' at line {}, got '{}'", lineno, line));
        }

        if !in_item {
            match line {
                "item {" | "item{" => {
                    in_item = true;
                    name = None;
                    id = None;
                }
                "item" => {
                    awaiting_brace = true;
                    name = None;
                    id = None;
                }
                _ => {
                    return Err(format!("unexpected content at line {}: '{}'", lineno, line));
                }
            }
            continue;
        }

        if line == "}" {
            let item_name =
                name.take().ok_or_else(|| format!("item ending at line {} has no name", lineno))?;
            let item_id =
                id.take().ok_or_else(|| format!("item ending at line {} has no id", lineno))?;
            if item_id < 1 {
                return Err(format!(
                    "id for '{}' must be positive, got {}",
                    item_name, item_id
                ));
            }
            if let Some(&existing) = entries.get(&item_name) {
                if existing != item_id {
                    return Err(format!(
                        "name '{}' maps to both id {} and id {}",
                        item_name, existing, item_id
                    ));
                }
            } else {
                if let Some((other, _)) = entries.iter().find(|(_, &v)| v == item_id) {
                    return Err(format!(
                        "id {} assigned to both '{}' and '{}'",
                        item_id, other, item_name
                    ));
                }
                entries.insert(item_name, item_id);
            }
            in_item = false;
        } else if let Some(rest) = line.strip_prefix("name:") {
            name = Some(
                parse_quoted(rest)
                    .ok_or_else(|| format!("invalid name at line {}: '{}'", lineno, line))?,
            );
        } else if let Some(rest) = line.strip_prefix("id:") {
            id = Some(
                rest.trim()
                    .parse::<i64>()
                    .map_err(|_| format!("invalid id at line {}: '{}'", lineno, line))?,
            );
        } else if line.starts_with("display_name:") {
            // unused by the converter
        } else {
            return Err(format!(
                "unexpected line {} inside item block: '{}'",
                lineno, line
            ));
        }
    }

    if in_item || awaiting_brace {
        return Err("unterminated item block".to_string());
    }
    Ok(entries)
}

fn parse_quoted(s: &str) -> Option<String> {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')))
    {
        Some(s[1..s.len() - 1].to_string())
    } else {
        None
    }
}
