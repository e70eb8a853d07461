//! Four-stage declarative loader pipeline (spec §4.8) over a `TreeDef`
//! tree typically produced by an external YAML/JSON parser (out of scope
//! here — this module only consumes the already-parsed map/list/scalar
//! shape).

use crate::registry::{NodeCategory, Registry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::HashSet;

/// `TreeDef := { type, id?, name?, props?, children? }` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDef {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub props: Option<Map<String, Json>>,
    #[serde(default)]
    pub children: Option<Vec<TreeDef>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderErrorKind {
    Syntax,
    Structure,
    Config,
    Semantic,
}

#[derive(Debug, Clone)]
pub struct LoaderError {
    pub kind: LoaderErrorKind,
    pub message: String,
    pub path: String,
}

pub fn format_errors(errors: &[LoaderError]) -> String {
    errors
        .iter()
        .map(|e| format!("[{:?}@{}] {}", e.kind, e.path, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub validate: bool,
    pub fail_fast: bool,
    pub auto_generate_ids: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            validate: true,
            fail_fast: false,
            auto_generate_ids: true,
        }
    }
}

/// Run stages 2–4 (structure, config schema, semantic) over `def` and
/// return it unchanged if valid, or every collected error if not (or just
/// the first, when `options.fail_fast`). Stage 1 (syntax) is the external
/// parser's job and is assumed already done by the time a `TreeDef` exists.
pub fn validate<'a>(
    def: &'a TreeDef,
    registry: &Registry,
    options: &LoaderOptions,
) -> Result<&'a TreeDef, Vec<LoaderError>> {
    if !options.validate {
        return Ok(def);
    }
    let mut errors = Vec::new();
    let mut seen_ids = HashSet::new();
    check_node(def, registry, options, "/", &mut seen_ids, &mut errors);
    if errors.is_empty() {
        Ok(def)
    } else {
        Err(errors)
    }
}

fn check_node(
    def: &TreeDef,
    registry: &Registry,
    options: &LoaderOptions,
    path: &str,
    seen_ids: &mut HashSet<String>,
    errors: &mut Vec<LoaderError>,
) {
    if options.fail_fast && !errors.is_empty() {
        return;
    }

    // Stage 2: structure
    if def.node_type.trim().is_empty() {
        errors.push(LoaderError {
            kind: LoaderErrorKind::Structure,
            message: "node definition is missing `type`".into(),
            path: path.to_string(),
        });
        return;
    }

    // Semantic: unique ids (only when an explicit id is given — generated
    // ids are unique by construction).
    if let Some(id) = &def.id {
        if !seen_ids.insert(id.clone()) {
            errors.push(LoaderError {
                kind: LoaderErrorKind::Semantic,
                message: format!("duplicate node id: {id}"),
                path: path.to_string(),
            });
        }
    } else if !options.auto_generate_ids {
        errors.push(LoaderError {
            kind: LoaderErrorKind::Structure,
            message: "node definition is missing `id` and auto_generate_ids is disabled".into(),
            path: path.to_string(),
        });
    }

    let children = def.children.as_deref().unwrap_or(&[]);
    let child_count = children.len();

    // Stage 4: semantic arity rules for the built-in composite/decorator
    // shapes the spec names explicitly.
    if let Some(metadata) = registry.get_metadata(&def.node_type) {
        if metadata.category == NodeCategory::Decorator && child_count != 1 {
            errors.push(LoaderError {
                kind: LoaderErrorKind::Semantic,
                message: format!(
                    "decorator '{}' must have exactly 1 child, found {child_count}",
                    def.node_type
                ),
                path: path.to_string(),
            });
        }
    }
    match def.node_type.as_str() {
        "While" if child_count != 2 => errors.push(LoaderError {
            kind: LoaderErrorKind::Semantic,
            message: format!("While must have exactly 2 children, found {child_count}"),
            path: path.to_string(),
        }),
        "Conditional" if !(2..=3).contains(&child_count) => errors.push(LoaderError {
            kind: LoaderErrorKind::Semantic,
            message: format!("Conditional must have 2 or 3 children, found {child_count}"),
            path: path.to_string(),
        }),
        "ForEach" if child_count < 1 => errors.push(LoaderError {
            kind: LoaderErrorKind::Semantic,
            message: "ForEach must have at least 1 child".into(),
            path: path.to_string(),
        }),
        "SubTree" => {
            let tree_id = def
                .props
                .as_ref()
                .and_then(|p| p.get("tree_id"))
                .and_then(|v| v.as_str());
            match tree_id {
                Some(id) if registry.has_tree(id) => {}
                Some(id) => errors.push(LoaderError {
                    kind: LoaderErrorKind::Semantic,
                    message: format!("SubTree references unknown tree id: {id}"),
                    path: path.to_string(),
                }),
                None => errors.push(LoaderError {
                    kind: LoaderErrorKind::Config,
                    message: "SubTree requires a `tree_id` prop".into(),
                    path: path.to_string(),
                }),
            }
        }
        _ => {}
    }

    for (i, child) in children.iter().enumerate() {
        let child_path = if path == "/" {
            format!("/{i}")
        } else {
            format!("{path}/{i}")
        };
        check_node(child, registry, options, &child_path, seen_ids, errors);
    }
}
