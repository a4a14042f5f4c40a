//! Human-readable and JSON rendering of data points and model trees.

use std::collections::BTreeMap;
use std::fmt::Write;
use serde::Serialize;
use crate::config::TraceConfig;
use crate::error::Result;
use crate::graph::Model;
use crate::types::point::{Meta, Point};

const TYPE_KEY: &str = "type";

/// Shape required from anything rendered as a tree.
pub trait TraceNode {
    /// Display name, taken from the `type` meta key.
    fn name(&self) -> String {
        match self.raw_meta().get(TYPE_KEY) {
            Some(serde_json::Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => "node".to_string(),
        }
    }

    fn raw_meta(&self) -> &Meta;

    /// Metadata without the `type` key.
    fn meta(&self) -> Meta {
        let mut meta = self.raw_meta().clone();
        meta.remove(TYPE_KEY);
        meta
    }

    fn nodes(&self) -> Vec<&Self>;

    fn value(&self) -> Option<String> {
        None
    }

    fn error(&self) -> Option<String> {
        None
    }
}

impl TraceNode for Point {
    fn raw_meta(&self) -> &Meta {
        &self.meta
    }

    fn nodes(&self) -> Vec<&Self> {
        self.sub_points.iter().collect()
    }

    fn value(&self) -> Option<String> {
        self.value.as_ref().map(|value| value.print())
    }

    fn error(&self) -> Option<String> {
        self.validate().err().map(|err| err.to_string())
    }
}

impl TraceNode for Model {
    fn raw_meta(&self) -> &Meta {
        &self.meta
    }

    fn nodes(&self) -> Vec<&Self> {
        self.models.iter().collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct TraceOptions {
    pub hidden_meta_keys: Vec<String>,
}

impl From<&TraceConfig> for TraceOptions {
    fn from(config: &TraceConfig) -> Self {
        TraceOptions {
            hidden_meta_keys: config.hidden_meta_keys.clone(),
        }
    }
}

fn format_meta_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_line<T: TraceNode>(node: &T, options: &TraceOptions) -> String {
    let mut line = node.name();
    let params: Vec<String> = node
        .meta()
        .iter()
        .filter(|(key, _)| !options.hidden_meta_keys.contains(key))
        .map(|(key, value)| format!("{}: {}", key, format_meta_value(value)))
        .collect();
    if !params.is_empty() {
        let _ = write!(line, "({})", params.join(", "));
    }
    if let Some(value) = node.value() {
        let _ = write!(line, " = {}", value);
    }
    if let Some(error) = node.error() {
        let _ = write!(line, " [error: {}]", error);
    }
    line
}

fn render_children<T: TraceNode>(node: &T, prefix: &str, options: &TraceOptions, out: &mut String) {
    let children = node.nodes();
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let last = i + 1 == count;
        let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        let _ = writeln!(out, "{}{}{}", prefix, branch, render_line(child, options));
        render_children(child, &format!("{}{}", prefix, indent), options, out);
    }
}

/// Renders a tree with one node per line.
pub fn render_tree<T: TraceNode>(root: &T, options: &TraceOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", render_line(root, options));
    render_children(root, "", options, &mut out);
    out
}

/// Renders one tree per model, failed models included.
pub fn render_all<T: TraceNode>(items: &BTreeMap<String, T>, options: &TraceOptions) -> String {
    let mut out = String::new();
    for (name, item) in items {
        let _ = writeln!(out, "Model: {}", name);
        out.push_str(&render_tree(item, options));
        out.push('\n');
    }
    out
}

/// Pretty JSON; nothing is hidden.
pub fn to_json<T: Serialize>(items: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(items)?)
}
