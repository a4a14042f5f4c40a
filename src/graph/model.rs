use serde::Serialize;
use crate::types::point::Meta;

/// Static, value-free description of a node tree.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Model {
    pub meta: Meta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}
