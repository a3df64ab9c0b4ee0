//! Minimal JSON-LD reading: node lists, `@type` sets and literal values

use serde_json::Value;

/// Flatten a document into its node objects (`[...]`, `{"@graph": [...]}` or
/// a single node)
pub(crate) fn nodes(doc: &Value) -> Vec<&Value> {
    match doc {
        Value::Array(items) => items.iter().flat_map(nodes).collect(),
        Value::Object(map) => match map.get("@graph") {
            Some(graph) => nodes(graph),
            None => vec![doc],
        },
        _ => Vec::new(),
    }
}

/// Types of the node whose `@id` is `subject`.
///
/// Trailing slashes are ignored when comparing ids. When no node matches and
/// the document holds exactly one node, that node is taken as the subject.
pub(crate) fn subject_types(doc: &Value, subject: &str) -> Vec<String> {
    let all = nodes(doc);
    let wanted = subject.trim_end_matches('/');
    let subject_node = all
        .iter()
        .find(|node| {
            node.get("@id")
                .and_then(Value::as_str)
                .is_some_and(|id| id.trim_end_matches('/') == wanted)
        })
        .or_else(|| (all.len() == 1).then(|| &all[0]));

    subject_node
        .and_then(|node| node.get("@type"))
        .map(strings)
        .unwrap_or_default()
}

/// First literal for any property whose IRI ends with `local`
/// (`...premis/rdf/v1#hasEventOutcome` matches `hasEventOutcome`)
pub(crate) fn find_literal(doc: &Value, local: &str) -> Option<String> {
    nodes(doc).into_iter().find_map(|node| {
        let map = node.as_object()?;
        map.iter()
            .filter(|(key, _)| key.rsplit(['#', '/', ':']).next() == Some(local))
            .find_map(|(_, value)| strings(value).into_iter().next())
    })
}

/// String values from a literal, `{"@value"}`, `{"@id"}` or an array of them
fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Array(items) => items.iter().flat_map(strings).collect(),
        Value::Object(map) => map
            .get("@value")
            .or_else(|| map.get("@id"))
            .map(strings)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
