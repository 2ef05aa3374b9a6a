use serde_json::{Map, Value};

/// Keys under which inference services place their detection lists.
pub const DETECTION_LIST_KEYS: &[&str] = &["predictions", "detections", "objects"];

/// One detection list found somewhere inside an inference result.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCandidate<'a> {
    /// Which recognized key held the list.
    pub key: &'a str,
    /// JSON pointer to the list, e.g. `/0/model_predictions/predictions`.
    pub pointer: String,
    /// Object-typed entries of the list, in list order.
    pub entries: Vec<&'a Map<String, Value>>,
}

impl DetectionCandidate<'_> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect every detection list in `root`, at any depth.
///
/// Traversal is depth-first pre-order driven by an explicit stack, so the
/// order of the returned candidates is the discovery order used for
/// tie-breaking. A match does not stop traversal into its own subtree.
pub fn scan(root: &Value) -> Vec<DetectionCandidate<'_>> {
    let mut found = Vec::new();
    let mut stack: Vec<(&Value, String)> = vec![(root, String::new())];

    while let Some((node, pointer)) = stack.pop() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if let Some(known) = DETECTION_LIST_KEYS.iter().find(|k| **k == key.as_str())
                        && let Value::Array(items) = value
                    {
                        found.push(DetectionCandidate {
                            key: *known,
                            pointer: format!("{}/{}", pointer, escape_token(key)),
                            entries: items.iter().filter_map(Value::as_object).collect(),
                        });
                    }
                }
                // Reverse push keeps children in document order when popped.
                for (key, value) in map.iter().rev() {
                    if is_container(value) {
                        stack.push((value, format!("{}/{}", pointer, escape_token(key))));
                    }
                }
            }
            Value::Array(items) => {
                for (index, value) in items.iter().enumerate().rev() {
                    if is_container(value) {
                        stack.push((value, format!("{}/{}", pointer, index)));
                    }
                }
            }
            _ => {}
        }
    }

    log::debug!("scan found {} detection list(s)", found.len());
    found
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn escape_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
