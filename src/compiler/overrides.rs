use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

const CANONICAL_KEYS: &[&str] = &["intent", "subject", "garment"];
const BATCH_SPEC_KEYS: &[&str] = &["productName", "productDescription", "pose", "view", "camera"];

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchSpecCamera {
    pub shot_type: Option<String>,
    pub framing: Option<String>,
    pub angle: Option<String>,
}

/// Editable per-shot document produced by batch previews.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchSpecOverride {
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    pub fit_description: Option<String>,
    pub pose: Option<String>,
    pub view: Option<String>,
    pub camera: Option<BatchSpecCamera>,
    pub look_at_camera: Option<bool>,
    pub hair_behind: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverrideDocument {
    /// Full structured record (or a subset of its top-level sections).
    Canonical(Map<String, Value>),
    BatchSpec(BatchSpecOverride),
    Ignored,
}

/// Classifies caller override text by probing top-level keys.
pub fn parse_override(text: Option<&str>) -> OverrideDocument {
    let Some(text) = text.map(str::trim).filter(|value| !value.is_empty()) else {
        return OverrideDocument::Ignored;
    };

    let object = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            debug!(target: "shoot.compiler", "override is not a JSON object; ignoring");
            return OverrideDocument::Ignored;
        }
        Err(err) => {
            debug!(target: "shoot.compiler", "override is not valid JSON ({}); ignoring", err);
            return OverrideDocument::Ignored;
        }
    };

    if CANONICAL_KEYS.iter().any(|key| object.contains_key(*key)) {
        return OverrideDocument::Canonical(object);
    }

    if BATCH_SPEC_KEYS.iter().any(|key| object.contains_key(*key)) {
        return match serde_json::from_value::<BatchSpecOverride>(Value::Object(object)) {
            Ok(spec) => OverrideDocument::BatchSpec(spec),
            Err(err) => {
                debug!(target: "shoot.compiler", "batch-spec override malformed ({}); ignoring", err);
                OverrideDocument::Ignored
            }
        };
    }

    OverrideDocument::Ignored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_canonical_documents() {
        let doc = parse_override(Some(r#"{"garment": {"name": "Shirt"}, "extra": 1}"#));
        match doc {
            OverrideDocument::Canonical(map) => assert!(map.contains_key("garment")),
            other => panic!("expected canonical, got {other:?}"),
        }
    }

    #[test]
    fn detects_batch_spec_documents() {
        let doc = parse_override(Some(
            r#"{"view": "technical_back", "camera": {"shot_type": "cowboy_shot", "framing": "cowboy_shot", "angle": "back"}}"#,
        ));
        let OverrideDocument::BatchSpec(spec) = doc else {
            panic!("expected batch spec");
        };
        assert_eq!(spec.view.as_deref(), Some("technical_back"));
        let camera = spec.camera.expect("camera");
        assert_eq!(camera.framing.as_deref(), Some("cowboy_shot"));
    }

    #[test]
    fn any_batch_spec_key_marks_a_partial_edit() {
        let doc = parse_override(Some(
            r#"{"productDescription": "Heavy twill cotton", "pose": "Hands in pockets"}"#,
        ));
        let OverrideDocument::BatchSpec(spec) = doc else {
            panic!("expected batch spec, got {doc:?}");
        };
        assert_eq!(spec.product_description.as_deref(), Some("Heavy twill cotton"));
        assert_eq!(spec.pose.as_deref(), Some("Hands in pockets"));

        let doc = parse_override(Some(r#"{"camera": {"framing": "cowboy_shot"}}"#));
        let OverrideDocument::BatchSpec(spec) = doc else {
            panic!("expected batch spec, got {doc:?}");
        };
        assert_eq!(
            spec.camera.and_then(|camera| camera.framing).as_deref(),
            Some("cowboy_shot")
        );

        let doc = parse_override(Some(r#"{"view": "front"}"#));
        assert!(matches!(doc, OverrideDocument::BatchSpec(ref spec) if spec.view.as_deref() == Some("front")));
    }

    #[test]
    fn ignores_plain_text_and_unrecognized_shapes() {
        assert_eq!(parse_override(Some("make it brighter")), OverrideDocument::Ignored);
        assert_eq!(parse_override(Some("[1, 2]")), OverrideDocument::Ignored);
        assert_eq!(parse_override(Some(r#"{"mood": "editorial"}"#)), OverrideDocument::Ignored);
        assert_eq!(parse_override(Some(r#"{"productName": 42}"#)), OverrideDocument::Ignored);
        assert_eq!(parse_override(None), OverrideDocument::Ignored);
    }
}
