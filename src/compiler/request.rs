use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compiler::visibility::Framing;
use crate::compiler::CompileError;
use crate::utils::text::{contains_any, non_empty};

/// Reference image slots keyed by name (`model`, `top_front`, `shoes`, ...).
pub type AssetSlots = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowType {
    Upper,
    Lower,
    Dress,
    Set,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::Upper => "upper",
            WorkflowType::Lower => "lower",
            WorkflowType::Dress => "dress",
            WorkflowType::Set => "set",
        }
    }
}

impl Default for WorkflowType {
    fn default() -> Self {
        WorkflowType::Upper
    }
}

const SET_KEYWORDS: &[&str] = &["takım", "pijama", "eşofman takımı", "bikini", "set", "suit"];
const FULL_BODY_KEYWORDS: &[&str] = &[
    "elbise", "tulum", "romper", "kaban", "palto", "trençkot", "dress", "jumpsuit", "coat", "gown",
];
const LOWER_KEYWORDS: &[&str] = &[
    "pantolon", "şort", "etek", "tayt", "jean", "trousers", "skirt", "shorts", "leggings",
    "joggers", "denim",
];

pub fn infer_workflow(product_name: &str) -> WorkflowType {
    if contains_any(product_name, SET_KEYWORDS) {
        WorkflowType::Set
    } else if contains_any(product_name, FULL_BODY_KEYWORDS) {
        WorkflowType::Dress
    } else if contains_any(product_name, LOWER_KEYWORDS) {
        WorkflowType::Lower
    } else {
        WorkflowType::Upper
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[serde(alias = "model")]
    Generic,
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Generic
    }
}

const MALE_KEYWORDS: &[&str] = &["erkek", "bay ", "male", " man"];
const FEMALE_KEYWORDS: &[&str] = &["kadın", "bayan", "female", "woman"];

pub fn infer_gender(text: &str) -> Gender {
    let lowered = format!(" {}", text.to_lowercase());
    // "female" contains "male", so the female check has to run first.
    if FEMALE_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
        Gender::Female
    } else if MALE_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
        Gender::Male
    } else {
        Gender::Generic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseFocus {
    Full,
    Upper,
    Lower,
    Closeup,
    Detail,
}

impl Default for PoseFocus {
    fn default() -> Self {
        PoseFocus::Full
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailView {
    Front,
    Angled,
    Back,
}

impl DetailView {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailView::Front => "front",
            DetailView::Angled => "angled",
            DetailView::Back => "back",
        }
    }
}

impl Default for DetailView {
    fn default() -> Self {
        DetailView::Front
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetView {
    Styling,
    Front,
    Side,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotRole {
    Styling,
    Technical,
}

impl ShotRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShotRole::Styling => "styling",
            ShotRole::Technical => "technical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosureType {
    Buttons,
    Zipper,
    None,
}

impl Default for ClosureType {
    fn default() -> Self {
        ClosureType::Buttons
    }
}

/// Inbound photoshoot request. Keys follow the camelCase shape the UI posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShootRequest {
    pub product_name: String,
    pub product_code: Option<String>,
    pub workflow_type: Option<WorkflowType>,
    pub uploaded_images: AssetSlots,
    pub gender: Option<Gender>,
    pub prompt: Option<String>,
    pub pose_focus: PoseFocus,
    pub detail_view: DetailView,
    pub framing: Option<String>,
    pub is_angles: bool,
    pub target_view: Option<TargetView>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    pub seed: Option<u64>,
    pub enable_web_search: bool,
    pub edited_prompt: Option<String>,

    pub buttons_open: bool,
    pub tucked: bool,
    pub sleeves_rolled: bool,
    pub socks_type: Option<String>,
    pub closure_type: ClosureType,
    pub collar_type: Option<String>,
    pub shoulder_type: Option<String>,
    pub waist_type: Option<String>,
    pub rise_type: Option<String>,
    pub leg_type: Option<String>,
    pub hem_type: Option<String>,

    pub product_description: Option<String>,
    pub fit_description: Option<String>,
    pub pose_description: Option<String>,
    pub pose_stickman: Option<String>,
    pub upper_garment_description: Option<String>,
    pub lower_garment_description: Option<String>,
    pub inner_wear_description: Option<String>,
    pub shoes_description: Option<String>,
    pub model_description: Option<String>,

    pub enable_expression: Option<bool>,
    pub enable_gaze: Option<bool>,
    pub hair_behind_shoulders: Option<bool>,
    pub look_at_camera: Option<bool>,
    pub enable_wind: bool,

    pub is_styling_shot: Option<bool>,
    pub shot_index: Option<u32>,
    pub shot_role: Option<ShotRole>,
    pub angle_id: Option<String>,
    pub mood_id: Option<String>,

    pub lighting_positive: Option<String>,
    pub lighting_negative: Option<String>,

    pub exclude_shoes_asset: bool,
    pub exclude_belt_asset: bool,
    pub exclude_hat_asset: bool,
    pub exclude_bag_asset: bool,
    pub exclude_all_accessories: bool,
}

impl ShootRequest {
    pub fn effective_workflow(&self) -> WorkflowType {
        self.workflow_type
            .unwrap_or_else(|| infer_workflow(&self.product_name))
    }

    pub fn effective_gender(&self) -> Gender {
        match self.gender {
            Some(Gender::Male) => Gender::Male,
            Some(Gender::Female) => Gender::Female,
            _ => infer_gender(&format!(
                "{} {}",
                self.product_name,
                self.prompt.as_deref().unwrap_or_default()
            )),
        }
    }

    pub fn expression_enabled(&self) -> bool {
        self.enable_expression.unwrap_or(true)
    }

    pub fn gaze_enabled(&self) -> bool {
        self.enable_gaze.unwrap_or(true)
    }

    /// The caller-pinned framing, if any. Unknown values are rejected.
    pub fn explicit_framing(&self) -> Result<Option<Framing>, CompileError> {
        match non_empty(self.framing.as_deref()) {
            Some(value) => Framing::from_str(value).map(Some),
            None => Ok(None),
        }
    }

    /// Slot value if present and usable as a backend reference (`http` prefix).
    pub fn slot(&self, name: &str) -> Option<&str> {
        self.uploaded_images
            .get(name)
            .map(|value| value.trim())
            .filter(|value| value.starts_with("http"))
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    pub fn stickman(&self) -> Option<&str> {
        non_empty(self.pose_stickman.as_deref())
            .filter(|value| value.starts_with("http"))
            .or_else(|| self.slot("pose_stickman"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_workflow_from_product_keywords() {
        assert_eq!(infer_workflow("Erkek Pijama Takımı"), WorkflowType::Set);
        assert_eq!(infer_workflow("Linen Midi Dress"), WorkflowType::Dress);
        assert_eq!(infer_workflow("Slim Fit Jean"), WorkflowType::Lower);
        assert_eq!(infer_workflow("Oxford Shirt"), WorkflowType::Upper);
    }

    #[test]
    fn explicit_workflow_wins_over_inference() {
        let request = ShootRequest {
            product_name: "Denim Jacket".to_string(),
            workflow_type: Some(WorkflowType::Upper),
            ..Default::default()
        };
        assert_eq!(request.effective_workflow(), WorkflowType::Upper);
    }

    #[test]
    fn infers_gender_without_confusing_female_for_male() {
        assert_eq!(infer_gender("Female linen blouse"), Gender::Female);
        assert_eq!(infer_gender("Erkek gömlek"), Gender::Male);
        assert_eq!(infer_gender("Unisex hoodie"), Gender::Generic);
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let raw = r#"{
            "productName": "Oxford Shirt",
            "uploadedImages": {"model": "https://cdn.example/model.png", "shoes": "data:image/png;base64,AAA"},
            "poseFocus": "upper",
            "shotIndex": 1,
            "gender": "model"
        }"#;
        let request: ShootRequest = serde_json::from_str(raw).expect("request parses");
        assert_eq!(request.pose_focus, PoseFocus::Upper);
        assert_eq!(request.shot_index, Some(1));
        assert_eq!(request.gender, Some(Gender::Generic));
        assert!(request.expression_enabled());
        assert!(request.has_slot("model"));
        assert!(!request.has_slot("shoes"));
    }

    #[test]
    fn rejects_unknown_explicit_framing() {
        let request = ShootRequest {
            framing: Some("knees_up".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            request.explicit_framing(),
            Err(CompileError::UnrecognizedFraming(value)) if value == "knees_up"
        ));
    }
}
