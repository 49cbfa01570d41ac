use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::compiler::assets::{accessory_allowed, first_shot_suppressed, Accessory, Exclusions};
use crate::compiler::enrich;
use crate::compiler::overrides::{parse_override, BatchSpecOverride, OverrideDocument};
use crate::compiler::request::{
    ClosureType, DetailView, Gender, ShootRequest, ShotRole, WorkflowType,
};
use crate::compiler::visibility::{resolve, Framing, ShotType};
use crate::compiler::{CompileError, ShotContext, View};
use crate::utils::text::{ensure_terminal_period, non_empty, normalize_whitespace};

const DEFAULT_INTENT: &str = "Fashion e-commerce photography";
const DEFAULT_PRODUCT_NAME: &str = "Fashion Garment";
const SHOE_STYLE: &str = "slim low-profile sneakers";
const SHOE_SIZE: &str = "SMALL, thin, minimal, proportional to body - NOT chunky, NOT oversized";
const STICKMAN_REFERENCE: &str = "use reference stickman image";
const LIGHTING_REFERENCE: &str = "Lighting matches the provided lighting reference image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "male_model")]
    Male,
    #[serde(rename = "female_model")]
    Female,
    #[default]
    #[serde(rename = "model")]
    Generic,
}

impl ModelType {
    pub fn label(&self) -> &'static str {
        match self {
            ModelType::Male => "male model",
            ModelType::Female => "female model",
            ModelType::Generic => "model",
        }
    }
}

impl From<Gender> for ModelType {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => ModelType::Male,
            Gender::Female => ModelType::Female,
            Gender::Generic => ModelType::Generic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub identity_locked: bool,
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hair_behind_shoulders: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look_at_camera: Option<bool>,
    pub wind_effect: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarmentDetails {
    pub collar: Option<String>,
    pub shoulder: Option<String>,
    pub waist: Option<String>,
    pub rise: Option<String>,
    pub leg_style: Option<String>,
    pub hem: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Garment {
    pub name: String,
    #[serde(rename = "type")]
    pub workflow: WorkflowType,
    pub fabric: Option<String>,
    pub fit: Option<String>,
    pub closure: ClosureType,
    pub details: GarmentDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonsState {
    Open,
    #[default]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TuckState {
    Tucked,
    #[default]
    Untucked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub visible: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl Layer {
    fn visible(description: Option<&str>) -> Self {
        Layer {
            visible: true,
            description: description.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Styling {
    pub buttons: ButtonsState,
    pub tuck: TuckState,
    pub sleeves_rolled: bool,
    pub inner_wear: Option<Layer>,
    pub jacket: Option<Layer>,
    pub upper_garment: Option<Layer>,
    pub lower_garment: Option<Layer>,
    pub socks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shoes {
    pub style: String,
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Shoes {
    fn slim(description: Option<String>) -> Self {
        Shoes {
            style: SHOE_STYLE.to_string(),
            size: SHOE_SIZE.to_string(),
            description,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Accessories {
    pub shoes: Option<Shoes>,
    pub belt: bool,
    pub hat: bool,
    pub glasses: bool,
    pub bag: bool,
    pub jewelry: bool,
}

impl Accessories {
    pub fn present(&self, accessory: Accessory) -> bool {
        match accessory {
            Accessory::Belt => self.belt,
            Accessory::Hat => self.hat,
            Accessory::Bag => self.bag,
            Accessory::Jewelry => self.jewelry,
            Accessory::Glasses => self.glasses,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    pub description: Option<String>,
    pub dynamic: bool,
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posture: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraAngle {
    #[default]
    Styling,
    Front,
    Side,
    Back,
}

impl CameraAngle {
    pub fn for_view(view: View) -> Self {
        match view {
            View::Styling => CameraAngle::Styling,
            View::Front => CameraAngle::Front,
            View::Side => CameraAngle::Side,
            View::Back => CameraAngle::Back,
            View::Detail(DetailView::Front) => CameraAngle::Front,
            View::Detail(DetailView::Angled) => CameraAngle::Side,
            View::Detail(DetailView::Back) => CameraAngle::Back,
        }
    }

    fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "styling" => Some(CameraAngle::Styling),
            "front" => Some(CameraAngle::Front),
            "side" | "angled" | "threequarter" => Some(CameraAngle::Side),
            "back" => Some(CameraAngle::Back),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub shot_type: ShotType,
    pub framing: Framing,
    pub angle: CameraAngle,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            shot_type: ShotType::FullBody,
            framing: Framing::HeadToToe,
            angle: CameraAngle::Styling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMode {
    MatchProvidedBackground,
    #[default]
    CleanStudio,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub background: BackgroundMode,
    pub lighting: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub upper: Option<String>,
    pub lower: Option<String>,
    pub inner: Option<String>,
    pub shoes: Option<String>,
}

/// Canonical intermediate record for one view of one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredPrompt {
    pub intent: String,
    pub subject: Subject,
    pub garment: Garment,
    pub styling: Styling,
    pub accessories: Accessories,
    pub pose: Pose,
    pub camera: Camera,
    pub scene: Scene,
    pub analysis: Analysis,
    #[serde(rename = "_is_user_edited")]
    pub is_user_edited: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CameraOverride {
    shot_type: Option<ShotType>,
    framing: Option<Framing>,
    angle: Option<CameraAngle>,
}

fn owned(value: Option<&str>) -> Option<String> {
    non_empty(value).map(normalize_whitespace)
}

fn default_gaze(view: View) -> bool {
    !matches!(view, View::Back | View::Side)
}

fn rigid_posture(view: View) -> Option<&'static str> {
    match view {
        View::Styling | View::Front => Some(
            "Standing straight at attention, arms hanging straight down at the sides, weight evenly balanced, symmetrical stance. Not hands on hips.",
        ),
        View::Side => Some(
            "Strict side profile with the body turned 90 degrees to the camera, arms relaxed along the sides.",
        ),
        View::Back => Some("Standing straight with the back to the camera, arms at the sides, shoulders level."),
        View::Detail(_) => None,
    }
}

fn seed(request: &ShootRequest, shot: &ShotContext) -> StructuredPrompt {
    let exclusions = Exclusions::from_request(request);
    let accessory = |kind: Accessory| {
        request.has_slot(kind.slot()) && accessory_allowed(kind, request.pose_focus, &exclusions)
    };
    let gaze = if request.gaze_enabled() {
        Some(request.look_at_camera.unwrap_or_else(|| default_gaze(shot.view)))
    } else {
        None
    };
    let inner_description = owned(request.inner_wear_description.as_deref());
    let upper_description = owned(request.upper_garment_description.as_deref());
    let lower_description = owned(request.lower_garment_description.as_deref());

    StructuredPrompt {
        intent: DEFAULT_INTENT.to_string(),
        subject: Subject {
            model_type: ModelType::from(shot.gender),
            identity_locked: request.has_slot("model"),
            body: owned(request.model_description.as_deref()),
            hair_behind_shoulders: request.hair_behind_shoulders,
            look_at_camera: gaze,
            wind_effect: request.enable_wind,
        },
        garment: Garment {
            name: owned(Some(request.product_name.as_str()))
                .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string()),
            workflow: shot.workflow,
            fabric: owned(request.product_description.as_deref()),
            fit: owned(request.fit_description.as_deref()),
            closure: request.closure_type,
            details: GarmentDetails {
                collar: owned(request.collar_type.as_deref()),
                shoulder: owned(request.shoulder_type.as_deref()),
                waist: owned(request.waist_type.as_deref()),
                rise: owned(request.rise_type.as_deref()),
                leg_style: owned(request.leg_type.as_deref()),
                hem: owned(request.hem_type.as_deref()),
            },
        },
        styling: Styling {
            buttons: if request.buttons_open {
                ButtonsState::Open
            } else {
                ButtonsState::Closed
            },
            tuck: if request.tucked {
                TuckState::Tucked
            } else {
                TuckState::Untucked
            },
            sleeves_rolled: request.sleeves_rolled,
            inner_wear: (request.has_slot("inner_wear") || inner_description.is_some())
                .then(|| Layer::visible(inner_description.as_deref())),
            jacket: request
                .has_slot("jacket")
                .then(|| Layer::visible(None)),
            upper_garment: (shot.workflow != WorkflowType::Upper && request.has_slot("top_front"))
                .then(|| Layer::visible(upper_description.as_deref())),
            lower_garment: (shot.workflow == WorkflowType::Upper && request.has_slot("bottom_front"))
                .then(|| Layer::visible(lower_description.as_deref())),
            socks: owned(request.socks_type.as_deref())
                .filter(|socks| !socks.eq_ignore_ascii_case("none")),
        },
        accessories: Accessories {
            shoes: None,
            belt: accessory(Accessory::Belt),
            hat: accessory(Accessory::Hat),
            glasses: accessory(Accessory::Glasses),
            bag: accessory(Accessory::Bag),
            jewelry: accessory(Accessory::Jewelry),
        },
        pose: Pose {
            description: owned(request.pose_description.as_deref()),
            dynamic: true,
            reference: request.stickman().map(|_| STICKMAN_REFERENCE.to_string()),
            posture: None,
        },
        camera: Camera::default(),
        scene: Scene {
            background: if request.has_slot("background") {
                BackgroundMode::MatchProvidedBackground
            } else {
                BackgroundMode::CleanStudio
            },
            lighting: request
                .has_slot("lighting")
                .then(|| LIGHTING_REFERENCE.to_string()),
        },
        analysis: Analysis {
            upper: upper_description,
            lower: lower_description,
            inner: inner_description,
            shoes: owned(request.shoes_description.as_deref()),
        },
        is_user_edited: false,
    }
}

fn probe_str<'a>(map: &'a Map<String, Value>, section: &str, key: &str) -> Option<&'a str> {
    map.get(section)
        .and_then(|value| value.get(key))
        .and_then(Value::as_str)
}

fn canonical_camera_override(map: &Map<String, Value>) -> Result<CameraOverride, CompileError> {
    let framing = probe_str(map, "camera", "framing")
        .map(Framing::from_str)
        .transpose()?;
    let shot_type = map
        .get("camera")
        .and_then(|camera| camera.get("shot_type"))
        .and_then(|value| serde_json::from_value::<ShotType>(value.clone()).ok());
    let angle = probe_str(map, "camera", "angle").and_then(CameraAngle::parse_loose);
    Ok(CameraOverride {
        shot_type,
        framing,
        angle,
    })
}

/// Top-level sections of the document replace the seeded ones wholesale.
fn merge_canonical(seeded: &StructuredPrompt, map: Map<String, Value>) -> Option<StructuredPrompt> {
    let mut base = match serde_json::to_value(seeded) {
        Ok(Value::Object(base)) => base,
        _ => return None,
    };
    for (key, value) in map {
        base.insert(key, value);
    }
    match serde_json::from_value::<StructuredPrompt>(Value::Object(base)) {
        Ok(merged) => Some(merged),
        Err(err) => {
            debug!(target: "shoot.compiler", "canonical override rejected ({}); ignoring", err);
            None
        }
    }
}

fn apply_batch_spec(
    prompt: &mut StructuredPrompt,
    spec: &BatchSpecOverride,
    role: ShotRole,
) -> Result<CameraOverride, CompileError> {
    if let Some(name) = owned(spec.product_name.as_deref()) {
        prompt.garment.name = name;
    }
    if let Some(fabric) = owned(spec.product_description.as_deref()) {
        prompt.garment.fabric = Some(fabric);
    }
    if let Some(fit) = owned(spec.fit_description.as_deref()) {
        prompt.garment.fit = Some(fit);
    }
    if role == ShotRole::Styling {
        if let Some(pose) = owned(spec.pose.as_deref()) {
            prompt.pose.description = Some(pose);
        }
    }
    if let Some(look) = spec.look_at_camera {
        prompt.subject.look_at_camera = Some(look);
    }
    if let Some(hair) = spec.hair_behind {
        prompt.subject.hair_behind_shoulders = Some(hair);
    }

    let Some(camera) = spec.camera.as_ref() else {
        return Ok(CameraOverride::default());
    };
    let framing = non_empty(camera.framing.as_deref())
        .map(Framing::from_str)
        .transpose()?;
    let shot_type = non_empty(camera.shot_type.as_deref())
        .and_then(|value| serde_json::from_value::<ShotType>(Value::String(value.to_string())).ok());
    let angle = camera.angle.as_deref().and_then(CameraAngle::parse_loose);
    Ok(CameraOverride {
        shot_type,
        framing,
        angle,
    })
}

/// Builds the structured record for one view: seed, override or enrichment,
/// view adjustments, then the single framing assignment and its consequences.
pub fn build(request: &ShootRequest, shot: &ShotContext) -> Result<StructuredPrompt, CompileError> {
    let mut prompt = seed(request, shot);
    let mut camera_override = CameraOverride::default();

    match parse_override(request.edited_prompt.as_deref()) {
        OverrideDocument::Canonical(map) => {
            let candidate = canonical_camera_override(&map)?;
            if let Some(merged) = merge_canonical(&prompt, map) {
                prompt = merged;
                prompt.is_user_edited = true;
                camera_override = candidate;
            }
        }
        OverrideDocument::BatchSpec(spec) => {
            camera_override = apply_batch_spec(&mut prompt, &spec, shot.role)?;
            prompt.is_user_edited = true;
        }
        OverrideDocument::Ignored => {}
    }

    if !prompt.is_user_edited {
        enrich::apply(&mut prompt, shot.view.is_back());
    }

    match shot.role {
        ShotRole::Styling => {
            prompt.pose.dynamic = true;
            prompt.pose.posture = None;
            if let Some(description) = prompt.pose.description.take() {
                prompt.pose.description = Some(ensure_terminal_period(&description));
            }
        }
        ShotRole::Technical => {
            prompt.pose.dynamic = false;
            prompt.pose.description = None;
            prompt.pose.posture = rigid_posture(shot.view).map(str::to_string);
        }
    }

    let framing = match shot.view {
        View::Detail(_) => Framing::WaistToAboveKnees,
        _ => match camera_override.framing {
            Some(framing) => framing,
            None => request
                .explicit_framing()?
                .unwrap_or_else(|| Framing::from_pose_focus(request.pose_focus)),
        },
    };
    let shot_type = match shot.view {
        View::Detail(_) => framing.shot_type(),
        _ => camera_override.shot_type.unwrap_or_else(|| framing.shot_type()),
    };
    prompt.camera = Camera {
        shot_type,
        framing,
        angle: camera_override
            .angle
            .filter(|_| !matches!(shot.view, View::Detail(_)))
            .unwrap_or_else(|| CameraAngle::for_view(shot.view)),
    };

    let visibility = resolve(framing);
    let shoes_allowed = visibility.can_show_footwear
        && request.has_slot("shoes")
        && !request.exclude_shoes_asset
        && !first_shot_suppressed(
            shot.workflow,
            request.pose_focus,
            shot.role,
            shot.view,
            request.shot_index,
        );
    let shoe_description = prompt
        .accessories
        .shoes
        .take()
        .and_then(|shoes| shoes.description)
        .or_else(|| prompt.analysis.shoes.clone());
    prompt.accessories.shoes = shoes_allowed.then(|| Shoes::slim(shoe_description));

    if framing == Framing::WaistToAboveKnees {
        prompt.accessories.shoes = None;
        prompt.subject.hair_behind_shoulders = None;
        prompt.subject.look_at_camera = None;
        prompt.pose.description = None;
        prompt.pose.posture = None;
        prompt.pose.reference = None;
    }

    if tracing::enabled!(target: "shoot.compiler", tracing::Level::DEBUG) {
        if let Ok(rendered) = serde_json::to_string(&prompt) {
            debug!(target: "shoot.compiler", view = shot.view.label(), structured = %rendered);
        }
    }

    Ok(prompt)
}
