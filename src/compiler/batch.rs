//! Multi-shot presets. A batch expands into one fully specified request per
//! selected shot; every shot then goes through the normal compiler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compiler::request::{
    AssetSlots, DetailView, Gender, PoseFocus, ShootRequest, ShotRole, TargetView, WorkflowType,
};
use crate::compiler::visibility::{Framing, ShotType};
use crate::compiler::{CompileError, View};
use crate::utils::text::{first_sentence, non_empty};

const FEMALE_RANDOM_POSES: &[&str] = &[
    "Standing with one hand on hip, weight shifted to left leg",
    "Hands in pockets, relaxed stance",
    "Arms crossed casually",
    "One hand touching hair",
];
const MALE_RANDOM_POSES: &[&str] = &[
    "Standing with hands in pockets, shoulders relaxed",
    "Arms at sides, weight on one leg",
    "One hand in pocket, other relaxed",
    "Hands clasped in front",
];
const FEMALE_ANGLED_POSES: &[&str] = &[
    "Body rotated 45 degrees to the right, looking over shoulder",
    "Three-quarter turn to the left, hands on hips",
    "Slight rotation showing side profile",
];
const MALE_ANGLED_POSES: &[&str] = &[
    "Body rotated 45 degrees to the right, looking at camera",
    "Three-quarter turn to the left, hands in pockets",
    "Slight rotation showing side profile",
];

const TECH_FRONT_POSE: &str =
    "Standing straight, arms at sides, neutral stance. Professional studio photography.";
const TECH_BACK_POSE: &str =
    "Standing straight, back to camera, arms at sides. Professional studio photography.";
const UPPER_TECH_BACK_POSE: &str = "Standing perfectly straight, back directly to camera, arms at sides. The upper garment hangs straight and smooth over the pants without any wrinkles, folds, or curling at the hemline. Hem is completely flat and horizontal.";
const THREEQUARTER_POSE: &str = "upright posture, three-quarter profile view facing right, shoulders level and relaxed, natural shoulder alignment, arms resting straight along the sides, hands relaxed with fingers slightly curved, no hand-to-body interaction, weight subtly distributed with slight emphasis on rear leg, neutral balanced stance, feet parallel and slightly apart, knees softly extended, neutral gaze directed forward in profile direction, head aligned with spine, chin neutral, elongated neck line";
const DETAIL_FRONT_POSE: &str =
    "Close-Up fashion photography detail shot. Camera framing is waist-to-knees. Standing straight.";
const DETAIL_BACK_POSE: &str = "Close-Up fashion photography back detail shot. Camera framing is waist-to-knees. Standing straight, back to camera.";
const UPPER_CLOSEUP_POSE: &str = "Close-up fashion photography shot, focusing on the collar and face area. Model is standing perfectly straight, facing the camera directly, arms at sides. Neutral expression, direct eye contact.";
const STD_CLOSEUP_POSE: &str = "Close-up fashion photography shot, focusing on the collar and face area. Model is standing perfectly straight.";
const STD_UPPER_FRONT_POSE: &str = "Standing straight, arms at sides, neutral stance. Cowboy shot.";
const STD_UPPER_BACK_POSE: &str = "Standing straight, back to camera, arms at sides. Cowboy shot.";

const ANGLED_POSE_TAG: &str = "yan_aci";
const ACCESSORY_SLOTS: &[&str] = &["jacket", "bag", "glasses", "hat", "belt", "jewelry"];
const FRONT_SIDE_SLOTS: &[&str] = &[
    "main_product",
    "dress_front",
    "top_front",
    "bottom_front",
    "detail_front_1",
    "detail_front_2",
    "detail_front_3",
    "detail_front_4",
];
const BACK_SIDE_SLOTS: &[&str] = &[
    "backRefUpload",
    "top_back",
    "bottom_back",
    "detail_back_1",
    "detail_back_2",
    "detail_back_3",
    "detail_back_4",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPreset {
    #[default]
    Catalog,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpperFraming {
    #[default]
    Full,
    MediumFull,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedPose {
    pub gender: Option<Gender>,
    pub tags: Vec<String>,
    pub custom_prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchRequest {
    pub base: ShootRequest,
    pub preset: BatchPreset,
    /// Shot ids to run; all shots of the preset when absent.
    pub selection: Option<Vec<String>>,
    pub upper_framing: UpperFraming,
    pub pose_library_prompt: Option<String>,
    pub angled_pose_prompt: Option<String>,
    pub styling_side_only: BTreeMap<String, bool>,
    pub tech_accessories: BTreeMap<String, bool>,
    pub saved_poses: Vec<SavedPose>,
    /// Hand-edited override documents keyed by shot id.
    pub edited_prompts: BTreeMap<String, String>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecAngle {
    Front,
    Angled,
    Back,
}

impl SpecAngle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecAngle::Front => "front",
            SpecAngle::Angled => "angled",
            SpecAngle::Back => "back",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecCamera {
    pub shot_type: ShotType,
    pub framing: Framing,
    pub angle: SpecAngle,
}

impl SpecCamera {
    fn full(angle: SpecAngle) -> Self {
        SpecCamera {
            shot_type: ShotType::FullBody,
            framing: Framing::HeadToToe,
            angle,
        }
    }

    fn cowboy(angle: SpecAngle) -> Self {
        SpecCamera {
            shot_type: ShotType::CowboyShot,
            framing: Framing::CowboyShot,
            angle,
        }
    }

    fn closeup(angle: SpecAngle) -> Self {
        SpecCamera {
            shot_type: ShotType::CloseUp,
            framing: Framing::ChestAndFace,
            angle,
        }
    }

    fn detail(angle: SpecAngle) -> Self {
        SpecCamera {
            shot_type: ShotType::CloseUp,
            framing: Framing::WaistToAboveKnees,
            angle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    #[default]
    Full,
    FirstSentenceOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AssetSides {
    pub front: bool,
    pub back: bool,
}

impl AssetSides {
    const FRONT: AssetSides = AssetSides {
        front: true,
        back: false,
    };
    const BACK: AssetSides = AssetSides {
        front: false,
        back: true,
    };
    const BOTH: AssetSides = AssetSides {
        front: true,
        back: true,
    };
}

/// One shot of a preset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotSpec {
    pub view: &'static str,
    pub pose: String,
    pub dynamic: bool,
    pub look_at_camera: bool,
    pub hair_behind: bool,
    pub camera: SpecCamera,
    pub assets: AssetSides,
    pub fit_mode: FitMode,
    pub exclude_hair_info: bool,
    pub exclude_socks_info: bool,
    pub exclude_shoes_asset: bool,
    pub exclude_belt_asset: bool,
    pub exclude_hat_asset: bool,
    pub exclude_bag_asset: bool,
    pub exclude_all_accessories: bool,
    pub enable_wind: bool,
    pub is_styling: bool,
    pub include_glasses: bool,
    pub use_stickman: bool,
}

impl ShotSpec {
    fn styling(view: &'static str, pose: String, camera: SpecCamera, assets: AssetSides) -> Self {
        ShotSpec {
            view,
            pose,
            dynamic: true,
            look_at_camera: true,
            hair_behind: false,
            camera,
            assets,
            fit_mode: FitMode::Full,
            exclude_hair_info: false,
            exclude_socks_info: false,
            exclude_shoes_asset: false,
            exclude_belt_asset: false,
            exclude_hat_asset: false,
            exclude_bag_asset: false,
            exclude_all_accessories: false,
            enable_wind: false,
            is_styling: true,
            include_glasses: false,
            use_stickman: true,
        }
    }

    fn technical(view: &'static str, pose: &str, camera: SpecCamera, assets: AssetSides) -> Self {
        ShotSpec {
            dynamic: false,
            hair_behind: true,
            is_styling: false,
            use_stickman: false,
            ..ShotSpec::styling(view, pose.to_string(), camera, assets)
        }
    }

    fn detail(view: &'static str, pose: &str, angle: SpecAngle) -> Self {
        let assets = if angle == SpecAngle::Back {
            AssetSides::BACK
        } else {
            AssetSides::FRONT
        };
        ShotSpec {
            look_at_camera: angle != SpecAngle::Back,
            fit_mode: FitMode::FirstSentenceOnly,
            exclude_hair_info: true,
            exclude_socks_info: true,
            exclude_shoes_asset: true,
            ..ShotSpec::technical(view, pose, SpecCamera::detail(angle), assets)
        }
    }

    pub fn role(&self) -> ShotRole {
        if self.is_styling {
            ShotRole::Styling
        } else {
            ShotRole::Technical
        }
    }

    pub fn is_detail(&self) -> bool {
        self.view.contains("detail")
    }

    pub fn target_view(&self) -> TargetView {
        if self.camera.angle == SpecAngle::Angled || self.view.contains("angled") {
            TargetView::Side
        } else if self.camera.angle == SpecAngle::Back || self.view.contains("back") {
            TargetView::Back
        } else {
            TargetView::Front
        }
    }

    pub fn pose_focus(&self) -> PoseFocus {
        if self.is_detail() {
            return PoseFocus::Detail;
        }
        match self.camera.shot_type {
            ShotType::CloseUp => PoseFocus::Closeup,
            ShotType::CowboyShot => PoseFocus::Upper,
            ShotType::FullBody => PoseFocus::Full,
        }
    }

    pub fn detail_view(&self) -> DetailView {
        match self.camera.angle {
            SpecAngle::Back => DetailView::Back,
            SpecAngle::Angled => DetailView::Angled,
            SpecAngle::Front => DetailView::Front,
        }
    }

    /// The view this shot compiles to.
    pub fn compiled_view(&self) -> View {
        if self.is_styling {
            View::Styling
        } else if self.is_detail() {
            View::Detail(self.detail_view())
        } else {
            View::from(self.target_view())
        }
    }
}

/// Inputs shared by both preset builders.
#[derive(Debug, Clone, Copy)]
pub struct PresetOptions<'a> {
    pub gender: Gender,
    pub hair_behind: bool,
    pub enable_wind: bool,
    pub upper_framing: UpperFraming,
    pub pose_library_prompt: Option<&'a str>,
    pub angled_pose_prompt: Option<&'a str>,
    pub styling_side_only: &'a BTreeMap<String, bool>,
    pub saved_poses: &'a [SavedPose],
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoseKind {
    Random,
    Angled,
}

/// Deterministic stand-in for a random pick: same seed, same pose.
pub fn pick_pose<'a>(poses: &[&'a str], seed: u64, salt: usize) -> Option<&'a str> {
    if poses.is_empty() {
        return None;
    }
    let index = (seed as usize).wrapping_add(salt) % poses.len();
    Some(poses[index])
}

fn builtin_pose(options: &PresetOptions<'_>, kind: PoseKind, salt: usize) -> String {
    let poses = match (kind, options.gender) {
        (PoseKind::Random, Gender::Male) => MALE_RANDOM_POSES,
        (PoseKind::Random, _) => FEMALE_RANDOM_POSES,
        (PoseKind::Angled, Gender::Male) => MALE_ANGLED_POSES,
        (PoseKind::Angled, _) => FEMALE_ANGLED_POSES,
    };
    pick_pose(poses, options.seed, salt)
        .unwrap_or_default()
        .to_string()
}

fn library_pose(options: &PresetOptions<'_>, kind: PoseKind, salt: usize) -> Option<String> {
    let candidates: Vec<&str> = options
        .saved_poses
        .iter()
        .filter(|pose| pose.gender == Some(options.gender))
        .filter(|pose| kind == PoseKind::Random || pose.tags.iter().any(|tag| tag == ANGLED_POSE_TAG))
        .filter_map(|pose| non_empty(Some(pose.custom_prompt.as_str())))
        .collect();
    pick_pose(&candidates, options.seed, salt).map(str::to_string)
}

pub fn catalog_specs(upper_workflow: bool, options: &PresetOptions<'_>) -> Vec<ShotSpec> {
    let random_pose = |salt: usize| {
        options
            .pose_library_prompt
            .map(str::to_string)
            .unwrap_or_else(|| builtin_pose(options, PoseKind::Random, salt))
    };
    let angled_pose = options
        .angled_pose_prompt
        .map(str::to_string)
        .unwrap_or_else(|| builtin_pose(options, PoseKind::Angled, 1));

    let with_styling_flags = |spec: ShotSpec| ShotSpec {
        hair_behind: options.hair_behind,
        ..spec
    };

    if upper_workflow {
        let medium_full = options.upper_framing == UpperFraming::MediumFull;
        let first_camera = if medium_full {
            SpecCamera::cowboy(SpecAngle::Front)
        } else {
            SpecCamera::full(SpecAngle::Front)
        };
        return vec![
            ShotSpec {
                enable_wind: options.enable_wind,
                include_glasses: true,
                exclude_shoes_asset: medium_full,
                ..with_styling_flags(ShotSpec::styling(
                    "styling_front",
                    random_pose(0),
                    first_camera,
                    AssetSides::FRONT,
                ))
            },
            ShotSpec {
                look_at_camera: false,
                ..with_styling_flags(ShotSpec::styling(
                    "styling_angled",
                    angled_pose,
                    SpecCamera::full(SpecAngle::Angled),
                    AssetSides::BOTH,
                ))
            },
            ShotSpec {
                enable_wind: options.enable_wind,
                ..with_styling_flags(ShotSpec::styling(
                    "styling_front_2",
                    random_pose(2),
                    SpecCamera::full(SpecAngle::Front),
                    AssetSides::FRONT,
                ))
            },
            ShotSpec {
                look_at_camera: false,
                exclude_hair_info: true,
                exclude_shoes_asset: true,
                exclude_hat_asset: true,
                exclude_belt_asset: true,
                ..ShotSpec::technical(
                    "technical_back",
                    UPPER_TECH_BACK_POSE,
                    SpecCamera::cowboy(SpecAngle::Back),
                    AssetSides::BACK,
                )
            },
            ShotSpec {
                hair_behind: options.hair_behind,
                ..ShotSpec::technical(
                    "closeup_front",
                    UPPER_CLOSEUP_POSE,
                    SpecCamera::closeup(SpecAngle::Front),
                    AssetSides::FRONT,
                )
            },
        ];
    }

    vec![
        ShotSpec {
            enable_wind: options.enable_wind,
            include_glasses: true,
            ..with_styling_flags(ShotSpec::styling(
                "styling_front",
                random_pose(0),
                SpecCamera::full(SpecAngle::Front),
                AssetSides::FRONT,
            ))
        },
        ShotSpec {
            look_at_camera: false,
            enable_wind: options.enable_wind,
            ..with_styling_flags(ShotSpec::styling(
                "styling_angled",
                angled_pose,
                SpecCamera::full(SpecAngle::Angled),
                AssetSides::BOTH,
            ))
        },
        ShotSpec {
            exclude_all_accessories: true,
            ..ShotSpec::technical(
                "technical_front",
                TECH_FRONT_POSE,
                SpecCamera::full(SpecAngle::Front),
                AssetSides::FRONT,
            )
        },
        ShotSpec {
            look_at_camera: false,
            exclude_hair_info: true,
            exclude_all_accessories: true,
            ..ShotSpec::technical(
                "technical_back",
                TECH_BACK_POSE,
                SpecCamera::full(SpecAngle::Back),
                AssetSides::BACK,
            )
        },
        ShotSpec {
            look_at_camera: false,
            exclude_all_accessories: true,
            ..ShotSpec::technical(
                "technical_threequarter_front",
                THREEQUARTER_POSE,
                SpecCamera::full(SpecAngle::Angled),
                AssetSides::BOTH,
            )
        },
        ShotSpec {
            exclude_belt_asset: true,
            ..ShotSpec::detail("detail_front", DETAIL_FRONT_POSE, SpecAngle::Front)
        },
        ShotSpec {
            exclude_belt_asset: true,
            ..ShotSpec::detail("detail_back", DETAIL_BACK_POSE, SpecAngle::Back)
        },
    ]
}

pub fn standard_specs(options: &PresetOptions<'_>) -> Vec<ShotSpec> {
    let styling_shot = |view: &'static str, camera: fn(SpecAngle) -> SpecCamera, salt: usize| {
        let side_only = options.styling_side_only.get(view).copied().unwrap_or(false);
        let kind = if side_only {
            PoseKind::Angled
        } else {
            PoseKind::Random
        };
        let pose = options
            .pose_library_prompt
            .map(str::to_string)
            .or_else(|| library_pose(options, kind, salt))
            .unwrap_or_else(|| builtin_pose(options, kind, salt));
        let (angle, assets) = if side_only {
            (SpecAngle::Angled, AssetSides::BOTH)
        } else {
            (SpecAngle::Front, AssetSides::FRONT)
        };
        ShotSpec {
            look_at_camera: !side_only,
            hair_behind: options.hair_behind,
            enable_wind: options.enable_wind,
            ..ShotSpec::styling(view, pose, camera(angle), assets)
        }
    };

    vec![
        ShotSpec {
            include_glasses: true,
            ..styling_shot("std_styling_full", SpecCamera::full, 0)
        },
        ShotSpec {
            exclude_shoes_asset: true,
            ..styling_shot("std_styling_upper", SpecCamera::cowboy, 1)
        },
        ShotSpec::technical(
            "std_tech_full_front",
            TECH_FRONT_POSE,
            SpecCamera::full(SpecAngle::Front),
            AssetSides::FRONT,
        ),
        ShotSpec {
            look_at_camera: false,
            exclude_hair_info: true,
            ..ShotSpec::technical(
                "std_tech_full_back",
                TECH_BACK_POSE,
                SpecCamera::full(SpecAngle::Back),
                AssetSides::BACK,
            )
        },
        ShotSpec {
            look_at_camera: false,
            exclude_all_accessories: true,
            ..ShotSpec::technical(
                "std_tech_threequarter_front",
                THREEQUARTER_POSE,
                SpecCamera::full(SpecAngle::Angled),
                AssetSides::BOTH,
            )
        },
        ShotSpec {
            exclude_shoes_asset: true,
            ..ShotSpec::technical(
                "std_tech_upper_front",
                STD_UPPER_FRONT_POSE,
                SpecCamera::cowboy(SpecAngle::Front),
                AssetSides::FRONT,
            )
        },
        ShotSpec {
            look_at_camera: false,
            exclude_hair_info: true,
            exclude_shoes_asset: true,
            ..ShotSpec::technical(
                "std_tech_upper_back",
                STD_UPPER_BACK_POSE,
                SpecCamera::cowboy(SpecAngle::Back),
                AssetSides::BACK,
            )
        },
        ShotSpec::detail("std_detail_front", DETAIL_FRONT_POSE, SpecAngle::Front),
        ShotSpec::detail("std_detail_back", DETAIL_BACK_POSE, SpecAngle::Back),
        ShotSpec {
            hair_behind: options.hair_behind,
            exclude_shoes_asset: true,
            exclude_bag_asset: true,
            ..ShotSpec::technical(
                "std_closeup_front",
                STD_CLOSEUP_POSE,
                SpecCamera::closeup(SpecAngle::Front),
                AssetSides::FRONT,
            )
        },
    ]
}

/// Editable per-shot document. Its keys match the batch-spec override shape,
/// so an edited copy can be sent back as that shot's override.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDocument {
    pub product_name: String,
    pub product_description: Option<String>,
    pub fit_description: Option<String>,
    pub pose: String,
    pub view: &'static str,
    pub camera: SpecCamera,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look_at_camera: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hair_behind: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct PlannedShot {
    /// 1-based position within the selected shots.
    pub index: u32,
    pub title: String,
    pub spec: ShotSpec,
    pub view: View,
    pub document: PreviewDocument,
    pub request: ShootRequest,
}

fn shot_slots(base: &AssetSlots, spec: &ShotSpec, tech_accessories: &BTreeMap<String, bool>) -> AssetSlots {
    let tech_allows = |slot: &str| tech_accessories.get(slot).copied().unwrap_or(false);
    base.iter()
        .filter(|(slot, _)| {
            let slot = slot.as_str();
            if ACCESSORY_SLOTS.contains(&slot) {
                if spec.exclude_all_accessories {
                    return false;
                }
                if !spec.is_styling && !tech_allows(slot) {
                    return false;
                }
                if slot == "glasses" {
                    return spec.include_glasses || spec.is_styling || tech_allows(slot);
                }
            }
            if FRONT_SIDE_SLOTS.contains(&slot) {
                return spec.assets.front;
            }
            if BACK_SIDE_SLOTS.contains(&slot) {
                return spec.assets.back;
            }
            true
        })
        .map(|(slot, url)| (slot.clone(), url.clone()))
        .collect()
}

fn shot_request(batch: &BatchRequest, spec: &ShotSpec, index: u32, seed: u64, fit: Option<String>) -> ShootRequest {
    let base = &batch.base;
    let mut request = base.clone();

    request.uploaded_images = shot_slots(&base.uploaded_images, spec, &batch.tech_accessories);
    request.workflow_type = Some(base.effective_workflow());
    request.gender = Some(base.effective_gender());
    request.fit_description = fit;
    request.pose_description = Some(spec.pose.clone());
    request.pose_stickman = if spec.use_stickman {
        base.pose_stickman.clone()
    } else {
        None
    };
    if spec.exclude_socks_info {
        request.socks_type = Some("none".to_string());
    }
    if spec.exclude_hair_info {
        request.hair_behind_shoulders = None;
        request.look_at_camera = None;
    } else {
        request.hair_behind_shoulders = Some(spec.hair_behind);
        request.look_at_camera = Some(spec.look_at_camera);
    }
    request.enable_wind = spec.enable_wind;
    request.is_styling_shot = Some(spec.is_styling);
    request.shot_role = Some(spec.role());
    request.shot_index = Some(index);
    request.angle_id = Some(spec.view.to_string());
    request.is_angles = false;
    request.target_view = (!spec.is_styling).then(|| spec.target_view());
    request.pose_focus = spec.pose_focus();
    request.detail_view = spec.detail_view();
    request.framing = Some(spec.camera.framing.as_str().to_string());
    request.exclude_shoes_asset = spec.exclude_shoes_asset;
    request.exclude_belt_asset = spec.exclude_belt_asset || spec.exclude_all_accessories;
    request.exclude_hat_asset = spec.exclude_hat_asset || spec.exclude_all_accessories;
    request.exclude_bag_asset = spec.exclude_bag_asset || spec.exclude_all_accessories;
    request.exclude_all_accessories = spec.exclude_all_accessories;
    request.seed = Some(seed);
    request.edited_prompt = batch.edited_prompts.get(spec.view).cloned();
    request
}

pub fn preset_specs(batch: &BatchRequest, seed: u64) -> Vec<ShotSpec> {
    let base = &batch.base;
    let options = PresetOptions {
        gender: base.effective_gender(),
        hair_behind: base.hair_behind_shoulders.unwrap_or(false),
        enable_wind: base.enable_wind,
        upper_framing: batch.upper_framing,
        pose_library_prompt: non_empty(batch.pose_library_prompt.as_deref()),
        angled_pose_prompt: non_empty(batch.angled_pose_prompt.as_deref()),
        styling_side_only: &batch.styling_side_only,
        saved_poses: &batch.saved_poses,
        seed,
    };
    match batch.preset {
        BatchPreset::Catalog => {
            catalog_specs(base.effective_workflow() == WorkflowType::Upper, &options)
        }
        BatchPreset::Standard => standard_specs(&options),
    }
}

/// Expands a batch into per-shot requests sharing one seed.
pub fn plan_batch(batch: &BatchRequest, seed: u64) -> Result<Vec<PlannedShot>, CompileError> {
    let specs = preset_specs(batch, seed);

    if let Some(selection) = batch.selection.as_ref() {
        if let Some(unknown) = selection
            .iter()
            .find(|id| !specs.iter().any(|spec| spec.view == id.as_str()))
        {
            return Err(CompileError::UnknownView(unknown.clone()));
        }
    }
    let selected: Vec<ShotSpec> = specs
        .into_iter()
        .filter(|spec| {
            batch
                .selection
                .as_ref()
                .map(|ids| ids.iter().any(|id| id == spec.view))
                .unwrap_or(true)
        })
        .collect();
    if selected.is_empty() {
        return Err(CompileError::InvalidRequest(
            "batch selection is empty".to_string(),
        ));
    }

    let base = &batch.base;
    let product_code = non_empty(base.product_code.as_deref());
    let product_name = non_empty(Some(base.product_name.as_str()))
        .unwrap_or("Fashion Garment")
        .to_string();

    Ok(selected
        .into_iter()
        .enumerate()
        .map(|(position, spec)| {
            let index = position as u32 + 1;
            let title = match product_code {
                Some(code) => format!("{code}{index}"),
                None => format!("image_{index}"),
            };
            let fit = match spec.fit_mode {
                FitMode::FirstSentenceOnly => base
                    .fit_description
                    .as_deref()
                    .map(|fit| first_sentence(fit).unwrap_or_else(|| fit.trim().to_string())),
                FitMode::Full => base.fit_description.clone(),
            };
            let detail = spec.is_detail();
            let document = PreviewDocument {
                product_name: product_name.clone(),
                product_description: base.product_description.clone(),
                fit_description: fit.clone(),
                pose: spec.pose.clone(),
                view: spec.view,
                camera: spec.camera,
                look_at_camera: (!detail).then_some(spec.look_at_camera),
                hair_behind: (!detail).then_some(spec.hair_behind),
            };
            let request = shot_request(batch, &spec, index, seed, fit);
            PlannedShot {
                index,
                title,
                view: spec.compiled_view(),
                spec,
                document,
                request,
            }
        })
        .collect())
}
