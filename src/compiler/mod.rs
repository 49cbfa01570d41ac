//! Photoshoot request compiler: request in, one prompt/negative/asset record
//! per requested view out. Everything here is synchronous and pure.

pub mod assets;
pub mod batch;
pub mod enrich;
pub mod mood;
pub mod negative;
pub mod overrides;
pub mod request;
pub mod structured;
pub mod text;
pub mod visibility;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::compiler::assets::{build_asset_list, AssetPlan, Exclusions};
use crate::compiler::mood::{is_face_absent, resolve_mood, synthesize_angle_id};
use crate::compiler::negative::NegativeContext;
use crate::compiler::request::{
    DetailView, Gender, PoseFocus, ShootRequest, ShotRole, TargetView, WorkflowType,
};
use crate::compiler::structured::StructuredPrompt;
use crate::compiler::text::TextContext;
use crate::utils::text::{non_empty, truncate_for_log};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unrecognized framing value: {0}")]
    UnrecognizedFraming(String),
    #[error("unknown view: {0}")]
    UnknownView(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Styling,
    Front,
    Side,
    Back,
    Detail(DetailView),
}

impl View {
    pub fn id(&self) -> &'static str {
        match self {
            View::Styling => "styling",
            View::Front => "front",
            View::Side => "side",
            View::Back => "back",
            View::Detail(DetailView::Front) => "detail_front",
            View::Detail(DetailView::Angled) => "detail_angled",
            View::Detail(DetailView::Back) => "detail_back",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Styling => "Styling Shot",
            View::Front => "Front View",
            View::Side => "Side View",
            View::Back => "Back View",
            View::Detail(DetailView::Front) => "Detail (FRONT)",
            View::Detail(DetailView::Angled) => "Detail (ANGLED)",
            View::Detail(DetailView::Back) => "Detail (BACK)",
        }
    }

    pub fn is_back(&self) -> bool {
        matches!(self, View::Back | View::Detail(DetailView::Back))
    }
}

impl From<TargetView> for View {
    fn from(target: TargetView) -> Self {
        match target {
            TargetView::Styling => View::Styling,
            TargetView::Front => View::Front,
            TargetView::Side => View::Side,
            TargetView::Back => View::Back,
        }
    }
}

impl Serialize for View {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// Per-view facts resolved once and shared by every builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotContext {
    pub view: View,
    pub role: ShotRole,
    pub workflow: WorkflowType,
    pub gender: Gender,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledView {
    pub view: View,
    pub title: &'static str,
    pub shot_role: ShotRole,
    pub prompt: String,
    pub negative_prompt: String,
    pub input_images: Vec<String>,
    pub structured: StructuredPrompt,
}

/// Views a single request asks for, in output order.
pub fn plan_views(request: &ShootRequest) -> Vec<View> {
    if request.pose_focus == PoseFocus::Detail {
        return vec![View::Detail(request.detail_view)];
    }
    if let Some(target) = request.target_view {
        return vec![View::from(target)];
    }
    if request.is_angles {
        return vec![View::Front, View::Side, View::Back];
    }
    vec![View::Styling]
}

/// Technical unless this is the freely posed hero shot. For the styling view
/// the legacy flag precedence applies: explicit role, styling flag, angle set,
/// closeup/detail focus, then technical-looking angle ids.
pub fn resolve_role(request: &ShootRequest, view: View) -> ShotRole {
    if view != View::Styling {
        return ShotRole::Technical;
    }
    if let Some(role) = request.shot_role {
        return role;
    }
    if let Some(is_styling) = request.is_styling_shot {
        return if is_styling {
            ShotRole::Styling
        } else {
            ShotRole::Technical
        };
    }
    if request.is_angles {
        return ShotRole::Technical;
    }
    if matches!(request.pose_focus, PoseFocus::Closeup | PoseFocus::Detail) {
        return ShotRole::Technical;
    }
    let technical_angle = non_empty(request.angle_id.as_deref())
        .map(|id| {
            let lowered = id.to_lowercase();
            ["tech", "detail", "closeup"]
                .iter()
                .any(|marker| lowered.contains(marker))
        })
        .unwrap_or(false);
    if technical_angle {
        ShotRole::Technical
    } else {
        ShotRole::Styling
    }
}

pub fn compile_view(request: &ShootRequest, view: View) -> Result<CompiledView, CompileError> {
    let explicit_framing = request.explicit_framing()?;
    let shot = ShotContext {
        view,
        role: resolve_role(request, view),
        workflow: request.effective_workflow(),
        gender: request.effective_gender(),
    };

    let structured = structured::build(request, &shot)?;

    let angle_id = non_empty(request.angle_id.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| synthesize_angle_id(view));
    let mood = if request.expression_enabled() {
        resolve_mood(Some(angle_id.as_str()), request.mood_id.as_deref(), Some(shot.role))
    } else {
        None
    };

    let prompt = text::compile(
        &structured,
        &TextContext {
            view,
            mood,
            lighting_positive: non_empty(request.lighting_positive.as_deref()),
            free_text: non_empty(request.prompt.as_deref()),
        },
    );
    let negative_prompt = negative::compose(
        &structured,
        &NegativeContext {
            view,
            role: shot.role,
            face_absent: is_face_absent(Some(angle_id.as_str()), Some(shot.role)),
            mood,
            lighting_negative: non_empty(request.lighting_negative.as_deref()),
        },
    );
    let input_images = build_asset_list(&AssetPlan {
        view,
        slots: &request.uploaded_images,
        pose_focus: request.pose_focus,
        workflow: shot.workflow,
        role: shot.role,
        shot_index: request.shot_index,
        explicit_framing,
        angle_id: non_empty(request.angle_id.as_deref()),
        stickman: request.stickman(),
        exclusions: Exclusions::from_request(request),
    });

    debug!(
        target: "shoot.compiler",
        view = view.id(),
        role = shot.role.as_str(),
        framing = structured.camera.framing.as_str(),
        assets = input_images.len(),
        "compiled view: {}",
        truncate_for_log(&prompt, 240)
    );

    Ok(CompiledView {
        view,
        title: view.label(),
        shot_role: shot.role,
        prompt,
        negative_prompt,
        input_images,
        structured,
    })
}

pub fn compile_request(request: &ShootRequest) -> Result<Vec<CompiledView>, CompileError> {
    plan_views(request)
        .into_iter()
        .map(|view| compile_view(request, view))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::negative::{fragment, Fragment};
    use crate::compiler::visibility::Framing;

    const SHOE_URL: &str = "http://x/shoe.png";

    fn request() -> ShootRequest {
        let mut request = ShootRequest {
            product_name: "Kadın Pileli Pantolon".to_string(),
            product_description: Some("Soft wool blend with a fine twill weave.".to_string()),
            fit_description: Some("High-waisted, floor-length wide leg.".to_string()),
            ..Default::default()
        };
        for (slot, url) in [
            ("model", "http://x/model.png"),
            ("bottom_front", "http://x/bottom_front.png"),
            ("bottom_back", "http://x/bottom_back.png"),
            ("shoes", SHOE_URL),
            ("pose", "http://x/raw_pose.png"),
            ("background", "ftp://x/background.png"),
        ] {
            request.uploaded_images.insert(slot.to_string(), url.to_string());
        }
        request
    }

    #[test]
    fn plans_views_from_focus_target_and_angles() {
        let mut req = request();
        assert_eq!(plan_views(&req), vec![View::Styling]);

        req.is_angles = true;
        assert_eq!(plan_views(&req), vec![View::Front, View::Side, View::Back]);

        req.target_view = Some(TargetView::Back);
        assert_eq!(plan_views(&req), vec![View::Back]);

        req.pose_focus = PoseFocus::Detail;
        req.detail_view = DetailView::Angled;
        assert_eq!(plan_views(&req), vec![View::Detail(DetailView::Angled)]);
    }

    #[test]
    fn role_precedence_for_styling_view() {
        let mut req = request();
        assert_eq!(resolve_role(&req, View::Styling), ShotRole::Styling);
        assert_eq!(resolve_role(&req, View::Front), ShotRole::Technical);

        req.angle_id = Some("std_tech_full_front".to_string());
        assert_eq!(resolve_role(&req, View::Styling), ShotRole::Technical);

        req.is_styling_shot = Some(true);
        assert_eq!(resolve_role(&req, View::Styling), ShotRole::Styling);

        req.shot_role = Some(ShotRole::Technical);
        assert_eq!(resolve_role(&req, View::Styling), ShotRole::Technical);
    }

    #[test]
    fn detail_focus_suppresses_person_channels() {
        let mut req = request();
        req.pose_focus = PoseFocus::Detail;
        req.detail_view = DetailView::Front;
        req.hair_behind_shoulders = Some(true);
        req.look_at_camera = Some(true);
        req.framing = Some("head_to_toe".to_string());

        let views = compile_request(&req).expect("compile");
        assert_eq!(views.len(), 1);
        let compiled = &views[0];
        assert_eq!(compiled.structured.camera.framing, Framing::WaistToAboveKnees);

        let value = serde_json::to_value(&compiled.structured).expect("serialize");
        let subject = value["subject"].as_object().expect("subject");
        assert!(!subject.contains_key("hair_behind_shoulders"));
        assert!(!subject.contains_key("look_at_camera"));
        assert!(value["accessories"]["shoes"].is_null());
        assert!(!compiled.input_images.contains(&SHOE_URL.to_string()));
    }

    #[test]
    fn back_views_exclude_face_language_and_carry_anti_logo() {
        let mut req = request();
        req.prompt = Some("Model looking at camera with a calm face.".to_string());
        req.look_at_camera = Some(true);
        for view in [View::Back, View::Detail(DetailView::Back)] {
            let compiled = compile_view(&req, view).expect("compile");
            let lowered = compiled.prompt.to_lowercase();
            assert!(!lowered.contains("face"), "{}", compiled.prompt);
            assert!(!lowered.contains("looking at camera"));
            assert!(compiled
                .negative_prompt
                .contains(fragment(Fragment::BackLogo)));
        }
    }

    #[test]
    fn compiling_twice_is_byte_identical() {
        let mut req = request();
        req.seed = Some(42);
        req.is_angles = true;
        let first = compile_request(&req).expect("compile");
        let second = compile_request(&req).expect("compile");
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.prompt, b.prompt);
            assert_eq!(a.negative_prompt, b.negative_prompt);
            assert_eq!(a.input_images, b.input_images);
        }
    }

    #[test]
    fn canonical_override_disables_enrichment() {
        let mut req = request();
        req.product_name = "Slim Jean".to_string();
        req.product_description = Some("Rigid cotton twill. Texture: undefined.".to_string());
        req.edited_prompt = Some(
            r#"{"intent": "Fashion e-commerce photography", "garment": {"name": "Slim Jean", "type": "lower", "fabric": "Rigid cotton twill. Texture: undefined."}}"#
                .to_string(),
        );
        let compiled = compile_view(&req, View::Styling).expect("compile");
        assert!(compiled.structured.is_user_edited);
        assert!(compiled.prompt.contains("Rigid cotton twill. Texture: undefined."));
        assert!(!compiled.prompt.contains("denim"));
    }

    #[test]
    fn framing_decides_shoe_visibility() {
        let mut req = request();
        req.framing = Some("cowboy_shot".to_string());
        let cowboy = compile_view(&req, View::Styling).expect("compile");
        assert!(cowboy.structured.accessories.shoes.is_none());
        assert!(!cowboy.input_images.contains(&SHOE_URL.to_string()));

        req.framing = Some("head_to_toe".to_string());
        let full = compile_view(&req, View::Styling).expect("compile");
        assert!(full.structured.accessories.shoes.is_some());
        assert!(full.input_images.contains(&SHOE_URL.to_string()));
        assert!(full.negative_prompt.contains("clown shoes"));
    }

    #[test]
    fn first_upper_styling_shot_drops_shoes() {
        let mut req = request();
        req.product_name = "Oxford Shirt".to_string();
        req.workflow_type = Some(WorkflowType::Upper);
        req.pose_focus = PoseFocus::Upper;
        req.shot_index = Some(1);
        let first = compile_view(&req, View::Styling).expect("compile");
        assert!(!first.input_images.contains(&SHOE_URL.to_string()));
        assert!(!first.negative_prompt.contains("clown shoes"));

        req.shot_index = Some(2);
        let second = compile_view(&req, View::Styling).expect("compile");
        assert!(second.input_images.contains(&SHOE_URL.to_string()));
    }

    #[test]
    fn raw_pose_and_non_http_slots_never_ship() {
        let compiled = compile_view(&request(), View::Styling).expect("compile");
        assert!(!compiled.input_images.iter().any(|url| url.contains("raw_pose")));
        assert!(!compiled.input_images.iter().any(|url| url.starts_with("ftp")));
        assert_eq!(compiled.input_images[0], "http://x/model.png");
    }

    #[test]
    fn unknown_framing_is_fatal() {
        let mut req = request();
        req.framing = Some("waist_up".to_string());
        assert!(matches!(
            compile_request(&req),
            Err(CompileError::UnrecognizedFraming(_))
        ));
    }
}
