use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::compiler::mood::MoodPreset;
use crate::compiler::request::{ClosureType, ShotRole, WorkflowType};
use crate::compiler::structured::{ButtonsState, StructuredPrompt, TuckState};
use crate::compiler::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    Shoes,
    Tucked,
    Untucked,
    Buttons,
    FlatFabric,
    Equipment,
    Cropping,
    Wind,
    TechnicalDistortion,
    BackLogo,
    BackFace,
    SymmetricFace,
}

static FRAGMENTS: Lazy<HashMap<Fragment, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            Fragment::Shoes,
            "oversized shoes, chunky shoes, large footwear, clown shoes, big shoes, thick soles, platform shoes, bulky sneakers, exaggerated footwear, disproportionate shoes, cartoon shoes, huge feet, giant shoes, massive sneakers, wide shoes, puffy shoes, oversized feet, unrealistic shoe size, shoes too big for body, exaggerated shoe proportions",
        ),
        (
            Fragment::Tucked,
            "tucked in shirt, shirt inside pants, waistband visible, belt visible, partial tuck, front tuck, half tuck, shirt in waistband, any part of shirt inside pants",
        ),
        (
            Fragment::Untucked,
            "untucked shirt, shirt hanging out, loose shirt over waistband, shirt draping over pants",
        ),
        (
            Fragment::Buttons,
            "open shirt, unbuttoned, open front, chest visible",
        ),
        (
            Fragment::FlatFabric,
            "flat fabric, smooth texture, plain surface, digital print look, no texture, solid color fabric, printed stripes, screen print, no weave visible, uniform surface, plastic looking fabric",
        ),
        (
            Fragment::Equipment,
            "studio equipment, light stands, softboxes, tripods, cables, photographer, camera visible in frame",
        ),
        (
            Fragment::Cropping,
            "cropped head, cut off head, missing head, partial face, close up, zoomed in, out of frame, cropped feet, missing shoes",
        ),
        (
            Fragment::Wind,
            "static hair, stiff fabric, motionless clothing",
        ),
        (
            Fragment::TechnicalDistortion,
            "dynamic pose, tilted body, leaning, crossed legs, hands on hips, exaggerated gesture, distorted proportions, fisheye lens, wide angle distortion",
        ),
        (
            Fragment::BackLogo,
            "front logo visible, mirrored print, front graphics on back, logo bleeding through",
        ),
        (
            Fragment::BackFace,
            "face visible, looking at camera, eye contact, frontal face, head turned to camera",
        ),
        (
            Fragment::SymmetricFace,
            "asymmetric eyes, distorted face, deformed facial features, uneven eyes, warped face",
        ),
    ])
});

pub fn fragment(kind: Fragment) -> &'static str {
    FRAGMENTS.get(&kind).copied().unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
pub struct NegativeContext<'a> {
    pub view: View,
    pub role: ShotRole,
    pub face_absent: bool,
    pub mood: Option<&'static MoodPreset>,
    pub lighting_negative: Option<&'a str>,
}

pub fn compose(prompt: &StructuredPrompt, ctx: &NegativeContext<'_>) -> String {
    let mut kinds = Vec::new();

    if prompt.accessories.shoes.is_some() {
        kinds.push(Fragment::Shoes);
    }
    kinds.push(match prompt.styling.tuck {
        TuckState::Tucked => Fragment::Untucked,
        TuckState::Untucked => Fragment::Tucked,
    });
    if prompt.styling.buttons == ButtonsState::Closed && prompt.garment.closure == ClosureType::Buttons {
        kinds.push(Fragment::Buttons);
    }
    kinds.push(Fragment::FlatFabric);
    kinds.push(Fragment::Equipment);
    if prompt.garment.workflow != WorkflowType::Upper {
        kinds.push(Fragment::Cropping);
    }
    if prompt.subject.wind_effect {
        kinds.push(Fragment::Wind);
    }
    if ctx.role == ShotRole::Technical {
        kinds.push(Fragment::TechnicalDistortion);
    }
    let back = ctx.view.is_back();
    if back {
        kinds.push(Fragment::BackLogo);
        kinds.push(Fragment::BackFace);
    }
    if !back && !matches!(ctx.view, View::Detail(_)) && !ctx.face_absent {
        kinds.push(Fragment::SymmetricFace);
    }

    let mut parts: Vec<&str> = kinds.into_iter().map(fragment).collect();
    if let Some(mood) = ctx.mood {
        parts.push(mood.negative_prompt_addition);
    }
    if let Some(lighting) = ctx.lighting_negative.map(str::trim).filter(|value| !value.is_empty()) {
        parts.push(lighting);
    }
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::request::DetailView;
    use crate::compiler::structured::Shoes;

    fn ctx(view: View, role: ShotRole) -> NegativeContext<'static> {
        NegativeContext {
            view,
            role,
            face_absent: false,
            mood: None,
            lighting_negative: None,
        }
    }

    #[test]
    fn every_fragment_is_configured() {
        for kind in [
            Fragment::Shoes,
            Fragment::Tucked,
            Fragment::Untucked,
            Fragment::Buttons,
            Fragment::FlatFabric,
            Fragment::Equipment,
            Fragment::Cropping,
            Fragment::Wind,
            Fragment::TechnicalDistortion,
            Fragment::BackLogo,
            Fragment::BackFace,
            Fragment::SymmetricFace,
        ] {
            assert!(!fragment(kind).is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn shoe_fragment_follows_structured_shoes() {
        let mut prompt = StructuredPrompt::default();
        let without = compose(&prompt, &ctx(View::Styling, ShotRole::Styling));
        assert!(!without.contains("clown shoes"));

        prompt.accessories.shoes = Some(Shoes {
            style: "slim".to_string(),
            size: "small".to_string(),
            description: None,
        });
        let with = compose(&prompt, &ctx(View::Styling, ShotRole::Styling));
        assert!(with.starts_with("oversized shoes"));
    }

    #[test]
    fn tuck_state_selects_opposite_fragment() {
        let mut prompt = StructuredPrompt::default();
        prompt.styling.tuck = TuckState::Tucked;
        let tucked = compose(&prompt, &ctx(View::Front, ShotRole::Technical));
        assert!(tucked.contains("untucked shirt"));
        assert!(!tucked.contains("tucked in shirt"));
    }

    #[test]
    fn back_view_gets_logo_and_gaze_fragments_but_no_face_symmetry() {
        let prompt = StructuredPrompt::default();
        let back = compose(&prompt, &ctx(View::Back, ShotRole::Technical));
        assert!(back.contains(fragment(Fragment::BackLogo)));
        assert!(back.contains("eye contact"));
        assert!(!back.contains(fragment(Fragment::SymmetricFace)));

        let detail_back = compose(&prompt, &ctx(View::Detail(DetailView::Back), ShotRole::Technical));
        assert!(detail_back.contains(fragment(Fragment::BackLogo)));

        let front = compose(&prompt, &ctx(View::Front, ShotRole::Technical));
        assert!(front.contains(fragment(Fragment::SymmetricFace)));
        assert!(front.contains(fragment(Fragment::TechnicalDistortion)));
    }

    #[test]
    fn cropping_skipped_for_upper_and_lighting_negative_last() {
        let mut prompt = StructuredPrompt::default();
        prompt.garment.workflow = WorkflowType::Upper;
        let upper = compose(
            &prompt,
            &NegativeContext {
                lighting_negative: Some("harsh shadows"),
                ..ctx(View::Styling, ShotRole::Styling)
            },
        );
        assert!(!upper.contains("cropped head"));
        assert!(upper.ends_with("harsh shadows"));

        prompt.garment.workflow = WorkflowType::Lower;
        let lower = compose(&prompt, &ctx(View::Styling, ShotRole::Styling));
        assert!(lower.contains("cropped head"));
    }
}
