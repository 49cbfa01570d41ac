use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::compiler::request::ShotRole;
use crate::compiler::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoodPreset {
    pub id: &'static str,
    pub prompt_addition: &'static str,
    pub negative_prompt_addition: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceProminence {
    Full,
    Partial,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleMeta {
    pub shot_type: ShotRole,
    pub face_prominence: FaceProminence,
}

const DEFAULT_STYLING_MOOD: &str = "natural";
const TECHNICAL_MOOD: &str = "professional";
const TECHNICAL_PARTIAL_MOOD: &str = "subtle";

static MOOD_PRESETS: Lazy<HashMap<&'static str, MoodPreset>> = Lazy::new(|| {
    let presets = [
        MoodPreset {
            id: "natural",
            prompt_addition: "Natural, relaxed expression with a soft and genuine look.",
            negative_prompt_addition: "forced smile, exaggerated expression, stiff expression",
        },
        MoodPreset {
            id: "confident",
            prompt_addition: "Confident, self-assured expression with composed posture.",
            negative_prompt_addition: "timid expression, slouching, insecure look",
        },
        MoodPreset {
            id: "joyful",
            prompt_addition: "Joyful expression with a light, authentic smile.",
            negative_prompt_addition: "sad expression, frown, gloomy mood",
        },
        MoodPreset {
            id: "serene",
            prompt_addition: "Serene, calm expression with peaceful, soft features.",
            negative_prompt_addition: "tense expression, agitated look, harsh mood",
        },
        MoodPreset {
            id: "editorial",
            prompt_addition: "High-fashion editorial attitude with a strong, intentional expression.",
            negative_prompt_addition: "casual snapshot look, goofy expression, awkward smile",
        },
        MoodPreset {
            id: "professional",
            prompt_addition: "Neutral, professional catalog expression.",
            negative_prompt_addition: "exaggerated expression, laughing, grimace, playful pose",
        },
        MoodPreset {
            id: "subtle",
            prompt_addition: "Subtle, neutral expression with relaxed features.",
            negative_prompt_addition: "strong expression, open mouth, exaggerated emotion",
        },
    ];
    presets.into_iter().map(|preset| (preset.id, preset)).collect()
});

static ANGLE_METADATA: Lazy<HashMap<&'static str, AngleMeta>> = Lazy::new(|| {
    use FaceProminence as F;
    use ShotRole as R;

    let entries: [(&'static str, ShotRole, FaceProminence); 23] = [
        ("styling_front", R::Styling, F::Full),
        ("styling_angled", R::Styling, F::Partial),
        ("styling_front_2", R::Styling, F::Full),
        ("technical_front", R::Technical, F::Full),
        ("technical_side", R::Technical, F::Partial),
        ("technical_back", R::Technical, F::None),
        ("technical_threequarter_front", R::Technical, F::Partial),
        ("detail_front", R::Technical, F::None),
        ("detail_angled", R::Technical, F::None),
        ("detail_back", R::Technical, F::None),
        ("closeup_front", R::Technical, F::Full),
        ("std_styling_full", R::Styling, F::Full),
        ("std_styling_upper", R::Styling, F::Full),
        ("std_tech_full_front", R::Technical, F::Full),
        ("std_tech_full_back", R::Technical, F::None),
        ("std_tech_threequarter_front", R::Technical, F::Partial),
        ("std_tech_upper_front", R::Technical, F::Full),
        ("std_tech_upper_back", R::Technical, F::None),
        ("std_detail_front", R::Technical, F::None),
        ("std_detail_back", R::Technical, F::None),
        ("std_closeup_front", R::Technical, F::Full),
        ("closeup_back", R::Technical, F::None),
        ("styling_back", R::Styling, F::None),
    ];
    entries
        .into_iter()
        .map(|(id, shot_type, face_prominence)| {
            (
                id,
                AngleMeta {
                    shot_type,
                    face_prominence,
                },
            )
        })
        .collect()
});

pub fn mood_preset(id: &str) -> Option<&'static MoodPreset> {
    MOOD_PRESETS.get(id.trim().to_lowercase().as_str())
}

pub fn angle_metadata(angle_id: &str) -> Option<AngleMeta> {
    ANGLE_METADATA.get(angle_id.trim()).copied()
}

/// Angle id used when the caller does not send one.
pub fn synthesize_angle_id(view: View) -> String {
    match view {
        View::Styling => "styling_front".to_string(),
        View::Front => "technical_front".to_string(),
        View::Side => "technical_side".to_string(),
        View::Back => "technical_back".to_string(),
        View::Detail(detail) => format!("detail_{}", detail.as_str()),
    }
}

/// Metadata for a known angle id, or an approximation built from the shot role
/// for unknown ids (`back`/`detail` in the id mean no visible face).
pub fn effective_angle(angle_id: Option<&str>, shot_role: Option<ShotRole>) -> AngleMeta {
    if let Some(meta) = angle_id.and_then(angle_metadata) {
        return meta;
    }

    let lowered = angle_id.unwrap_or_default().to_lowercase();
    let face_prominence = if lowered.contains("back") || lowered.contains("detail") {
        FaceProminence::None
    } else if lowered.contains("threequarter") || lowered.contains("side") {
        FaceProminence::Partial
    } else {
        FaceProminence::Full
    };
    AngleMeta {
        shot_type: shot_role.unwrap_or(ShotRole::Styling),
        face_prominence,
    }
}

pub fn resolve_mood(
    angle_id: Option<&str>,
    user_mood_id: Option<&str>,
    shot_role: Option<ShotRole>,
) -> Option<&'static MoodPreset> {
    let meta = effective_angle(angle_id, shot_role);
    match (meta.face_prominence, meta.shot_type) {
        (FaceProminence::None, _) => None,
        (FaceProminence::Partial, ShotRole::Technical) => mood_preset(TECHNICAL_PARTIAL_MOOD),
        (FaceProminence::Full, ShotRole::Technical) => mood_preset(TECHNICAL_MOOD),
        (_, ShotRole::Styling) => user_mood_id
            .and_then(mood_preset)
            .or_else(|| mood_preset(DEFAULT_STYLING_MOOD)),
    }
}

pub fn is_face_absent(angle_id: Option<&str>, shot_role: Option<ShotRole>) -> bool {
    effective_angle(angle_id, shot_role).face_prominence == FaceProminence::None
}
