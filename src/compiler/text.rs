//! Renders a structured record into the positive prompt. Every block reads
//! its visibility from `camera.framing` and nothing else.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compiler::assets::{Accessory, ACCESSORIES};
use crate::compiler::mood::MoodPreset;
use crate::compiler::request::{ClosureType, DetailView, WorkflowType};
use crate::compiler::structured::{
    BackgroundMode, ButtonsState, GarmentDetails, ModelType, StructuredPrompt, TuckState,
};
use crate::compiler::visibility::{resolve, DetailField, Framing, Visibility, DETAIL_FIELDS};
use crate::compiler::View;
use crate::utils::text::{ensure_terminal_period, normalize_whitespace, split_sentences};

const DEFAULT_LIGHTING: &str = "Soft, even studio lighting with gentle shadows.";
const DETAIL_PRESERVATION: &str =
    "Detail Preservation: Maximize label legibility, exact stitching transfer. Hallucination strictly disallowed.";

static BACK_SCRUB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)face|looking at (?:the )?camera|eye contact").expect("valid back scrub regex")
});

/// Alternate-language accessory hints and their canonical English terms.
static TERM_TRANSLATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"güneş\s+gözlü\w*", "sunglasses"),
        (r"gözlü\w*", "glasses"),
        (r"kemer\w*", "belt"),
        (r"şapka\w*", "hat"),
        (r"çanta\w*", "bag"),
        (r"kolye\w*", "necklace"),
        (r"küpe\w*", "earrings"),
        (r"bileklik\w*", "bracelet"),
        (r"takı\w*", "jewelry"),
        (r"siyah\w*", "black"),
        (r"beyaz\w*", "white"),
        (r"kahverengi\w*", "brown"),
        (r"altın\w*", "gold"),
        (r"gümüş\w*", "silver"),
        (r"deri(?:si|den)?\b", "leather"),
    ]
    .into_iter()
    .map(|(pattern, english)| {
        let regex = Regex::new(&format!(r"(?i)\b{pattern}")).expect("valid translation regex");
        (regex, english)
    })
    .collect()
});

static ACCESSORY_MENTIONS: Lazy<Vec<(Regex, Accessory)>> = Lazy::new(|| {
    [
        (r"(?i)\bbelts?\b", Accessory::Belt),
        (r"(?i)\b(?:hat|cap|beanie)s?\b", Accessory::Hat),
        (r"(?i)\b(?:sun)?glasses\b", Accessory::Glasses),
        (r"(?i)\b(?:bag|handbag|purse)s?\b", Accessory::Bag),
        (
            r"(?i)\b(?:necklace|earring|bracelet|jewelry|jewellery)s?\b",
            Accessory::Jewelry,
        ),
    ]
    .into_iter()
    .map(|(pattern, accessory)| {
        (
            Regex::new(pattern).expect("valid accessory regex"),
            accessory,
        )
    })
    .collect()
});

/// Inputs to the text compiler that live outside the structured record.
#[derive(Debug, Clone, Copy)]
pub struct TextContext<'a> {
    pub view: View,
    pub mood: Option<&'static MoodPreset>,
    pub lighting_positive: Option<&'a str>,
    pub free_text: Option<&'a str>,
}

pub fn translate_accessory_terms(text: &str) -> String {
    TERM_TRANSLATIONS
        .iter()
        .fold(text.to_string(), |acc, (regex, english)| {
            regex.replace_all(&acc, *english).into_owned()
        })
}

fn mentioned_accessories(sentence: &str) -> Vec<Accessory> {
    ACCESSORY_MENTIONS
        .iter()
        .filter(|(regex, _)| regex.is_match(sentence))
        .map(|(_, accessory)| *accessory)
        .collect()
}

/// Splits caller free text into accessory sentences for present accessories
/// and everything else. Sentences about absent accessories are dropped.
fn partition_free_text(text: Option<&str>, prompt: &StructuredPrompt) -> (Vec<String>, Vec<String>) {
    let mut accessory_sentences = Vec::new();
    let mut remainder = Vec::new();
    let Some(text) = text else {
        return (accessory_sentences, remainder);
    };

    for sentence in split_sentences(&translate_accessory_terms(text)) {
        let mentioned = mentioned_accessories(&sentence);
        if mentioned.is_empty() {
            remainder.push(sentence);
        } else if mentioned
            .iter()
            .any(|accessory| prompt.accessories.present(*accessory))
        {
            accessory_sentences.push(ensure_terminal_period(&sentence));
        }
    }
    (accessory_sentences, remainder)
}

fn detail_value(details: &GarmentDetails, field: DetailField) -> Option<&str> {
    match field {
        DetailField::Collar => details.collar.as_deref(),
        DetailField::Shoulder => details.shoulder.as_deref(),
        DetailField::Waist => details.waist.as_deref(),
        DetailField::Rise => details.rise.as_deref(),
        DetailField::LegStyle => details.leg_style.as_deref(),
        DetailField::Hem => details.hem.as_deref(),
    }
}

fn length_constraint(fit: &str) -> Option<&'static str> {
    let lowered = fit.to_lowercase();
    if lowered.contains("floor-length") {
        Some("LENGTH CONSTRAINT: The pants MUST touch the floor and cover the shoes entirely. Long pooling hem.")
    } else if lowered.contains("full-length") {
        Some("LENGTH CONSTRAINT: The pants MUST hit the floor exactly. Full length silhouette.")
    } else if lowered.contains("ankle-length") {
        Some("LENGTH CONSTRAINT: The hem MUST end precisely at the ankle bone. DO NOT extend to the floor. Visible gap between hem and shoes.")
    } else if lowered.contains("cropped") {
        Some("LENGTH CONSTRAINT: Cropped fit. The hem is 3 inches above the ankle. High-water style. Clear visibility of ankles and socks/shoes.")
    } else if lowered.contains("culotte") {
        Some("LENGTH CONSTRAINT: Mid-calf length. Wide leg opening ending halfway down the shin.")
    } else {
        None
    }
}

fn detail_view_line(detail: DetailView) -> &'static str {
    match detail {
        DetailView::Angled => "View: Angled (Canonical). Rotation: Slight 10-20 degrees vertical axis. Camera facing bias: front_faces_camera_left. Keep full visibility.",
        DetailView::Back => "View: Back. Camera Angle: Eye Level. Lighting: Soft Diffused Studio.",
        DetailView::Front => "View: Front. Camera Angle: Eye Level. Lighting: Soft Diffused Studio.",
    }
}

fn framing_block(prompt: &StructuredPrompt, view: View) -> Vec<String> {
    let back = view.is_back();
    let mut parts = vec!["Medium format fashion photography.".to_string()];
    let framing = match prompt.camera.framing {
        Framing::HeadToToe if back => "FULL BODY BACK VIEW. Head, torso, legs and feet fully visible from behind. Do not crop head. Do not crop feet.",
        Framing::HeadToToe => "Camera framing is full body, head to toe visible.",
        Framing::CowboyShot if back => "Cowboy Shot framing from behind (Head to Mid-Thigh). Camera cuts off at thigh level. DO NOT show full legs or shoes.",
        Framing::CowboyShot => "Camera framing is Cowboy Shot (Head to Mid-Thigh). Hands fully visible.",
        Framing::ChestAndFace if back => "Camera framing is a close-up of the upper back and shoulders, focusing on upper garment details.",
        Framing::ChestAndFace => "Camera framing is close-up on chest and face, focusing on upper garment details.",
        Framing::WaistToAboveKnees => "Detail shot. Framing: Waist to Above Knees (Lower Body Detail). Focus on garment construction and fabric.",
    };
    parts.push(framing.to_string());
    if !matches!(view, View::Styling | View::Detail(_)) {
        parts.push(format!("Technical {} reference shot.", view.label().to_lowercase()));
    }
    parts
}

fn identity_block(prompt: &StructuredPrompt, visibility: &Visibility) -> Vec<String> {
    let subject = &prompt.subject;
    let mut parts = Vec::new();
    match subject.body.as_deref() {
        Some(body) => {
            parts.push(format!(
                "A professional {} is posing wearing {}.",
                subject.model_type.label(),
                prompt.garment.name
            ));
            parts.push(ensure_terminal_period(body));
        }
        None => {
            let (height, shoe_size) = match subject.model_type {
                ModelType::Male => ("190cm tall", "EU size 43"),
                ModelType::Female | ModelType::Generic => ("175cm tall", "EU size 38"),
            };
            let measurements = if visibility.can_show_footwear {
                format!("{height}, wearing {shoe_size} shoes")
            } else {
                height.to_string()
            };
            parts.push(format!(
                "A professional {} ({measurements}) is posing wearing {}.",
                subject.model_type.label(),
                prompt.garment.name
            ));
        }
    }
    parts.push("Realistic body proportions.".to_string());
    if subject.identity_locked {
        parts.push(
            "Model identity and body must strictly match the provided model reference image."
                .to_string(),
        );
    }
    parts
}

fn product_block(prompt: &StructuredPrompt, visibility: &Visibility) -> Vec<String> {
    let garment = &prompt.garment;
    let mut parts = vec![format!("LOCKED PRODUCT: {}.", garment.name)];

    match garment.fabric.as_deref() {
        Some(fabric) => {
            parts.push("FABRIC TEXTURE (CRITICAL, MUST MATCH REFERENCE IMAGE EXACTLY):".to_string());
            parts.push(ensure_terminal_period(fabric));
            parts.push(
                "The fabric must show realistic textile structure with visible thread texture and material depth. DO NOT render as a flat digital print."
                    .to_string(),
            );
        }
        None => parts.push(
            "Fabric should show realistic textile texture with visible weave and material depth, not a flat printed look."
                .to_string(),
        ),
    }

    if let Some(fit) = garment.fit.as_deref() {
        parts.push(format!("FIT & SILHOUETTE (CRITICAL): {}", ensure_terminal_period(fit)));
        if visibility.can_show_leg_hem {
            if let Some(constraint) = length_constraint(fit) {
                parts.push(constraint.to_string());
            }
        }
        parts.push("Maintain these exact proportions relative to the model's height.".to_string());
    }

    if visibility.can_show_collar_hair_buttons && garment.workflow != WorkflowType::Lower {
        let closure = match (garment.closure, prompt.styling.buttons) {
            (ClosureType::Buttons, ButtonsState::Closed) => Some(
                "Buttons: CLOSED. The garment is FULLY BUTTONED UP. Front opening is closed.",
            ),
            (ClosureType::Buttons, ButtonsState::Open) => {
                Some("The garment is worn open with the buttons undone.")
            }
            (ClosureType::Zipper, ButtonsState::Closed) => {
                Some("Zipper: CLOSED, pulled all the way up.")
            }
            (ClosureType::Zipper, ButtonsState::Open) => Some("The zipper is worn open."),
            (ClosureType::None, _) => None,
        };
        if let Some(closure) = closure {
            parts.push(closure.to_string());
        }
    }

    for field in DETAIL_FIELDS {
        if !field.enabled(garment.workflow, visibility) {
            continue;
        }
        if let Some(value) = detail_value(&garment.details, field) {
            parts.push(format!("{}: {}", field.label(), ensure_terminal_period(value)));
        }
    }

    if visibility.can_show_waist_fit && garment.workflow != WorkflowType::Dress {
        let tuck = match prompt.styling.tuck {
            TuckState::Tucked => "TUCKED IN: The top is tightly tucked into the waistband. Waistband fully visible. No fabric draping over the waist.",
            TuckState::Untucked => "UNTUCKED: The top hangs loose over the waistband. No part of the top is tucked in.",
        };
        parts.push(tuck.to_string());
    }
    parts
}

fn accessory_block(prompt: &StructuredPrompt, accessory_sentences: Vec<String>) -> Vec<String> {
    let mut parts: Vec<String> = ACCESSORIES
        .iter()
        .filter(|accessory| prompt.accessories.present(**accessory))
        .map(|accessory| {
            format!(
                "Wearing the {} shown in the provided {} reference image.",
                accessory.slot(),
                accessory.slot()
            )
        })
        .collect();
    parts.extend(accessory_sentences);
    parts
}

fn pose_block(prompt: &StructuredPrompt, view: View) -> Vec<String> {
    let pose = &prompt.pose;
    let mut parts = Vec::new();

    let label = match view {
        View::Detail(detail) => {
            parts.push(detail_view_line(detail).to_string());
            parts.push(DETAIL_PRESERVATION.to_string());
            return parts;
        }
        View::Styling => "View: Styling hero shot.",
        View::Front => "View: Front. Camera Angle: Eye Level.",
        View::Side => "View: Side profile. Camera Angle: Eye Level.",
        View::Back => "View: Back. Camera Angle: Eye Level. The model stands with the back to the camera.",
    };
    parts.push(label.to_string());

    if let Some(posture) = pose.posture.as_deref() {
        parts.push(format!("POSTURE: {}", ensure_terminal_period(posture)));
    } else if let Some(description) = pose.description.as_deref() {
        parts.push(format!("POSE INSTRUCTION: {}", ensure_terminal_period(description)));
    } else {
        let filler = match (pose.dynamic, view.is_back()) {
            (true, false) => "Dynamic fashion pose, relaxed and natural, weight shifted to one leg.",
            (true, true) => "Relaxed dynamic stance seen from behind, weight on one leg.",
            (false, false) => "Standing straight pose.",
            (false, true) => "Standing straight pose, seen from behind.",
        };
        parts.push(filler.to_string());
    }

    if pose.reference.is_some() {
        parts.push(
            "The model mimics the pose from the pose reference image. Use ONLY the body position (arms, legs, stance) from the pose reference."
                .to_string(),
        );
    }
    parts
}

fn styling_block(prompt: &StructuredPrompt, visibility: &Visibility) -> Vec<String> {
    let styling = &prompt.styling;
    let mut parts = Vec::new();

    if styling.jacket.is_some() {
        parts.push(
            "Wearing a jacket/coat as an OUTER layer over the main outfit. The jacket is the outermost layer."
                .to_string(),
        );
    }
    if let Some(layer) = styling.upper_garment.as_ref() {
        parts.push(
            "Wearing the upper garment shown in the provided upper front reference image.".to_string(),
        );
        if let Some(description) = layer.description.as_deref() {
            parts.push(ensure_terminal_period(description));
        }
    }
    if let Some(layer) = styling.lower_garment.as_ref() {
        if visibility.can_show_waist_fit {
            parts.push("Paired with the lower garment from the provided reference image.".to_string());
            if let Some(description) = layer.description.as_deref() {
                parts.push(ensure_terminal_period(description));
            }
        }
    }
    if let Some(layer) = styling.inner_wear.as_ref() {
        parts.push("Wearing an inner layer UNDER the main upper garment.".to_string());
        match layer.description.as_deref() {
            Some(description) => parts.push(format!("Inner wear: {}", ensure_terminal_period(description))),
            None => parts.push(
                "The inner wear MUST EXACTLY match the provided inner wear reference image in color, style and fabric."
                    .to_string(),
            ),
        }
    }
    if styling.sleeves_rolled && visibility.can_show_collar_hair_buttons {
        parts.push("Sleeves are rolled up to the forearm.".to_string());
    }
    parts
}

fn footwear_block(prompt: &StructuredPrompt, visibility: &Visibility) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(shoes) = prompt.accessories.shoes.as_ref() {
        parts.push(
            "Shoes: CRITICAL: Model is wearing the EXACT shoes shown in the provided shoe reference image."
                .to_string(),
        );
        parts.push(format!("Shoe style: {}. Shoe size: {}.", shoes.style, shoes.size));
        if let Some(description) = shoes.description.as_deref() {
            parts.push(ensure_terminal_period(description));
        }
    }
    if visibility.can_show_footwear {
        if let Some(socks) = prompt.styling.socks.as_deref() {
            parts.push(format!("Socks: {}", ensure_terminal_period(socks)));
        }
    }
    parts
}

fn background_block(prompt: &StructuredPrompt) -> Vec<String> {
    let background = match prompt.scene.background {
        BackgroundMode::MatchProvidedBackground => {
            "Background matches the provided background reference image exactly."
        }
        BackgroundMode::CleanStudio => "Clean studio background.",
    };
    vec![background.to_string()]
}

fn appearance_block(prompt: &StructuredPrompt, view: View, visibility: &Visibility) -> Vec<String> {
    let subject = &prompt.subject;
    let back = view.is_back();
    let mut parts = Vec::new();

    if !back {
        match subject.look_at_camera {
            Some(true) => parts.push("The model is looking at the camera.".to_string()),
            Some(false) => parts.push("The model's gaze is directed away from the lens.".to_string()),
            None => {}
        }
    }

    if subject.hair_behind_shoulders == Some(true) && visibility.can_show_collar_hair_buttons {
        let hair = if back {
            "STYLING: Hair is kept off the back and shoulders so the back of the garment stays fully visible.".to_string()
        } else {
            let pronoun = match subject.model_type {
                ModelType::Male => "his",
                ModelType::Female => "her",
                ModelType::Generic => "their",
            };
            format!(
                "STYLING: The model's hair is neatly tucked behind {pronoun} shoulders. The hair MUST NOT cover the garment, shoulders or neckline."
            )
        };
        parts.push(hair);
    }

    if subject.wind_effect {
        parts.push("A gentle breeze moves the hair and fabric slightly.".to_string());
    }

    if visibility.can_show_face_details && !back {
        parts.push("Natural skin texture and realistic facial detail.".to_string());
    }
    parts
}

fn lighting_block(prompt: &StructuredPrompt, lighting_positive: Option<&str>) -> Vec<String> {
    let lighting = lighting_positive
        .map(ensure_terminal_period)
        .or_else(|| prompt.scene.lighting.as_deref().map(ensure_terminal_period))
        .unwrap_or_else(|| DEFAULT_LIGHTING.to_string());
    vec![lighting]
}

fn render_block(sentences: Vec<String>, back: bool) -> Option<String> {
    let joined = normalize_whitespace(&sentences.join(" "));
    let rendered = if back {
        split_sentences(&joined)
            .into_iter()
            .filter(|sentence| !BACK_SCRUB_RE.is_match(sentence))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        joined
    };
    (!rendered.is_empty()).then_some(rendered)
}

/// Builds the positive prompt in fixed block order.
pub fn compile(prompt: &StructuredPrompt, ctx: &TextContext<'_>) -> String {
    let view = ctx.view;
    let visibility = resolve(prompt.camera.framing);
    let (accessory_sentences, remainder) = partition_free_text(ctx.free_text, prompt);

    let blocks = [
        framing_block(prompt, view),
        identity_block(prompt, &visibility),
        product_block(prompt, &visibility),
        accessory_block(prompt, accessory_sentences),
        pose_block(prompt, view),
        styling_block(prompt, &visibility),
        footwear_block(prompt, &visibility),
        background_block(prompt),
        appearance_block(prompt, view, &visibility),
        ctx.mood
            .map(|mood| vec![mood.prompt_addition.to_string()])
            .unwrap_or_default(),
        lighting_block(prompt, ctx.lighting_positive),
        remainder,
    ];

    blocks
        .into_iter()
        .filter_map(|block| render_block(block, view.is_back()))
        .collect::<Vec<_>>()
        .join(" ")
}
