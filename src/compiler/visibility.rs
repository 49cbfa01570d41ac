use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compiler::request::{PoseFocus, WorkflowType};
use crate::compiler::CompileError;

/// Camera crop category. The only input to visibility gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    HeadToToe,
    CowboyShot,
    ChestAndFace,
    WaistToAboveKnees,
}

impl Framing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framing::HeadToToe => "head_to_toe",
            Framing::CowboyShot => "cowboy_shot",
            Framing::ChestAndFace => "chest_and_face",
            Framing::WaistToAboveKnees => "waist_to_above_knees",
        }
    }

    pub fn from_pose_focus(focus: PoseFocus) -> Framing {
        match focus {
            PoseFocus::Full | PoseFocus::Lower => Framing::HeadToToe,
            PoseFocus::Upper => Framing::CowboyShot,
            PoseFocus::Closeup => Framing::ChestAndFace,
            PoseFocus::Detail => Framing::WaistToAboveKnees,
        }
    }

    pub fn shot_type(&self) -> ShotType {
        match self {
            Framing::HeadToToe => ShotType::FullBody,
            Framing::CowboyShot => ShotType::CowboyShot,
            Framing::ChestAndFace | Framing::WaistToAboveKnees => ShotType::CloseUp,
        }
    }
}

impl FromStr for Framing {
    type Err = CompileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "head_to_toe" => Ok(Framing::HeadToToe),
            "cowboy_shot" => Ok(Framing::CowboyShot),
            "chest_and_face" => Ok(Framing::ChestAndFace),
            "waist_to_above_knees" => Ok(Framing::WaistToAboveKnees),
            other => Err(CompileError::UnrecognizedFraming(other.to_string())),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotType {
    FullBody,
    CowboyShot,
    CloseUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Visibility {
    pub can_show_footwear: bool,
    pub can_show_leg_hem: bool,
    pub can_show_waist_fit: bool,
    pub can_show_collar_hair_buttons: bool,
    pub can_show_face_details: bool,
}

pub fn resolve(framing: Framing) -> Visibility {
    match framing {
        Framing::HeadToToe => Visibility {
            can_show_footwear: true,
            can_show_leg_hem: true,
            can_show_waist_fit: true,
            can_show_collar_hair_buttons: true,
            can_show_face_details: false,
        },
        Framing::CowboyShot => Visibility {
            can_show_footwear: false,
            can_show_leg_hem: false,
            can_show_waist_fit: true,
            can_show_collar_hair_buttons: true,
            can_show_face_details: false,
        },
        Framing::ChestAndFace => Visibility {
            can_show_footwear: false,
            can_show_leg_hem: false,
            can_show_waist_fit: false,
            can_show_collar_hair_buttons: true,
            can_show_face_details: true,
        },
        Framing::WaistToAboveKnees => Visibility::default(),
    }
}

/// Per-zone garment detail fields. Each one is rendered only when the
/// workflow carries that zone and the framing shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailField {
    Collar,
    Shoulder,
    Waist,
    Rise,
    LegStyle,
    Hem,
}

pub const DETAIL_FIELDS: [DetailField; 6] = [
    DetailField::Collar,
    DetailField::Shoulder,
    DetailField::Waist,
    DetailField::Rise,
    DetailField::LegStyle,
    DetailField::Hem,
];

impl DetailField {
    pub fn label(&self) -> &'static str {
        match self {
            DetailField::Collar => "Collar",
            DetailField::Shoulder => "Shoulder",
            DetailField::Waist => "Waist",
            DetailField::Rise => "Rise",
            DetailField::LegStyle => "Leg style",
            DetailField::Hem => "Hem",
        }
    }

    pub fn applies_to(&self, workflow: WorkflowType) -> bool {
        use WorkflowType::*;
        match self {
            DetailField::Collar | DetailField::Shoulder => matches!(workflow, Upper | Dress | Set),
            DetailField::Waist => matches!(workflow, Lower | Dress | Set),
            DetailField::Rise | DetailField::LegStyle => matches!(workflow, Lower | Set),
            DetailField::Hem => matches!(workflow, Lower | Dress | Set),
        }
    }

    pub fn visible_in(&self, visibility: &Visibility) -> bool {
        match self {
            DetailField::Collar | DetailField::Shoulder => visibility.can_show_collar_hair_buttons,
            DetailField::Waist | DetailField::Rise => visibility.can_show_waist_fit,
            DetailField::LegStyle | DetailField::Hem => visibility.can_show_leg_hem,
        }
    }

    pub fn enabled(&self, workflow: WorkflowType, visibility: &Visibility) -> bool {
        self.applies_to(workflow) && self.visible_in(visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating_table_is_total() {
        let head_to_toe = resolve(Framing::HeadToToe);
        assert!(head_to_toe.can_show_footwear);
        assert!(head_to_toe.can_show_leg_hem);
        assert!(head_to_toe.can_show_waist_fit);
        assert!(head_to_toe.can_show_collar_hair_buttons);
        assert!(!head_to_toe.can_show_face_details);

        let cowboy = resolve(Framing::CowboyShot);
        assert!(!cowboy.can_show_footwear);
        assert!(!cowboy.can_show_leg_hem);
        assert!(cowboy.can_show_waist_fit);
        assert!(cowboy.can_show_collar_hair_buttons);
        assert!(!cowboy.can_show_face_details);

        let chest = resolve(Framing::ChestAndFace);
        assert!(!chest.can_show_footwear);
        assert!(!chest.can_show_leg_hem);
        assert!(!chest.can_show_waist_fit);
        assert!(chest.can_show_collar_hair_buttons);
        assert!(chest.can_show_face_details);

        assert_eq!(resolve(Framing::WaistToAboveKnees), Visibility::default());
    }

    #[test]
    fn framing_strings_round_trip_and_unknown_values_fail() {
        for framing in [
            Framing::HeadToToe,
            Framing::CowboyShot,
            Framing::ChestAndFace,
            Framing::WaistToAboveKnees,
        ] {
            assert_eq!(Framing::from_str(framing.as_str()).ok(), Some(framing));
        }
        assert!(matches!(
            Framing::from_str("waist_up"),
            Err(CompileError::UnrecognizedFraming(value)) if value == "waist_up"
        ));
    }

    #[test]
    fn detail_fields_follow_workflow_and_framing() {
        let cowboy = resolve(Framing::CowboyShot);
        assert!(DetailField::Collar.enabled(WorkflowType::Upper, &cowboy));
        assert!(!DetailField::Hem.enabled(WorkflowType::Lower, &cowboy));
        assert!(!DetailField::Rise.enabled(WorkflowType::Upper, &cowboy));

        let full = resolve(Framing::HeadToToe);
        assert!(DetailField::LegStyle.enabled(WorkflowType::Set, &full));
        assert!(!DetailField::LegStyle.enabled(WorkflowType::Dress, &full));
    }
}
