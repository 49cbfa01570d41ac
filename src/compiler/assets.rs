use std::collections::HashSet;

use crate::compiler::request::{
    AssetSlots, DetailView, PoseFocus, ShootRequest, ShotRole, WorkflowType,
};
use crate::compiler::visibility::{resolve, Framing};
use crate::compiler::View;

const FRONT_SLOTS: &[&str] = &[
    "main_product",
    "top_front",
    "bottom_front",
    "dress_front",
    "jacket",
    "inner_wear",
    "detail_1",
    "detail_2",
    "detail_3",
    "detail_front_1",
    "detail_front_2",
    "detail_front_3",
    "detail_front_4",
];

const BACK_SLOTS: &[&str] = &[
    "top_back",
    "bottom_back",
    "backRefUpload",
    "jacket",
    "detail_back_1",
    "detail_back_2",
    "detail_back_3",
    "detail_back_4",
];

const DETAIL_COMMON_SLOTS: &[&str] = &["model", "background", "detail_1", "detail_2", "detail_3"];

const DETAIL_FRONT_SLOTS: &[&str] = &[
    "main_product",
    "top_front",
    "bottom_front",
    "dress_front",
    "jacket",
    "inner_wear",
    "detail_front_1",
    "detail_front_2",
    "detail_front_3",
    "detail_front_4",
];

const DETAIL_BACK_SLOTS: &[&str] = &[
    "top_back",
    "bottom_back",
    "backRefUpload",
    "jacket",
    "detail_back_1",
    "detail_back_2",
    "detail_back_3",
    "detail_back_4",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessory {
    Belt,
    Hat,
    Bag,
    Jewelry,
    Glasses,
}

pub const ACCESSORIES: [Accessory; 5] = [
    Accessory::Belt,
    Accessory::Hat,
    Accessory::Bag,
    Accessory::Jewelry,
    Accessory::Glasses,
];

impl Accessory {
    pub fn slot(&self) -> &'static str {
        match self {
            Accessory::Belt => "belt",
            Accessory::Hat => "hat",
            Accessory::Bag => "bag",
            Accessory::Jewelry => "jewelry",
            Accessory::Glasses => "glasses",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exclusions {
    pub shoes: bool,
    pub belt: bool,
    pub hat: bool,
    pub bag: bool,
    pub all_accessories: bool,
}

impl Exclusions {
    pub fn from_request(request: &ShootRequest) -> Self {
        Exclusions {
            shoes: request.exclude_shoes_asset,
            belt: request.exclude_belt_asset,
            hat: request.exclude_hat_asset,
            bag: request.exclude_bag_asset,
            all_accessories: request.exclude_all_accessories,
        }
    }
}

/// Everything the asset filter looks at. Built from the request, never from
/// the structured record, so the two stay independent.
#[derive(Debug, Clone)]
pub struct AssetPlan<'a> {
    pub view: View,
    pub slots: &'a AssetSlots,
    pub pose_focus: PoseFocus,
    pub workflow: WorkflowType,
    pub role: ShotRole,
    pub shot_index: Option<u32>,
    pub explicit_framing: Option<Framing>,
    pub angle_id: Option<&'a str>,
    pub stickman: Option<&'a str>,
    pub exclusions: Exclusions,
}

impl<'a> AssetPlan<'a> {
    fn slot(&self, name: &str) -> Option<&'a str> {
        self.slots
            .get(name)
            .map(|value| value.trim())
            .filter(|value| value.starts_with("http"))
    }

    pub fn accessory_allowed(&self, accessory: Accessory) -> bool {
        accessory_allowed(accessory, self.pose_focus, &self.exclusions)
    }

    /// Upper workflow, upper focus, first styling shot: shoes never ship.
    pub fn first_shot_suppressed(&self) -> bool {
        first_shot_suppressed(
            self.workflow,
            self.pose_focus,
            self.role,
            self.view,
            self.shot_index,
        )
    }

    pub fn shoes_allowed(&self) -> bool {
        if self.exclusions.shoes || self.first_shot_suppressed() {
            return false;
        }
        self.explicit_framing
            .map(|framing| resolve(framing).can_show_footwear)
            .unwrap_or(true)
    }

    fn wants_front(&self) -> bool {
        matches!(self.view, View::Styling | View::Front | View::Side)
    }

    fn wants_back(&self) -> bool {
        match self.view {
            View::Back | View::Side => true,
            View::Styling => self
                .angle_id
                .map(|id| {
                    let lowered = id.to_lowercase();
                    lowered.contains("angled") || lowered.contains("threequarter")
                })
                .unwrap_or(false),
            _ => false,
        }
    }
}

pub fn accessory_allowed(accessory: Accessory, focus: PoseFocus, exclusions: &Exclusions) -> bool {
    if exclusions.all_accessories {
        return false;
    }
    let explicitly_excluded = match accessory {
        Accessory::Belt => exclusions.belt,
        Accessory::Hat => exclusions.hat,
        Accessory::Bag => exclusions.bag,
        Accessory::Jewelry | Accessory::Glasses => false,
    };
    if explicitly_excluded {
        return false;
    }
    // closeups crop out belt, bag and hat
    !(focus == PoseFocus::Closeup
        && matches!(accessory, Accessory::Belt | Accessory::Bag | Accessory::Hat))
}

pub fn first_shot_suppressed(
    workflow: WorkflowType,
    focus: PoseFocus,
    role: ShotRole,
    view: View,
    shot_index: Option<u32>,
) -> bool {
    workflow == WorkflowType::Upper
        && focus == PoseFocus::Upper
        && role == ShotRole::Styling
        && view == View::Styling
        && shot_index == Some(1)
}

struct OrderedAssets {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl OrderedAssets {
    fn new() -> Self {
        OrderedAssets {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            if self.seen.insert(value.to_string()) {
                self.items.push(value.to_string());
            }
        }
    }
}

pub fn build_asset_list(plan: &AssetPlan<'_>) -> Vec<String> {
    let mut assets = OrderedAssets::new();

    if let View::Detail(detail) = plan.view {
        for name in DETAIL_COMMON_SLOTS {
            assets.push(plan.slot(name));
        }
        let sides: &[&[&str]] = match detail {
            DetailView::Front => &[DETAIL_FRONT_SLOTS],
            DetailView::Back => &[DETAIL_BACK_SLOTS],
            DetailView::Angled => &[DETAIL_FRONT_SLOTS, DETAIL_BACK_SLOTS],
        };
        for side in sides {
            for name in *side {
                assets.push(plan.slot(name));
            }
        }
        if detail != DetailView::Back && plan.accessory_allowed(Accessory::Belt) {
            assets.push(plan.slot("belt"));
        }
        return assets.items;
    }

    assets.push(plan.slot("model"));

    if plan.wants_front() {
        for name in FRONT_SLOTS {
            assets.push(plan.slot(name));
        }
    }
    if plan.wants_back() {
        for name in BACK_SLOTS {
            assets.push(plan.slot(name));
        }
        if plan.view == View::Back {
            // back shots fall back on the front garment shot when no back shot exists
            if plan.slot("top_back").is_none() {
                assets.push(plan.slot("top_front"));
            }
            if plan.slot("bottom_back").is_none() {
                assets.push(plan.slot("bottom_front"));
            }
            assets.push(plan.slot("inner_wear"));
        }
    }

    if plan.shoes_allowed() {
        assets.push(plan.slot("shoes"));
    }

    assets.push(plan.slot("background"));

    for accessory in ACCESSORIES {
        if plan.accessory_allowed(accessory) {
            assets.push(plan.slot(accessory.slot()));
        }
    }

    assets.push(plan.slot("lighting"));

    let stickman = plan
        .stickman
        .map(str::trim)
        .filter(|value| value.starts_with("http"))
        .or_else(|| plan.slot("pose_stickman"));
    assets.push(stickman);

    assets.items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(entries: &[(&str, &str)]) -> AssetSlots {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn plan<'a>(view: View, slots: &'a AssetSlots) -> AssetPlan<'a> {
        AssetPlan {
            view,
            slots,
            pose_focus: PoseFocus::Full,
            workflow: WorkflowType::Lower,
            role: ShotRole::Styling,
            shot_index: None,
            explicit_framing: None,
            angle_id: None,
            stickman: None,
            exclusions: Exclusions::default(),
        }
    }

    #[test]
    fn keeps_http_values_in_order_and_strips_pose() {
        let slots = slots(&[
            ("model", "https://cdn/model.png"),
            ("top_front", "https://cdn/top.png"),
            ("pose", "https://cdn/pose.png"),
            ("background", "blob:local"),
            ("shoes", "https://cdn/shoes.png"),
            ("main_product", "https://cdn/top.png"),
        ]);
        let assets = build_asset_list(&plan(View::Front, &slots));
        assert_eq!(
            assets,
            vec!["https://cdn/model.png", "https://cdn/top.png", "https://cdn/shoes.png"]
        );
    }

    #[test]
    fn back_view_uses_back_slots_with_front_fallback() {
        let slots = slots(&[
            ("model", "https://cdn/model.png"),
            ("top_front", "https://cdn/top_front.png"),
            ("bottom_back", "https://cdn/bottom_back.png"),
            ("bottom_front", "https://cdn/bottom_front.png"),
        ]);
        let assets = build_asset_list(&plan(View::Back, &slots));
        assert!(assets.contains(&"https://cdn/bottom_back.png".to_string()));
        assert!(assets.contains(&"https://cdn/top_front.png".to_string()));
        assert!(!assets.contains(&"https://cdn/bottom_front.png".to_string()));
    }

    #[test]
    fn angled_styling_shot_pulls_back_references() {
        let slots = slots(&[("top_back", "https://cdn/top_back.png")]);
        let mut angled = plan(View::Styling, &slots);
        assert!(build_asset_list(&angled).is_empty());
        angled.angle_id = Some("styling_angled");
        assert_eq!(build_asset_list(&angled), vec!["https://cdn/top_back.png"]);
    }

    #[test]
    fn closeup_drops_belt_bag_and_hat_but_keeps_glasses() {
        let slots = slots(&[
            ("belt", "https://cdn/belt.png"),
            ("bag", "https://cdn/bag.png"),
            ("hat", "https://cdn/hat.png"),
            ("glasses", "https://cdn/glasses.png"),
        ]);
        let mut closeup = plan(View::Styling, &slots);
        closeup.pose_focus = PoseFocus::Closeup;
        assert_eq!(build_asset_list(&closeup), vec!["https://cdn/glasses.png"]);
    }

    #[test]
    fn first_upper_styling_shot_drops_shoes_second_keeps_them() {
        let slots = slots(&[("shoes", "https://cdn/shoes.png")]);
        let mut first = plan(View::Styling, &slots);
        first.workflow = WorkflowType::Upper;
        first.pose_focus = PoseFocus::Upper;
        first.shot_index = Some(1);
        assert!(build_asset_list(&first).is_empty());

        let mut second = first.clone();
        second.shot_index = Some(2);
        assert_eq!(build_asset_list(&second), vec!["https://cdn/shoes.png"]);
    }

    #[test]
    fn explicit_framing_without_footwear_drops_shoes() {
        let slots = slots(&[("shoes", "https://cdn/shoes.png")]);
        let mut cowboy = plan(View::Styling, &slots);
        cowboy.explicit_framing = Some(Framing::CowboyShot);
        assert!(build_asset_list(&cowboy).is_empty());

        cowboy.explicit_framing = Some(Framing::HeadToToe);
        assert_eq!(build_asset_list(&cowboy), vec!["https://cdn/shoes.png"]);
    }

    #[test]
    fn detail_views_rebuild_strictly_per_side() {
        let slots = slots(&[
            ("model", "https://cdn/model.png"),
            ("background", "https://cdn/bg.png"),
            ("shoes", "https://cdn/shoes.png"),
            ("top_front", "https://cdn/top_front.png"),
            ("top_back", "https://cdn/top_back.png"),
            ("detail_1", "https://cdn/d1.png"),
            ("pose_stickman", "https://cdn/stick.png"),
        ]);
        let front = build_asset_list(&plan(View::Detail(DetailView::Front), &slots));
        assert_eq!(
            front,
            vec![
                "https://cdn/model.png",
                "https://cdn/bg.png",
                "https://cdn/d1.png",
                "https://cdn/top_front.png"
            ]
        );

        let back = build_asset_list(&plan(View::Detail(DetailView::Back), &slots));
        assert!(back.contains(&"https://cdn/top_back.png".to_string()));
        assert!(!back.contains(&"https://cdn/top_front.png".to_string()));

        let angled = build_asset_list(&plan(View::Detail(DetailView::Angled), &slots));
        assert!(angled.contains(&"https://cdn/top_back.png".to_string()));
        assert!(angled.contains(&"https://cdn/top_front.png".to_string()));
        assert!(!angled.contains(&"https://cdn/shoes.png".to_string()));
    }
}
