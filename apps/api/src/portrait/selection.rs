//! Feature selection: the caller's structured style choice for a portrait.
//!
//! Every option serialises as a kebab-case id (`classic-suit`, `studio-white`, `light-blue`)
//! so the client form can post the ids it renders verbatim.
//!
//! A selection is only usable once `validate()` passes: the clothing must belong to the
//! chosen gender and every colour slot the clothing requires must be filled.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn id(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// The four garment colour slots a clothing option may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorSlot {
    Main,
    Shirt,
    Tie,
    Sweater,
}

impl ColorSlot {
    pub fn id(self) -> &'static str {
        match self {
            ColorSlot::Main => "main",
            ColorSlot::Shirt => "shirt",
            ColorSlot::Tie => "tie",
            ColorSlot::Sweater => "sweater",
        }
    }
}

/// Clothing options. Each variant is scoped to exactly one gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Clothing {
    // male
    ClassicSuit,
    SuitAndTie,
    ThreePieceSuit,
    BlazerOpenCollar,
    SweaterOverShirt,
    PoloShirt,
    // female
    BusinessSuit,
    BlazerBlouse,
    SheathDress,
    Turtleneck,
    CardiganBlouse,
}

impl Clothing {
    pub const ALL: [Clothing; 11] = [
        Clothing::ClassicSuit,
        Clothing::SuitAndTie,
        Clothing::ThreePieceSuit,
        Clothing::BlazerOpenCollar,
        Clothing::SweaterOverShirt,
        Clothing::PoloShirt,
        Clothing::BusinessSuit,
        Clothing::BlazerBlouse,
        Clothing::SheathDress,
        Clothing::Turtleneck,
        Clothing::CardiganBlouse,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Clothing::ClassicSuit => "classic-suit",
            Clothing::SuitAndTie => "suit-and-tie",
            Clothing::ThreePieceSuit => "three-piece-suit",
            Clothing::BlazerOpenCollar => "blazer-open-collar",
            Clothing::SweaterOverShirt => "sweater-over-shirt",
            Clothing::PoloShirt => "polo-shirt",
            Clothing::BusinessSuit => "business-suit",
            Clothing::BlazerBlouse => "blazer-blouse",
            Clothing::SheathDress => "sheath-dress",
            Clothing::Turtleneck => "turtleneck",
            Clothing::CardiganBlouse => "cardigan-blouse",
        }
    }

    pub fn gender(self) -> Gender {
        match self {
            Clothing::ClassicSuit
            | Clothing::SuitAndTie
            | Clothing::ThreePieceSuit
            | Clothing::BlazerOpenCollar
            | Clothing::SweaterOverShirt
            | Clothing::PoloShirt => Gender::Male,
            Clothing::BusinessSuit
            | Clothing::BlazerBlouse
            | Clothing::SheathDress
            | Clothing::Turtleneck
            | Clothing::CardiganBlouse => Gender::Female,
        }
    }

    /// Colour slots that must be present for this clothing option.
    pub fn required_slots(self) -> &'static [ColorSlot] {
        use ColorSlot::*;
        match self {
            Clothing::ClassicSuit => &[Main, Shirt],
            Clothing::SuitAndTie => &[Main, Shirt, Tie],
            Clothing::ThreePieceSuit => &[Main, Shirt, Tie],
            Clothing::BlazerOpenCollar => &[Main, Shirt],
            Clothing::SweaterOverShirt => &[Sweater, Shirt],
            Clothing::PoloShirt => &[Main],
            Clothing::BusinessSuit => &[Main, Shirt],
            Clothing::BlazerBlouse => &[Main, Shirt],
            Clothing::SheathDress => &[Main],
            Clothing::Turtleneck => &[Main],
            Clothing::CardiganBlouse => &[Sweater, Shirt],
        }
    }

    pub fn for_gender(gender: Gender) -> impl Iterator<Item = Clothing> {
        Clothing::ALL.into_iter().filter(move |c| c.gender() == gender)
    }
}

/// Semantic colour keys offered for every garment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Color {
    Navy,
    Charcoal,
    Black,
    Gray,
    LightGray,
    White,
    LightBlue,
    SkyBlue,
    Burgundy,
    Beige,
    Camel,
    Olive,
    ForestGreen,
    Cream,
    Blush,
}

impl Color {
    pub const ALL: [Color; 15] = [
        Color::Navy,
        Color::Charcoal,
        Color::Black,
        Color::Gray,
        Color::LightGray,
        Color::White,
        Color::LightBlue,
        Color::SkyBlue,
        Color::Burgundy,
        Color::Beige,
        Color::Camel,
        Color::Olive,
        Color::ForestGreen,
        Color::Cream,
        Color::Blush,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Color::Navy => "navy",
            Color::Charcoal => "charcoal",
            Color::Black => "black",
            Color::Gray => "gray",
            Color::LightGray => "light-gray",
            Color::White => "white",
            Color::LightBlue => "light-blue",
            Color::SkyBlue => "sky-blue",
            Color::Burgundy => "burgundy",
            Color::Beige => "beige",
            Color::Camel => "camel",
            Color::Olive => "olive",
            Color::ForestGreen => "forest-green",
            Color::Cream => "cream",
            Color::Blush => "blush",
        }
    }

    /// Human-readable wording substituted into prompt templates.
    pub fn description(self) -> &'static str {
        match self {
            Color::Navy => "deep navy blue",
            Color::Charcoal => "charcoal gray",
            Color::Black => "classic black",
            Color::Gray => "medium gray",
            Color::LightGray => "soft light gray",
            Color::White => "crisp white",
            Color::LightBlue => "pale light blue",
            Color::SkyBlue => "bright sky blue",
            Color::Burgundy => "rich burgundy",
            Color::Beige => "warm beige",
            Color::Camel => "camel tan",
            Color::Olive => "muted olive green",
            Color::ForestGreen => "dark forest green",
            Color::Cream => "soft cream",
            Color::Blush => "dusty blush pink",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pose {
    Professional,
    Casual,
    Editorial,
}

impl Pose {
    pub const ALL: [Pose; 3] = [Pose::Professional, Pose::Casual, Pose::Editorial];

    pub fn id(self) -> &'static str {
        match self {
            Pose::Professional => "professional",
            Pose::Casual => "casual",
            Pose::Editorial => "editorial",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Pose::Professional => {
                "standing upright with squared shoulders, facing the camera with a confident, \
                 approachable smile"
            }
            Pose::Casual => {
                "in a relaxed three-quarter stance with shoulders slightly turned and a natural, \
                 friendly expression"
            }
            Pose::Editorial => {
                "in a poised magazine-style pose, head gently tilted, with a composed and \
                 self-assured gaze"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Background {
    StudioWhite,
    StudioGray,
    ModernOffice,
    Library,
    CityStreet,
    OutdoorGarden,
    GradientBlue,
}

impl Background {
    pub const ALL: [Background; 7] = [
        Background::StudioWhite,
        Background::StudioGray,
        Background::ModernOffice,
        Background::Library,
        Background::CityStreet,
        Background::OutdoorGarden,
        Background::GradientBlue,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Background::StudioWhite => "studio-white",
            Background::StudioGray => "studio-gray",
            Background::ModernOffice => "modern-office",
            Background::Library => "library",
            Background::CityStreet => "city-street",
            Background::OutdoorGarden => "outdoor-garden",
            Background::GradientBlue => "gradient-blue",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Background::StudioWhite => "a clean, evenly lit seamless white studio backdrop",
            Background::StudioGray => "a neutral mid-gray studio backdrop with soft vignetting",
            Background::ModernOffice => {
                "a softly blurred modern office with glass walls and warm ambient light"
            }
            Background::Library => "a softly blurred wood-paneled library with rows of books",
            Background::CityStreet => {
                "a shallow-depth-of-field city street with gentle bokeh from storefront lights"
            }
            Background::OutdoorGarden => "a softly blurred green garden in late-afternoon light",
            Background::GradientBlue => "a smooth dark-to-light blue gradient studio backdrop",
        }
    }
}

/// Per-garment colour choices. Absent slots are simply `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorChoices {
    #[serde(default)]
    pub main: Option<Color>,
    #[serde(default)]
    pub shirt: Option<Color>,
    #[serde(default)]
    pub tie: Option<Color>,
    #[serde(default)]
    pub sweater: Option<Color>,
}

impl ColorChoices {
    pub fn get(&self, slot: ColorSlot) -> Option<Color> {
        match slot {
            ColorSlot::Main => self.main,
            ColorSlot::Shirt => self.shirt,
            ColorSlot::Tie => self.tie,
            ColorSlot::Sweater => self.sweater,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("selection is not valid JSON: {0}")]
    Malformed(String),

    #[error("clothing '{}' is not available for gender '{}'", .clothing.id(), .gender.id())]
    ClothingGenderMismatch { clothing: Clothing, gender: Gender },

    #[error("clothing '{}' requires a '{}' color", .clothing.id(), .slot.id())]
    MissingColor { clothing: Clothing, slot: ColorSlot },
}

/// The structured style choice submitted alongside the source photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSelection {
    pub gender: Gender,
    pub clothing: Clothing,
    #[serde(default)]
    pub colors: ColorChoices,
    pub pose: Pose,
    pub background: Background,
}

impl FeatureSelection {
    /// Parses the serialized form field and validates it in one step.
    pub fn parse(raw: &str) -> Result<Self, SelectionError> {
        let selection: FeatureSelection =
            serde_json::from_str(raw).map_err(|e| SelectionError::Malformed(e.to_string()))?;
        selection.validate()?;
        Ok(selection)
    }

    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.clothing.gender() != self.gender {
            return Err(SelectionError::ClothingGenderMismatch {
                clothing: self.clothing,
                gender: self.gender,
            });
        }

        for &slot in self.clothing.required_slots() {
            if self.colors.get(slot).is_none() {
                return Err(SelectionError::MissingColor {
                    clothing: self.clothing,
                    slot,
                });
            }
        }

        Ok(())
    }
}

/// Compact one-line summary used in log fields.
impl fmt::Display for FeatureSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.gender.id(), self.clothing.id())?;
        for slot in [
            ColorSlot::Main,
            ColorSlot::Shirt,
            ColorSlot::Tie,
            ColorSlot::Sweater,
        ] {
            if let Some(color) = self.colors.get(slot) {
                write!(f, " {}={}", slot.id(), color.id())?;
            }
        }
        write!(f, " pose={} bg={}", self.pose.id(), self.background.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC_SUIT_JSON: &str = r#"{
        "gender": "male",
        "clothing": "classic-suit",
        "colors": {"main": "navy", "shirt": "white"},
        "pose": "professional",
        "background": "studio-white"
    }"#;

    #[test]
    fn test_parse_valid_selection() {
        let selection = FeatureSelection::parse(CLASSIC_SUIT_JSON).unwrap();
        assert_eq!(selection.gender, Gender::Male);
        assert_eq!(selection.clothing, Clothing::ClassicSuit);
        assert_eq!(selection.colors.main, Some(Color::Navy));
        assert_eq!(selection.colors.shirt, Some(Color::White));
        assert_eq!(selection.colors.tie, None);
        assert_eq!(selection.background, Background::StudioWhite);
    }

    #[test]
    fn test_missing_required_slot_is_rejected() {
        let json = r#"{
            "gender": "male",
            "clothing": "suit-and-tie",
            "colors": {"main": "charcoal", "shirt": "white"},
            "pose": "professional",
            "background": "studio-gray"
        }"#;
        let err = FeatureSelection::parse(json).unwrap_err();
        assert_eq!(
            err,
            SelectionError::MissingColor {
                clothing: Clothing::SuitAndTie,
                slot: ColorSlot::Tie
            }
        );
        assert!(err.to_string().contains("'tie'"));
    }

    #[test]
    fn test_clothing_must_match_gender() {
        let json = r#"{
            "gender": "female",
            "clothing": "classic-suit",
            "colors": {"main": "navy", "shirt": "white"},
            "pose": "casual",
            "background": "library"
        }"#;
        let err = FeatureSelection::parse(json).unwrap_err();
        assert!(matches!(err, SelectionError::ClothingGenderMismatch { .. }));
    }

    #[test]
    fn test_unknown_ids_are_malformed() {
        let json = r#"{
            "gender": "male",
            "clothing": "space-suit",
            "pose": "professional",
            "background": "studio-white"
        }"#;
        assert!(matches!(
            FeatureSelection::parse(json),
            Err(SelectionError::Malformed(_))
        ));
    }

    #[test]
    fn test_colors_default_to_empty() {
        let json = r#"{
            "gender": "female",
            "clothing": "sheath-dress",
            "pose": "editorial",
            "background": "gradient-blue"
        }"#;
        // sheath-dress requires main, and colors was omitted entirely
        let err = FeatureSelection::parse(json).unwrap_err();
        assert!(matches!(
            err,
            SelectionError::MissingColor {
                slot: ColorSlot::Main,
                ..
            }
        ));
    }

    #[test]
    fn test_every_clothing_belongs_to_one_gender_and_requires_a_slot() {
        for clothing in Clothing::ALL {
            assert!(!clothing.required_slots().is_empty(), "{}", clothing.id());
            assert!(Clothing::for_gender(clothing.gender()).any(|c| c == clothing));
        }
    }

    #[test]
    fn test_ids_match_serde_names() {
        for color in Color::ALL {
            let json = serde_json::to_string(&color).unwrap();
            assert_eq!(json, format!("\"{}\"", color.id()));
        }
        for clothing in Clothing::ALL {
            let json = serde_json::to_string(&clothing).unwrap();
            assert_eq!(json, format!("\"{}\"", clothing.id()));
        }
        for background in Background::ALL {
            let json = serde_json::to_string(&background).unwrap();
            assert_eq!(json, format!("\"{}\"", background.id()));
        }
    }

    #[test]
    fn test_display_summary() {
        let selection = FeatureSelection::parse(CLASSIC_SUIT_JSON).unwrap();
        assert_eq!(
            selection.to_string(),
            "male/classic-suit main=navy shirt=white pose=professional bg=studio-white"
        );
    }
}
