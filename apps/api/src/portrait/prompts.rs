// Prompt text for the portrait generator.
// Templates carry `{mainColor}`, `{shirtColor}`, `{tieColor}`, `{sweaterColor}`, `{pose}` and
// `{background}` placeholders; `resolver` substitutes them. Predefined combinations are
// hand-tuned prompts that win over template synthesis when their key matches.

use crate::portrait::selection::{Background, Clothing, Color, Gender, Pose};

/// Shared opening line. Keeps the subject's identity anchored to the input photo.
const IDENTITY_PREAMBLE: &str = "Using the person in the provided photo, preserve their exact \
    face, hairstyle, skin tone and facial features.";

/// Shared closing line appended to every prompt.
const PHOTO_QUALITY_SUFFIX: &str = "Photorealistic high-resolution headshot, soft key light, \
    sharp focus on the eyes, natural skin texture, no text or watermark.";

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

pub const MALE_CLASSIC_SUIT_TEMPLATE: &str = "Dress him in a tailored {mainColor} two-piece suit \
    over a {shirtColor} dress shirt with an open collar. Pose him {pose}. Place him in front of \
    {background}.";

pub const MALE_SUIT_AND_TIE_TEMPLATE: &str = "Dress him in a tailored {mainColor} two-piece suit, \
    a {shirtColor} dress shirt and a neatly knotted {tieColor} silk tie. Pose him {pose}. Place \
    him in front of {background}.";

pub const MALE_THREE_PIECE_SUIT_TEMPLATE: &str = "Dress him in a {mainColor} three-piece suit with \
    a matching waistcoat, a {shirtColor} dress shirt and a {tieColor} tie. Pose him {pose}. \
    Place him in front of {background}.";

pub const MALE_BLAZER_OPEN_COLLAR_TEMPLATE: &str = "Dress him in a {mainColor} unstructured \
    blazer over a {shirtColor} shirt with the top button undone. Pose him {pose}. Place him in \
    front of {background}.";

pub const MALE_SWEATER_OVER_SHIRT_TEMPLATE: &str = "Dress him in a {sweaterColor} fine-knit crew \
    neck sweater layered over a {shirtColor} collared shirt. Pose him {pose}. Place him in front \
    of {background}.";

pub const MALE_POLO_SHIRT_TEMPLATE: &str = "Dress him in a well-fitted {mainColor} pique polo \
    shirt. Pose him {pose}. Place him in front of {background}.";

pub const FEMALE_BUSINESS_SUIT_TEMPLATE: &str = "Dress her in a tailored {mainColor} business \
    suit jacket over a {shirtColor} silk blouse. Pose her {pose}. Place her in front of \
    {background}.";

pub const FEMALE_BLAZER_BLOUSE_TEMPLATE: &str = "Dress her in a {mainColor} single-breasted \
    blazer over a {shirtColor} blouse with a soft neckline. Pose her {pose}. Place her in front \
    of {background}.";

pub const FEMALE_SHEATH_DRESS_TEMPLATE: &str = "Dress her in an elegant {mainColor} sheath dress \
    with a modest neckline. Pose her {pose}. Place her in front of {background}.";

pub const FEMALE_TURTLENECK_TEMPLATE: &str = "Dress her in a slim {mainColor} fine-knit \
    turtleneck. Pose her {pose}. Place her in front of {background}.";

pub const FEMALE_CARDIGAN_BLOUSE_TEMPLATE: &str = "Dress her in a {sweaterColor} fitted cardigan \
    over a {shirtColor} blouse. Pose her {pose}. Place her in front of {background}.";

/// Template table keyed by `(gender, clothing)`.
pub const PROMPT_TEMPLATES: &[(Gender, Clothing, &str)] = &[
    (Gender::Male, Clothing::ClassicSuit, MALE_CLASSIC_SUIT_TEMPLATE),
    (Gender::Male, Clothing::SuitAndTie, MALE_SUIT_AND_TIE_TEMPLATE),
    (Gender::Male, Clothing::ThreePieceSuit, MALE_THREE_PIECE_SUIT_TEMPLATE),
    (Gender::Male, Clothing::BlazerOpenCollar, MALE_BLAZER_OPEN_COLLAR_TEMPLATE),
    (Gender::Male, Clothing::SweaterOverShirt, MALE_SWEATER_OVER_SHIRT_TEMPLATE),
    (Gender::Male, Clothing::PoloShirt, MALE_POLO_SHIRT_TEMPLATE),
    (Gender::Female, Clothing::BusinessSuit, FEMALE_BUSINESS_SUIT_TEMPLATE),
    (Gender::Female, Clothing::BlazerBlouse, FEMALE_BLAZER_BLOUSE_TEMPLATE),
    (Gender::Female, Clothing::SheathDress, FEMALE_SHEATH_DRESS_TEMPLATE),
    (Gender::Female, Clothing::Turtleneck, FEMALE_TURTLENECK_TEMPLATE),
    (Gender::Female, Clothing::CardiganBlouse, FEMALE_CARDIGAN_BLOUSE_TEMPLATE),
];

/// Used only when a `(gender, clothing)` pair has no template row.
pub const GENERIC_TEMPLATE: &str = "Dress the person in smart professional attire in \
    {mainColor}. Pose them {pose}. Place them in front of {background}.";

/// Wraps a clothing/pose/background sentence with the shared identity and quality lines.
pub fn frame_prompt(body: &str) -> String {
    format!("{IDENTITY_PREAMBLE} {body} {PHOTO_QUALITY_SUFFIX}")
}

// ────────────────────────────────────────────────────────────────────────────
// Predefined combinations
// ────────────────────────────────────────────────────────────────────────────

pub const CLASSIC_SUIT_NAVY_WHITE_STUDIO: &str = "Using the person in the provided photo, \
    preserve their exact face, hairstyle, skin tone and facial features. Dress him in a \
    perfectly tailored deep navy blue two-piece suit with notch lapels over a crisp white \
    dress shirt, collar open and neat. He stands upright with squared shoulders, facing the \
    camera with a confident, approachable smile. Seamless pure white studio backdrop lit \
    evenly from both sides with no shadows on the wall. Corporate headshot, 85mm lens, \
    photorealistic, sharp focus on the eyes, no text or watermark.";

pub const CLASSIC_SUIT_CHARCOAL_LIGHT_BLUE_OFFICE: &str = "Using the person in the provided \
    photo, preserve their exact face, hairstyle, skin tone and facial features. Dress him in a \
    charcoal gray two-piece suit over a pale light blue dress shirt with an open collar. He \
    stands in a relaxed three-quarter stance with a natural, friendly expression. Softly \
    blurred modern glass-walled office behind him with warm ambient light. Editorial business \
    portrait, photorealistic, shallow depth of field, no text or watermark.";

pub const SUIT_AND_TIE_NAVY_WHITE_BURGUNDY_STUDIO: &str = "Using the person in the provided \
    photo, preserve their exact face, hairstyle, skin tone and facial features. Dress him in a \
    deep navy blue suit, crisp white dress shirt and a rich burgundy silk tie in a half-Windsor \
    knot. He faces the camera with squared shoulders and a confident, approachable smile. \
    Neutral mid-gray studio backdrop with soft vignetting. Executive headshot, photorealistic, \
    sharp focus on the eyes, no text or watermark.";

pub const SUIT_AND_TIE_BLACK_WHITE_BLACK_GRADIENT: &str = "Using the person in the provided \
    photo, preserve their exact face, hairstyle, skin tone and facial features. Dress him in a \
    sharp black suit, crisp white shirt and slim black tie. He holds a poised magazine-style \
    pose with the head gently tilted and a composed gaze. Smooth dark-to-light blue gradient \
    backdrop. High-fashion editorial portrait, photorealistic, dramatic rim light, no text or \
    watermark.";

pub const BUSINESS_SUIT_BLACK_WHITE_STUDIO: &str = "Using the person in the provided photo, \
    preserve their exact face, hairstyle, skin tone and facial features. Dress her in a \
    tailored black business suit jacket over a crisp white silk blouse. She stands upright \
    facing the camera with a confident, approachable smile. Seamless pure white studio \
    backdrop, evenly lit. Corporate headshot, 85mm lens, photorealistic, sharp focus on the \
    eyes, no text or watermark.";

pub const BLAZER_BLOUSE_NAVY_CREAM_LIBRARY: &str = "Using the person in the provided photo, \
    preserve their exact face, hairstyle, skin tone and facial features. Dress her in a deep \
    navy blue blazer over a soft cream blouse. She stands in a relaxed three-quarter stance \
    with a warm, natural expression. Softly blurred wood-paneled library with rows of books \
    behind her. Approachable professional portrait, photorealistic, gentle window light, no \
    text or watermark.";

pub const SHEATH_DRESS_BURGUNDY_GRADIENT: &str = "Using the person in the provided photo, \
    preserve their exact face, hairstyle, skin tone and facial features. Dress her in an \
    elegant rich burgundy sheath dress with a modest boat neckline. She holds a poised \
    magazine-style pose, head gently tilted, with a self-assured gaze. Smooth dark-to-light \
    blue gradient studio backdrop. Editorial portrait, photorealistic, soft beauty lighting, no \
    text or watermark.";

/// One hand-authored prompt and the feature combination it was written for.
#[derive(Debug, Clone, Copy)]
pub struct PredefinedCombination {
    pub gender: Gender,
    pub clothing: Clothing,
    pub main: Option<Color>,
    pub pose: Pose,
    pub background: Background,
    pub shirt: Option<Color>,
    pub tie: Option<Color>,
    pub prompt: &'static str,
}

/// Order matters: when two rows share clothing + main colour + pose, the earlier row is the
/// one returned by the loose fallback.
pub const PREDEFINED_COMBINATIONS: &[PredefinedCombination] = &[
    PredefinedCombination {
        gender: Gender::Male,
        clothing: Clothing::ClassicSuit,
        main: Some(Color::Navy),
        pose: Pose::Professional,
        background: Background::StudioWhite,
        shirt: Some(Color::White),
        tie: None,
        prompt: CLASSIC_SUIT_NAVY_WHITE_STUDIO,
    },
    PredefinedCombination {
        gender: Gender::Male,
        clothing: Clothing::ClassicSuit,
        main: Some(Color::Charcoal),
        pose: Pose::Casual,
        background: Background::ModernOffice,
        shirt: Some(Color::LightBlue),
        tie: None,
        prompt: CLASSIC_SUIT_CHARCOAL_LIGHT_BLUE_OFFICE,
    },
    PredefinedCombination {
        gender: Gender::Male,
        clothing: Clothing::SuitAndTie,
        main: Some(Color::Navy),
        pose: Pose::Professional,
        background: Background::StudioGray,
        shirt: Some(Color::White),
        tie: Some(Color::Burgundy),
        prompt: SUIT_AND_TIE_NAVY_WHITE_BURGUNDY_STUDIO,
    },
    PredefinedCombination {
        gender: Gender::Male,
        clothing: Clothing::SuitAndTie,
        main: Some(Color::Black),
        pose: Pose::Editorial,
        background: Background::GradientBlue,
        shirt: Some(Color::White),
        tie: Some(Color::Black),
        prompt: SUIT_AND_TIE_BLACK_WHITE_BLACK_GRADIENT,
    },
    PredefinedCombination {
        gender: Gender::Female,
        clothing: Clothing::BusinessSuit,
        main: Some(Color::Black),
        pose: Pose::Professional,
        background: Background::StudioWhite,
        shirt: Some(Color::White),
        tie: None,
        prompt: BUSINESS_SUIT_BLACK_WHITE_STUDIO,
    },
    PredefinedCombination {
        gender: Gender::Female,
        clothing: Clothing::BlazerBlouse,
        main: Some(Color::Navy),
        pose: Pose::Casual,
        background: Background::Library,
        shirt: Some(Color::Cream),
        tie: None,
        prompt: BLAZER_BLOUSE_NAVY_CREAM_LIBRARY,
    },
    PredefinedCombination {
        gender: Gender::Female,
        clothing: Clothing::SheathDress,
        main: Some(Color::Burgundy),
        pose: Pose::Editorial,
        background: Background::GradientBlue,
        shirt: None,
        tie: None,
        prompt: SHEATH_DRESS_BURGUNDY_GRADIENT,
    },
];
