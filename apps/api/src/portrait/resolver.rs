//! Prompt resolution: turns a validated `FeatureSelection` into one generation instruction.
//!
//! Lookup order:
//! 1. exact predefined combination (clothing, main, pose, background, shirt, tie)
//! 2. loose predefined combination (clothing, main, pose)
//! 3. template synthesis for `(gender, clothing)`
//!
//! The loose tier ignores background, shirt and tie, so it can hand back a prompt written
//! for a different backdrop than the one selected. That fallback is intentional and kept.
//!
//! All tables are built once on first use and are read-only afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::portrait::prompts::{
    frame_prompt, GENERIC_TEMPLATE, PREDEFINED_COMBINATIONS, PROMPT_TEMPLATES,
};
use crate::portrait::selection::{Background, Clothing, Color, FeatureSelection, Gender, Pose};

/// Exact match key for a predefined combination.
///
/// `shirt` and `tie` only participate when the selection fills them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CombinationKey {
    pub clothing: Clothing,
    pub main: Option<Color>,
    pub pose: Pose,
    pub background: Background,
    pub shirt: Option<Color>,
    pub tie: Option<Color>,
}

/// Looser fallback key: clothing + main colour + pose only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LooseKey {
    pub clothing: Clothing,
    pub main: Option<Color>,
    pub pose: Pose,
}

impl CombinationKey {
    pub fn for_selection(selection: &FeatureSelection) -> Self {
        CombinationKey {
            clothing: selection.clothing,
            main: selection.colors.main,
            pose: selection.pose,
            background: selection.background,
            shirt: selection.colors.shirt,
            tie: selection.colors.tie,
        }
    }

    pub fn loose(&self) -> LooseKey {
        LooseKey {
            clothing: self.clothing,
            main: self.main,
            pose: self.pose,
        }
    }
}

/// Which tier produced a resolved prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    Exact,
    Loose,
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrompt {
    pub text: String,
    pub source: PromptSource,
}

#[derive(Default)]
struct CombinationTable {
    exact: HashMap<CombinationKey, &'static str>,
    loose: HashMap<LooseKey, &'static str>,
}

struct Catalog {
    combinations: HashMap<Gender, CombinationTable>,
    templates: HashMap<(Gender, Clothing), &'static str>,
}

static CATALOG: LazyLock<Catalog> = LazyLock::new(|| {
    let mut combinations: HashMap<Gender, CombinationTable> = HashMap::new();
    for combo in PREDEFINED_COMBINATIONS {
        let key = CombinationKey {
            clothing: combo.clothing,
            main: combo.main,
            pose: combo.pose,
            background: combo.background,
            shirt: combo.shirt,
            tie: combo.tie,
        };
        let table = combinations.entry(combo.gender).or_default();
        table.exact.insert(key, combo.prompt);
        // first row wins for a shared loose key
        table.loose.entry(key.loose()).or_insert(combo.prompt);
    }

    let templates = PROMPT_TEMPLATES
        .iter()
        .map(|&(gender, clothing, template)| ((gender, clothing), template))
        .collect();

    Catalog {
        combinations,
        templates,
    }
});

/// Stateless resolver over the process-wide prompt catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptResolver;

impl PromptResolver {
    /// Returns the generation instruction for `selection` and where it came from. Never fails.
    pub fn resolve(&self, selection: &FeatureSelection) -> ResolvedPrompt {
        let key = CombinationKey::for_selection(selection);

        if let Some(table) = CATALOG.combinations.get(&selection.gender) {
            if let Some(prompt) = table.exact.get(&key) {
                return ResolvedPrompt {
                    text: (*prompt).to_string(),
                    source: PromptSource::Exact,
                };
            }
            if let Some(prompt) = table.loose.get(&key.loose()) {
                return ResolvedPrompt {
                    text: (*prompt).to_string(),
                    source: PromptSource::Loose,
                };
            }
        }

        let template = CATALOG
            .templates
            .get(&(selection.gender, selection.clothing))
            .copied()
            .unwrap_or(GENERIC_TEMPLATE);

        ResolvedPrompt {
            text: frame_prompt(&fill_template(template, selection)),
            source: PromptSource::Template,
        }
    }
}

/// Substitutes every placeholder once. Absent colour slots become empty strings and the
/// whitespace they leave behind is collapsed.
fn fill_template(template: &str, selection: &FeatureSelection) -> String {
    let describe = |color: Option<Color>| color.map(Color::description).unwrap_or("");

    let filled = template
        .replace("{mainColor}", describe(selection.colors.main))
        .replace("{shirtColor}", describe(selection.colors.shirt))
        .replace("{tieColor}", describe(selection.colors.tie))
        .replace("{sweaterColor}", describe(selection.colors.sweater))
        .replace("{pose}", selection.pose.description())
        .replace("{background}", selection.background.description());

    filled.split_whitespace().collect::<Vec<_>>().join(" ")
}
