//! Curated dig-line library and repetition-avoiding selector
//!
//! Supplies the one-liners the response policy falls back on when a slide
//! carries no `[Orik]` tags but the dice say Orik should pipe up anyway.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rand::Rng;
use rand::seq::SliceRandom;

/// Source of sarcastic one-liners.
///
/// `next_line` never fails; implementations always have something to say.
pub trait DigLineSource: Send + Sync {
    /// Pick a line, optionally steered by a context hint (slide title etc.)
    fn next_line(&self, context: Option<&str>) -> String;

    /// Forget which lines were already used (called on session start)
    fn reset_history(&self);
}

/// General presentation-skills digs
const PRESENTATION_SKILLS: &[&str] = &[
    "Sure, let's all pretend Aaron rehearsed this part",
    "Oh look, Aaron's reading directly from his slides again",
    "Wow Aaron, that transition was smoother than sandpaper",
    "I see Aaron's using the 'wing it and hope for the best' approach",
    "Aaron's presentation skills are truly... something",
    "Nothing says 'professional presenter' like Aaron's deer-in-headlights look",
];

/// Technical-competence digs
const TECHNICAL_COMPETENCE: &[&str] = &[
    "Wow Aaron, groundbreaking insight... from 2012",
    "Aaron's technical depth is about as shallow as a puddle",
    "I'm sure Aaron totally understands what he just said",
    "Aaron's explaining this like he learned it five minutes ago",
    "That's some cutting-edge technology there, Aaron... if this were 2010",
    "I love how Aaron makes complex topics sound... confusing",
];

/// Slide-design digs
const DESIGN_CHOICES: &[&str] = &[
    "Another slide where Aaron proves bullet points are a design choice",
    "Aaron's slide design aesthetic: 'More is more'",
    "I see Aaron went with the 'wall of text' approach again",
    "Aaron's slides have all the visual appeal of a tax document",
    "Aaron's design philosophy: 'If it fits, it ships'",
];

/// General-purpose sarcasm
const GENERAL_SARCASM: &[&str] = &[
    "Oh brilliant, Aaron. Just brilliant",
    "I'm sure the audience is hanging on Aaron's every word",
    "Aaron's enthusiasm is truly... noticeable",
    "Let me contain my excitement about Aaron's next point",
    "Aaron's really outdoing himself today... and that's saying something",
];

/// Context keyword -> dedicated lines
const CONTEXT_SPECIFIC: &[(&str, &[&str])] = &[
    (
        "demo",
        &[
            "I'm sure this demo will work perfectly, just like Aaron's last one",
            "Aaron's demos have a 50/50 chance of working... and that's optimistic",
            "Let's all cross our fingers that Aaron's demo gods are smiling today",
        ],
    ),
    (
        "architecture",
        &[
            "Aaron's architecture diagrams are as clear as mud",
            "I love how Aaron makes simple architectures look impossibly complex",
        ],
    ),
    (
        "performance",
        &[
            "Aaron's performance metrics are about as reliable as his predictions",
            "Aaron's optimization skills are truly... visible",
        ],
    ),
    (
        "security",
        &[
            "Aaron's security approach: 'Hope for the best'",
            "I'm sure Aaron's security implementation is bulletproof... like tissue paper",
        ],
    ),
];

/// Named base categories, in weighting order
const BASE_CATEGORIES: &[(&str, &[&str])] = &[
    ("presentation_skills", PRESENTATION_SKILLS),
    ("technical_competence", TECHNICAL_COMPETENCE),
    ("design_choices", DESIGN_CHOICES),
    ("general_sarcasm", GENERAL_SARCASM),
];

/// Selector state that survives between picks
#[derive(Debug, Default)]
struct SelectorState {
    used_lines: HashSet<String>,
    category_usage: HashMap<String, u32>,
    last_category: Option<String>,
}

/// Built-in [`DigLineSource`] with variety tracking.
///
/// Avoids repeating a line until the whole pool is exhausted, avoids using
/// the same category twice in a row, and weights under-used categories up.
#[derive(Default)]
pub struct DigLibrary {
    state: Mutex<SelectorState>,
}

impl DigLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a line with an injected RNG (deterministic in tests)
    pub fn next_line_with_rng<R: Rng>(&self, context: Option<&str>, rng: &mut R) -> String {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let categories = categories_for_context(context);
        let category = select_category(&categories, &state, rng);
        let pool = lines_for_category(category);

        // Prefer lines not yet used; reset tracking once the pool is spent
        let mut fresh: Vec<&str> = pool
            .iter()
            .filter(|line| !state.used_lines.contains(**line))
            .copied()
            .collect();
        if fresh.is_empty() {
            state.used_lines.clear();
            fresh = pool.to_vec();
        }

        let line = (*fresh.choose(rng).unwrap_or(&pool[0])).to_string();

        state.used_lines.insert(line.clone());
        *state.category_usage.entry(category.to_string()).or_insert(0) += 1;
        state.last_category = Some(category.to_string());

        tracing::debug!(category, line = %line, "selected dig line");
        line
    }
}

impl DigLineSource for DigLibrary {
    fn next_line(&self, context: Option<&str>) -> String {
        self.next_line_with_rng(context, &mut rand::thread_rng())
    }

    fn reset_history(&self) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *state = SelectorState::default();
        tracing::debug!("dig line history reset");
    }
}

/// Candidate category names for a context hint
fn categories_for_context(context: Option<&str>) -> Vec<&'static str> {
    let mut categories: Vec<&'static str> =
        BASE_CATEGORIES.iter().map(|(name, _)| *name).collect();

    if let Some(hint) = context {
        let lower = hint.to_lowercase();
        for &(keyword, _) in CONTEXT_SPECIFIC {
            if lower.contains(keyword) {
                categories.insert(0, keyword);
                break;
            }
        }
    }

    categories
}

/// Weighted category pick, avoiding back-to-back reuse
fn select_category<'a, R: Rng>(
    candidates: &[&'a str],
    state: &SelectorState,
    rng: &mut R,
) -> &'a str {
    let mut filtered: Vec<&'a str> = if candidates.len() > 1 {
        candidates
            .iter()
            .filter(|c| state.last_category.as_deref() != Some(**c))
            .copied()
            .collect()
    } else {
        candidates.to_vec()
    };
    if filtered.is_empty() {
        filtered = candidates.to_vec();
    }

    // Under-used categories get a heavier weight
    let weights: Vec<u32> = filtered
        .iter()
        .map(|c| {
            let usage = state.category_usage.get(*c).copied().unwrap_or(0);
            10u32.saturating_sub(usage).max(1)
        })
        .collect();

    let total: u32 = weights.iter().sum();
    let mut roll = rng.gen_range(0..total);
    for (&candidate, &weight) in filtered.iter().zip(&weights) {
        if roll < weight {
            return candidate;
        }
        roll -= weight;
    }

    filtered[filtered.len() - 1]
}

/// Line pool for a category name
fn lines_for_category(category: &str) -> &'static [&'static str] {
    for &(name, pool) in BASE_CATEGORIES {
        if name == category {
            return pool;
        }
    }
    for &(keyword, pool) in CONTEXT_SPECIFIC {
        if keyword == category {
            return pool;
        }
    }
    GENERAL_SARCASM
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn never_returns_empty_line() {
        let library = DigLibrary::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert!(!library.next_line_with_rng(None, &mut rng).is_empty());
        }
    }

    #[test]
    fn avoids_repeats_until_pool_exhausted() {
        let library = DigLibrary::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = HashSet::new();

        // Fewer picks than the total pool size: all distinct
        for _ in 0..10 {
            let line = library.next_line_with_rng(None, &mut rng);
            assert!(seen.insert(line), "line repeated before pool exhausted");
        }
    }

    #[test]
    fn context_hint_steers_selection() {
        // With a demo hint, the context category is a candidate
        let categories = categories_for_context(Some("Live Demo: deploying"));
        assert_eq!(categories[0], "demo");

        let categories = categories_for_context(Some("Quarterly results"));
        assert_eq!(categories.len(), BASE_CATEGORIES.len());
    }

    #[test]
    fn reset_clears_usage_state() {
        let library = DigLibrary::new();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..5 {
            library.next_line_with_rng(None, &mut rng);
        }
        library.reset_history();

        let state = library.state.lock().unwrap();
        assert!(state.used_lines.is_empty());
        assert!(state.category_usage.is_empty());
        assert!(state.last_category.is_none());
    }

    #[test]
    fn consecutive_picks_vary_category() {
        let library = DigLibrary::new();
        let mut rng = StdRng::seed_from_u64(5);
        library.next_line_with_rng(None, &mut rng);
        let last = library
            .state
            .lock()
            .unwrap()
            .last_category
            .clone()
            .unwrap();

        library.next_line_with_rng(None, &mut rng);
        let next = library
            .state
            .lock()
            .unwrap()
            .last_category
            .clone()
            .unwrap();

        assert_ne!(last, next);
    }
}
