use std::{collections::HashSet, fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::{level::RhythmLevel, Result, RhythmError};

/// Immutable, explicitly constructed set of levels.
///
/// Selection is a pure lookup: there is no process-wide registry, callers own
/// the catalog and pass it to whatever needs to resolve a selector.
#[derive(Debug, Clone)]
pub struct LevelCatalog {
    levels: Vec<RhythmLevel>,
}

/// One line of the human-readable catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// 1-based position, usable as a selector.
    pub index: usize,
    pub name: String,
    pub slug: String,
    pub tempo_bpm: f64,
    pub hit_points: usize,
    pub tags: Vec<String>,
}

impl fmt::Display for LevelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags = if self.tags.is_empty() {
            "untagged".to_string()
        } else {
            self.tags.join(", ")
        };
        write!(
            f,
            "{}. {} [{}] - {} bpm - hits: {} - {}",
            self.index, self.name, self.slug, self.tempo_bpm, self.hit_points, tags
        )
    }
}

impl LevelCatalog {
    /// Validates every level and rejects duplicate slugs.
    pub fn new(levels: Vec<RhythmLevel>) -> Result<Self> {
        let mut seen = HashSet::new();
        for level in &levels {
            level.validate()?;
            if !seen.insert(level.slug.to_lowercase()) {
                return Err(RhythmError::DuplicateSlug(level.slug.clone()));
            }
        }
        Ok(Self { levels })
    }

    /// Parses a JSON array of levels.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let levels: Vec<RhythmLevel> = serde_json::from_str(input)?;
        Self::new(levels)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The stock exercises: a basic pulse, two Hindemith-style drills and
    /// two Argentine folk patterns.
    pub fn builtin() -> Self {
        Self {
            levels: builtin_levels(),
        }
    }

    pub fn levels(&self) -> &[RhythmLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Resolves a selector to a level.
    ///
    /// `None` picks the first level. Otherwise the selector is tried as a
    /// slug, then as a 1-based index, then as an exact display name. Slug and
    /// name comparisons ignore case.
    pub fn select(&self, selector: Option<&str>) -> Result<&RhythmLevel> {
        let Some(selector) = selector else {
            return self.levels.first().ok_or_else(|| RhythmError::LevelNotFound {
                selector: "<first>".to_string(),
            });
        };

        let key = selector.trim().to_lowercase();
        if let Some(level) = self.levels.iter().find(|l| l.slug.to_lowercase() == key) {
            return Ok(level);
        }
        if let Ok(index) = key.parse::<usize>() {
            if let Some(level) = index.checked_sub(1).and_then(|i| self.levels.get(i)) {
                return Ok(level);
            }
        }
        self.levels
            .iter()
            .find(|l| l.name.to_lowercase() == key)
            .ok_or_else(|| RhythmError::LevelNotFound {
                selector: selector.to_string(),
            })
    }

    pub fn listing(&self) -> Vec<LevelSummary> {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, level)| LevelSummary {
                index: i + 1,
                name: level.name.clone(),
                slug: level.slug.clone(),
                tempo_bpm: level.tempo_bpm,
                hit_points: level.hit_points.len(),
                tags: level.tags.iter().cloned().collect(),
            })
            .collect()
    }
}

/// Repeats a bar of `(offset, label)` accents `bars` times, `bar_beats` apart.
fn repeat_bars(bars: usize, bar_beats: f64, accents: &[(f64, &str)]) -> Vec<(f64, String)> {
    (0..bars)
        .flat_map(move |bar| {
            let base = bar as f64 * bar_beats;
            accents
                .iter()
                .map(move |(offset, label)| (base + offset, format!("{}: {label}", bar + 1)))
        })
        .collect()
}

fn builtin_levels() -> Vec<RhythmLevel> {
    vec![
        RhythmLevel::new(
            "basic_pulse",
            "Basic 4/4 pulse",
            92.0,
            150,
            320.0,
            16.0,
            repeat_bars(4, 4.0, &[(0.0, "beat 1"), (2.0, "beat 3")]),
        )
        .with_description("Hit the strong beats 1 and 3 to keep the pulse.")
        .with_tags(["Basic pulse"]),
        RhythmLevel::new(
            "hindemith_offbeat",
            "Hindemith off-beat",
            104.0,
            130,
            340.0,
            16.0,
            repeat_bars(4, 4.0, &[(0.0, "1"), (1.5, "2 and"), (3.0, "4")]),
        )
        .with_description("Syncopation drill after Hindemith's Elementary Training.")
        .with_tags(["Hindemith", "Syncopation"]),
        RhythmLevel::new(
            "hindemith_5_8",
            "Hindemith 5/8 (3+2)",
            116.0,
            130,
            360.0,
            10.0,
            repeat_bars(4, 2.5, &[(0.0, "stroke 1"), (1.5, "subdivision 3")]),
        )
        .with_description("Group 5/8 as 3+2 following dry drum accents.")
        .with_tags(["Hindemith", "Irregular meter"]),
        RhythmLevel::new(
            "zamba_6_8",
            "Zamba 6/8",
            128.0,
            140,
            370.0,
            12.0,
            repeat_bars(
                4,
                3.0,
                &[(0.0, "support 1"), (1.5, "sway 4"), (2.5, "flourish 6")],
            ),
        )
        .with_description("Bombo leguero pulse accenting 1, 4 and 6.")
        .with_tags(["Zamba", "Argentine folk"]),
        RhythmLevel::new(
            "chacarera_12_8",
            "Chacarera 12/8",
            132.0,
            150,
            380.0,
            12.0,
            repeat_bars(
                2,
                6.0,
                &[
                    (0.0, "strong 1"),
                    (1.5, "off-beat 4"),
                    (3.0, "accent 7"),
                    (4.0, "roll 9"),
                    (5.0, "close 11"),
                ],
            ),
        )
        .with_description("Traditional bombo leguero pattern in 12/8.")
        .with_tags(["Chacarera", "Argentine folk"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_levels_are_valid() {
        let catalog = LevelCatalog::builtin();
        assert_eq!(catalog.len(), 5);
        let revalidated = LevelCatalog::new(catalog.levels().to_vec()).unwrap();
        assert_eq!(revalidated.len(), 5);
    }

    #[test]
    fn builtin_pulse_has_eight_hits() {
        let catalog = LevelCatalog::builtin();
        let level = catalog.select(Some("basic_pulse")).unwrap();
        assert_eq!(level.hit_points.len(), 8);
        assert_eq!(level.hit_points[3].beat, 6.0);
        assert_eq!(level.hit_points[3].label, "2: beat 3");
    }

    #[test]
    fn selects_by_slug_index_and_name() {
        let catalog = LevelCatalog::builtin();
        assert_eq!(catalog.select(None).unwrap().slug, "basic_pulse");
        assert_eq!(catalog.select(Some("ZAMBA_6_8")).unwrap().slug, "zamba_6_8");
        assert_eq!(catalog.select(Some("2")).unwrap().slug, "hindemith_offbeat");
        assert_eq!(
            catalog.select(Some("chacarera 12/8")).unwrap().slug,
            "chacarera_12_8"
        );
    }

    #[test]
    fn unknown_selector_is_not_found() {
        let catalog = LevelCatalog::builtin();
        for selector in ["0", "6", "polka", ""] {
            let err = catalog.select(Some(selector)).unwrap_err();
            assert!(matches!(err, RhythmError::LevelNotFound { .. }), "{selector}");
        }
    }

    #[test]
    fn empty_catalog_has_no_default() {
        let catalog = LevelCatalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.select(None).is_err());
    }

    #[test]
    fn rejects_duplicate_slugs() {
        let level = LevelCatalog::builtin().levels()[0].clone();
        let err = LevelCatalog::new(vec![level.clone(), level]).unwrap_err();
        assert!(matches!(err, RhythmError::DuplicateSlug(slug) if slug == "basic_pulse"));
    }

    #[test]
    fn listing_enumerates_from_one() {
        let listing = LevelCatalog::builtin().listing();
        assert_eq!(listing[0].index, 1);
        assert_eq!(listing[4].hit_points, 10);
        assert_eq!(listing[3].tags, vec!["Argentine folk", "Zamba"]);
        assert_eq!(
            listing[0].to_string(),
            "1. Basic 4/4 pulse [basic_pulse] - 92 bpm - hits: 8 - Basic pulse"
        );
    }

    #[test]
    fn loads_catalog_from_json() {
        let json = r#"[{
            "slug": "two",
            "name": "Two",
            "tempo_bpm": 120.0,
            "window_ms": 100,
            "base_speed": 300.0,
            "pattern_length_beats": 2.0,
            "hit_points": [{ "beat": 0.0, "label": "a" }, { "beat": 1.0, "label": "b" }],
            "tags": ["custom"]
        }]"#;
        let catalog = LevelCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.select(Some("1")).unwrap().name, "Two");
    }

    #[test]
    fn json_catalog_with_unordered_beats_is_rejected() {
        let json = r#"[{
            "slug": "bad",
            "name": "Bad",
            "tempo_bpm": 120.0,
            "window_ms": 100,
            "base_speed": 300.0,
            "pattern_length_beats": 2.0,
            "hit_points": [{ "beat": 1.0, "label": "b" }, { "beat": 0.0, "label": "a" }]
        }]"#;
        assert!(matches!(
            LevelCatalog::from_json_str(json),
            Err(RhythmError::InvalidLevel { .. })
        ));
    }
}
