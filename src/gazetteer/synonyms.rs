//! Administrative type-word synonyms ("Oblast" / "Region") used to widen
//! gazetteer names.

use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{GeoError, Result};

/// Interchangeable administrative-unit type words
pub const DEFAULT_SYNONYMS: &[(&str, &str)] = &[
    ("Oblast", "Region"),
    ("Region", "Oblast"),
    ("Krai", "Region"),
    ("District", "Region"),
    ("Region", "District"),
];

#[derive(Debug, Clone)]
struct SynonymRule {
    pattern: Regex,
    replacement: String,
}

/// Whole-word substitutions producing extra candidate names.
///
/// Matching is case-sensitive and bounded by `\b`, so "Oblast" rewrites
/// "Amur Oblast" but leaves "Oblastville" alone.
#[derive(Debug, Clone)]
pub struct SynonymExpander {
    rules: Vec<SynonymRule>,
}

impl SynonymExpander {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Expander preloaded with [`DEFAULT_SYNONYMS`]
    pub fn with_defaults() -> Result<Self> {
        let mut expander = Self::new();
        for (original, synonym) in DEFAULT_SYNONYMS {
            expander.add_rule(original, synonym)?;
        }
        Ok(expander)
    }

    /// Rewrite every whole-word occurrence of `original` as `synonym`
    pub fn add_rule(&mut self, original: &str, synonym: &str) -> Result<()> {
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(original)))?;
        self.rules.push(SynonymRule {
            pattern,
            replacement: synonym.to_string(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Load extra rules from a text file.
    ///
    /// `Krai => Region` adds a one-way rule; `Oblast, Region` makes every
    /// listed word interchangeable with the first. `#` starts a comment.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Synonym file not found: {}", path.display());
            return Ok(());
        }

        let content = fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
        let before = self.rules.len();

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            if let Some((lefts, rights)) = line.split_once("=>") {
                // First item on the right is the replacement
                let Some(target) = rights.split(',').map(str::trim).find(|s| !s.is_empty())
                else {
                    continue;
                };
                for source in lefts.split(',').map(str::trim) {
                    if !source.is_empty() && source != target {
                        self.add_rule(source, target)?;
                    }
                }
            } else {
                let mut words = line.split(',').map(str::trim).filter(|s| !s.is_empty());
                let Some(canonical) = words.next() else {
                    continue;
                };
                for variant in words {
                    if variant != canonical {
                        self.add_rule(variant, canonical)?;
                        self.add_rule(canonical, variant)?;
                    }
                }
            }
        }

        info!(
            "Loaded {} synonym rules from {}",
            self.rules.len() - before,
            path.display()
        );
        Ok(())
    }

    /// Variants of `name` produced by each matching rule, in rule order.
    pub fn expand(&self, name: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| rule.pattern.is_match(name))
            .map(|rule| {
                rule.pattern
                    .replace_all(name, rule.replacement.as_str())
                    .into_owned()
            })
            .filter(|variant| variant != name)
            .collect()
    }
}

impl Default for SynonymExpander {
    fn default() -> Self {
        Self::new()
    }
}
