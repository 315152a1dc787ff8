use crate::catalog::Catalog;
use crate::error::HostError;
use crate::modifier::ModifierSet;
use crate::store::Recipe;
use crate::store::record::MAX_VALUE;
use serde::{Deserialize, Serialize};

/// Criteria for the search stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    pub min_value: i32,
    pub max_value: i32,
    /// Every one of these modifiers must be present
    pub includes_modifier: ModifierSet,
    /// None of these modifiers may be present. Wins over `includes_modifier`.
    pub excludes_modifier: ModifierSet,
    /// Also accept recipes that reach the value range when the crit RNG hits.
    /// Recipes whose raw value is in range match either way.
    pub include_crit_rng_hp: bool,
    /// Accept recipes that need prompt-entanglement-only materials
    pub include_pe_only: bool,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl SearchFilter {
    /// A filter that matches every recipe.
    pub fn all() -> Self {
        Self {
            min_value: 0,
            max_value: MAX_VALUE as i32,
            includes_modifier: ModifierSet::empty(),
            excludes_modifier: ModifierSet::empty(),
            include_crit_rng_hp: true,
            include_pe_only: true,
        }
    }

    /// A filter on the raw value range only, leaving out PE-only recipes.
    pub fn value_range(min_value: i32, max_value: i32) -> Self {
        Self {
            min_value,
            max_value,
            include_crit_rng_hp: false,
            include_pe_only: false,
            ..Self::all()
        }
    }

    pub fn validate(&self) -> Result<(), HostError> {
        let max = MAX_VALUE as i32;
        if !(0..=max).contains(&self.min_value) || !(0..=max).contains(&self.max_value) {
            return Err(HostError::InvalidFilter(format!(
                "value range {}..={} is outside 0..={}",
                self.min_value, self.max_value, max
            )));
        }
        if self.min_value > self.max_value {
            return Err(HostError::InvalidFilter(format!(
                "min value {} is greater than max value {}",
                self.min_value, self.max_value
            )));
        }
        Ok(())
    }

    /// The required modifiers after excluded bits are removed.
    #[inline]
    pub fn effective_includes(&self) -> ModifierSet {
        self.includes_modifier.difference(self.excludes_modifier)
    }

    /// Check the value and modifier criteria of a recipe.
    pub fn matches_values(&self, recipe: &Recipe) -> bool {
        if !recipe.modifier.has_all(self.effective_includes()) {
            return false;
        }
        if !recipe.modifier.has_none(self.excludes_modifier) {
            return false;
        }
        let range = self.min_value..=self.max_value;
        if range.contains(&(recipe.value as i32)) {
            return true;
        }
        self.include_crit_rng_hp && recipe.crit_rng && range.contains(&(recipe.crit_value() as i32))
    }

    /// Check every criterion, including the prompt-entanglement gate.
    pub fn matches(&self, recipe: &Recipe, catalog: &Catalog) -> bool {
        if !self.matches_values(recipe) {
            return false;
        }
        self.include_pe_only || !recipe.groups().any(|g| catalog.is_pe_only(g))
    }
}
