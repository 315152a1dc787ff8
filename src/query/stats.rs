use crate::catalog::GroupId;
use crate::store::Recipe;
use serde::Serialize;

/// Stats for searching and filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of recipes found
    pub found_count: usize,
    /// Groups in those recipes. Absent when usage was not computed.
    pub group_stat: Option<GroupStat>,
}

impl Stats {
    pub fn new(found_count: usize, group_stat: Option<GroupStat>) -> Self {
        Self {
            found_count,
            group_stat,
        }
    }
}

/// How many recipes use each group.
///
/// Position corresponds to group id, value to the number of recipes.
/// A recipe that uses a group in several slots counts once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupStat(Vec<usize>);

impl GroupStat {
    /// A zeroed table for `len` group ids.
    pub fn new(len: usize) -> Self {
        Self(vec![0; len])
    }

    /// Count the distinct groups of a recipe
    pub fn add(&mut self, recipe: &Recipe) {
        for group in recipe.unique_groups() {
            let i = group as usize;
            if i >= self.0.len() {
                self.0.resize(i + 1, 0);
            }
            self.0[i] += 1;
        }
    }

    /// Add another table into this one.
    pub fn merge(&mut self, other: &GroupStat) {
        if other.0.len() > self.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (count, add) in self.0.iter_mut().zip(&other.0) {
            *count += add;
        }
    }

    pub fn get(&self, group: GroupId) -> usize {
        self.0.get(group as usize).copied().unwrap_or(0)
    }

    /// Groups with a non-zero count.
    pub fn used_groups(&self) -> impl Iterator<Item = (GroupId, usize)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(group, count)| (group as GroupId, *count))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}
