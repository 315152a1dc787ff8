use crate::error::DatabaseError;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Ordinal id of an ingredient.
pub type ActorId = u16;
/// Ordinal id of a group of interchangeable ingredients.
pub type GroupId = u16;

/// The group id used for an empty ingredient slot.
pub const EMPTY_GROUP: GroupId = 0;

/// A single ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorDef {
    pub id: ActorId,
    pub name: String,
}

/// A group of interchangeable ingredients, the unit of filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    pub id: GroupId,
    pub name: String,
    /// Every actor in the group is only obtainable through prompt entanglement
    #[serde(default)]
    pub pe_only: bool,
    pub actors: Vec<ActorDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    groups: Vec<GroupDef>,
}

/// Ingredient catalog of a database: which actors exist and how they group.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: Vec<GroupDef>,
    /// group id -> position in `groups`
    by_id: AHashMap<GroupId, usize>,
    /// actor id -> owning group
    actor_group: AHashMap<ActorId, GroupId>,
    max_group_id: GroupId,
}

impl Catalog {
    /// Build a catalog from group definitions, validating ids.
    pub fn new(groups: Vec<GroupDef>) -> Result<Self, DatabaseError> {
        let mut by_id = AHashMap::with_capacity(groups.len());
        let mut actor_group = AHashMap::new();
        let mut max_group_id = EMPTY_GROUP;

        for (i, group) in groups.iter().enumerate() {
            if group.id == EMPTY_GROUP {
                return Err(DatabaseError::InvalidCatalog(format!(
                    "group '{}' uses the reserved id {}",
                    group.name, EMPTY_GROUP
                )));
            }
            if by_id.insert(group.id, i).is_some() {
                return Err(DatabaseError::InvalidCatalog(format!(
                    "duplicate group id {}",
                    group.id
                )));
            }
            if group.actors.is_empty() {
                return Err(DatabaseError::InvalidCatalog(format!(
                    "group {} ('{}') has no actors",
                    group.id, group.name
                )));
            }
            for actor in &group.actors {
                if let Some(other) = actor_group.insert(actor.id, group.id) {
                    return Err(DatabaseError::InvalidCatalog(format!(
                        "actor {} belongs to both group {} and group {}",
                        actor.id, other, group.id
                    )));
                }
            }
            max_group_id = max_group_id.max(group.id);
        }

        Ok(Self {
            groups,
            by_id,
            actor_group,
            max_group_id,
        })
    }

    /// Load `catalog.yaml`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatabaseError::MissingCatalog);
        }
        let reader = BufReader::new(File::open(path)?);
        let file: CatalogFile = serde_yaml::from_reader(reader)?;
        Self::new(file.groups)
    }

    /// Save as `catalog.yaml`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatabaseError> {
        let writer = BufWriter::new(File::create(path)?);
        let file = CatalogFile {
            groups: self.groups.clone(),
        };
        serde_yaml::to_writer(writer, &file)?;
        Ok(())
    }

    pub fn groups(&self) -> &[GroupDef] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupDef> {
        self.by_id.get(&id).map(|&i| &self.groups[i])
    }

    pub fn contains_group(&self, id: GroupId) -> bool {
        id == EMPTY_GROUP || self.by_id.contains_key(&id)
    }

    /// Actors of a group. The empty group has none.
    pub fn actors_of(&self, id: GroupId) -> impl Iterator<Item = ActorId> + '_ {
        self.group(id)
            .into_iter()
            .flat_map(|group| group.actors.iter().map(|actor| actor.id))
    }

    /// The group an actor belongs to.
    pub fn group_of(&self, actor: ActorId) -> Option<GroupId> {
        self.actor_group.get(&actor).copied()
    }

    pub fn is_pe_only(&self, id: GroupId) -> bool {
        self.group(id).is_some_and(|group| group.pe_only)
    }

    /// Size of a dense table indexed by group id.
    pub fn group_table_len(&self) -> usize {
        self.max_group_id as usize + 1
    }

    /// Translate actor ids into the set of groups they belong to.
    ///
    /// Unknown actors are ignored.
    pub fn groups_of_actors(&self, actors: &[ActorId]) -> AHashSet<GroupId> {
        actors
            .iter()
            .filter_map(|actor| self.group_of(*actor))
            .collect()
    }
}
