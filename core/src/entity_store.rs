//! The Entity Store (spec §4.B): deduplicates non-lexeme references such as
//! the person in a `named-after` relation.

use std::collections::HashMap;

use crate::node::{Entity, EntityIdx, NodeRef};

#[derive(Default)]
pub struct EntityStore {
    arena: Vec<Entity>,
    by_name: HashMap<String, Vec<EntityIdx>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, idx: EntityIdx) -> &Entity {
        &self.arena[idx as usize]
    }

    pub fn candidates(&self, name: &str) -> &[EntityIdx] {
        self.by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Looks up `name` in the name-indexed bucket, builds a candidate `e`
    /// from `entity` (or a bare `Entity::new(name)` if none), attempts to
    /// merge it into an existing bucket entry, and otherwise appends it.
    pub fn identify(&mut self, name: &str, entity: Option<Entity>) -> NodeRef {
        let candidate = entity.unwrap_or_else(|| Entity::new(name));
        let bucket = self.by_name.entry(name.to_owned()).or_default();
        for &idx in bucket.iter() {
            if try_merge(&mut self.arena[idx as usize], &candidate) {
                return NodeRef::Entity(idx);
            }
        }
        let idx = self.arena.len() as EntityIdx;
        self.arena.push(candidate);
        self.by_name.get_mut(name).unwrap().push(idx);
        NodeRef::Entity(idx)
    }
}

/// Merges `e2` into `e1` if, for every attribute in
/// `{wplink, born, died, nationality}`, either side is empty or the values
/// are equal. Occupation is concatenated with `"; "`; the rest is filled in
/// only where `e1` was previously empty.
fn try_merge(e1: &mut Entity, e2: &Entity) -> bool {
    let compatible = |a: &Option<String>, b: &Option<String>| match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    };
    if !compatible(&e1.wplink, &e2.wplink)
        || !compatible(&e1.born, &e2.born)
        || !compatible(&e1.died, &e2.died)
        || !compatible(&e1.nationality, &e2.nationality)
    {
        return false;
    }
    e1.occupation = match (&e1.occupation, &e2.occupation) {
        (Some(a), Some(b)) => Some(format!("{a}; {b}")),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    };
    e1.nationality = e1.nationality.take().or_else(|| e2.nationality.clone());
    e1.born = e1.born.take().or_else(|| e2.born.clone());
    e1.died = e1.died.take().or_else(|| e2.died.clone());
    e1.wplink = e1.wplink.take().or_else(|| e2.wplink.clone());
    true
}
