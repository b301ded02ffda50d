// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{RecipeError, RecipesData};
use crate::util::yaml_store::{read_yaml_file, write_yaml_file};
use std::path::PathBuf;

#[cfg(test)]
use std::sync::RwLock;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

const RECIPES_LABEL: &str = "recipes";

pub trait RecipeStore: Send + Sync {
    fn load(&self) -> Result<RecipesData, RecipeError>;
    fn save(&self, data: &RecipesData) -> Result<(), RecipeError>;
}

pub struct FileRecipeStore {
    recipes_file: PathBuf,
}

impl FileRecipeStore {
    pub fn new(recipes_file: PathBuf) -> Result<Self, RecipeError> {
        if recipes_file.as_os_str().is_empty() {
            return Err(RecipeError::Store("Recipes file path is empty".to_string()));
        }
        Ok(Self { recipes_file })
    }
}

impl RecipeStore for FileRecipeStore {
    fn load(&self) -> Result<RecipesData, RecipeError> {
        let data: RecipesData = read_yaml_file(&self.recipes_file, RECIPES_LABEL)
            .map_err(|e| RecipeError::Store(e.to_string()))?
            .unwrap_or_default();
        normalize(data)
    }

    fn save(&self, data: &RecipesData) -> Result<(), RecipeError> {
        write_yaml_file(&self.recipes_file, RECIPES_LABEL, data)
            .map_err(|e| RecipeError::Store(e.to_string()))
    }
}

/// Checks the loaded file for consistency and moves id counters past existing ids.
fn normalize(mut data: RecipesData) -> Result<RecipesData, RecipeError> {
    for (id, tag) in &data.tags {
        if *id == 0 || tag.id != *id {
            return Err(RecipeError::Store(format!(
                "Tag entry {} has mismatched id {}",
                id, tag.id
            )));
        }
    }
    for (id, recipe) in &data.recipes {
        if *id == 0 || recipe.id != *id {
            return Err(RecipeError::Store(format!(
                "Recipe entry {} has mismatched id {}",
                id, recipe.id
            )));
        }
        for tag_id in &recipe.tags {
            match data.tags.get(tag_id) {
                Some(tag) if tag.user_id == recipe.user_id => {}
                _ => {
                    return Err(RecipeError::Store(format!(
                        "Recipe {} references unknown tag {}",
                        id, tag_id
                    )));
                }
            }
        }
    }

    let min_tag_id = id_after(data.tags.keys().next_back(), "tag")?;
    let min_recipe_id = id_after(data.recipes.keys().next_back(), "recipe")?;
    if data.next_tag_id < min_tag_id {
        log::warn!(
            "recipes.yaml next_tag_id {} is behind existing tags; using {}",
            data.next_tag_id,
            min_tag_id
        );
        data.next_tag_id = min_tag_id;
    }
    if data.next_recipe_id < min_recipe_id {
        log::warn!(
            "recipes.yaml next_recipe_id {} is behind existing recipes; using {}",
            data.next_recipe_id,
            min_recipe_id
        );
        data.next_recipe_id = min_recipe_id;
    }
    Ok(data)
}

/// First free id after `last`, or 1 for an empty table.
fn id_after(last: Option<&u64>, kind: &str) -> Result<u64, RecipeError> {
    match last {
        None => Ok(1),
        Some(id) => id
            .checked_add(1)
            .ok_or_else(|| RecipeError::Store(format!("No {} ids left after {}", kind, id))),
    }
}

#[cfg(test)]
pub struct MemoryRecipeStore {
    data: RwLock<RecipesData>,
    fail_saves: AtomicBool,
}

#[cfg(test)]
impl MemoryRecipeStore {
    pub fn new(initial: RecipesData) -> Self {
        Self {
            data: RwLock::new(initial),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl RecipeStore for MemoryRecipeStore {
    fn load(&self) -> Result<RecipesData, RecipeError> {
        match self.data.read() {
            Ok(guard) => Ok(guard.clone()),
            Err(poisoned) => Ok(poisoned.into_inner().clone()),
        }
    }

    fn save(&self, data: &RecipesData) -> Result<(), RecipeError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RecipeError::Store("save disabled".to_string()));
        }
        match self.data.write() {
            Ok(mut guard) => *guard = data.clone(),
            Err(poisoned) => *poisoned.into_inner() = data.clone(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::types::{Price, Recipe, Tag};

    fn sample_data() -> RecipesData {
        let mut data = RecipesData::default();
        data.tags.insert(
            3,
            Tag {
                id: 3,
                user_id: 1,
                name: "Vegan".to_string(),
            },
        );
        data.recipes.insert(
            5,
            Recipe {
                id: 5,
                user_id: 1,
                title: "Chickpea curry".to_string(),
                time_minutes: 25,
                price: Price::from_cents(550),
                link: String::new(),
                tags: vec![3],
            },
        );
        data
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileRecipeStore::new(dir.path().join("recipes.yaml")).expect("store");
        let data = store.load().expect("load");
        assert_eq!(data, RecipesData::default());
    }

    #[test]
    fn save_and_load_keeps_data_and_advances_counters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recipes.yaml");
        let store = FileRecipeStore::new(path.clone()).expect("store");
        store.save(&sample_data()).expect("save");

        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.contains("Chickpea curry"));
        assert!(content.contains("price_cents: 550"));

        let loaded = store.load().expect("load");
        assert_eq!(loaded.tags.len(), 1);
        assert_eq!(loaded.recipes[&5].tags, vec![3]);
        assert_eq!(loaded.next_tag_id, 4);
        assert_eq!(loaded.next_recipe_id, 6);
    }

    #[test]
    fn load_rejects_foreign_tag_reference() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recipes.yaml");
        let mut data = sample_data();
        if let Some(tag) = data.tags.get_mut(&3) {
            tag.user_id = 2;
        }
        let store = FileRecipeStore::new(path).expect("store");
        store.save(&data).expect("save");

        let err = store.load().expect_err("foreign tag");
        assert!(err.to_string().contains("unknown tag 3"));
    }

    #[test]
    fn load_rejects_mismatched_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recipes.yaml");
        let mut data = sample_data();
        if let Some(recipe) = data.recipes.get_mut(&5) {
            recipe.id = 9;
        }
        let store = FileRecipeStore::new(path).expect("store");
        store.save(&data).expect("save");
        assert!(store.load().is_err());
    }

    #[test]
    fn load_rejects_exhausted_tag_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recipes.yaml");
        let mut data = RecipesData::default();
        data.tags.insert(
            u64::MAX,
            Tag {
                id: u64::MAX,
                user_id: 1,
                name: "Last".to_string(),
            },
        );
        let store = FileRecipeStore::new(path).expect("store");
        store.save(&data).expect("save");

        let err = store.load().expect_err("no ids left");
        assert!(matches!(err, RecipeError::Store(_)));
        assert!(err.to_string().contains("No tag ids left"));
    }

    #[test]
    fn empty_path_rejected() {
        assert!(FileRecipeStore::new(PathBuf::new()).is_err());
    }
}
