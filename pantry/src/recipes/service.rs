// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::store::RecipeStore;
use super::types::{
    MAX_LINK_CHARS, MAX_TAG_NAME_CHARS, MAX_TITLE_CHARS, Recipe, RecipeChanges, RecipeDraft,
    RecipeError, RecipeId, RecipesData, Tag, TagId,
};
use crate::iam::UserId;
use crate::security::validate_text_field;
use std::sync::{Arc, RwLock};

/// Tags and recipes of all users. Every query is scoped to one owner.
pub struct RecipeService {
    store: Arc<dyn RecipeStore>,
    data: RwLock<RecipesData>,
}

impl RecipeService {
    pub fn new(store: Arc<dyn RecipeStore>) -> Result<Self, RecipeError> {
        let data = store.load()?;
        log::info!(
            "Loaded {} tag(s) and {} recipe(s)",
            data.tags.len(),
            data.recipes.len()
        );
        Ok(Self {
            store,
            data: RwLock::new(data),
        })
    }

    fn read<T>(&self, f: impl FnOnce(&RecipesData) -> T) -> Result<T, RecipeError> {
        let guard = self.data.read().map_err(|_| RecipeError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Applies `f` to a copy of the data, persists it, then makes it current.
    /// Nothing changes in memory if `f` or the save fails.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RecipesData) -> Result<T, RecipeError>,
    ) -> Result<T, RecipeError> {
        let mut guard = self.data.write().map_err(|_| RecipeError::LockPoisoned)?;
        let mut next = guard.clone();
        let result = f(&mut next)?;
        self.store.save(&next)?;
        *guard = next;
        Ok(result)
    }

    /// The user's tags, ordered by name descending.
    pub fn list_tags(&self, user_id: UserId) -> Result<Vec<Tag>, RecipeError> {
        self.read(|data| {
            let mut tags: Vec<Tag> = data
                .tags
                .values()
                .filter(|tag| tag.user_id == user_id)
                .cloned()
                .collect();
            tags.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));
            tags
        })
    }

    pub fn get_tag(&self, user_id: UserId, tag_id: TagId) -> Result<Tag, RecipeError> {
        self.read(|data| owned_tag(data, user_id, tag_id).cloned())?
    }

    pub fn create_tag(&self, user_id: UserId, name: &str) -> Result<Tag, RecipeError> {
        let name = validate_tag_name(name)?;
        let tag = self.mutate(|data| {
            let tag = Tag {
                id: data.next_tag_id,
                user_id,
                name,
            };
            data.next_tag_id = next_id(tag.id, "tag")?;
            data.tags.insert(tag.id, tag.clone());
            Ok(tag)
        })?;
        log::info!("User {} created tag {}", user_id, tag.id);
        Ok(tag)
    }

    pub fn rename_tag(&self, user_id: UserId, tag_id: TagId, name: &str) -> Result<Tag, RecipeError> {
        let name = validate_tag_name(name)?;
        self.mutate(|data| {
            owned_tag(data, user_id, tag_id)?;
            let tag = data.tags.get_mut(&tag_id).ok_or(RecipeError::NotFound)?;
            tag.name = name;
            Ok(tag.clone())
        })
    }

    /// Removes the tag and detaches it from the owner's recipes.
    pub fn delete_tag(&self, user_id: UserId, tag_id: TagId) -> Result<(), RecipeError> {
        self.mutate(|data| {
            owned_tag(data, user_id, tag_id)?;
            data.tags.remove(&tag_id);
            for recipe in data.recipes.values_mut() {
                if recipe.user_id == user_id {
                    recipe.tags.retain(|id| *id != tag_id);
                }
            }
            Ok(())
        })?;
        log::info!("User {} deleted tag {}", user_id, tag_id);
        Ok(())
    }

    /// The user's recipes, newest first. With `tag_filter`, only recipes carrying any of those tags.
    pub fn list_recipes(
        &self,
        user_id: UserId,
        tag_filter: Option<&[TagId]>,
    ) -> Result<Vec<Recipe>, RecipeError> {
        self.read(|data| {
            data.recipes
                .values()
                .rev()
                .filter(|recipe| recipe.user_id == user_id)
                .filter(|recipe| match tag_filter {
                    Some(filter) => recipe.tags.iter().any(|id| filter.contains(id)),
                    None => true,
                })
                .cloned()
                .collect()
        })
    }

    pub fn get_recipe(&self, user_id: UserId, recipe_id: RecipeId) -> Result<Recipe, RecipeError> {
        self.read(|data| owned_recipe(data, user_id, recipe_id).cloned())?
    }

    /// Tags of `recipe` in the order they were attached.
    pub fn recipe_tags(&self, recipe: &Recipe) -> Result<Vec<Tag>, RecipeError> {
        self.read(|data| {
            recipe
                .tags
                .iter()
                .filter_map(|id| data.tags.get(id))
                .filter(|tag| tag.user_id == recipe.user_id)
                .cloned()
                .collect()
        })
    }

    pub fn create_recipe(&self, user_id: UserId, draft: RecipeDraft) -> Result<Recipe, RecipeError> {
        let title = validate_text_field("Title", &draft.title, MAX_TITLE_CHARS)
            .map_err(|msg| RecipeError::validation("title", msg))?;
        let link = validate_link(&draft.link)?;
        let recipe = self.mutate(|data| {
            let tags = resolve_tags(data, user_id, &draft.tags)?;
            let recipe = Recipe {
                id: data.next_recipe_id,
                user_id,
                title,
                time_minutes: draft.time_minutes,
                price: draft.price,
                link,
                tags,
            };
            data.next_recipe_id = next_id(recipe.id, "recipe")?;
            data.recipes.insert(recipe.id, recipe.clone());
            Ok(recipe)
        })?;
        log::info!("User {} created recipe {}", user_id, recipe.id);
        Ok(recipe)
    }

    pub fn update_recipe(
        &self,
        user_id: UserId,
        recipe_id: RecipeId,
        changes: RecipeChanges,
    ) -> Result<Recipe, RecipeError> {
        let title = match changes.title.as_deref() {
            Some(title) => Some(
                validate_text_field("Title", title, MAX_TITLE_CHARS)
                    .map_err(|msg| RecipeError::validation("title", msg))?,
            ),
            None => None,
        };
        let link = match changes.link.as_deref() {
            Some(link) => Some(validate_link(link)?),
            None => None,
        };

        self.mutate(|data| {
            owned_recipe(data, user_id, recipe_id)?;
            let tags = match changes.tags.as_deref() {
                Some(ids) => Some(resolve_tags(data, user_id, ids)?),
                None => None,
            };
            let recipe = data
                .recipes
                .get_mut(&recipe_id)
                .ok_or(RecipeError::NotFound)?;
            if let Some(title) = title {
                recipe.title = title;
            }
            if let Some(time_minutes) = changes.time_minutes {
                recipe.time_minutes = time_minutes;
            }
            if let Some(price) = changes.price {
                recipe.price = price;
            }
            if let Some(link) = link {
                recipe.link = link;
            }
            if let Some(tags) = tags {
                recipe.tags = tags;
            }
            Ok(recipe.clone())
        })
    }

    pub fn delete_recipe(&self, user_id: UserId, recipe_id: RecipeId) -> Result<(), RecipeError> {
        self.mutate(|data| {
            owned_recipe(data, user_id, recipe_id)?;
            data.recipes.remove(&recipe_id);
            Ok(())
        })?;
        log::info!("User {} deleted recipe {}", user_id, recipe_id);
        Ok(())
    }
}

// Other users' rows are reported as missing.
fn next_id(assigned: u64, kind: &str) -> Result<u64, RecipeError> {
    assigned
        .checked_add(1)
        .ok_or_else(|| RecipeError::Store(format!("No {} ids left after {}", kind, assigned)))
}

fn owned_tag(data: &RecipesData, user_id: UserId, tag_id: TagId) -> Result<&Tag, RecipeError> {
    data.tags
        .get(&tag_id)
        .filter(|tag| tag.user_id == user_id)
        .ok_or(RecipeError::NotFound)
}

fn owned_recipe(
    data: &RecipesData,
    user_id: UserId,
    recipe_id: RecipeId,
) -> Result<&Recipe, RecipeError> {
    data.recipes
        .get(&recipe_id)
        .filter(|recipe| recipe.user_id == user_id)
        .ok_or(RecipeError::NotFound)
}

fn resolve_tags(
    data: &RecipesData,
    user_id: UserId,
    ids: &[TagId],
) -> Result<Vec<TagId>, RecipeError> {
    let mut resolved: Vec<TagId> = Vec::with_capacity(ids.len());
    for id in ids {
        if owned_tag(data, user_id, *id).is_err() {
            return Err(RecipeError::validation(
                "tags",
                format!("Invalid pk \"{}\" - object does not exist.", id),
            ));
        }
        if !resolved.contains(id) {
            resolved.push(*id);
        }
    }
    Ok(resolved)
}

fn validate_tag_name(name: &str) -> Result<String, RecipeError> {
    validate_text_field("Name", name, MAX_TAG_NAME_CHARS)
        .map_err(|msg| RecipeError::validation("name", msg))
}

fn validate_link(link: &str) -> Result<String, RecipeError> {
    let link = link.trim();
    if link.chars().count() > MAX_LINK_CHARS {
        return Err(RecipeError::validation(
            "link",
            format!("Link must be at most {} characters", MAX_LINK_CHARS),
        ));
    }
    Ok(link.to_string())
}
