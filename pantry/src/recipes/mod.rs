// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod service;
mod store;
mod types;

pub use service::RecipeService;
#[cfg(test)]
pub use store::MemoryRecipeStore;
pub use store::{FileRecipeStore, RecipeStore};
pub use types::{
    MAX_LINK_CHARS, MAX_TAG_NAME_CHARS, MAX_TITLE_CHARS, Price, Recipe, RecipeChanges,
    RecipeDraft, RecipeError, RecipeId, RecipesData, Tag, TagId,
};
