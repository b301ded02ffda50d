// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::iam::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type TagId = u64;
pub type RecipeId = u64;

pub const MAX_TAG_NAME_CHARS: usize = 255;
pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_LINK_CHARS: usize = 255;

const PRICE_MAX_DIGITS: usize = 5;
const PRICE_DECIMAL_PLACES: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Tag {
    pub id: TagId,
    pub user_id: UserId,
    pub name: String,
}

/// Non-negative amount with two decimal places, kept in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    pub fn from_cents(cents: u64) -> Self {
        Price(cents)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    /// Parses a decimal string such as `5.00`, `12.5` or `7`.
    /// At most 5 digits in total, of which at most 2 after the point.
    pub fn parse(input: &str) -> Result<Price, String> {
        let trimmed = input.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err("A valid number is required.".to_string());
        }

        let whole = whole.trim_start_matches('0');
        if fraction.len() > PRICE_DECIMAL_PLACES {
            return Err(format!(
                "Ensure that there are no more than {} decimal places.",
                PRICE_DECIMAL_PLACES
            ));
        }
        if whole.len() > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
            return Err(format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES
            ));
        }

        let whole_value: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| "A valid number is required.".to_string())?
        };
        let mut fraction_value: u64 = 0;
        for (index, digit) in fraction.chars().enumerate() {
            let digit = digit.to_digit(10).unwrap_or(0) as u64;
            fraction_value += if index == 0 { digit * 10 } else { digit };
        }
        Ok(Price(whole_value * 100 + fraction_value))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub id: RecipeId,
    pub user_id: UserId,
    pub title: String,
    pub time_minutes: u32,
    #[serde(rename = "price_cents")]
    pub price: Price,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

/// Input for a new recipe. `tags` are ids owned by the same user.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub title: String,
    pub time_minutes: u32,
    pub price: Price,
    pub link: String,
    pub tags: Vec<TagId>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<u32>,
    pub price: Option<Price>,
    pub link: Option<String>,
    pub tags: Option<Vec<TagId>>,
}

fn first_id() -> u64 {
    1
}

/// Contents of `state/recipes.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RecipesData {
    #[serde(default = "first_id")]
    pub next_tag_id: TagId,
    #[serde(default = "first_id")]
    pub next_recipe_id: RecipeId,
    #[serde(default)]
    pub tags: BTreeMap<TagId, Tag>,
    #[serde(default)]
    pub recipes: BTreeMap<RecipeId, Recipe>,
}

impl Default for RecipesData {
    fn default() -> Self {
        RecipesData {
            next_tag_id: first_id(),
            next_recipe_id: first_id(),
            tags: BTreeMap::new(),
            recipes: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
pub enum RecipeError {
    Validation { field: String, message: String },
    NotFound,
    Store(String),
    LockPoisoned,
}

impl RecipeError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        RecipeError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RecipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeError::Validation { field, message } => write!(f, "{}: {}", field, message),
            RecipeError::NotFound => write!(f, "Not found"),
            RecipeError::Store(message) => write!(f, "Recipe store error: {}", message),
            RecipeError::LockPoisoned => write!(f, "Recipe store lock poisoned"),
        }
    }
}

impl std::error::Error for RecipeError {}
