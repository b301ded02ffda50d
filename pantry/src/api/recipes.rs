// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::{ApiError, AuthenticatedUser, FIELD_REQUIRED};
use super::tags::TagResponse;
use crate::iam::UserId;
use crate::recipes::{
    Price, Recipe, RecipeChanges, RecipeDraft, RecipeId, RecipeService, TagId,
};
use crate::util::blocking::run_blocking;

/// Prices arrive either as `"5.50"` or as a bare JSON number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Text(String),
    Number(serde_json::Number),
}

impl PriceInput {
    fn parse(&self) -> Result<Price, String> {
        match self {
            PriceInput::Text(text) => Price::parse(text),
            PriceInput::Number(number) => Price::parse(&number.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<u32>,
    pub price: Option<PriceInput>,
    pub link: Option<String>,
    pub tags: Option<Vec<TagId>>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeQuery {
    pub tags: Option<String>,
}

#[derive(Serialize)]
struct RecipeResponse {
    id: RecipeId,
    title: String,
    time_minutes: u32,
    price: String,
    link: String,
    tags: Vec<TagId>,
}

impl From<&Recipe> for RecipeResponse {
    fn from(recipe: &Recipe) -> Self {
        RecipeResponse {
            id: recipe.id,
            title: recipe.title.clone(),
            time_minutes: recipe.time_minutes,
            price: recipe.price.to_string(),
            link: recipe.link.clone(),
            tags: recipe.tags.clone(),
        }
    }
}

#[derive(Serialize)]
struct RecipeDetailResponse {
    id: RecipeId,
    title: String,
    time_minutes: u32,
    price: String,
    link: String,
    tags: Vec<TagResponse>,
}

fn detail_response(
    recipes: &RecipeService,
    recipe: &Recipe,
) -> Result<RecipeDetailResponse, ApiError> {
    let tags = recipes
        .recipe_tags(recipe)?
        .iter()
        .map(TagResponse::from)
        .collect();
    Ok(RecipeDetailResponse {
        id: recipe.id,
        title: recipe.title.clone(),
        time_minutes: recipe.time_minutes,
        price: recipe.price.to_string(),
        link: recipe.link.clone(),
        tags,
    })
}

/// Parses `?tags=1,2` into tag ids.
fn parse_tag_filter(raw: &str) -> Result<Vec<TagId>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<TagId>()
                .map_err(|_| ApiError::field("tags", format!("\"{}\" is not a valid tag id.", part)))
        })
        .collect()
}

/// Turns a full request body into a draft. Missing required fields are collected per field.
fn draft_from(body: RecipeRequest) -> Result<RecipeDraft, ApiError> {
    let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut push = |field: &str, message: String| {
        errors.entry(field.to_string()).or_default().push(message);
    };

    if body.title.is_none() {
        push("title", FIELD_REQUIRED.to_string());
    }
    if body.time_minutes.is_none() {
        push("time_minutes", FIELD_REQUIRED.to_string());
    }
    let price = match body.price.as_ref().map(PriceInput::parse) {
        Some(Ok(price)) => Some(price),
        Some(Err(message)) => {
            push("price", message);
            None
        }
        None => {
            push("price", FIELD_REQUIRED.to_string());
            None
        }
    };

    match (body.title, body.time_minutes, price) {
        (Some(title), Some(time_minutes), Some(price)) if errors.is_empty() => Ok(RecipeDraft {
            title,
            time_minutes,
            price,
            link: body.link.unwrap_or_default(),
            tags: body.tags.unwrap_or_default(),
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

fn changes_from(body: RecipeRequest) -> Result<RecipeChanges, ApiError> {
    let price = match body.price.as_ref() {
        Some(input) => Some(input.parse().map_err(|msg| ApiError::field("price", msg))?),
        None => None,
    };
    Ok(RecipeChanges {
        title: body.title,
        time_minutes: body.time_minutes,
        price,
        link: body.link,
        tags: body.tags,
    })
}

async fn update(
    recipes: web::Data<RecipeService>,
    user_id: UserId,
    recipe_id: RecipeId,
    changes: RecipeChanges,
) -> Result<Recipe, ApiError> {
    let recipes = recipes.into_inner();
    let recipe = run_blocking("update recipe", move || {
        recipes.update_recipe(user_id, recipe_id, changes)
    })
    .await??;
    Ok(recipe)
}

pub async fn list_recipes(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    query: web::Query<RecipeQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = match query.tags.as_deref() {
        Some(raw) => Some(parse_tag_filter(raw)?),
        None => None,
    };
    let items: Vec<RecipeResponse> = recipes
        .list_recipes(user.id, filter.as_deref())?
        .iter()
        .map(RecipeResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(items))
}

pub async fn create_recipe(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    body: web::Json<RecipeRequest>,
) -> Result<HttpResponse, ApiError> {
    let draft = draft_from(body.into_inner())?;
    let recipes = recipes.into_inner();
    let recipe =
        run_blocking("create recipe", move || recipes.create_recipe(user.id, draft)).await??;
    Ok(HttpResponse::Created().json(RecipeResponse::from(&recipe)))
}

pub async fn get_recipe(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    path: web::Path<RecipeId>,
) -> Result<HttpResponse, ApiError> {
    let recipe = recipes.get_recipe(user.id, path.into_inner())?;
    Ok(HttpResponse::Ok().json(detail_response(&recipes, &recipe)?))
}

pub async fn patch_recipe(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    path: web::Path<RecipeId>,
    body: web::Json<RecipeRequest>,
) -> Result<HttpResponse, ApiError> {
    let changes = changes_from(body.into_inner())?;
    let recipe = update(recipes, user.id, path.into_inner(), changes).await?;
    Ok(HttpResponse::Ok().json(RecipeResponse::from(&recipe)))
}

/// Full replacement; omitted `link` and `tags` are cleared.
pub async fn put_recipe(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    path: web::Path<RecipeId>,
    body: web::Json<RecipeRequest>,
) -> Result<HttpResponse, ApiError> {
    let draft = draft_from(body.into_inner())?;
    let changes = RecipeChanges {
        title: Some(draft.title),
        time_minutes: Some(draft.time_minutes),
        price: Some(draft.price),
        link: Some(draft.link),
        tags: Some(draft.tags),
    };
    let recipe = update(recipes, user.id, path.into_inner(), changes).await?;
    Ok(HttpResponse::Ok().json(RecipeResponse::from(&recipe)))
}

pub async fn delete_recipe(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    path: web::Path<RecipeId>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = path.into_inner();
    let recipes = recipes.into_inner();
    run_blocking("delete recipe", move || recipes.delete_recipe(user.id, recipe_id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: Option<&str>, price: Option<PriceInput>) -> RecipeRequest {
        RecipeRequest {
            title: title.map(str::to_string),
            time_minutes: Some(5),
            price,
            link: None,
            tags: None,
        }
    }

    #[test]
    fn tag_filter_parses_comma_separated_ids() {
        assert_eq!(parse_tag_filter("1,2, 3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_tag_filter("4,").unwrap(), vec![4]);
        assert!(parse_tag_filter("1,x").is_err());
    }

    #[test]
    fn draft_requires_title_and_price() {
        let err = draft_from(request(None, None)).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors["title"], vec![FIELD_REQUIRED.to_string()]);
        assert_eq!(errors["price"], vec![FIELD_REQUIRED.to_string()]);
        assert!(!errors.contains_key("time_minutes"));
    }

    #[test]
    fn draft_accepts_numeric_and_string_prices() {
        let number: serde_json::Number = serde_json::from_str("5.5").unwrap();
        let draft = draft_from(request(Some("Soup"), Some(PriceInput::Number(number)))).unwrap();
        assert_eq!(draft.price.cents(), 550);
        assert!(draft.tags.is_empty());
        assert_eq!(draft.link, "");

        let draft = draft_from(request(
            Some("Soup"),
            Some(PriceInput::Text("12.00".to_string())),
        ))
        .unwrap();
        assert_eq!(draft.price.cents(), 1200);
    }

    #[test]
    fn invalid_price_is_reported_on_price_field() {
        let err = draft_from(request(
            Some("Soup"),
            Some(PriceInput::Text("1234.5".to_string())),
        ))
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref errors) if errors.contains_key("price")));

        let err = changes_from(request(None, Some(PriceInput::Text("abc".to_string()))))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref errors) if errors.contains_key("price")));
    }
}
