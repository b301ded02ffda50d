// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, AuthenticatedUser, FIELD_REQUIRED};
use crate::recipes::{RecipeService, Tag, TagId};
use crate::util::blocking::run_blocking;

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TagResponse {
    pub id: TagId,
    pub name: String,
}

impl From<&Tag> for TagResponse {
    fn from(tag: &Tag) -> Self {
        TagResponse {
            id: tag.id,
            name: tag.name.clone(),
        }
    }
}

fn name_from(body: TagRequest) -> Result<String, ApiError> {
    body.name.ok_or_else(|| ApiError::field("name", FIELD_REQUIRED))
}

pub async fn list_tags(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
) -> Result<HttpResponse, ApiError> {
    let tags: Vec<TagResponse> = recipes
        .list_tags(user.id)?
        .iter()
        .map(TagResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(tags))
}

pub async fn create_tag(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    body: web::Json<TagRequest>,
) -> Result<HttpResponse, ApiError> {
    let name = name_from(body.into_inner())?;
    let recipes = recipes.into_inner();
    let tag = run_blocking("create tag", move || recipes.create_tag(user.id, &name)).await??;
    Ok(HttpResponse::Created().json(TagResponse::from(&tag)))
}

pub async fn get_tag(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    path: web::Path<TagId>,
) -> Result<HttpResponse, ApiError> {
    let tag = recipes.get_tag(user.id, path.into_inner())?;
    Ok(HttpResponse::Ok().json(TagResponse::from(&tag)))
}

pub async fn update_tag(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    path: web::Path<TagId>,
    body: web::Json<TagRequest>,
) -> Result<HttpResponse, ApiError> {
    let tag_id = path.into_inner();
    let tag = match body.into_inner().name {
        Some(name) => {
            let recipes = recipes.into_inner();
            run_blocking("rename tag", move || recipes.rename_tag(user.id, tag_id, &name))
                .await??
        }
        None => recipes.get_tag(user.id, tag_id)?,
    };
    Ok(HttpResponse::Ok().json(TagResponse::from(&tag)))
}

pub async fn delete_tag(
    AuthenticatedUser(user): AuthenticatedUser,
    recipes: web::Data<RecipeService>,
    path: web::Path<TagId>,
) -> Result<HttpResponse, ApiError> {
    let tag_id = path.into_inner();
    let recipes = recipes.into_inner();
    run_blocking("delete tag", move || recipes.delete_tag(user.id, tag_id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
