// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::web;

pub mod error;
mod recipes;
mod tags;
mod user;

pub use error::ApiError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
            .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
            .service(
                web::scope("/user")
                    .route("/create/", web::post().to(user::create_user))
                    .route("/token/", web::post().to(user::create_token))
                    .service(
                        web::resource("/me/")
                            .route(web::get().to(user::get_me))
                            .route(web::patch().to(user::update_me)),
                    ),
            )
            .service(
                web::scope("/recipe")
                    .service(
                        web::resource("/tags/")
                            .route(web::get().to(tags::list_tags))
                            .route(web::post().to(tags::create_tag)),
                    )
                    .service(
                        web::resource("/tags/{id}/")
                            .route(web::get().to(tags::get_tag))
                            .route(web::patch().to(tags::update_tag))
                            .route(web::delete().to(tags::delete_tag)),
                    )
                    .service(
                        web::resource("/recipes/")
                            .route(web::get().to(recipes::list_recipes))
                            .route(web::post().to(recipes::create_recipe)),
                    )
                    .service(
                        web::resource("/recipes/{id}/")
                            .route(web::get().to(recipes::get_recipe))
                            .route(web::patch().to(recipes::patch_recipe))
                            .route(web::put().to(recipes::put_recipe))
                            .route(web::delete().to(recipes::delete_recipe)),
                    ),
            ),
    );
}
