// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::rt::System;
use actix_web::{App, HttpServer, middleware::Logger, web};
use log::{LevelFilter, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pantry::api;
use pantry::bootstrap::{self, BootstrapResult};
use pantry::config::ValidatedConfig;
use pantry::iam::{JwtAuthMiddlewareFactory, UserServices};
use pantry::recipes::{FileRecipeStore, RecipeService};
use pantry::runtime_paths::RuntimePaths;

const HELP_TEXT: &str = "Usage: pantry [-C <root>] [command]\n\n\
Commands:\n  \
(none)                                  Start the API server\n  \
createsuperuser <email> <password>      Create a staff superuser and exit\n  \
help                                    Show this message\n\n\
Options:\n  \
-C <root>                               Runtime directory (default: current directory)\n  \
-h, --help                              Show this message\n";

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("❌ Use -C <root> to set the runtime directory, or help for usage.");
            return 1;
        }
    };

    if matches!(parsed_args.mode, RunMode::Help) {
        print!("{}", HELP_TEXT);
        return 0;
    }

    let bootstrap = match bootstrap::bootstrap_runtime(&parsed_args.runtime_root) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("❌ Bootstrap error: {}", error);
            eprintln!("❌ Application cannot start with invalid configuration.");
            return 1;
        }
    };

    if let Err(error) = init_logging(&bootstrap.validated_config) {
        eprintln!("❌ Failed to initialize logger: {}", error);
        return 1;
    }

    match parsed_args.mode {
        RunMode::CreateSuperuser { email, password } => {
            System::new().block_on(create_superuser(bootstrap, &email, &password))
        }
        _ => match System::new().block_on(run_server(bootstrap)) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("❌ Server failed to start: {}", error);
                1
            }
        },
    }
}

fn init_logging(config: &ValidatedConfig) -> Result<(), log::SetLoggerError> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    // Configure logging with a stable format
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
}

async fn create_superuser(bootstrap: BootstrapResult, email: &str, password: &str) -> i32 {
    let user_services = match UserServices::new(
        &bootstrap.validated_config,
        bootstrap.runtime_paths.users_file.clone(),
    ) {
        Ok(services) => services,
        Err(error) => {
            eprintln!("❌ Failed to initialize user services: {}", error);
            return 1;
        }
    };

    match user_services.create_superuser(email, password).await {
        Ok(user) => {
            println!("Superuser {} created (id {}).", user.email, user.id);
            0
        }
        Err(error) => {
            eprintln!("❌ Failed to create superuser: {}", error);
            1
        }
    }
}

async fn run_server(bootstrap: BootstrapResult) -> std::io::Result<()> {
    let validated_config = Arc::new(bootstrap.validated_config);
    let runtime_paths = bootstrap.runtime_paths;

    log_startup_info(&validated_config, &runtime_paths);

    let user_services =
        match UserServices::new(&validated_config, runtime_paths.users_file.clone()) {
            Ok(services) => Arc::new(services),
            Err(error) => {
                eprintln!("❌ Failed to initialize user services: {}", error);
                eprintln!("❌ Application cannot start without user services.");
                return Err(std::io::Error::other(error.to_string()));
            }
        };
    info!("✅ User services initialized successfully");

    let recipe_service = match FileRecipeStore::new(runtime_paths.recipes_file.clone())
        .and_then(|store| RecipeService::new(Arc::new(store)))
    {
        Ok(service) => Arc::new(service),
        Err(error) => {
            eprintln!("❌ Failed to initialize recipe store: {}", error);
            return Err(std::io::Error::other(error.to_string()));
        }
    };
    info!("✅ Recipe store initialized successfully");

    let workers = validated_config.server.workers;
    let factory = {
        let config_for_app = validated_config.clone();
        let user_services = user_services.clone();
        let recipe_service = recipe_service.clone();

        move || {
            App::new()
                .app_data(web::Data::from(config_for_app.clone()))
                .app_data(web::Data::from(user_services.clone()))
                .app_data(web::Data::from(recipe_service.clone()))
                .wrap(JwtAuthMiddlewareFactory)
                .wrap(Logger::new(
                    r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
                ))
                .configure(api::configure)
        }
    };

    HttpServer::new(factory)
        .workers(workers)
        .bind(validated_config.server.address_tuple())?
        .run()
        .await
}

fn log_startup_info(config: &ValidatedConfig, runtime_paths: &RuntimePaths) {
    info!("Starting {} - {}", config.app.name, config.app.description);
    info!("Workers: {}", config.server.workers);
    info!(
        "Listening on {}:{}",
        config.server.host, config.server.port
    );
    info!("Config file: {}", runtime_paths.config_file.display());
    info!("Users file: {}", runtime_paths.users_file.display());
    info!("Recipes file: {}", runtime_paths.recipes_file.display());
    info!("Runtime root: {}", runtime_paths.root.display());
}

#[derive(Debug)]
enum RunMode {
    Serve,
    CreateSuperuser { email: String, password: String },
    Help,
}

struct ParsedArgs {
    runtime_root: PathBuf,
    mode: RunMode,
}

fn parse_args() -> Result<ParsedArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.iter().any(|arg| is_help_flag(arg)) {
        return Ok(ParsedArgs {
            runtime_root: PathBuf::from("."),
            mode: RunMode::Help,
        });
    }

    let mut args = args.into_iter();
    let mut runtime_root = PathBuf::from(".");
    let mut command = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" {
            continue;
        } else if arg == "-C" {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = PathBuf::from(value);
        } else {
            command.push(arg);
        }
    }

    let mode = match command.as_slice() {
        [] => RunMode::Serve,
        [help] if help.eq_ignore_ascii_case("help") => RunMode::Help,
        [name, email, password] if name == "createsuperuser" => RunMode::CreateSuperuser {
            email: email.clone(),
            password: password.clone(),
        },
        [name, ..] if name == "createsuperuser" => {
            return Err("createsuperuser expects <email> <password>".to_string());
        }
        [name, ..] => return Err(format!("Unknown command: {}", name)),
    };

    let runtime_root = make_runtime_root_absolute(&runtime_root)?;
    Ok(ParsedArgs { runtime_root, mode })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn make_runtime_root_absolute(runtime_root: &Path) -> Result<PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root.to_path_buf());
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}
