//! Minefield game sessions served over HTTP.
//!
//! Each session owns one [`Board`]: mines are placed when the game is
//! created, and every turn reveals a cell, flooding outward through cells
//! with no orthogonally adjacent mines. Sessions live in a
//! [`SessionRegistry`] and are evicted once idle for too long.

pub mod cleanup;
pub mod config;
pub mod cors;
pub mod data;
pub mod error;
pub mod logic;
pub mod model;
pub mod rate_limit;
pub mod routes;

pub use config::Settings;
pub use data::{Board, Cell, CellContent, GameStatus, Pos};
pub use error::{ApiError, SessionError, StartupError, ValidationError};
pub use logic::{RetentionPolicy, RevealOutcome, SessionRegistry, render};
pub use model::{GameInfo, GameParams, TurnRequest};

use rocket::{Build, Rocket, catchers, routes};

use crate::{cleanup::CleanupFairing, cors::create_cors, rate_limit::RateLimiter};

/// Assembles the server: managed state, fairings, routes and catchers.
pub fn build(settings: Settings) -> Result<Rocket<Build>, StartupError> {
    let cors = create_cors(&settings.cors_allowed_origins)?;
    let cleanup = CleanupFairing {
        every: settings.cleanup_interval,
        policy: settings.retention,
    };

    Ok(rocket::build()
        .attach(cors)
        .attach(cleanup)
        .manage(SessionRegistry::new())
        .manage(RateLimiter::per_minute(settings.games_per_minute))
        .manage(settings)
        .mount(
            "/",
            routes![
                routes::index,
                routes::create_game,
                routes::take_turn,
                routes::get_game,
                routes::close_game
            ],
        )
        .register(
            "/",
            catchers![routes::bad_request, routes::not_found, routes::unprocessable],
        ))
}
