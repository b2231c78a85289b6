use rocket::{
    Request, State, catch, delete, get, http::Status, post, serde::json::Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::Settings,
    error::{ApiError, ValidationError},
    logic::SessionRegistry,
    model::{ErrorBody, GameInfo, GameParams, ServiceInfo, TurnRequest},
    rate_limit::{ClientIp, RateLimiter},
};

#[get("/")]
pub fn index(settings: &State<Settings>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        title: settings.app_title.clone(),
        description: settings.app_description.clone(),
    })
}

#[post("/new", data = "<params>")]
#[instrument(level = "trace", skip(registry, rate_limiter), fields(client_ip = %client_ip.0, width = params.width, height = params.height, mines = params.mine_count))]
pub fn create_game(
    params: Json<GameParams>,
    registry: &State<SessionRegistry>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<GameInfo>, ApiError> {
    info!(
        "Game creation request from {}: {}x{} with {} mines",
        client_ip.0, params.width, params.height, params.mine_count
    );

    params.validate().inspect_err(|e| {
        warn!("Rejected game parameters from {}: {}", client_ip.0, e);
    })?;
    rate_limiter.check(client_ip.0)?;

    let info = registry.create_session(params.into_inner())?;
    Ok(Json(info))
}

#[post("/turn", data = "<turn>")]
#[instrument(level = "trace", skip(registry), fields(game_id = %turn.game_id, row = turn.row, col = turn.col))]
pub async fn take_turn(
    turn: Json<TurnRequest>,
    registry: &State<SessionRegistry>,
) -> Result<Json<GameInfo>, ApiError> {
    turn.validate()?;
    let info = registry.apply_turn(turn.game_id, turn.row, turn.col).await?;
    Ok(Json(info))
}

fn parse_id(id: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(id).map_err(|_| ValidationError::MalformedId(id.to_string()))
}

#[get("/game/<id>")]
#[instrument(level = "trace", skip(registry))]
pub async fn get_game(
    id: &str,
    registry: &State<SessionRegistry>,
) -> Result<Json<GameInfo>, ApiError> {
    let info = registry.view(parse_id(id)?).await?;
    Ok(Json(info))
}

#[delete("/game/<id>")]
#[instrument(level = "trace", skip(registry))]
pub fn close_game(id: &str, registry: &State<SessionRegistry>) -> Result<Status, ApiError> {
    registry.close_session(parse_id(id)?)?;
    Ok(Status::NoContent)
}

fn detail(status: Status, req: &Request<'_>) -> Json<ErrorBody> {
    let detail = match status.code {
        404 => format!("no route for {} {}", req.method(), req.uri()),
        _ => format!("{}: malformed request body", status.reason_lossy()),
    };
    Json(ErrorBody { detail })
}

#[catch(400)]
pub fn bad_request(req: &Request<'_>) -> Json<ErrorBody> {
    detail(Status::BadRequest, req)
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Json<ErrorBody> {
    detail(Status::NotFound, req)
}

#[catch(422)]
pub fn unprocessable(req: &Request<'_>) -> Json<ErrorBody> {
    detail(Status::UnprocessableEntity, req)
}
