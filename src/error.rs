use rocket::{
    Request,
    http::Status,
    response::{self, Responder, status},
    serde::json::Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{ErrorBody, MAX_COORD, MAX_MINES, MAX_SIDE, MIN_SIDE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "width and height must be within {}..={}, got {width}x{height}",
        MIN_SIDE,
        MAX_SIDE
    )]
    InvalidDimensions { width: usize, height: usize },
    #[error("mines_count must not exceed {}, got {mine_count}", MAX_MINES)]
    MineCountOutOfRange { mine_count: usize },
    #[error("mines_count must be less than the number of cells ({cells}), got {mine_count}")]
    TooManyMines { mine_count: usize, cells: usize },
    #[error("row and col must be within 0..={}, got ({row}, {col})", MAX_COORD)]
    TurnOutOfRange { row: usize, col: usize },
    #[error("malformed game id: {0}")]
    MalformedId(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("game {0} not found")]
    NotFound(Uuid),
    #[error("cell ({row}, {col}) is outside the {height}x{width} board")]
    InvalidCoordinate {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },
    #[error("placed only {placed} of {requested} mines")]
    PlacementExhausted { placed: usize, requested: usize },
}

impl SessionError {
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::UnprocessableEntity,
            Self::NotFound(_) => Status::NotFound,
            Self::InvalidCoordinate { .. } => Status::BadRequest,
            Self::PlacementExhausted { .. } => Status::InternalServerError,
        }
    }
}

/// Everything a route handler can fail with.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("too many games created, try again later")]
    RateLimited,
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Session(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            Self::Session(err) => err.status(),
            Self::RateLimited => Status::TooManyRequests,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        status::Custom(self.status(), Json(body)).respond_to(req)
    }
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("invalid CORS configuration: {0}")]
    Cors(#[from] rocket_cors::Error),
    #[error("server failed: {0}")]
    Rocket(#[from] Box<rocket::Error>),
}

impl From<rocket::Error> for StartupError {
    fn from(err: rocket::Error) -> Self {
        Self::Rocket(Box::new(err))
    }
}
