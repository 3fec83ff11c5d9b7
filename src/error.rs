use std::path::PathBuf;

use strum_macros::Display;
use thiserror::Error;

use crate::Int;
use crate::warehouse::Position;

/// Which configured landmark a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Landmark {
    #[strum(serialize = "start")]
    Start,
    #[strum(serialize = "goal")]
    Goal,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: Int, height: Int },

    #[error("{landmark} position {position} is outside the {width}x{height} grid")]
    OutOfBounds {
        landmark: Landmark,
        position: Position,
        width: Int,
        height: Int,
    },

    #[error("{landmark} position {position} is on an obstacle")]
    OnObstacle {
        landmark: Landmark,
        position: Position,
    },

    #[error("{name} must be in {range}, got {value}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("step interval must be at least 1 ms")]
    InvalidSpeed,

    #[error("no tokio runtime available to drive the step timer")]
    NoRuntime,

    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
