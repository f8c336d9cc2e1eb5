pub mod attr;
pub mod config;
pub mod csr;
pub mod error;
pub mod export;
pub mod flatten;
pub mod game_mode;
pub mod http_client;
pub mod match_record;
pub mod metadata;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod source;
pub mod waypoint;
