pub mod auth;
pub mod clock;
pub mod config;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod patch;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
