pub mod auth;
pub mod db;
pub mod error;
pub mod middleware;
pub mod notification;
pub mod reminder;
pub mod routes;
pub mod state;
pub mod task;
pub mod websocket;
