pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod images;
pub mod meals;
pub mod recipes;
pub mod shopping;
pub mod sse;
pub mod state;
pub mod storage;
pub mod sync;
