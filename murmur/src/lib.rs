pub mod api;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod memory;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod social;
