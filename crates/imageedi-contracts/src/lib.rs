pub mod canvas;
pub mod chat;
pub mod events;
pub mod image;
pub mod models;
