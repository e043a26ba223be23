//! API request handlers

pub mod chat;
pub mod files;
pub mod items;
pub mod tasks;
