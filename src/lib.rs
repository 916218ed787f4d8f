//! Folder semantics (list, rename, move, delete, trash, share, batch drop)
//! emulated on a flat object store.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
