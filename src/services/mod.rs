//! Storage backends and the folder layer built on top of them.

pub mod batch_drop;
pub mod folder_error;
pub mod folder_service;
pub mod listing;
pub mod memory_store;
pub mod mutator;
pub mod object_store;
pub mod share_registry;
pub mod storage_service;
pub mod trash;
