//! Flood-depth capture relay.
//!
//! SYSTEM CONTEXT
//! ==============
//! A browser globe viewer renders a flood plane at a building location and
//! captures black/white visibility masks of it. This crate owns everything
//! around that renderer: the HTTP/SSE relay that feeds it camera and depth
//! messages and persists the masks it uploads, the pixel post-processing
//! that turns rendered frames into masks, the planar distance field, and the
//! camera/scene math that decides what gets captured.

pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod geo;
pub mod hub;
pub mod mask;
pub mod message;
pub mod plane;
pub mod routes;
pub mod shutdown;
pub mod sse;
pub mod state;
pub mod store;
pub mod tiles;
pub mod watcher;
