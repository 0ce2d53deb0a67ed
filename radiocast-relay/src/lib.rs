//! # Radiocast Relay Library (radiocast-relay)
//!
//! Relays internet radio streams into voice rooms.
//!
//! **Pipeline (one task per room):** ffmpeg decoder process -> fixed-size
//! PCM frames -> volume scaling -> Opus encoding -> transport sink.
//!
//! **Control:** a [`SessionRegistry`] owns every room session and serves
//! play/stop/volume/pause/resume, exposed over HTTP by [`api`]. Sources are
//! named stations, raw URLs or picks from a [`search::StationSearch`].

pub mod api;
pub mod audio;
pub mod error;
pub mod search;
pub mod session;
pub mod source;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use session::{RoomSession, SessionRegistry, SessionState};
pub use types::RoomId;
