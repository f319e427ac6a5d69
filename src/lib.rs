//! Core of the Tabemono local-food guide.
//!
//! Given a city (restored from the last session, or suggested from the
//! user's location), the guide lists that city's must-try dishes with ordering
//! phrases and restaurant picks. The state machine lives in [`app`]; the
//! terminal front end in [`ui`] only renders it.

pub mod app;
pub mod catalog;
pub mod config;
pub mod effects;
pub mod error;
pub mod events;
pub mod geo;
pub mod location;
pub mod logging;
pub mod models;
pub mod store;
pub mod ui;
