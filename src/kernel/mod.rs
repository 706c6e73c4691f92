//! Headless application core: the tree owner, its actions and services.

pub mod action;
pub mod controller;
pub mod services;

pub use action::{Action, ContextAction};
pub use controller::{
    ControllerError, DispatchResult, PumpReport, ReloadOutcome, TreeController, UNTITLED_DOCUMENT,
};
