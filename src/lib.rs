pub mod auth;
mod constructors;
pub mod controllers;
pub mod entities;
pub mod presenters;
pub mod repositories;
pub(crate) mod utils;

pub use constructors::*;
