//! CLI command implementations

pub(crate) mod bootstrap;
pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod current;
pub(crate) mod heads;
pub(crate) mod history;
pub(crate) mod seed;
pub(crate) mod stamp;
pub(crate) mod upgrade;
