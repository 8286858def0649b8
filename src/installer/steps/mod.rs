//! One module per installer step.

pub(crate) mod configuration;
pub(crate) mod connect;
pub(crate) mod finish;
pub(crate) mod install;
