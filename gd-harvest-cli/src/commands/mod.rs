pub(crate) mod config;
pub(crate) mod harvest;
pub(crate) mod rotate;
