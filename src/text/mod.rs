pub(crate) mod font;
pub(crate) mod metrics;
pub(crate) mod script;
pub(crate) mod shaping;
