pub(crate) mod packer;
pub(crate) mod placer;
