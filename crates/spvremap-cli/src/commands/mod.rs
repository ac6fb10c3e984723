pub mod inspect;
pub mod remap;
