pub mod error;
mod kind;
mod name;

pub use crate::kind::ContentKind;
pub use crate::name::{FIELD_SEPARATOR, KIND_SEPARATOR, ResourceName};
