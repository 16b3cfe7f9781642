// Файл: params/mod.rs

pub mod models;
pub mod serializer;

pub use models::{ParamSet, ParamValue};
pub use serializer::{serialize, serialize_with_callback, SerializedQuery};
