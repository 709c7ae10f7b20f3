pub mod properties;
pub mod values;
