pub mod name;
pub mod yaml;
