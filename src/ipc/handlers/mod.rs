pub mod calc_config;
pub mod core;
pub mod definitions;
pub mod grades;
