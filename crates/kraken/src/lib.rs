pub mod agent;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod property_data;
pub mod property_system;
pub mod providers;
pub mod systems;
