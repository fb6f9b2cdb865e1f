pub mod conduct;
pub mod core;
pub mod results;
pub mod roster;
pub mod scores;
pub mod settings;
