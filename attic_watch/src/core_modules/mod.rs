pub mod accessway;
pub mod cooldown;
pub mod detection;
pub mod history;
pub mod scorer;
pub mod zone;
