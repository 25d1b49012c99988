pub mod environments;
pub mod health;
