pub mod care;
pub mod health;
