pub mod health;
pub mod resolution;
pub mod shares;
