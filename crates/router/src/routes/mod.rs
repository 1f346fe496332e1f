pub mod animate;
pub mod health;
