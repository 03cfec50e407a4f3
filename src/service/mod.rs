pub mod analysis;
pub mod waste;
