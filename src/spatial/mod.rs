pub mod index;
pub mod traits;
