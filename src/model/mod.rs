pub mod batch;
pub mod order;
pub mod point;
pub mod warehouse;
