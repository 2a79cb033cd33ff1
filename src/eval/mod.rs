pub mod context;
pub mod expression;
pub mod handle;
pub mod message;
pub mod operators;
pub mod value;
