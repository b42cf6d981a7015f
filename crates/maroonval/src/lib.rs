// Maroonval crate: the boxed runtime values the interpreter moves around.
pub mod value;

pub use value::{u64_add, u64_cmp, u64_mul, u64_sub, Value};
