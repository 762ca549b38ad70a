pub mod listen;
pub mod quote;
