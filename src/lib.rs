pub mod ir;
pub mod pass;
pub mod verify;
