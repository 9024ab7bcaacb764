pub mod guard;
pub mod inspect;
pub mod ops;
