pub mod consult;
pub mod screening;
