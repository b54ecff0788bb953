pub mod filters;
pub mod vehicle;
