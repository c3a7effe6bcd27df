pub mod claim;
pub mod policy;
pub mod validate;
