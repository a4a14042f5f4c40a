pub mod origin;
pub mod provider;
