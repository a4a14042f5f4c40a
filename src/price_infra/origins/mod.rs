pub mod static_origin;

pub use static_origin::StaticOrigin;
