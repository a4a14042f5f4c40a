pub mod origins;
pub mod provider;
pub mod updater;

pub use provider::GraphProvider;
pub use updater::Updater;
