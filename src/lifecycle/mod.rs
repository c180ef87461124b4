//! Process lifecycle for the playground

mod shutdown;

pub use shutdown::ShutdownSignal;
