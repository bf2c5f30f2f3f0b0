pub mod containers;
pub mod deployment;
pub mod docker;
pub mod locks;
pub mod nginx;
pub mod ports;
pub mod runtime;
