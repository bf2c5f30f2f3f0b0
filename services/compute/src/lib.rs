pub mod features;
pub mod services;
pub mod utilities;
