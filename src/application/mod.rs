pub mod dto;
pub mod ports;
pub mod services;
pub mod status_store;

#[cfg(test)]
pub mod testing;
