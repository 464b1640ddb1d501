pub mod store;
pub mod verification;

#[cfg(test)]
pub mod memory;
