pub mod ask;
pub mod config;
pub mod health;
pub mod index;

#[cfg(test)]
pub(crate) mod test_support;
