pub mod api;
pub mod config;
pub mod controller;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
