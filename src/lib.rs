pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod retry;

#[cfg(test)]
mod test_support;
