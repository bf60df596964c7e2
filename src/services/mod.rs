pub mod context;
pub mod kv;
pub mod outcome;
pub mod platform;
pub mod reddit;
pub mod reversal;
pub mod strikes;
pub mod templates;

#[cfg(test)]
pub mod test_utils;
