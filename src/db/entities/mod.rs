pub mod key_values;
