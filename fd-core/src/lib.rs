pub mod cli_args;
pub mod client;
pub mod configuration;
pub mod dispatcher;
pub mod in_memory_universe;
pub mod reqwest_helpers;

#[cfg(test)]
pub mod test_objects;
