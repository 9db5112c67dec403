pub mod model_runner;
pub mod object_store;
