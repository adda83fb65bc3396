mod common;
mod isolation_tests;
mod scenario_tests;
mod shutdown_tests;
