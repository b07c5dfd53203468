pub mod support;

pub mod loader_tests;
