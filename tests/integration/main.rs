mod support;
mod sweep_tests;
