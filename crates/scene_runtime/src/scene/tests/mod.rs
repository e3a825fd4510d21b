//! Scenario tests for the scene runtime

mod support;

mod lifecycle;
