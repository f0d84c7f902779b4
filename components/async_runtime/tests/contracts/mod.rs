//! Contract test runner for async_runtime
