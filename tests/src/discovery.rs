mod integration;
mod timeouts;
