//! Loopback integration tests for the khaneh workspace.

#[cfg(test)]
mod command;
#[cfg(test)]
mod discovery;
#[cfg(test)]
mod support;
