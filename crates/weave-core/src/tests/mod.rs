// Crate-level test helpers and cross-module scenarios
#[cfg(test)]
pub(crate) mod support;

#[cfg(test)]
mod integration;
