use std::error::Error;

pub mod api;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod handler;
pub mod host;
pub mod model;

#[cfg(test)]
mod testing;

pub fn unpack_error(err: &dyn Error) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
