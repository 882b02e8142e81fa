//! API request and response bodies.
//!
//! Request bodies are read as raw field maps and handed to the record factories, so a
//! missing key is reported by name instead of as a generic deserialization failure. The
//! structs named `*Request` here describe those bodies for the OpenAPI document.
//!
//! Responses render document references as `<collection>/<id>` strings.

pub mod accounts;
pub mod entries;
pub mod labels;
