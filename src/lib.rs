//! Chatwoot ⇄ Botpress bridge — webhook relay core.

pub mod attachment;
pub mod botpress;
pub mod chatwoot;
pub mod config;
pub mod error;
pub mod rotation;
pub mod webhook;
