//! erdsync - keeps an entity-relationship schema document and its diagram in sync.
//!
//! A schema document (`entities` + `relationships`) is projected into a graph of
//! positioned nodes and styled edges. The [`reconciler::Reconciler`] owns that graph
//! and applies every change to it: whole documents from text or from natural-language
//! generation, attribute edits coming back from entity cards, and new connections.

pub mod editor;
pub mod export;
pub mod gemini;
pub mod graph_writer;
pub mod html_writer;
pub mod ingest;
pub mod io;
pub mod json_reader;
pub mod model;
pub mod notice;
pub mod parser;
pub mod projection;
pub mod prompt;
pub mod reconciler;
pub mod server;
pub mod workspace;
pub mod yaml_reader;
