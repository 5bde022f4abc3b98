//! Persistence: the `<purple>` document, the list file and the debounced save.

mod autosave;
mod document;
mod file;
pub(crate) mod schedule;
mod xmlnode;

pub use autosave::spawn_autosave;
