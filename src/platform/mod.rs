//! Platform abstraction: the filesystem operations scoped directories rely on.

pub mod pal;
