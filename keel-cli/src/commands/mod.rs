//! CLI command implementations.
//! CLI 命令实现。

pub mod list;
pub mod pack;
pub mod restore;
pub mod verify;
