//! 文件服务模块
//!
//! 目录枚举（本地文件系统）与复制/粘贴/删除的批量操作

pub mod local;
pub mod ops;

pub use local::LocalDirectoryLoader;
pub use ops::{copy_into, delete_recursive, paste};
