//! treedit - lazily loaded, watch-synchronized directory tree
//!
//! 模块结构：
//! - models: 数据模型（NodeTree、树文档 XML 编解码）
//! - kernel: 树控制器、动作、服务层（目录枚举、监听、文件操作）

pub mod kernel;
pub mod models;
