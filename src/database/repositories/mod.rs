// 存储库模块

pub mod location;
pub mod map_center;
