// 数据库实体定义

pub mod location;
pub mod photo;
