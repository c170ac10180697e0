use std::sync::Arc;

use crate::ArtDB;
use crate::cli::server::ServerCommand;

/// 应用状态
pub struct AppState {
    /// 艺术品数据库与缓存
    pub db: ArtDB,
    /// 管理接口鉴权 token
    pub token: String,
    /// 允许跨域访问的来源，为空时允许任意来源
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(db: ArtDB, opts: ServerCommand) -> Arc<Self> {
        Arc::new(AppState { db, token: opts.token, cors_origins: opts.cors_origin })
    }
}
