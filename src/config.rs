use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::matcher::MAX_TOP_K;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let path = ProjectDirs::from("", "artlens", "artlens")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".artlens"));
    ConfDir { path }
});

#[derive(Parser, Debug, Clone)]
pub struct MatchOptions {
    /// 返回的艺术品数量，范围从 1 到 50
    #[arg(short = 'k', long, value_name = "K", default_value_t = 1, value_parser = parse_top_k)]
    pub top_k: usize,
    /// 相似度阈值，低于该值的描述符会被忽略，范围从 -1 到 1
    #[arg(short, long, value_name = "SCORE", default_value_t = 0., allow_negative_numbers = true, value_parser = parse_threshold)]
    pub threshold: f32,
    /// 首选的描述语言，例如 it、en
    #[arg(short, long, value_name = "LANG")]
    pub lang: Option<String>,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "artlens", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// artlens 配置文件目录
    #[arg(short, long, default_value_t = CONF_DIR.clone())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 从 JSON 文件导入艺术品及其描述符
    Add(AddCommand),
    /// 使用向量搜索艺术品
    Match(MatchCommand),
    /// 列出所有艺术品
    Catalog(CatalogCommand),
    /// 启动 HTTP 服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("artlens.db")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

impl std::fmt::Display for ConfDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn parse_top_k(s: &str) -> anyhow::Result<usize> {
    let k: usize = s.parse()?;
    if !(1..=MAX_TOP_K).contains(&k) {
        return Err(anyhow::anyhow!("top_k 必须在 1 到 {MAX_TOP_K} 之间"));
    }
    Ok(k)
}

fn parse_threshold(s: &str) -> anyhow::Result<f32> {
    let t: f32 = s.parse()?;
    if !(-1.0..=1.0).contains(&t) {
        return Err(anyhow::anyhow!("阈值必须在 -1 到 1 之间"));
    }
    Ok(t)
}
