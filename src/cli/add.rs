use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;
use log::info;

use crate::ArtDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::payload::parse_payloads;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// JSON 文件，可以是以 ID 为键的对象，也可以是艺术品数组
    pub path: PathBuf,
    /// 遇到错误的艺术品时继续导入其余艺术品
    #[arg(long)]
    pub keep_going: bool,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let data = tokio::fs::read(&self.path).await?;
        let payloads = parse_payloads(serde_json::from_slice(&data)?)?;

        // 导入结束后统一刷新一次
        let db = ArtDBBuilder::new(opts.conf_dir.clone()).refresh(false).open().await?;

        let pb = ProgressBar::new(payloads.len() as u64).with_style(pb_style());
        let mut failed = 0;
        for payload in &payloads {
            let id = payload.id.as_deref().unwrap_or("<none>");
            pb.set_message(id.to_string());
            if let Err(e) = db.write_artwork(payload).await {
                if !self.keep_going {
                    pb.abandon();
                    return Err(e.context(format!("导入艺术品 {id} 失败")));
                }
                pb.println(format!("[ERR] {id}: {e}"));
                failed += 1;
            }
            pb.inc(1);
        }
        pb.finish_with_message("艺术品导入完成");

        let stats = db.refresh().await?;
        info!(
            "导入 {} 件艺术品，失败 {} 件；当前共 {} 件艺术品，{} 个描述符",
            payloads.len() - failed,
            failed,
            stats.artworks,
            stats.descriptors
        );
        Ok(())
    }
}
