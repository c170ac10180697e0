use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use log::debug;
use serde_json::Value;

use crate::ArtDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{MatchOptions, Opts};
use crate::matcher::MatchResult;

#[derive(Parser, Debug, Clone)]
pub struct MatchCommand {
    #[command(flatten)]
    pub search: MatchOptions,
    /// 查询向量所在的 JSON 文件，内容为数组或带有 embedding 字段的对象
    pub embedding: PathBuf,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for MatchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let data = tokio::fs::read(&self.embedding).await?;
        let query = parse_query(serde_json::from_slice(&data)?)?;
        debug!("查询向量维度: {}", query.len());

        let db = ArtDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let result = db
            .search(query, self.search.top_k, self.search.threshold, self.search.lang.clone())
            .await?;

        print_result(&result, self.output_format)
    }
}

fn parse_query(value: Value) -> Result<Vec<f32>> {
    let value = match value {
        Value::Object(mut map) => {
            map.remove("embedding").ok_or_else(|| anyhow!("缺少 embedding 字段"))?
        }
        value => value,
    };
    Ok(serde_json::from_value(value)?)
}

fn print_result(result: &[MatchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for r in result {
                println!(
                    "{:.4}\t{}\t{}\t{}",
                    r.score,
                    r.artwork_id,
                    r.descriptor_id,
                    r.title.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
