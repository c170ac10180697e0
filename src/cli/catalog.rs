use anyhow::Result;
use clap::Parser;

use crate::ArtDBBuilder;
use crate::cli::{OutputFormat, SubCommandExtend};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct CatalogCommand {
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for CatalogCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = ArtDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let artworks = db.catalog().await;

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&artworks)?),
            OutputFormat::Table => {
                for artwork in &artworks {
                    println!(
                        "{}\t{}\t{}",
                        artwork.id,
                        artwork.title.as_deref().unwrap_or("-"),
                        artwork.artist.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Ok(())
    }
}
