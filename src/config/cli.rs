use crate::config::toml_config::MergeConfig;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "letter-merge")]
#[command(about = "Fill a .docx template with spreadsheet rows, one document per row")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the {{placeholders}} of a template and write the data worksheet
    Scan {
        /// Template .docx file
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Do not write the data worksheet next to the template
        #[arg(long)]
        no_worksheet: bool,
    },

    /// Show how placeholders map onto the data columns
    Map {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Generate one document per data row
    Generate {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// File name prefix (also fills {{文件名前缀}})
        #[arg(short, long)]
        prefix: Option<String>,

        /// Output format: docx or pdf
        #[arg(long)]
        format: Option<String>,

        /// File name pattern using {date}, {prefix} and {index}
        #[arg(long)]
        pattern: Option<String>,

        /// Keep going when a single document fails
        #[arg(long)]
        continue_on_error: bool,

        /// Date used in file names (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Write a JSON report of the batch to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Override monitoring setting from config
        #[arg(long)]
        monitor: Option<bool>,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// Template .docx file
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Data file (.xlsx, .xlsm or .csv)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Worksheet name, defaults to the first sheet
    #[arg(long)]
    pub sheet: Option<String>,

    /// Manual mapping 占位符=列名 (repeatable, empty column unmaps)
    #[arg(short, long = "map", value_parser = parse_mapping_pair)]
    pub mappings: Vec<(String, String)>,
}

/// 解析 `占位符=列名`
pub fn parse_mapping_pair(value: &str) -> Result<(String, String), String> {
    let (placeholder, column) = value
        .split_once('=')
        .ok_or_else(|| format!("expected 占位符=列名, got '{}'", value))?;

    let placeholder = placeholder.trim();
    if placeholder.is_empty() {
        return Err(format!("placeholder name is empty in '{}'", value));
    }
    Ok((placeholder.to_string(), column.trim().to_string()))
}

impl InputArgs {
    fn apply_to(&self, config: &mut MergeConfig) {
        if let Some(template) = &self.template {
            config.template.path = Some(template.clone());
        }
        if let Some(data) = &self.data {
            config.data.path = Some(data.clone());
        }
        if let Some(sheet) = &self.sheet {
            config.data.sheet = Some(sheet.clone());
        }
        for (placeholder, column) in &self.mappings {
            config.mapping.insert(placeholder.clone(), column.clone());
        }
    }
}

impl Cli {
    /// 命令列參數覆蓋配置檔設定
    pub fn apply_to(&self, config: &mut MergeConfig) {
        match &self.command {
            Command::Scan {
                template,
                no_worksheet,
            } => {
                if let Some(template) = template {
                    config.template.path = Some(template.clone());
                }
                if *no_worksheet {
                    config.template.write_worksheet = false;
                }
            }
            Command::Map { input } => {
                input.apply_to(config);
                // map 只是查看，不重寫數據模板
                config.template.write_worksheet = false;
            }
            Command::Generate {
                input,
                output_dir,
                prefix,
                format,
                pattern,
                continue_on_error,
                monitor,
                ..
            } => {
                input.apply_to(config);
                config.template.write_worksheet = false;

                if let Some(dir) = output_dir {
                    config.output.dir = Some(dir.clone());
                }
                if let Some(prefix) = prefix {
                    config.output.file_prefix = prefix.clone();
                }
                if let Some(format) = format {
                    config.output.format = format.clone();
                }
                if let Some(pattern) = pattern {
                    config.output.filename_pattern = pattern.clone();
                }
                if *continue_on_error {
                    config.batch.failure_policy = "continue".to_string();
                }
                if let Some(monitor) = monitor {
                    config.monitoring.enabled = *monitor;
                    tracing::info!("🔧 Monitoring overridden to: {}", monitor);
                }
            }
        }
    }
}
