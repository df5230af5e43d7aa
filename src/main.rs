//! # jl-nodes 命令行
//!
//! 脱离宿主单独使用各节点：查看注册表、检查条件数据文件、加载潜空间张量、上传文件。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jl_nodes::cloud::{
    AzureVideoInput, AzureVideoNode, DEFAULT_SIGNED_EXPIRES, S3VideoInput, S3VideoNode, UploadOutput,
};
use jl_nodes::conditioning::{ConditioningLoadJson, load_json};
use jl_nodes::latent::{LatentLoad, LoadLatent};
use jl_nodes::nodes::registry;
use jl_nodes::paths::FolderPaths;

/// 生成式媒体流水线的插件节点
#[derive(Parser, Debug)]
#[command(name = "jl-nodes", version, about, long_about = None)]
struct Cli {
    /// 输出更多日志，可重复（-v, -vv, -vvv）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// 宿主输出目录，默认取`JLNODES_OUTPUT_DIR`或`./output`
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出注册的节点
    Nodes,

    /// 条件数据JSON文件
    #[command(subcommand)]
    Conditioning(ConditioningCommand),

    /// 潜空间张量检查点
    #[command(subcommand)]
    Latent(LatentCommand),

    /// 上传本地文件
    #[command(subcommand)]
    Upload(UploadCommand),
}

#[derive(Subcommand, Debug)]
enum ConditioningCommand {
    /// 列出条件数据目录下的文件
    List,
    /// 加载并汇总一个文件（路径，或条件数据目录下的文件名）
    Inspect { file: String },
}

#[derive(Subcommand, Debug)]
enum LatentCommand {
    /// 列出输出目录下的`.latent`文件
    List,
    /// 加载一个文件（相对输出目录），失败时显示占位张量及原因
    Load { file: String },
    /// 文件内容的SHA-256
    Fingerprint { file: String },
}

#[derive(Subcommand, Debug)]
enum UploadCommand {
    S3(S3Args),
    Azure(AzureArgs),
}

#[derive(Args, Debug)]
struct CommonUploadArgs {
    file: PathBuf,
    #[arg(long, default_value = "video/mp4")]
    mime: String,
    /// 返回带时效的签名URL
    #[arg(long)]
    signed: bool,
    #[arg(long, default_value_t = DEFAULT_SIGNED_EXPIRES)]
    expires: u64,
    #[arg(long, default_value = "")]
    callback_url: String,
}

#[derive(Args, Debug)]
struct S3Args {
    #[command(flatten)]
    common: CommonUploadArgs,
    #[arg(long)]
    bucket: String,
    #[arg(long, default_value = "")]
    region: String,
    /// 兼容S3的自定义端点
    #[arg(long, default_value = "")]
    endpoint: String,
    #[arg(long, default_value = "comfyui/videos/{basename}")]
    key_template: String,
}

#[derive(Args, Debug)]
struct AzureArgs {
    #[command(flatten)]
    common: CommonUploadArgs,
    /// 默认取`AZURE_BLOB_CONTAINER_VIDEOS`或`videos`
    #[arg(long, default_value = "")]
    container: String,
    #[arg(long, default_value = AzureVideoInput::DEFAULT_BLOB_TEMPLATE)]
    blob_template: String,
    #[arg(long, default_value = "")]
    connection_string: String,
    #[arg(long, default_value = "")]
    account_name: String,
    #[arg(long, default_value = "")]
    account_key: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let paths = cli.output_dir.map_or_else(FolderPaths::from_env, FolderPaths::new);
    tracing::debug!(output_dir = %paths.output_dir().display(), "已确定输出目录");

    let result = match cli.command {
        Commands::Nodes => run_nodes(),
        Commands::Conditioning(command) => run_conditioning(command, &paths),
        Commands::Latent(command) => run_latent(command, &paths),
        Commands::Upload(command) => run_upload(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("错误: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run_nodes() -> anyhow::Result<()> {
    for info in registry() {
        println!("{:<26} {:<30} {}", info.class_name, info.display_name, info.category);
    }
    Ok(())
}

fn run_conditioning(command: ConditioningCommand, paths: &FolderPaths) -> anyhow::Result<()> {
    let node = ConditioningLoadJson::new(paths.clone());
    match command {
        ConditioningCommand::List => {
            for name in node.options() {
                println!("{name}");
            }
        }
        ConditioningCommand::Inspect { file } => {
            let conditioning = if Path::new(&file).is_file() {
                load_json(Path::new(&file))
            } else {
                node.load(&file)
            }
            .with_context(|| format!("无法加载条件数据{file}"))?;
            println!("共{}条", conditioning.len());
            for (index, entry) in conditioning.iter().enumerate() {
                let keys = entry
                    .meta
                    .as_dict()
                    .map(|dict| dict.keys().cloned().collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                println!(
                    "[{index}] {} {:?}，元数据键: [{keys}]，元数据中的张量: {}",
                    entry.tensor.dtype(),
                    entry.tensor.shape(),
                    entry.meta.tensor_count()
                );
            }
        }
    }
    Ok(())
}

fn run_latent(command: LatentCommand, paths: &FolderPaths) -> anyhow::Result<()> {
    let mut node = LoadLatent::new(paths.clone());
    match command {
        LatentCommand::List => {
            for name in node.options().into_iter().filter(|name| !name.is_empty()) {
                println!("{name}");
            }
        }
        LatentCommand::Load { file } => match node.load(&file) {
            LatentLoad::Loaded { samples, format } => {
                println!("{:?} {} {:?}", format, samples.dtype(), samples.shape());
            }
            LatentLoad::Fallback { samples, reason } => {
                println!("占位张量 {} {:?}（{reason}）", samples.dtype(), samples.shape());
            }
        },
        LatentCommand::Fingerprint { file } => println!("{}", node.fingerprint(&file)),
    }
    Ok(())
}

fn run_upload(command: UploadCommand) -> anyhow::Result<()> {
    let output = match command {
        UploadCommand::S3(args) => {
            let input = S3VideoInput {
                file_path: args.common.file.display().to_string(),
                bucket: args.bucket,
                key_template: args.key_template,
                region: args.region,
                endpoint: args.endpoint,
                mime: args.common.mime,
                use_signed_url: args.common.signed,
                signed_expires: args.common.expires,
                callback_url: args.common.callback_url,
                ..Default::default()
            };
            S3VideoNode::default().upload(&input)?
        }
        UploadCommand::Azure(args) => {
            let input = AzureVideoInput {
                file_path: args.common.file.display().to_string(),
                container_name: args.container,
                blob_name_template: args.blob_template,
                connection_string: args.connection_string,
                account_name: args.account_name,
                account_key: args.account_key,
                mime: args.common.mime,
                use_signed_url: args.common.signed,
                signed_expires: args.common.expires,
                callback_url: args.common.callback_url,
                ..Default::default()
            };
            AzureVideoNode::default().upload(&input)?
        }
    };
    print_upload(&output)
}

fn print_upload(output: &UploadOutput) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}
