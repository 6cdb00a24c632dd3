use anyhow::{Context, Result};
use azblob_core::{
    download_blob, list_blobs, upload_blob, DownloadOptions, Settings, ToolContext, ToolRegistry,
    UploadOptions,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "azblob")]
#[command(author, version, about = "Azure Blob Storage ツール", long_about = None)]
struct Cli {
    /// デバッグログを出力（RUST_LOG が優先）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blob をアップロード
    Upload {
        /// コンテナ名（省略時: 設定の default_container）
        #[arg(short, long)]
        container: Option<String>,

        /// Blob 名
        blob: String,

        /// アップロードするファイル
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// アップロードするテキスト
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Blob をダウンロード
    Download {
        /// コンテナ名（省略時: 設定の default_container）
        #[arg(short, long)]
        container: Option<String>,

        /// Blob 名
        blob: String,

        /// 保存先パス
        #[arg(short, long, conflicts_with = "text")]
        output: Option<PathBuf>,

        /// 内容をテキストとして標準出力に表示
        #[arg(short, long)]
        text: bool,
    },

    /// コンテナ内の Blob 一覧を JSON で表示
    List {
        /// コンテナ名（省略時: 設定の default_container）
        #[arg(short, long)]
        container: Option<String>,
    },

    /// ツール定義（名前・説明・引数スキーマ）を JSON で表示
    Tools,

    /// ツールを名前で呼び出す
    Call {
        /// ツール名（upload-blob / download-blob / list-blobs）
        tool: String,

        /// 引数の JSON オブジェクト（省略時は標準入力から読み込み）
        #[arg(short, long)]
        args: Option<String>,
    },

    /// 設定ファイルの操作
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// シェル補完スクリプトを生成
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// 現在の設定を表示
    Show,
    /// 設定ファイルのパスを表示
    Path,
    /// デフォルトのコンテナを設定
    SetContainer {
        name: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "❌".red(), format!("{:#}", e).red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);

    let ctx = ToolContext::from_env();

    match cli.command {
        Commands::Upload {
            container,
            blob,
            file,
            text,
        } => {
            let container = resolve_container(container, Settings::load)?;
            run_upload(&ctx, &container, &blob, file, text).await?
        }
        Commands::Download {
            container,
            blob,
            output,
            text,
        } => {
            let container = resolve_container(container, Settings::load)?;
            run_download(&ctx, &container, &blob, output, text).await?
        }
        Commands::List { container } => {
            let container = resolve_container(container, Settings::load)?;
            let pb = spinner(format!("{} を一覧取得中...", container));
            let result = list_blobs(&ctx, &container).await;
            pb.finish_and_clear();
            println!("{}", result?);
        }
        Commands::Tools => {
            let registry = ToolRegistry::new(ctx)?;
            println!("{}", serde_json::to_string_pretty(registry.definitions())?);
        }
        Commands::Call { tool, args } => run_call(ctx, &tool, args).await?,
        Commands::Config { action } => run_config(action)?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "azblob", &mut io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose, Settings::load)));

    // 標準出力はツールの結果専用
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// RUST_LOG 未設定時のログレベル（設定ファイルが読めなければ warn）
fn default_log_level(
    verbose: bool,
    load: impl FnOnce() -> azblob_core::Result<Settings>,
) -> String {
    if verbose {
        return "debug".to_string();
    }
    load()
        .ok()
        .and_then(|settings| settings.log_level)
        .unwrap_or_else(|| "warn".to_string())
}

/// コンテナ名を決める（省略時のみ設定ファイルを読む）
fn resolve_container(
    explicit: Option<String>,
    load: impl FnOnce() -> azblob_core::Result<Settings>,
) -> Result<String> {
    match explicit {
        Some(name) => Ok(name),
        None => {
            let settings = load()?;
            tracing::debug!("Loaded settings: {:?}", settings);
            Ok(settings.resolve_container(None)?)
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

async fn run_upload(
    ctx: &ToolContext,
    container: &str,
    blob: &str,
    file: Option<PathBuf>,
    text: Option<String>,
) -> Result<()> {
    let pb = spinner(format!("{}/{} にアップロード中...", container, blob));
    let options = UploadOptions {
        file_path: file,
        text_content: text,
    };
    let result = upload_blob(ctx, container, blob, options).await;
    pb.finish_and_clear();

    println!("{} {}", "✅".green(), result?);
    Ok(())
}

async fn run_download(
    ctx: &ToolContext,
    container: &str,
    blob: &str,
    output: Option<PathBuf>,
    text: bool,
) -> Result<()> {
    let pb = spinner(format!("{}/{} をダウンロード中...", container, blob));
    let options = DownloadOptions {
        path_file: output,
        as_text: text,
    };
    let result = download_blob(ctx, container, blob, options).await;
    pb.finish_and_clear();

    let result = result?;
    if text {
        // テキストはそのまま出力（パイプで扱えるように装飾しない）
        print!("{}", result);
    } else {
        println!("{} {}", "✅".green(), result);
    }
    Ok(())
}

async fn run_call(ctx: ToolContext, tool: &str, args: Option<String>) -> Result<()> {
    let raw = match args {
        Some(args) => args,
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read arguments from stdin")?;
            input
        }
    };

    let args: serde_json::Value = if raw.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&raw).context("Tool arguments must be a JSON object")?
    };

    let registry = ToolRegistry::new(ctx)?;
    let result = registry.execute(tool, args).await?;
    println!("{}", result);
    Ok(())
}

fn run_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load()?;
            println!(
                "{} {}",
                "default_container:".cyan(),
                settings
                    .default_container
                    .as_deref()
                    .unwrap_or("(未設定)")
                    .yellow()
            );
            println!(
                "{} {}",
                "log_level:".cyan(),
                settings.log_level.as_deref().unwrap_or("(未設定)").yellow()
            );
        }
        ConfigAction::Path => {
            println!("{}", Settings::config_path()?.display());
        }
        ConfigAction::SetContainer { name } => {
            let mut settings = Settings::load()?;
            settings.default_container = Some(name.clone());
            settings.save()?;
            println!(
                "{} デフォルトのコンテナを {} に設定しました",
                "✅".green(),
                name.bright_blue()
            );
        }
    }

    Ok(())
}
