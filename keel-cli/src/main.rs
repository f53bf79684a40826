//! Keel CLI - The Keel package manager command line interface.
//! Keel CLI - Keel 软件包管理器的命令行界面。

mod commands;
mod config;
mod output;

use clap::{Parser, Subcommand};

/// Main CLI structure.
/// 主 CLI 结构体。
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about = "Keel - A package dependency resolver and restorer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output. / 启用详细输出。
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress output. / 抑制输出。
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Available CLI commands.
/// 可用的 CLI 命令。
#[derive(Subcommand)]
enum Commands {
    /// Restore a project's packages and write its lock file. / 还原项目的软件包并写入锁文件。
    Restore {
        /// Project directory or manifest path. / 项目目录或清单路径。
        #[arg(default_value = ".")]
        path: String,

        /// Package source (directory, URL, or index+URL); repeatable. / 软件包源（目录、URL 或 index+URL）；可重复。
        #[arg(short, long)]
        source: Vec<String>,

        /// Package store root(s), separated like PATH. / 软件包存储根目录（按 PATH 方式分隔）。
        #[arg(long)]
        packages: Option<String>,

        /// Bypass the HTTP response cache. / 绕过 HTTP 响应缓存。
        #[arg(long)]
        no_cache: bool,

        /// Keep going when a source fails repeatedly. / 当某个源反复失败时继续。
        #[arg(long)]
        ignore_failed_sources: bool,

        /// Runtime identifier to select native assets for; repeatable. / 选择本机资产的运行时标识符；可重复。
        #[arg(long = "runtime")]
        runtimes: Vec<String>,
    },

    /// List installed packages across store roots. / 列出所有存储根目录中已安装的软件包。
    List {
        /// Package store root(s), separated like PATH. / 软件包存储根目录（按 PATH 方式分隔）。
        #[arg(long)]
        packages: Option<String>,
    },

    /// Verify installed archives against their hash sidecars. / 根据哈希旁注文件验证已安装的归档。
    Verify {
        /// Package store root(s), separated like PATH. / 软件包存储根目录（按 PATH 方式分隔）。
        #[arg(long)]
        packages: Option<String>,
    },

    /// Build a package archive from a project. / 从项目构建软件包归档。
    Pack {
        /// Project directory or manifest path. / 项目目录或清单路径。
        #[arg(default_value = ".")]
        path: String,

        /// Directory to write the archive into. / 写入归档的目录。
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Main entry point.
/// 主入口点。
fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Restore {
            path,
            source,
            packages,
            no_cache,
            ignore_failed_sources,
            runtimes,
        } => {
            match commands::restore::run(
                &path,
                &source,
                packages.as_deref(),
                no_cache,
                ignore_failed_sources,
                &runtimes,
                cli.verbose,
                cli.quiet,
            ) {
                // A restore that finished but logged warnings gets its own
                // exit status so scripts can tell the two apart.
                // 完成但带警告的还原使用单独的退出状态，以便脚本区分。
                Ok(true) => std::process::exit(2),
                Ok(false) => Ok(()),
                Err(e) => Err(e),
            }
        }
        Commands::List { packages } => commands::list::run(packages.as_deref()),
        Commands::Verify { packages } => commands::verify::run(packages.as_deref(), cli.quiet),
        Commands::Pack { path, output } => {
            commands::pack::run(&path, output.as_deref(), cli.quiet)
        }
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("error: {}", e);
        }
        std::process::exit(1);
    }
}
