//! steward CLI - 通知・クリーンアップのポリシーエンジンを動かす

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use steward_core::StewardConfig;
use steward_core::app::{App, AppBuilder, SchedulingDriver};
use steward_core::domain::{InsightId, ResolutionAction, UserId};
use steward_core::impls::LogNotifier;
use steward_core::time::UserTimezone;

#[derive(Parser)]
#[command(name = "steward", version, about = "Task insight and cleanup engine")]
struct Cli {
    /// TOML 設定ファイル（省略時はすべて既定値）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ctrl-C まで scheduling driver を動かす
    Run {
        /// 監視するユーザー（複数指定可）
        #[arg(long = "user", required = true)]
        users: Vec<String>,
    },

    /// monitor cycle を 1 回実行し、保存された insight を表示
    Monitor {
        #[arg(long)]
        user: String,

        /// IANA タイムゾーン（省略時はプロフィールの設定）
        #[arg(long)]
        tz: Option<String>,
    },

    /// cleanup cycle を 1 回実行し、結果を表示
    Cleanup {
        #[arg(long)]
        user: String,

        #[arg(long)]
        tz: Option<String>,
    },

    /// 通知の残り枠と履歴を表示
    Stats {
        #[arg(long)]
        user: String,
    },

    /// エスカレーションされたタスクに回答する
    Resolve {
        #[arg(long)]
        user: String,

        #[arg(long)]
        insight: String,

        /// delete / complete / keep
        #[arg(long)]
        action: String,
    },

    /// 回答待ちのエスカレーション一覧
    Pending {
        #[arg(long)]
        user: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<StewardConfig> {
    match path {
        Some(path) => StewardConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(StewardConfig::default()),
    }
}

async fn timezone_for(app: &App, user: &UserId, tz: Option<&str>) -> Result<UserTimezone> {
    match tz {
        Some(name) => Ok(UserTimezone::parse(name)?),
        None => Ok(app.admission().timezone_for(user).await),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let app = AppBuilder::from_config(&config)?
        .notifier(Arc::new(LogNotifier))
        .build()
        .context("wiring the application")?;

    match cli.command {
        Commands::Run { users } => {
            let driver = Arc::new(SchedulingDriver::new(
                Arc::new(app),
                config.scheduler.clone(),
            )?);
            for user in users {
                driver.add_user(UserId::new(user));
            }

            let handle = Arc::clone(&driver).spawn();
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
            tracing::info!("shutdown requested");
            handle.shutdown_and_join().await;
            print_json(&driver.status())?;
        }
        Commands::Monitor { user, tz } => {
            let user = UserId::new(user);
            let timezone = timezone_for(&app, &user, tz.as_deref()).await?;
            let insights = app.run_monitor_cycle(&user, timezone).await?;
            print_json(&insights)?;
        }
        Commands::Cleanup { user, tz } => {
            let user = UserId::new(user);
            let timezone = timezone_for(&app, &user, tz.as_deref()).await?;
            let report = app.run_cleanup_cycle(&user, timezone).await?;
            print_json(&report)?;
        }
        Commands::Stats { user } => {
            let stats = app.admission().stats(&UserId::new(user)).await?;
            print_json(&stats)?;
        }
        Commands::Resolve {
            user,
            insight,
            action,
        } => {
            let action: ResolutionAction = action.parse()?;
            let resolved = app
                .resolve_escalation(&UserId::new(user), &InsightId::new(insight), action)
                .await?;
            print_json(&resolved)?;
        }
        Commands::Pending { user } => {
            let pending = app.list_pending_escalations(&UserId::new(user)).await?;
            print_json(&pending)?;
        }
    }

    Ok(())
}
