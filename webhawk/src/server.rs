//! サーバー組み立て・起動・シャットダウンハンドリング
//!
//! ストア、ブロードキャスター、変更フィード中継、スケジューラ、HTTPサーバーを
//! 配線する。中継タスクが止まった場合はサーバーごと終了する。

use crate::api::create_app;
use crate::common::error::{HawkError, HawkResult};
use crate::config::HawkConfig;
use crate::db::migrations::initialize_database;
use crate::db::snapshots::SqliteSnapshotStore;
use crate::db::traits::SharedSnapshotStore;
use crate::events::create_shared_broadcaster;
use crate::events::relay::spawn_change_relay;
use crate::health::{Prober, RoundRunner, RoundScheduler};
use crate::shutdown::ShutdownController;
use crate::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 設定からアプリケーション状態を組み立てる
///
/// データベースの初期化とマイグレーションもここで行う。
pub async fn build_state(config: &HawkConfig) -> HawkResult<AppState> {
    let pool = initialize_database(&config.database_url).await?;
    let store: SharedSnapshotStore = Arc::new(SqliteSnapshotStore::new(pool).await?);
    info!(database_url = %config.database_url, "Snapshot store ready");

    let prober = Prober::new(&config.targets, &config.url_cleaners, config.check_timeout)?;
    info!(
        targets = prober.targets().len(),
        timeout_ms = config.check_timeout.as_millis() as u64,
        "Prober configured"
    );

    Ok(AppState {
        store: store.clone(),
        broadcaster: create_shared_broadcaster(),
        rounds: RoundRunner::new(prober, store),
        history_limit: config.history_limit(),
        cors_origin: config.cors_origin.clone(),
    })
}

/// `config.bind_addr()` で待ち受けてサーバーを起動する
pub async fn run(config: HawkConfig, shutdown: ShutdownController) -> HawkResult<()> {
    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| HawkError::Internal(format!("Failed to bind to {bind_addr}: {e}")))?;
    serve(config, listener, shutdown).await
}

/// 待ち受け済みのリスナーでサーバーを起動する
///
/// シャットダウン要求（シグナルまたはコントローラ）で正常終了する。
/// 変更フィード中継が終了した場合はエラーを返す。
pub async fn serve(
    config: HawkConfig,
    listener: TcpListener,
    shutdown: ShutdownController,
) -> HawkResult<()> {
    let mode = config.schedule_mode()?;
    let state = build_state(&config).await?;

    // 最初のラウンドより前に購読しておく
    let relay = spawn_change_relay(state.store.clone(), state.broadcaster.clone());

    let scheduler = RoundScheduler::new(
        Arc::new(state.rounds.clone()),
        mode,
        config.overlap,
        shutdown.clone(),
    );
    let _scheduler = scheduler.start();

    let app = create_app(state);
    if let Ok(addr) = listener.local_addr() {
        info!("Web Hawk listening on {}", addr);
    }

    let server = {
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(shutdown))
                .await
        }
    };

    let result = tokio::select! {
        served = server => served
            .map_err(|e| HawkError::Internal(format!("Server error: {e}"))),
        relayed = relay => {
            let err = match relayed {
                Ok(Err(e)) => HawkError::from(e),
                Ok(Ok(())) => HawkError::Internal("Change feed relay ended".to_string()),
                Err(e) => HawkError::Internal(format!("Change feed relay panicked: {e}")),
            };
            error!(error = %err, "Live update path lost; stopping server");
            Err(err)
        }
    };

    // スケジューラを止める
    shutdown.request_shutdown();
    if result.is_ok() {
        info!("Server shutdown complete");
    }
    result
}

/// シャットダウンシグナルを待機
async fn shutdown_signal(shutdown: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = shutdown.wait() => {
            info!("Shutdown requested, shutting down...");
        }
    }
}
