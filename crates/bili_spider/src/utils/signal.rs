use std::io;

use tokio::signal;
use tokio_util::sync::CancellationToken;

#[cfg(target_family = "windows")]
async fn terminate() -> io::Result<()> {
    signal::ctrl_c().await
}

/// ctrl + c 发送的是 SIGINT 信号，kill 发送的是 SIGTERM 信号，都需要处理
#[cfg(target_family = "unix")]
async fn terminate() -> io::Result<()> {
    use tokio::select;

    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let mut int = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    select! {
        _ = term.recv() => Ok(()),
        _ = int.recv() => Ok(()),
    }
}

/// 在后台监听中断信号，收到后取消返回的 token
pub fn cancel_on_terminate() -> CancellationToken {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    tokio::spawn(async move {
        match terminate().await {
            Ok(()) => {
                warn!("收到中断信号，当前请求结束后停止抓取..");
                guard.cancel();
            }
            Err(e) => error!("监听中断信号失败：{:#}", e),
        }
    });
    cancel
}
