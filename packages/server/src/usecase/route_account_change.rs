//! UseCase: アカウント変更の配信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RouteAccountChangeUseCase::execute() メソッド
//! - 変更イベントを、そのユーザーの現在の接続 1 つだけに配信すること
//!
//! ### なぜこのテストが必要か
//! - 他ユーザーの接続へ配信されると残高などの情報が漏洩する
//! - 未接続ユーザーへの変更はエラーにせず破棄する必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：登録済みユーザーへの配信
//! - 正常系：未登録ユーザーの変更は破棄
//! - エッジケース：切断処理前の閉じた接続（破棄し、登録も掃除する）
//! - エッジケース：接続が別ユーザーとして登録し直した後の変更（届かない）

use std::sync::Arc;

use crate::domain::{AccountChange, ConnectionId, ConnectionRegistry, DeliveryError, Push};

/// 配信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// 接続のキューに積まれた
    Delivered(ConnectionId),
    /// ユーザーに登録済みの接続がない
    NoConnection,
    /// 接続は登録されていたが、すでに閉じていた
    ConnectionClosed(ConnectionId),
}

/// アカウント変更配信のユースケース
pub struct RouteAccountChangeUseCase {
    /// Registry（接続管理の抽象化）
    registry: Arc<dyn ConnectionRegistry>,
}

impl RouteAccountChangeUseCase {
    /// 新しい RouteAccountChangeUseCase を作成
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 変更イベントの配信を実行
    ///
    /// 参照とキューへの投入は Registry の deliver で 1 つの単位として行う。
    /// 未接続・切断済みはエラーではなく、イベントを破棄するだけ。
    pub async fn execute(&self, change: AccountChange) -> RouteOutcome {
        let AccountChange { user_id, document } = change;

        match self
            .registry
            .deliver(&user_id, Push::UserUpdated(document))
            .await
        {
            None => {
                tracing::debug!("No connection registered for user '{}', dropping change", user_id);
                RouteOutcome::NoConnection
            }
            Some(Ok(connection_id)) => {
                tracing::debug!(
                    "Queued user-updated for user '{}' on connection {}",
                    user_id,
                    connection_id
                );
                RouteOutcome::Delivered(connection_id)
            }
            Some(Err(DeliveryError::ConnectionClosed(connection_id))) => {
                // 閉じた接続の登録は Registry 側で削除済み
                tracing::debug!(
                    "Dropping change for user '{}': connection {} is closed",
                    user_id,
                    connection_id
                );
                RouteOutcome::ConnectionClosed(connection_id)
            }
        }
    }
}
