//! UseCase: 接続切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectConnectionUseCase::execute() メソッド
//! - 切断した接続が所有していた登録のみが削除されること
//!
//! ### なぜこのテストが必要か
//! - 上書きされた古い接続の切断で新しい登録が消えると、更新が届かなくなる
//!
//! ### どのような状況を想定しているか
//! - 正常系：登録済み接続の切断
//! - エッジケース：登録前に切断した接続
//! - エッジケース：上書きされた古い接続の切断

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRegistry, UserId};

/// 接続切断のユースケース
pub struct DisconnectConnectionUseCase {
    /// Registry（接続管理の抽象化）
    registry: Arc<dyn ConnectionRegistry>,
}

impl DisconnectConnectionUseCase {
    /// 新しい DisconnectConnectionUseCase を作成
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 接続切断を実行
    ///
    /// # Returns
    ///
    /// 登録が削除されたユーザー。この接続が何も所有していなければ `None`
    pub async fn execute(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.registry.unregister(connection_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionHandle, ConnectionIdFactory},
        infrastructure::repository::InMemoryConnectionRegistry,
    };

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_disconnect_registered_connection() {
        // テスト項目: 登録済み接続の切断で、そのユーザーの登録が削除される
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = DisconnectConnectionUseCase::new(registry.clone());
        let (handle, _rx) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        registry.register(user("u1"), handle.clone()).await;

        // when (操作):
        let removed = usecase.execute(handle.id()).await;

        // then (期待する結果):
        assert_eq!(removed, Some(user("u1")));
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_unregistered_connection() {
        // テスト項目: 登録前に切断した接続では何も削除されない
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = DisconnectConnectionUseCase::new(registry.clone());
        let (other, _rx) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        registry.register(user("u2"), other).await;

        // when (操作):
        let removed = usecase.execute(ConnectionIdFactory::generate()).await;

        // then (期待する結果):
        assert_eq!(removed, None);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_disconnect_displaced_connection_keeps_new_registration() {
        // テスト項目: 上書きされた古い接続の切断では新しい登録が残る
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let usecase = DisconnectConnectionUseCase::new(registry.clone());
        let (old, _rx1) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        let (new, _rx2) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        registry.register(user("u1"), old.clone()).await;
        registry.register(user("u1"), new.clone()).await;

        // when (操作):
        let removed = usecase.execute(old.id()).await;

        // then (期待する結果):
        assert_eq!(removed, None);
        assert_eq!(registry.lookup(&user("u1")).await, Some(new));
    }
}
