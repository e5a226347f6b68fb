//! UseCase: ユーザー登録処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RegisterUserUseCase::execute() メソッド
//! - user_id の検証と Registry への登録（後勝ち）
//!
//! ### なぜこのテストが必要か
//! - 不正な user_id で Registry を汚さないことを保証
//! - 同一ユーザーの再登録で古い接続が置き換えられることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ユーザーの登録
//! - 正常系：同一ユーザーの別接続からの再登録
//! - 異常系：空の user_id

use std::sync::Arc;

use crate::domain::{ConnectionHandle, ConnectionId, ConnectionRegistry, UserId};

use super::error::RegisterUserError;

/// 登録結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    /// 登録されたユーザー
    pub user_id: UserId,
    /// 置き換えられた以前の接続（あれば）
    pub displaced: Option<ConnectionId>,
}

/// ユーザー登録のユースケース
pub struct RegisterUserUseCase {
    /// Registry（接続管理の抽象化）
    registry: Arc<dyn ConnectionRegistry>,
}

impl RegisterUserUseCase {
    /// 新しい RegisterUserUseCase を作成
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// ユーザー登録を実行
    ///
    /// # Arguments
    ///
    /// * `user_id` - クライアントから受け取った user_id（未検証）
    /// * `handle` - 登録する接続のハンドル
    ///
    /// # Returns
    ///
    /// * `Ok(RegisterOutcome)` - 登録成功
    /// * `Err(RegisterUserError)` - user_id が不正
    pub async fn execute(
        &self,
        user_id: String,
        handle: ConnectionHandle,
    ) -> Result<RegisterOutcome, RegisterUserError> {
        let user_id = UserId::try_from(user_id)?;
        let displaced = self.registry.register(user_id.clone(), handle).await;
        Ok(RegisterOutcome { user_id, displaced })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionIdFactory, ValueObjectError},
        infrastructure::repository::InMemoryConnectionRegistry,
    };

    fn create_test_registry() -> Arc<InMemoryConnectionRegistry> {
        Arc::new(InMemoryConnectionRegistry::new())
    }

    #[tokio::test]
    async fn test_register_user_success() {
        // テスト項目: 新規ユーザーを登録できる
        // given (前提条件):
        let registry = create_test_registry();
        let usecase = RegisterUserUseCase::new(registry.clone());
        let (handle, _rx) = ConnectionHandle::channel(ConnectionIdFactory::generate());

        // when (操作):
        let result = usecase.execute("u1".to_string(), handle.clone()).await;

        // then (期待する結果):
        let outcome = result.unwrap();
        assert_eq!(outcome.user_id.as_str(), "u1");
        assert_eq!(outcome.displaced, None);
        assert_eq!(registry.lookup(&outcome.user_id).await, Some(handle));
    }

    #[tokio::test]
    async fn test_register_same_user_reports_displaced_connection() {
        // テスト項目: 同一ユーザーの再登録で置き換えられた接続が返される
        // given (前提条件):
        let registry = create_test_registry();
        let usecase = RegisterUserUseCase::new(registry.clone());
        let (first, _rx1) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        let (second, _rx2) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        usecase.execute("u1".to_string(), first.clone()).await.unwrap();

        // when (操作):
        let outcome = usecase
            .execute("u1".to_string(), second.clone())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome.displaced, Some(first.id()));
        assert_eq!(registry.lookup(&outcome.user_id).await, Some(second));
    }

    #[tokio::test]
    async fn test_register_empty_user_id_fails() {
        // テスト項目: 空の user_id では登録されない
        // given (前提条件):
        let registry = create_test_registry();
        let usecase = RegisterUserUseCase::new(registry.clone());
        let (handle, _rx) = ConnectionHandle::channel(ConnectionIdFactory::generate());

        // when (操作):
        let result = usecase.execute("".to_string(), handle).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RegisterUserError::InvalidUserId(ValueObjectError::UserIdEmpty))
        );
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_register_padded_or_long_user_id() {
        // テスト項目: 前後に空白のある ID は正規化され、長い ID もそのまま登録される
        // given (前提条件):
        let registry = create_test_registry();
        let usecase = RegisterUserUseCase::new(registry.clone());
        let (padded, _rx1) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        let (long, _rx2) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        let long_id = "x".repeat(300);

        // when (操作):
        let padded_outcome = usecase.execute(" u1 ".to_string(), padded.clone()).await;
        let long_outcome = usecase.execute(long_id.clone(), long.clone()).await;

        // then (期待する結果):
        assert_eq!(padded_outcome.unwrap().user_id.as_str(), "u1");
        assert_eq!(long_outcome.unwrap().user_id.as_str(), long_id);
        let u1 = UserId::new("u1".to_string()).unwrap();
        assert_eq!(registry.lookup(&u1).await, Some(padded));
    }
}
