//! InMemory Connection Registry 実装
//!
//! ドメイン層が定義する ConnectionRegistry trait の具体的な実装。
//! 2 つの HashMap を 1 つの Mutex で保護して使用します。
//!
//! - `by_user`: UserId → 現在そのユーザーを表す接続
//! - `by_connection`: ConnectionId → その接続が現在表しているユーザー（逆参照）
//!
//! 切断時は逆参照からユーザーを引き、`by_user` の値がまだ同じ接続を指している
//! 場合のみ削除します（compare-and-delete）。上書きされた古い接続が後から
//! 切断しても、新しい登録は消えません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionHandle, ConnectionId, ConnectionRegistry, DeliveryError, Push, UserId};

#[derive(Default)]
struct RegistryState {
    by_user: HashMap<UserId, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, UserId>,
}

/// インメモリ Connection Registry 実装
///
/// プロセスの生存期間のみ保持され、永続化はしません。
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryConnectionRegistry {
    /// 新しい InMemoryConnectionRegistry を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(&self, user_id: UserId, handle: ConnectionHandle) -> Option<ConnectionId> {
        let mut state = self.state.lock().await;
        let connection_id = handle.id();

        // 同じ接続が別ユーザーとして再登録された場合、以前のユーザーへの
        // 割り当てを外す（他ユーザーの更新が届かないように）
        if let Some(previous_user) = state.by_connection.remove(&connection_id)
            && previous_user != user_id
            && state
                .by_user
                .get(&previous_user)
                .is_some_and(|current| current.id() == connection_id)
        {
            state.by_user.remove(&previous_user);
        }

        let displaced = state
            .by_user
            .insert(user_id.clone(), handle)
            .map(|previous| previous.id())
            .filter(|previous_id| *previous_id != connection_id);

        // 上書きされた接続はもうどのユーザーも表さない
        if let Some(previous_id) = displaced {
            state.by_connection.remove(&previous_id);
        }
        state.by_connection.insert(connection_id, user_id);

        displaced
    }

    async fn unregister(&self, connection_id: ConnectionId) -> Option<UserId> {
        let mut state = self.state.lock().await;
        let user_id = state.by_connection.remove(&connection_id)?;

        let still_owned = state
            .by_user
            .get(&user_id)
            .is_some_and(|current| current.id() == connection_id);
        if !still_owned {
            return None;
        }

        state.by_user.remove(&user_id);
        Some(user_id)
    }

    async fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        let state = self.state.lock().await;
        state.by_user.get(user_id).cloned()
    }

    async fn deliver(
        &self,
        user_id: &UserId,
        push: Push,
    ) -> Option<Result<ConnectionId, DeliveryError>> {
        let mut state = self.state.lock().await;
        let handle = state.by_user.get(user_id)?;
        let connection_id = handle.id();

        // 送信はロックを保持したまま行う（参照と送信の間に再登録が入らない）
        if let Err(e) = handle.push(push) {
            state.by_user.remove(user_id);
            state.by_connection.remove(&connection_id);
            return Some(Err(e));
        }
        Some(Ok(connection_id))
    }

    async fn count(&self) -> usize {
        let state = self.state.lock().await;
        state.by_user.len()
    }
}
